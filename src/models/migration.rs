use core::fmt;
use std::{convert::Infallible, str::FromStr};

use serde::{Deserialize, Serialize};

/// What to do when applying migrations fails at a lifecycle transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort startup.
    #[default]
    FailFast,
    /// Log the full cause and keep serving on the current schema.
    FailSoft,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::FailFast => write!(f, "fail_fast"),
            FailurePolicy::FailSoft => write!(f, "fail_soft"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStep {
    pub id: &'static str,
    pub down_revision: Option<&'static str>,
    pub description: &'static str,
    pub upgrade: &'static str,
    pub downgrade: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationTarget {
    Head,
    Base,
    Revision(String),
}

impl FromStr for MigrationTarget {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "head" => MigrationTarget::Head,
            "base" => MigrationTarget::Base,
            revision => MigrationTarget::Revision(revision.to_string()),
        })
    }
}

impl fmt::Display for MigrationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationTarget::Head => write!(f, "head"),
            MigrationTarget::Base => write!(f, "base"),
            MigrationTarget::Revision(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Upgrade,
    Downgrade,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upgrade => write!(f, "upgrade"),
            Direction::Downgrade => write!(f, "downgrade"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub direction: Direction,
    pub from: Option<String>,
    pub to: Option<String>,
    pub applied: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub id: String,
    pub down_revision: Option<String>,
    pub description: String,
    pub applied: bool,
    pub current: bool,
}
