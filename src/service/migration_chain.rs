use std::collections::{HashMap, HashSet};

use crate::models::migration::MigrationStep;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationConflictError {
    #[error("Multiple root migrations: {}", .0.join(", "))]
    MultipleRoots(Vec<String>),

    #[error("No root migration among {0} steps")]
    NoRoot(usize),

    #[error("Duplicate migration id: {0}")]
    DuplicateId(String),

    #[error("Migration {id} revises unknown step {parent}")]
    MissingParent { id: String, parent: String },

    #[error("Migration {parent} has more than one successor: {}", .children.join(", "))]
    Branch { parent: String, children: Vec<String> },

    #[error("Migrations unreachable from root: {}", .0.join(", "))]
    Unreachable(Vec<String>),
}

/// A validated, linear ordering of migration steps from root to head.
#[derive(Debug, Clone, Default)]
pub struct MigrationChain {
    steps: Vec<MigrationStep>,
}

impl MigrationChain {
    /// Checks the step graph and orders it. Pure; never touches a database.
    pub fn resolve(steps: &[MigrationStep]) -> Result<Self, MigrationConflictError> {
        if steps.is_empty() {
            return Ok(Self::default());
        }

        let mut by_id: HashMap<&str, &MigrationStep> = HashMap::with_capacity(steps.len());
        for step in steps {
            if by_id.insert(step.id, step).is_some() {
                return Err(MigrationConflictError::DuplicateId(step.id.to_string()));
            }
        }

        let roots: Vec<&MigrationStep> = steps
            .iter()
            .filter(|step| step.down_revision.is_none())
            .collect();

        let root = match roots.as_slice() {
            [] => return Err(MigrationConflictError::NoRoot(steps.len())),
            [root] => *root,
            many => {
                return Err(MigrationConflictError::MultipleRoots(
                    many.iter().map(|step| step.id.to_string()).collect(),
                ));
            }
        };

        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
        for step in steps {
            let Some(parent) = step.down_revision else {
                continue;
            };

            if !by_id.contains_key(parent) {
                return Err(MigrationConflictError::MissingParent {
                    id: step.id.to_string(),
                    parent: parent.to_string(),
                });
            }

            successors.entry(parent).or_default().push(step.id);
        }

        for step in steps {
            match successors.get(step.id) {
                Some(children) if children.len() > 1 => {
                    return Err(MigrationConflictError::Branch {
                        parent: step.id.to_string(),
                        children: children.iter().map(|id| id.to_string()).collect(),
                    });
                }
                _ => {}
            }
        }

        let mut ordered = Vec::with_capacity(steps.len());
        let mut visited = HashSet::with_capacity(steps.len());
        let mut cursor = Some(root);

        while let Some(step) = cursor {
            if !visited.insert(step.id) {
                break;
            }
            ordered.push(step.clone());
            cursor = successors
                .get(step.id)
                .and_then(|children| children.first())
                .and_then(|id| by_id.get(id).copied());
        }

        if ordered.len() != steps.len() {
            let unreachable = steps
                .iter()
                .filter(|step| !visited.contains(step.id))
                .map(|step| step.id.to_string())
                .collect();
            return Err(MigrationConflictError::Unreachable(unreachable));
        }

        Ok(Self { steps: ordered })
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn head(&self) -> Option<&str> {
        self.steps.last().map(|step| step.id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.id == id)
    }
}
