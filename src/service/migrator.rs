use std::{sync::Arc, time::Duration};

use sqlx::{Connection, PgConnection, postgres::PgConnectOptions};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::{
    db::migration as store,
    models::{
        error::error_chain,
        migration::{
            Direction, FailurePolicy, MigrationReport, MigrationStatus, MigrationStep,
            MigrationTarget,
        },
    },
    service::migration_chain::{MigrationChain, MigrationConflictError},
};

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Conflicting migration chain: {0}")]
    Conflict(#[from] MigrationConflictError),

    #[error("Migration step {id} failed: {source}")]
    Step { id: String, source: sqlx::Error },

    #[error("Migration database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Timed out after {0:?} connecting to the migration target")]
    Timeout(Duration),

    #[error("Database is at unknown version {0}")]
    UnknownVersion(String),

    #[error("Unknown migration target {0}")]
    UnknownTarget(String),

    #[error("Cannot {direction} from {current} to {target}")]
    InvalidTarget {
        direction: Direction,
        current: String,
        target: String,
    },

    #[error("Version record changed by another process while applying {0}")]
    ConcurrentUpdate(String),
}

impl MigrationError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, MigrationError::Conflict(_))
    }
}

/// Applies the failure policy to a migration outcome.
///
/// Conflicts are returned regardless of policy. Under `FailSoft` every other
/// error is logged with its full cause and swallowed.
pub fn enforce(
    policy: FailurePolicy,
    result: Result<MigrationReport, MigrationError>,
) -> Result<Option<MigrationReport>, MigrationError> {
    match result {
        Ok(report) => Ok(Some(report)),
        Err(e) if e.is_conflict() => Err(e),
        Err(e) => match policy {
            FailurePolicy::FailFast => Err(e),
            FailurePolicy::FailSoft => {
                error!(
                    policy = %policy,
                    "Migration failed, continuing with a possibly stale schema: {}",
                    error_chain(&e)
                );
                Ok(None)
            }
        },
    }
}

fn label(version: Option<&str>) -> String {
    version.unwrap_or("base").to_string()
}

/// Brings the target database to a version of the embedded migration chain.
///
/// Uses its own connection rather than the request pool, and holds a
/// session advisory lock for the whole run so concurrent processes
/// migrate one at a time.
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    options: PgConnectOptions,
    steps: Arc<Vec<MigrationStep>>,
    policy: FailurePolicy,
    connect_timeout: Duration,
}

impl MigrationRunner {
    pub fn new(options: PgConnectOptions, steps: Vec<MigrationStep>, policy: FailurePolicy) -> Self {
        Self {
            options,
            steps: Arc::new(steps),
            policy,
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn chain(&self) -> Result<MigrationChain, MigrationConflictError> {
        MigrationChain::resolve(&self.steps)
    }

    /// Upgrade to head.
    pub async fn run(&self) -> Result<MigrationReport, MigrationError> {
        self.upgrade(&MigrationTarget::Head).await
    }

    /// [`MigrationRunner::run`] with the configured failure policy applied.
    pub async fn run_with_policy(&self) -> Result<Option<MigrationReport>, MigrationError> {
        enforce(self.policy, self.run().await)
    }

    pub async fn upgrade(&self, target: &MigrationTarget) -> Result<MigrationReport, MigrationError> {
        let chain = self.chain()?;
        let mut conn = self.connect().await?;

        store::lock(&mut conn).await?;
        let result = self.apply(&mut conn, &chain, target, Direction::Upgrade).await;
        self.finish(conn).await;

        result
    }

    pub async fn downgrade(
        &self,
        target: &MigrationTarget,
    ) -> Result<MigrationReport, MigrationError> {
        let chain = self.chain()?;
        let mut conn = self.connect().await?;

        store::lock(&mut conn).await?;
        let result = self.apply(&mut conn, &chain, target, Direction::Downgrade).await;
        self.finish(conn).await;

        result
    }

    pub async fn current(&self) -> Result<Option<String>, MigrationError> {
        let mut conn = self.connect().await?;
        let current = store::current_version(&mut conn).await;
        if let Err(e) = conn.close().await {
            warn!("Failed to close migration connection: {}", e);
        }
        Ok(current?)
    }

    pub async fn history(&self) -> Result<Vec<MigrationStatus>, MigrationError> {
        let chain = self.chain()?;
        let current = self.current().await?;
        let current_pos = Self::position_of(&chain, current.as_deref())?;

        let history = chain
            .steps()
            .iter()
            .enumerate()
            .map(|(index, step)| MigrationStatus {
                id: step.id.to_string(),
                down_revision: step.down_revision.map(str::to_string),
                description: step.description.to_string(),
                applied: current_pos.is_some_and(|pos| index <= pos),
                current: current_pos == Some(index),
            })
            .collect();

        Ok(history)
    }

    async fn connect(&self) -> Result<PgConnection, MigrationError> {
        match timeout(self.connect_timeout, PgConnection::connect_with(&self.options)).await {
            Ok(conn) => Ok(conn?),
            Err(_) => Err(MigrationError::Timeout(self.connect_timeout)),
        }
    }

    // Closing the connection also drops the advisory lock, so a failed unlock is only logged.
    async fn finish(&self, mut conn: PgConnection) {
        if let Err(e) = store::unlock(&mut conn).await {
            warn!("Failed to release migration lock: {}", e);
        }
        if let Err(e) = conn.close().await {
            warn!("Failed to close migration connection: {}", e);
        }
    }

    fn position_of(
        chain: &MigrationChain,
        version: Option<&str>,
    ) -> Result<Option<usize>, MigrationError> {
        match version {
            None => Ok(None),
            Some(id) => chain
                .position(id)
                .map(Some)
                .ok_or_else(|| MigrationError::UnknownVersion(id.to_string())),
        }
    }

    fn target_position(
        chain: &MigrationChain,
        target: &MigrationTarget,
    ) -> Result<Option<usize>, MigrationError> {
        match target {
            MigrationTarget::Head => Ok(chain.len().checked_sub(1)),
            MigrationTarget::Base => Ok(None),
            MigrationTarget::Revision(id) => chain
                .position(id)
                .map(Some)
                .ok_or_else(|| MigrationError::UnknownTarget(id.clone())),
        }
    }

    async fn apply(
        &self,
        conn: &mut PgConnection,
        chain: &MigrationChain,
        target: &MigrationTarget,
        direction: Direction,
    ) -> Result<MigrationReport, MigrationError> {
        store::ensure_version_table(&mut *conn).await?;
        let current = store::current_version(&mut *conn).await?;

        let current_pos = Self::position_of(chain, current.as_deref())?;
        let target_pos = Self::target_position(chain, target)?;

        let wrong_way = match direction {
            Direction::Upgrade => target_pos < current_pos,
            Direction::Downgrade => target_pos > current_pos,
        };
        if wrong_way {
            return Err(MigrationError::InvalidTarget {
                direction,
                current: label(current.as_deref()),
                target: target.to_string(),
            });
        }

        // Positions are inclusive; None is "base", before the first step.
        let (low, high) = match direction {
            Direction::Upgrade => (current_pos, target_pos),
            Direction::Downgrade => (target_pos, current_pos),
        };
        let start = low.map_or(0, |pos| pos + 1);
        let end = high.map_or(0, |pos| pos + 1);
        let pending = &chain.steps()[start..end];

        let mut version = current.clone();
        let mut applied = Vec::with_capacity(pending.len());

        let mut ordered: Vec<&MigrationStep> = pending.iter().collect();
        if direction == Direction::Downgrade {
            ordered.reverse();
        }

        for step in ordered {
            let (sql, next) = match direction {
                Direction::Upgrade => (step.upgrade, Some(step.id)),
                Direction::Downgrade => (step.downgrade, step.down_revision),
            };

            Self::apply_step(&mut *conn, step, sql, version.as_deref(), next).await?;
            info!(
                "Migration {} {} -> {} ({})",
                direction,
                label(version.as_deref()),
                label(next),
                step.description
            );

            version = next.map(str::to_string);
            applied.push(step.id.to_string());
        }

        if applied.is_empty() {
            info!("Schema already at {}, nothing to {}", label(version.as_deref()), direction);
        }

        Ok(MigrationReport {
            direction,
            from: current,
            to: version,
            applied,
        })
    }

    async fn apply_step(
        conn: &mut PgConnection,
        step: &MigrationStep,
        sql: &'static str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<(), MigrationError> {
        let mut tx = conn.begin().await?;

        sqlx::raw_sql(sql)
            .execute(&mut *tx)
            .await
            .map_err(|source| MigrationError::Step {
                id: step.id.to_string(),
                source,
            })?;

        if !store::swap_version(&mut tx, from, to).await? {
            return Err(MigrationError::ConcurrentUpdate(step.id.to_string()));
        }

        tx.commit().await?;
        Ok(())
    }
}
