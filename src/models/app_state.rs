use std::sync::Arc;

use crate::{
    config::app_config::{AppConfig, ConfigurationError, DatabaseConfig},
    migrations,
    models::migration::{FailurePolicy, MigrationStep},
    service::{migrator::MigrationRunner, session::SessionProvider},
};

pub struct AppState {
    sessions: SessionProvider,
    migrator: MigrationRunner,
}

impl AppState {
    /// Validates the connection target up front. Opens no connections.
    pub fn from_config(config: &AppConfig) -> Result<Arc<Self>, ConfigurationError> {
        Self::with_steps(
            &config.database,
            migrations::embedded(),
            config.migration.failure_policy,
        )
    }

    pub fn with_steps(
        database: &DatabaseConfig,
        steps: Vec<MigrationStep>,
        policy: FailurePolicy,
    ) -> Result<Arc<Self>, ConfigurationError> {
        let sessions = SessionProvider::new(database)?;
        let migrator = MigrationRunner::new(sessions.connect_options().clone(), steps, policy)
            .with_connect_timeout(database.acquire_timeout());

        Ok(Self::new(sessions, migrator))
    }

    pub fn new(sessions: SessionProvider, migrator: MigrationRunner) -> Arc<Self> {
        Arc::new(Self { sessions, migrator })
    }

    pub fn get_sessions(&self) -> &SessionProvider {
        &self.sessions
    }

    pub fn get_migrator(&self) -> &MigrationRunner {
        &self.migrator
    }
}
