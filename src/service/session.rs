use std::{
    ops::{Deref, DerefMut},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use axum::{extract::FromRequestParts, http::request::Parts};
use dashmap::{DashMap, mapref::entry::Entry};
use serde::Serialize;
use sqlx::{
    PgConnection, Pool, Postgres,
    pool::PoolConnection,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    config::app_config::{ConfigurationError, DatabaseConfig},
    models::{app_state::AppState, error::ServerError},
};

pub type SessionId = Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to acquire database session: {0}")]
    Acquire(#[from] sqlx::Error),

    #[error("Timed out after {0:?} waiting for a database session")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub active: u64,
    pub acquired: u64,
    pub released: u64,
}

/// Tracks every session currently handed out.
///
/// `acquired == released + active` holds whenever no lease is mid-release.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    live: DashMap<SessionId, Instant>,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a fresh id. The id is unique among live leases.
    pub fn lease(self: &Arc<Self>) -> SessionLease {
        let id = loop {
            let candidate = Uuid::new_v4();
            if let Entry::Vacant(slot) = self.live.entry(candidate) {
                slot.insert(Instant::now());
                break candidate;
            }
        };

        self.acquired.fetch_add(1, Ordering::SeqCst);
        SessionLease {
            id,
            registry: Arc::clone(self),
        }
    }

    fn release(&self, id: SessionId) {
        match self.live.remove(&id) {
            Some((_, acquired_at)) => {
                self.released.fetch_add(1, Ordering::SeqCst);
                debug!("Released session {} after {:?}", id, acquired_at.elapsed());
            }
            None => warn!("Session {} was already released", id),
        }
    }

    #[cfg(test)]
    pub fn is_live(&self, id: &SessionId) -> bool {
        self.live.contains_key(id)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            active: self.live.len() as u64,
            acquired: self.acquired.load(Ordering::SeqCst),
            released: self.released.load(Ordering::SeqCst),
        }
    }
}

/// Registration of one session. Deregisters on drop.
#[derive(Debug)]
pub struct SessionLease {
    id: SessionId,
    registry: Arc<SessionRegistry>,
}

impl SessionLease {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

/// One database session, owned by a single unit of work.
///
/// Statements run in autocommit mode. Use [`Session::begin`] for a
/// multi-statement unit; the transaction rolls back unless committed.
/// Dropping the session returns the connection to the pool.
#[derive(Debug)]
pub struct Session {
    // Field order matters: the connection goes back to the pool before the lease is released.
    conn: PoolConnection<Postgres>,
    lease: SessionLease,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.lease.id()
    }

    #[cfg(test)]
    pub async fn begin(&mut self) -> Result<sqlx::Transaction<'_, Postgres>, sqlx::Error> {
        sqlx::Connection::begin(&mut *self.conn).await
    }
}

impl Deref for Session {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

#[derive(Debug, Clone)]
pub struct SessionProvider {
    pool: Pool<Postgres>,
    options: PgConnectOptions,
    registry: Arc<SessionRegistry>,
    acquire_timeout: Duration,
}

impl SessionProvider {
    /// Validates the settings and builds a lazily connecting pool; no
    /// connection is opened here.
    pub fn new(config: &DatabaseConfig) -> Result<Self, ConfigurationError> {
        let options = config.validate()?;
        let acquire_timeout = config.acquire_timeout();
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy_with(options.clone());

        Ok(Self {
            pool,
            options,
            registry: SessionRegistry::new(),
            acquire_timeout,
        })
    }

    /// The parsed connection target the pool was built from.
    pub fn connect_options(&self) -> &PgConnectOptions {
        &self.options
    }

    pub async fn acquire(&self) -> Result<Session, SessionError> {
        let conn = match self.pool.acquire().await {
            Ok(conn) => conn,
            Err(sqlx::Error::PoolTimedOut) => {
                error!(
                    "No database session available within {:?}",
                    self.acquire_timeout
                );
                return Err(SessionError::Timeout(self.acquire_timeout));
            }
            Err(e) => {
                error!("Failed to acquire database session: {}", e);
                return Err(SessionError::Acquire(e));
            }
        };

        let session = Session {
            conn,
            lease: self.registry.lease(),
        };
        debug!("Acquired session {}", session.id());

        Ok(session)
    }

    pub fn stats(&self) -> SessionStats {
        self.registry.stats()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(state.get_sessions().acquire().await?)
    }
}
