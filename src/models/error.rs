use std::error::Error as StdError;

use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;
use tracing::{error, warn};

use crate::service::{migrator::MigrationError, session::SessionError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Sqlx failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("Api error: {1}")]
    Api(StatusCode, String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ServerError::Sqlx(e) => {
                error!("Sqlx failed with error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
            }
            ServerError::Session(e) => {
                error!("Failed to hand out database session: {}", error_chain(&e));
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    String::from("Database unavailable"),
                )
            }
            ServerError::Migration(e) => {
                error!("Migration error: {}", error_chain(&e));
                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
            }
            ServerError::Api(sc, msg) => {
                error!("Api error: {} - {}", sc, msg);
                (sc, msg)
            }
            ServerError::NotFound(e) => {
                warn!("Entity not found: {}", e);
                (StatusCode::NOT_FOUND, e)
            }
        }
        .into_response()
    }
}

/// Errors that stop the process before or after serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("Server io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders an error and all of its sources on one line.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_message = cause.to_string();
        if !message.contains(&cause_message) {
            message.push_str(": ");
            message.push_str(&cause_message);
        }
        source = cause.source();
    }

    message
}
