use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde_json::json;
use tracing::error;

use crate::{
    db,
    models::{app_state::AppState, error::ServerError},
    service::{migrator::MigrationError, session::Session},
};

pub fn root_routes(state: Arc<AppState>) -> Router {
    Router::new().route("/", get(root)).with_state(state)
}

pub fn health_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/detailed", get(health_detailed))
        .with_state(state.clone())
}

async fn root(mut session: Session) -> Result<impl IntoResponse, ServerError> {
    let one = db::health::health_check(&mut session).await?;
    Ok(Json(json!({ "message": format!("Hello, world! {}", one) })))
}

async fn health() -> impl IntoResponse {
    "OK".into_response()
}

async fn health_detailed(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServerError> {
    let platform = true;

    let head = state
        .get_migrator()
        .chain()
        .map_err(MigrationError::from)?
        .head()
        .map(str::to_string);

    // Everything is read on one pooled session.
    let (db_status, current) = match state.get_sessions().acquire().await {
        Ok(mut session) => match db::health::health_check(&mut session).await {
            Ok(_) => match db::migration::current_version(&mut session).await {
                Ok(current) => (true, current),
                Err(e) => {
                    error!("Failed to read schema version: {}", e);
                    (true, None)
                }
            },
            Err(_) => (false, None),
        },
        Err(_) => (false, None),
    };
    let up_to_date = db_status && current == head;

    let json = json!({
        "platform": platform,
        "database": db_status,
        "migration": {
            "current": current,
            "head": head,
            "up_to_date": up_to_date,
        },
        "sessions": state.get_sessions().stats(),
    });

    Ok((StatusCode::OK, Json(json)))
}
