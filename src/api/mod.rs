use std::sync::Arc;

use axum::Router;

use crate::models::app_state::AppState;

pub mod health;
pub mod policy;
pub mod validation;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::root_routes(state.clone()))
        .nest("/health", health::health_routes(state.clone()))
        .nest("/policies", policy::policy_routes(state))
}
