use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use crate::{
    api::validation::ValidatedJson,
    db,
    models::{
        app_state::AppState,
        error::ServerError,
        policy::{CreatePolicyRequest, PatchPolicyRequest},
    },
    service::session::Session,
};

pub fn policy_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list_policies).post(create_policy))
        .route(
            "/{policy_id}",
            get(get_policy).patch(patch_policy).delete(delete_policy),
        )
        .with_state(state)
}

async fn create_policy(
    mut session: Session,
    ValidatedJson(request): ValidatedJson<CreatePolicyRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let policy = db::policy::create_policy(&mut session, &request).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": policy.id }))))
}

async fn list_policies(mut session: Session) -> Result<impl IntoResponse, ServerError> {
    let policies = db::policy::list_policies(&mut session).await?;
    Ok((StatusCode::OK, Json(policies)))
}

async fn get_policy(
    mut session: Session,
    Path(policy_id): Path<i32>,
) -> Result<impl IntoResponse, ServerError> {
    let Some(policy) = db::policy::get_policy(&mut session, policy_id).await? else {
        return Err(ServerError::NotFound(format!("Policy with id {} does not exist", policy_id)));
    };

    Ok((StatusCode::OK, Json(policy)))
}

async fn patch_policy(
    mut session: Session,
    Path(policy_id): Path<i32>,
    ValidatedJson(request): ValidatedJson<PatchPolicyRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let Some(policy) = db::policy::update_policy(&mut session, policy_id, &request).await? else {
        return Err(ServerError::NotFound(format!("Policy with id {} does not exist", policy_id)));
    };

    Ok((StatusCode::OK, Json(policy)))
}

async fn delete_policy(
    mut session: Session,
    Path(policy_id): Path<i32>,
) -> Result<impl IntoResponse, ServerError> {
    if !db::policy::delete_policy(&mut session, policy_id).await? {
        return Err(ServerError::NotFound(format!("Policy with id {} does not exist", policy_id)));
    }

    Ok(StatusCode::NO_CONTENT)
}
