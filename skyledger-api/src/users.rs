use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Extension, Json, Router,
};

use skyledger_catalog::{NewUser, UserPatch};
use skyledger_core::catalog::UserAccount;

use crate::{error::AppError, middleware::Principal, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/users", get(list_users).post(add_user))
        .route("/v1/users/{id}", patch(update_user).delete(delete_user))
}

async fn list_users(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
) -> Result<Json<Vec<UserAccount>>, AppError> {
    Ok(Json(state.accounts.list_users(role).await?))
}

async fn add_user(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Json(input): Json<NewUser>,
) -> Result<(StatusCode, Json<UserAccount>), AppError> {
    let user = state.accounts.add_user(role, input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<UserAccount>, AppError> {
    Ok(Json(state.accounts.update_user(role, id, patch).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.accounts.delete_user(role, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
