//! User management API handlers.
use crate::api::error::ApiError;
use crate::api::types::{OkResponse, UserListResponse};
use crate::api::{dal_error, invalid};
use crate::app::AppState;
use crate::auth::Identity;
use crate::dal::{mutations, parse_path_id, views};
use crate::store::AccountStatus;
use axum::extract::{Path, State};
use axum::http::Uri;
use axum::{Extension, Json};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses((status = 200, description = "First users by id", body = UserListResponse))
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<UserListResponse>, ApiError> {
    let data = views::fetch_users_brief(state.store.as_ref())
        .await
        .map_err(|err| dal_error(&state, "Failed to load users", err))?;
    Ok(Json(UserListResponse { data }))
}

async fn change_status(
    state: AppState,
    actor: Identity,
    uri: Uri,
    raw_id: &str,
    status: AccountStatus,
) -> Result<Json<OkResponse>, ApiError> {
    let (action, failed) = match status {
        AccountStatus::Suspended => ("user.suspend", "Failed to suspend user"),
        _ => ("user.activate", "Failed to activate user"),
    };
    let user_id = parse_path_id(raw_id, "user").map_err(invalid)?;
    mutations::set_user_status(state.store.as_ref(), user_id, status)
        .await
        .map_err(|err| dal_error(&state, failed, err))?;
    state
        .audit
        .record(action, Some(&actor), uri.path(), json!({ "user_id": user_id }))
        .await;
    Ok(Json(OkResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/suspend",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User suspended", body = OkResponse),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn suspend_user(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(actor): Extension<Identity>,
    uri: Uri,
) -> Result<Json<OkResponse>, ApiError> {
    change_status(state, actor, uri, &id, AccountStatus::Suspended).await
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/activate",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User activated", body = OkResponse),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn activate_user(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(actor): Extension<Identity>,
    uri: Uri,
) -> Result<Json<OkResponse>, ApiError> {
    change_status(state, actor, uri, &id, AccountStatus::Active).await
}
