use axum::{
    extract::{Extension, Json, Path, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, ServiceError},
    operations::GroupOperation,
    routes::{json_body, path_id},
    utils::{CurrentUser, success_to_api_response},
};

use super::model::{AttachLocationRequest, CreateGroupRequest};

#[axum::debug_handler]
pub async fn create_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<CreateGroupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(payload)?;
    let repo = GroupOperation::new(state.store.clone());

    let group = repo.create(user.user_id, req.name).await?;
    Ok((StatusCode::CREATED, success_to_api_response(group)))
}

#[axum::debug_handler]
pub async fn list_groups(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let repo = GroupOperation::new(state.store.clone());
    Ok(success_to_api_response(repo.list_for_member(user.user_id).await?))
}

#[axum::debug_handler]
pub async fn get_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = path_id(path)?;
    let repo = GroupOperation::new(state.store.clone());
    Ok(success_to_api_response(repo.get(user.user_id, id).await?))
}

#[axum::debug_handler]
pub async fn join_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = path_id(path)?;
    let repo = GroupOperation::new(state.store.clone());
    Ok(success_to_api_response(repo.join(user.user_id, id).await?))
}

#[axum::debug_handler]
pub async fn attach_location(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AttachLocationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let group_id = path_id(path)?;
    let req = json_body(payload)?;

    let location_id = req
        .location_id
        .ok_or(ServiceError::required("location_id"))?;

    let repo = GroupOperation::new(state.store.clone());
    let group = repo
        .attach_location(user.user_id, group_id, location_id)
        .await?;
    Ok(success_to_api_response(group))
}
