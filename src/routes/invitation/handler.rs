use axum::{
    extract::{Extension, Json, Path, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, FieldError, ServiceError},
    operations::InvitationOperation,
    routes::{json_body, path_id},
    utils::{CurrentUser, success_to_api_response},
};

#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    pub group_id: Option<Uuid>,
    pub invitee_id: Option<Uuid>,
}

#[axum::debug_handler]
pub async fn create_invitation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<CreateInvitationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(payload)?;

    let (group_id, invitee_id) = match (req.group_id, req.invitee_id) {
        (Some(group_id), Some(invitee_id)) => (group_id, invitee_id),
        (group_id, invitee_id) => {
            let fields = [("group_id", group_id.is_none()), ("invitee_id", invitee_id.is_none())]
                .into_iter()
                .filter(|(_, missing)| *missing)
                .map(|(field, _)| FieldError {
                    field,
                    message: "is required".into(),
                })
                .collect();
            return Err(ServiceError::Validation(fields).into());
        }
    };

    let repo = InvitationOperation::new(state.store.clone());
    let invitation = repo.invite(user.user_id, group_id, invitee_id).await?;
    Ok((StatusCode::CREATED, success_to_api_response(invitation)))
}

#[axum::debug_handler]
pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let repo = InvitationOperation::new(state.store.clone());
    Ok(success_to_api_response(repo.list(user.user_id).await?))
}

#[axum::debug_handler]
pub async fn get_invitation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = path_id(path)?;
    let repo = InvitationOperation::new(state.store.clone());
    Ok(success_to_api_response(repo.get(user.user_id, id).await?))
}

#[axum::debug_handler]
pub async fn accept_invitation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = path_id(path)?;
    let repo = InvitationOperation::new(state.store.clone());
    Ok(success_to_api_response(repo.accept(user.user_id, id).await?))
}

#[axum::debug_handler]
pub async fn reject_invitation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = path_id(path)?;
    let repo = InvitationOperation::new(state.store.clone());
    Ok(success_to_api_response(repo.reject(user.user_id, id).await?))
}

#[axum::debug_handler]
pub async fn revoke_invitation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = path_id(path)?;
    let repo = InvitationOperation::new(state.store.clone());

    repo.revoke(user.user_id, id).await?;
    Ok(success_to_api_response(serde_json::json!({ "id": id })))
}
