use axum::{
    extract::{Extension, Json, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    config::Config,
    error::{AppError, FieldErrors, ServiceError},
    models::{NewUser, User},
    operations::UserOperation,
    routes::json_body,
    utils::{CurrentUser, generate_token, success_to_api_response},
};

use super::model::{AuthResponse, LoginRequest};

fn issue_token(user: User, config: &Config) -> Result<AuthResponse, ServiceError> {
    let (token, expires_at) = generate_token(user.id, config)
        .map_err(|e| ServiceError::Internal(format!("failed to sign token: {e}")))?;
    Ok(AuthResponse {
        user,
        token,
        expires_at,
    })
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(payload)?;
    let repo = UserOperation::new(state.store.clone(), state.config.bcrypt_cost);

    let user = repo.register(req).await?;
    Ok((
        StatusCode::CREATED,
        success_to_api_response(issue_token(user, &state.config)?),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(payload)?;

    let mut errors = FieldErrors::new();
    if req.email.as_deref().is_none_or(str::is_empty) {
        errors.push("email", "is required");
    }
    if req.password.as_deref().is_none_or(str::is_empty) {
        errors.push("password", "is required");
    }
    errors.into_result()?;

    let repo = UserOperation::new(state.store.clone(), state.config.bcrypt_cost);
    let user = repo
        .login(
            req.email.as_deref().unwrap_or_default(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(success_to_api_response(issue_token(user, &state.config)?))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let repo = UserOperation::new(state.store.clone(), state.config.bcrypt_cost);
    Ok(success_to_api_response(repo.me(user.user_id).await?))
}
