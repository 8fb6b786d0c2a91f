use axum::{
    extract::{Extension, Json, Path, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    operations::ReviewOperation,
    routes::{json_body, path_id},
    utils::{CurrentUser, success_to_api_response},
};

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

#[axum::debug_handler]
pub async fn add_review(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let location_id = path_id(path)?;
    let req = json_body(payload)?;
    let repo = ReviewOperation::new(state.store.clone());

    let review = repo
        .add(user.user_id, location_id, req.rating, req.comment)
        .await?;
    Ok((StatusCode::CREATED, success_to_api_response(review)))
}

#[axum::debug_handler]
pub async fn list_reviews(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let location_id = path_id(path)?;
    let repo = ReviewOperation::new(state.store.clone());
    Ok(success_to_api_response(repo.list(location_id).await?))
}
