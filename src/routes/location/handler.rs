use axum::{
    extract::{
        Extension, Json, Multipart, Path, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, ServiceError},
    models::{LocationPatch, NewLocation},
    operations::{LocationOperation, NearbyQuery},
    routes::{json_body, path_id},
    storage::Upload,
    utils::{CurrentUser, success_to_api_response},
};

use super::model::{DESCRIPTION_FIELD, PHOTO_FIELD, SearchQuery};

fn multipart_error(err: MultipartError) -> AppError {
    ServiceError::bad_request(err.body_text()).into()
}

#[axum::debug_handler]
pub async fn create_location(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<NewLocation>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(payload)?;
    let repo = LocationOperation::new(state.store.clone());

    let location = repo.create(user.user_id, req).await?;
    Ok((StatusCode::CREATED, success_to_api_response(location)))
}

#[axum::debug_handler]
pub async fn list_locations(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let repo = LocationOperation::new(state.store.clone());
    Ok(success_to_api_response(repo.list_visible(user.user_id).await?))
}

#[axum::debug_handler]
pub async fn get_location(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = path_id(path)?;
    let repo = LocationOperation::new(state.store.clone());
    Ok(success_to_api_response(repo.get(user.user_id, id).await?))
}

#[axum::debug_handler]
pub async fn update_location(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<LocationPatch>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = path_id(path)?;
    let patch = json_body(payload)?;
    let repo = LocationOperation::new(state.store.clone());
    Ok(success_to_api_response(repo.update(user.user_id, id, patch).await?))
}

#[axum::debug_handler]
pub async fn delete_location(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = path_id(path)?;
    let repo = LocationOperation::new(state.store.clone());

    repo.delete(user.user_id, id).await?;
    Ok(success_to_api_response(serde_json::json!({ "id": id })))
}

#[axum::debug_handler]
pub async fn add_photos(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = path_id(path)?;
    let mut multipart =
        multipart.map_err(|e| AppError::from(ServiceError::bad_request(e.body_text())))?;

    let mut uploads = Vec::new();
    let mut description = String::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == PHOTO_FIELD {
            let file_name = field.file_name().map(ToString::to_string);
            let content_type = field.content_type().map(ToString::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;
            uploads.push(Upload {
                file_name,
                content_type,
                bytes,
            });
        } else if name == DESCRIPTION_FIELD {
            description = field.text().await.map_err(multipart_error)?;
        }
    }
    tracing::debug!(location_id = %id, files = uploads.len(), "received photo upload");

    let repo = LocationOperation::new(state.store.clone());
    let location = repo
        .add_photos(state.files.as_ref(), user.user_id, id, uploads, description)
        .await?;
    Ok((StatusCode::CREATED, success_to_api_response(location)))
}

#[axum::debug_handler]
pub async fn list_photos(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = path_id(path)?;
    let repo = LocationOperation::new(state.store.clone());
    Ok(success_to_api_response(repo.list_photos(user.user_id, id).await?))
}

#[axum::debug_handler]
pub async fn search_nearby(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let query = NearbyQuery::parse(
        query.latitude.as_deref(),
        query.longitude.as_deref(),
        query.radius.as_deref(),
    )?;

    let repo = LocationOperation::new(state.store.clone());
    let locations = repo.search_nearby(query).await?;
    tracing::debug!(
        latitude = query.latitude,
        longitude = query.longitude,
        radius_km = query.radius_km,
        found = locations.len(),
        "nearby search"
    );
    Ok(success_to_api_response(locations))
}
