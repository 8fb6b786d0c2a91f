pub mod auth;
pub mod group;
pub mod invitation;
pub mod location;
pub mod review;

use axum::{
    Json,
    extract::{
        Path,
        rejection::{JsonRejection, PathRejection},
    },
};
use uuid::Uuid;

use crate::error::{AppError, ServiceError};

/// 请求体无法解析时返回统一的 400 响应，而不是 axum 默认的纯文本
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected request body");
            Err(ServiceError::bad_request(rejection.body_text()).into())
        }
    }
}

pub(crate) fn path_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(_) => Err(ServiceError::bad_request("invalid id in path").into()),
    }
}
