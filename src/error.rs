use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::result::ApiResponse;
use crate::storage::StorageError;
use crate::store::StoreError;
use crate::utils::error_codes;

/// 单个字段的校验失败信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// 业务层错误，与 HTTP 无关
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(String),
    #[error("authentication required")]
    Unauthenticated,
    #[error("{0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// 单个必填字段缺失
    pub fn required(field: &'static str) -> Self {
        Self::Validation(vec![FieldError {
            field,
            message: "is required".into(),
        }])
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => Self::Conflict(format!("{what} already exists")),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Rejected(reason) => Self::BadRequest(reason),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 收集全部字段错误，而不是遇到第一个就返回
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self.0))
        }
    }
}

/// HTTP 边界错误
#[derive(Debug)]
pub enum AppError {
    Service(ServiceError),
    RateLimited { retry_after_secs: u64 },
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError::Service(err)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Service(err) => match err {
                ServiceError::Validation(_) | ServiceError::BadRequest(_) => {
                    StatusCode::BAD_REQUEST
                }
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
                ServiceError::Conflict(_) => StatusCode::CONFLICT,
                ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn code(&self) -> i32 {
        match self {
            AppError::Service(err) => match err {
                ServiceError::Validation(_) => error_codes::VALIDATION_ERROR,
                ServiceError::BadRequest(_) => error_codes::BAD_REQUEST,
                ServiceError::NotFound(_) => error_codes::NOT_FOUND,
                ServiceError::Forbidden(_) => error_codes::PERMISSION_DENIED,
                ServiceError::Unauthenticated => error_codes::AUTH_FAILED,
                ServiceError::Conflict(_) => error_codes::CONFLICT,
                ServiceError::Internal(_) => error_codes::INTERNAL_ERROR,
            },
            AppError::RateLimited { .. } => error_codes::RATE_LIMIT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match self {
            AppError::Service(ServiceError::Validation(fields)) => ApiResponse {
                code,
                msg: "validation failed".into(),
                resp_data: Some(serde_json::json!({ "fields": fields })),
            },
            AppError::Service(ServiceError::Internal(detail)) => {
                // 内部细节只写日志，不返回给调用方
                tracing::error!(error = %detail, "internal error");
                ApiResponse {
                    code,
                    msg: "internal server error".into(),
                    resp_data: None,
                }
            }
            AppError::Service(err) => ApiResponse {
                code,
                msg: err.to_string(),
                resp_data: None,
            },
            AppError::RateLimited { retry_after_secs } => ApiResponse {
                code,
                msg: format!("too many requests, retry in {retry_after_secs} seconds"),
                resp_data: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rstest::rstest;

    #[rstest]
    #[case(ServiceError::Validation(vec![]), StatusCode::BAD_REQUEST)]
    #[case(ServiceError::bad_request("x"), StatusCode::BAD_REQUEST)]
    #[case(ServiceError::NotFound("Location"), StatusCode::NOT_FOUND)]
    #[case(ServiceError::forbidden("no"), StatusCode::FORBIDDEN)]
    #[case(ServiceError::Unauthenticated, StatusCode::UNAUTHORIZED)]
    #[case(ServiceError::conflict("dup"), StatusCode::CONFLICT)]
    #[case(ServiceError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn maps_each_kind_to_a_fixed_status(#[case] err: ServiceError, #[case] expected: StatusCode) {
        assert_eq!(AppError::from(err).status(), expected);
    }

    #[tokio::test]
    async fn internal_detail_is_not_leaked() {
        let response =
            AppError::from(ServiceError::Internal("pool timed out at 10.0.0.3".into()))
                .into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!body.contains("10.0.0.3"));
        assert!(body.contains("internal server error"));
    }

    #[tokio::test]
    async fn validation_lists_every_field() {
        let mut errors = FieldErrors::new();
        errors.push("name", "must not be empty");
        errors.push("latitude", "must be between -90 and 90");
        let err = errors.into_result().unwrap_err();

        let response = AppError::from(err).into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let fields = body["resp_data"]["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1]["field"], "latitude");
    }

    #[test]
    fn duplicate_store_key_becomes_conflict() {
        let err: ServiceError = StoreError::Duplicate("email".into()).into();
        assert!(matches!(err, ServiceError::Conflict(msg) if msg == "email already exists"));
    }
}
