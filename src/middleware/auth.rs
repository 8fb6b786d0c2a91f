use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use crate::{
    AppState,
    error::{AppError, ServiceError},
    utils::verify_token,
};

/// 校验 Bearer 令牌，并把调用者写入请求扩展供处理器读取
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.map_err(|rejection| {
        tracing::debug!(uri = %req.uri(), %rejection, "missing bearer token");
        ServiceError::Unauthenticated
    })?;

    let claims = verify_token(bearer.token(), &state.config).map_err(|e| {
        tracing::debug!(uri = %req.uri(), error = %e, "rejected token");
        ServiceError::Unauthenticated
    })?;

    req.extensions_mut().insert(claims.current_user()?);
    Ok(next.run(req).await)
}
