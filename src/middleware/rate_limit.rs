use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use redis::AsyncCommands;

use crate::{
    config::Config,
    error::{AppError, ServiceError},
};

/// 按客户端IP的固定窗口计数器
#[derive(Clone)]
pub struct RateLimiter {
    redis: redis::Client,
    window: Duration,
    max_requests: u32,
}

/// 依次取 x-real-ip、x-forwarded-for 的第一个地址、连接地址
pub(crate) fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("x-real-ip")
        .or_else(|| {
            header("x-forwarded-for")
                .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
        })
        .map(ToString::to_string)
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".into())
}

impl RateLimiter {
    pub fn new(redis: redis::Client, config: &Config) -> Self {
        Self {
            redis,
            window: config.rate_limit_window(),
            max_requests: config.rate_limit_requests,
        }
    }

    pub async fn check_rate_limit(&self, req: Request<Body>, next: Next) -> Result<Response, AppError> {
        let remote = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        let ip = client_ip(req.headers(), remote);

        let key = format!("rate_limit:{ip}");
        let mut conn = self
            .redis
            .get_multiplexed_async_connection()
            .await
            .map_err(redis_error)?;

        // 使用 Redis 的 INCR 和 EXPIRE 命令实现计数器
        let count: u64 = conn.incr(&key, 1).await.map_err(redis_error)?;
        if count == 1 {
            let _: () = conn
                .expire(&key, self.window.as_secs() as i64)
                .await
                .map_err(redis_error)?;
        }

        if count > u64::from(self.max_requests) {
            tracing::warn!(%ip, count, "rate limit exceeded");
            return Err(AppError::RateLimited {
                retry_after_secs: self.window.as_secs(),
            });
        }

        Ok(next.run(req).await)
    }
}

fn redis_error(err: redis::RedisError) -> AppError {
    ServiceError::Internal(format!("rate limiter unavailable: {err}")).into()
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    limiter.check_rate_limit(req, next).await
}
