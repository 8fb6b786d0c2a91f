use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::{services::ServeDir, timeout::TimeoutLayer};

use crate::{
    AppState,
    middleware::{auth_middleware, log_errors},
    routes,
};

fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// 构建完整路由：公开路由、受保护路由、上传文件的静态服务
///
/// 限流依赖 Redis，由调用方按配置决定是否叠加。
pub fn create_router(state: AppState) -> Router {
    // 将路由分为公开路由和受保护路由
    let public_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login));

    let upload_limit = state.files.limits().max_request_bytes();

    let protected_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        // 地点路由
        .route(
            "/locations",
            post(routes::location::create_location).get(routes::location::list_locations),
        )
        .route(
            "/locations/{id}",
            get(routes::location::get_location)
                .put(routes::location::update_location)
                .delete(routes::location::delete_location),
        )
        .route(
            "/locations/{id}/photos",
            post(routes::location::add_photos)
                .get(routes::location::list_photos)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/locations/{id}/reviews",
            post(routes::review::add_review).get(routes::review::list_reviews),
        )
        .route("/location/search", get(routes::location::search_nearby))
        // 群组路由
        .route(
            "/groups",
            post(routes::group::create_group).get(routes::group::list_groups),
        )
        .route("/groups/{id}", get(routes::group::get_group))
        .route("/groups/{id}/join", post(routes::group::join_group))
        .route("/groups/{id}/locations", post(routes::group::attach_location))
        // 邀请路由
        .route(
            "/invitations",
            post(routes::invitation::create_invitation)
                .get(routes::invitation::list_invitations),
        )
        .route(
            "/invitations/{id}",
            get(routes::invitation::get_invitation)
                .delete(routes::invitation::revoke_invitation),
        )
        .route(
            "/invitations/{id}/accept",
            post(routes::invitation::accept_invitation),
        )
        .route(
            "/invitations/{id}/reject",
            post(routes::invitation::reject_invitation),
        )
        // 应用认证中间件
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = Router::new().merge(public_routes).merge(protected_routes);

    // 根路径不能用于 nest
    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(base, api)
    };

    let router = router
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(axum::middleware::from_fn(log_errors))
        .layer(timeout_layer(state.config.request_timeout()));

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}
