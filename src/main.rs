use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use locshare_backend::{
    AppState,
    config::Config,
    middleware::{RateLimiter, rate_limit},
    router::create_router,
    storage::{LocalFileStorage, UploadLimits},
    store::{DocumentStore, MemoryStore, PgStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置存储
    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.db_max_connections)
                .await
                .expect("Failed to connect to Postgres");
            store.migrate().await.expect("Failed to run migrations");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let files = Arc::new(LocalFileStorage::new(
        &config.upload_dir,
        &config.public_base_url,
        UploadLimits::default(),
    ));

    // 设置应用状态
    let state = AppState {
        store: store.clone(),
        files,
        config: config.clone(),
    };

    let router = create_router(state);

    // 配置了 Redis 才启用限流
    let app = match &config.redis_url {
        Some(url) => {
            let redis_client = redis::Client::open(url.as_str()).expect("Failed to create Redis client");
            let rate_limiter = Arc::new(RateLimiter::new(redis_client, &config));
            tracing::info!(
                requests = config.rate_limit_requests,
                window_secs = config.rate_limit_window_secs,
                "rate limiting enabled"
            );
            router.layer(axum::middleware::from_fn_with_state(rate_limiter, rate_limit))
        }
        None => router,
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    store.close().await;
    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
