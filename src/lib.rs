use std::sync::Arc;

use config::Config;
use storage::FileStorage;
use store::DocumentStore;

pub mod access;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod operations;
pub mod result;
pub mod router;
pub mod routes;
pub mod storage;
pub mod store;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub files: Arc<dyn FileStorage>,
    pub config: Config,
}
