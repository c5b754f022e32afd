pub mod health;
pub mod ingest;
pub mod marine;
pub mod metrics_handler;

use crate::query::QueryService;

/// State shared by the API handlers
#[derive(Clone)]
pub struct AppState {
    pub service: QueryService,
}
