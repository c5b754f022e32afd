use anyhow::Result;
use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    auth,
    cleanup::{self, RetentionConfig},
    config::Config,
    handlers::{self, AppState},
    ingest::{self, IngestionRunner, Orchestrator},
    metrics,
    query::QueryService,
    signals::{self, setup_signal_handlers},
    store::ObservationStore,
};

/// How long shutdown waits for an in-flight ingestion pass
const PASS_DRAIN_TIMEOUT: Duration = Duration::from_secs(300);

/// Start the query API, the ingestion scheduler and the retention task
///
/// This function:
/// 1. Initializes metrics
/// 2. Opens the observation store
/// 3. Sets up signal handlers for graceful shutdown
/// 4. Spawns the background tasks
/// 5. Serves requests until a shutdown signal arrives
pub async fn start_server(config: Config) -> Result<()> {
    info!("Initializing Prometheus metrics...");
    let metrics_handle = Arc::new(metrics::init_metrics()?);

    let store = ObservationStore::open(&config.database).await?;
    let orchestrator = Arc::new(Orchestrator::from_config(&config, store.clone())?);
    let runner = IngestionRunner::new(orchestrator);
    let service = QueryService::new(store.clone(), runner.clone(), config.trigger.secret.clone());

    let (shutdown_tx, signal_handle) = setup_signal_handlers();

    let scheduler = if config.ingestion.schedule_enabled {
        Some(ingest::spawn_scheduler(
            runner.clone(),
            Duration::from_secs(config.ingestion.interval_seconds),
            shutdown_tx.subscribe(),
        ))
    } else {
        info!("Scheduled ingestion disabled");
        None
    };

    let retention = cleanup::spawn_retention_task(
        store,
        RetentionConfig::new(config.ingestion.retention_days),
        shutdown_tx.subscribe(),
    );

    if config.trigger.secret.is_none() {
        info!("No trigger secret configured, POST /api/ingest will reject every request");
    }

    let app = create_router(AppState { service }, metrics_handle);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting coastwatch on {}", addr);
    info!(
        "Configuration: {} locations, database {}, ingestion every {}s",
        config.registry().len(),
        config.database.path.display(),
        config.ingestion.interval_seconds
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown_rx = shutdown_tx.subscribe();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signals::wait_for_shutdown(shutdown_rx).await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    if runner.is_running() {
        info!("Waiting for in-flight ingestion pass to finish");
        if !runner.wait_idle(PASS_DRAIN_TIMEOUT).await {
            tracing::warn!("Ingestion pass still running at shutdown");
        }
    }

    if let Some(handle) = scheduler {
        handle.await?;
    }
    if let Some(handle) = retention {
        handle.await?;
    }
    signal_handle.await?;
    info!("Server stopped gracefully");

    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState, metrics_handle: Arc<PrometheusHandle>) -> Router {
    let trigger_routes = Router::new()
        .route("/api/ingest", post(handlers::ingest::trigger_ingestion))
        .layer(middleware::from_fn(auth::trigger_auth_middleware))
        .with_state(state.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    let api_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/marine-data/:country/:city",
            get(handlers::marine::marine_data),
        )
        .route(
            "/api/marine-data/:country/:city/latest",
            get(handlers::marine::latest_marine_data),
        )
        .route("/api/countries", get(handlers::marine::countries))
        .route("/api/cities/:country", get(handlers::marine::cities))
        .route("/api/stats", get(handlers::marine::stats))
        .route("/api/sources", get(handlers::marine::sources))
        .route("/api/ingest/status", get(handlers::ingest::ingestion_status))
        .layer(cors)
        .with_state(state);

    Router::new()
        .route("/metrics", get(handlers::metrics_handler::metrics))
        .with_state(metrics_handle)
        .merge(api_routes)
        .merge(trigger_routes)
        .layer(TraceLayer::new_for_http())
}
