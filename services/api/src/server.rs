use crate::cli::ServeArgs;
use crate::infra::{seed_directory, AppState};
use crate::routes::with_placement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use placement_desk::config::AppConfig;
use placement_desk::error::AppError;
use placement_desk::telemetry;
use placement_desk::workflows::placement::{InMemoryPlacementStore, PlacementService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryPlacementStore::new());
    let placement_service = Arc::new(PlacementService::new(store.clone(), config.placement));
    if !args.empty {
        let seeded = seed_directory(&store, &*placement_service)?;
        info!(
            positions = seeded.positions.len(),
            application = seeded.application.id.0,
            "sample directory seeded"
        );
    }

    let app = with_placement_routes(placement_service.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    let policy = placement_service.policy();
    info!(
        ?config.environment,
        %addr,
        capacity_policy = policy.capacity.label(),
        close_when_filled = policy.close_when_filled,
        "placement desk ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
