use crate::cli::ServeArgs;
use crate::infra::{build_matching_service, AppState};
use crate::routes::with_matching_routes;
use admission_match::config::AppConfig;
use admission_match::error::AppError;
use admission_match::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
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

    let service = Arc::new(build_matching_service(&config)?);
    info!(
        catalog_rows = service.context().catalog().len(),
        threshold = config.matching.ranking_threshold,
        batch_max_items = config.matching.batch_max_items,
        "matching artifacts loaded"
    );

    let app = with_matching_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admission matching service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
