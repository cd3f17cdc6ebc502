use admission_match::config::AppConfig;
use admission_match::error::AppError;
use admission_match::matching::{BatchOrchestrator, MatchingContext, MatchingService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Load every artifact named by the configuration; fails fast on the first bad file.
pub(crate) fn build_matching_service(config: &AppConfig) -> Result<MatchingService, AppError> {
    let context = MatchingContext::load(&config.artifacts, &config.matching)?;
    Ok(MatchingService::new(
        Arc::new(context),
        BatchOrchestrator::from_config(&config.matching),
    ))
}
