use crate::cli::ServeArgs;
use crate::demo::{sample_catalog, sample_patient};
use crate::infra::{
    logging_dispatcher, AppState, InMemoryMatchRepository, InMemoryPatientDirectory,
};
use crate::routes::with_matching_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use trial_match::config::AppConfig;
use trial_match::error::AppError;
use trial_match::telemetry;
use trial_match::workflows::catalog::{PatientProfileImporter, StaticTrialCatalog};
use trial_match::workflows::matching::{TrialMatchingService, TrialScorer};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let catalog = match args.catalog.take() {
        Some(path) => StaticTrialCatalog::from_path(path)?,
        None => sample_catalog()?,
    };

    let directory = InMemoryPatientDirectory::default();
    if args.patients.is_empty() {
        directory.insert(sample_patient());
    }
    for path in &args.patients {
        directory.insert(PatientProfileImporter::from_path(path)?);
    }

    info!(
        trials = catalog.len(),
        patients = directory.len(),
        minimum_relevance = config.matching.minimum_relevance,
        "matching inputs loaded"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let matching_service = Arc::new(TrialMatchingService::new(
        Arc::new(directory),
        Arc::new(catalog),
        Arc::new(InMemoryMatchRepository::default()),
        Arc::new(logging_dispatcher()),
        TrialScorer::from_config(&config.matching),
    ));

    let app = with_matching_routes(matching_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "trial matching service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
