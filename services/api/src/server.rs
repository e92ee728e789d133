use crate::cli::ServeArgs;
use crate::infra::{AppState, LogPresenter};
use crate::routes::with_screening_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use nutriscan::config::AppConfig;
use nutriscan::error::AppError;
use nutriscan::telemetry;
use nutriscan::workflows::screening::{HttpScreeningBackend, ScreeningService, UploadIntake};
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
    if let Some(backend_url) = args.backend_url.take() {
        config.backend.base_url = backend_url;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let backend = Arc::new(HttpScreeningBackend::new(&config.backend)?);
    let screening_service = Arc::new(ScreeningService::new(
        UploadIntake::new(config.intake),
        backend.clone(),
        backend.clone(),
        Arc::new(LogPresenter),
    ));

    let app = with_screening_routes(screening_service, config.intake.max_upload_bytes)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        backend = backend.base_url(),
        "nutriscan screening service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
