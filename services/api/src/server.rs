use crate::cli::ServeArgs;
use crate::infra::{load_jobs, AppState, InMemoryJobRepository};
use crate::routes::with_job_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use invoice_compliance::config::AppConfig;
use invoice_compliance::error::AppError;
use invoice_compliance::session::SessionRegistry;
use invoice_compliance::telemetry;
use invoice_compliance::workflows::jobs::JobComplianceService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let repository = match args.seed.take() {
        Some(path) => {
            let jobs = load_jobs(&path)?;
            info!(jobs = jobs.len(), path = %path.display(), "seeding job repository");
            InMemoryJobRepository::seeded(jobs).map_err(|err| AppError::Jobs(err.into()))?
        }
        None => InMemoryJobRepository::default(),
    };
    let job_service = Arc::new(JobComplianceService::new(Arc::new(repository)));

    if config.auth.tokens.is_empty() {
        warn!("APP_API_TOKENS is empty; every /api/v1 request will be rejected");
    }
    let sessions = Arc::new(SessionRegistry::new(config.auth.tokens.clone()));

    let app = with_job_routes(job_service, sessions)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "invoice compliance service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
