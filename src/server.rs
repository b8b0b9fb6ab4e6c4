use crate::cli::ServeArgs;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::infra::{load_seed, AppState, InMemoryPlacementStore, MailNotifier, SeedData};
use crate::placement::jobs::{ExpirySweeper, IdentityResolver, JobBoard, JwtIdentityResolver};
use crate::routes::with_job_routes;
use crate::telemetry;
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

    let seed = match &config.seed_file {
        Some(path) => {
            let seed = load_seed(path)?;
            info!(
                path = %path.display(),
                students = seed.students.len(),
                recruiters = seed.recruiters.len(),
                jobs = seed.jobs.len(),
                "loaded seed documents"
            );
            seed
        }
        None => SeedData::default(),
    };
    let store = Arc::new(InMemoryPlacementStore::from_seed(seed));
    let notifier = Arc::new(MailNotifier::from_config(config.email.as_ref()));
    let resolver: Arc<dyn IdentityResolver> =
        Arc::new(JwtIdentityResolver::new(&config.auth.jwt_secret));
    let board = Arc::new(JobBoard::new(store.clone(), notifier));

    let sweeper = config
        .expiry
        .sweep_interval()
        .map(|period| ExpirySweeper::new(store, period).spawn());

    let app = with_job_routes(board, resolver)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "campus placement service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "unable to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    info!("received ctrl+c interrupt, closing server");
}
