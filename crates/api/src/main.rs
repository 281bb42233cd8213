use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use duoledger_classifier::{ChatCompletionsClassifier, ClassifierConfig, DynClassifier};
use duoledger_worker::{
    JobProcessor, JobQueue, ReconciliationSweep, SubmissionService, WorkerConfig, WorkerPool,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duoledger_api::config::ServerConfig;
use duoledger_api::router::build_app_router;
use duoledger_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "duoledger_api=debug,duoledger_worker=debug,duoledger_classifier=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    let classifier_config = ClassifierConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        workers = worker_config.worker_count,
        queue_capacity = worker_config.queue_capacity,
        classifier_url = %classifier_config.base_url,
        model = %classifier_config.model,
        "Loaded configuration",
    );

    let classify_deadline = classifier_config.overall_deadline();
    if let Err(reason) = worker_config.check_stale_after(classify_deadline) {
        panic!("Invalid worker configuration: {reason}");
    }

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = duoledger_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    duoledger_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    duoledger_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Pipeline ---
    let classifier: DynClassifier = Arc::new(
        ChatCompletionsClassifier::new(classifier_config)
            .expect("Failed to build classification client"),
    );

    let (queue, receiver) = JobQueue::bounded(worker_config.queue_capacity);
    let processor = Arc::new(JobProcessor::new(
        pool.clone(),
        classifier,
        classify_deadline,
    ));

    let worker_cancel = CancellationToken::new();
    let workers = WorkerPool::start(
        processor,
        receiver,
        worker_config.worker_count,
        worker_cancel.clone(),
    );

    let sweep_cancel = CancellationToken::new();
    let sweep = ReconciliationSweep::new(
        pool.clone(),
        queue.clone(),
        worker_config.reconcile_interval,
        worker_config.stale_after,
    );
    let sweep_handle = tokio::spawn({
        let cancel = sweep_cancel.clone();
        async move { sweep.run(cancel).await }
    });

    let submissions = Arc::new(SubmissionService::new(
        pool.clone(),
        queue,
        worker_config.enqueue_timeout,
    ));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        submissions,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining pipeline");

    sweep_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweep_handle).await;
    tracing::info!("Reconciliation sweep stopped");

    // Jobs still queued stay `pending` and are re-enqueued on next start.
    workers
        .shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
