//! Claim Decision Engine - API Server Binary
//!
//! # Usage
//!
//! ```bash
//! # File backend under ./data
//! cargo run --bin claims-decision-api
//!
//! # PostgreSQL backend
//! API_STORAGE_BACKEND=postgres API_DATABASE_URL=postgres://... cargo run --bin claims-decision-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_LOG_LEVEL` - trace, debug, info, warn, error (default: info); `RUST_LOG` wins
//! * `API_LOG_FORMAT` - plain or json (default: plain)
//! * `API_STORAGE_BACKEND` - file or postgres (default: file)
//! * `API_DATA_DIR` - root of the file backend (default: data)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_FRAUD_THRESHOLD` - fraud threshold when a request carries none (default: 0.5)
//! * `API_REVIEW_CONFIDENCE_THRESHOLD` - decisions below this go to review (default: 50)
//! * `API_AUDIT_RETRY_SECS` - audit redelivery interval (default: 30)
//! * `API_AUDIT_BACKLOG_CAPACITY` - undelivered audit events kept for retry (default: 10000)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_claims::{AuditDispatcher, DecisionOrchestrator};
use infra_store::{
    create_pool, run_migrations, DatabaseConfig, JsonFileAuditSink, JsonlPolicyLedger,
    JsonlReviewStore, PgAuditSink, PgHealth, PgPolicyLedger, PgReviewRepository,
};
use interface_api::config::{ApiConfig, LogFormat, StorageBackend};
use interface_api::{create_router, AppState};

const REVIEW_DIR: &str = "reviews";
const AUDIT_DIR: &str = "audit_logs";
const LEDGER_DIR: &str = "ledger";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("loading API configuration")?;

    init_tracing(&config.log_level, config.log_format);

    let engine_config = config.engine_config();
    engine_config.validate().context("validating engine configuration")?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        backend = ?config.storage_backend,
        "Starting Claim Decision Engine API Server"
    );

    let state = match config.storage_backend {
        StorageBackend::File => build_file_state(&config).await?,
        StorageBackend::Postgres => build_postgres_state(&config).await?,
    };

    let audit = state.orchestrator.audit().clone();
    let retry = tokio::spawn(retry_audit_backlog(
        audit.clone(),
        Duration::from_secs(config.audit_retry_secs.max(1)),
    ));

    let app = create_router(state);
    let addr: SocketAddr = config.server_addr().parse().context("parsing server address")?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await.context("binding listener")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    retry.abort();
    let abandoned = audit.flush().await;
    if !abandoned.is_empty() {
        tracing::error!(count = abandoned.len(), "Audit events left undelivered, see log for payloads");
    }
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Plain => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
    }
}

/// Single-process deployment over JSON-lines files
async fn build_file_state(config: &ApiConfig) -> anyhow::Result<AppState> {
    let root = &config.data_dir;
    tracing::info!(data_dir = %root.display(), "Opening file storage");

    let store = Arc::new(
        JsonlReviewStore::open(root.join(REVIEW_DIR))
            .await
            .context("opening review log")?,
    );
    let audit = Arc::new(JsonFileAuditSink::new(root.join(AUDIT_DIR)));
    let ledger = Arc::new(
        JsonlPolicyLedger::open(root.join(LEDGER_DIR))
            .await
            .context("opening policy ledger")?,
    );

    let orchestrator = DecisionOrchestrator::new(config.engine_config(), store.clone(), audit.clone())
        .with_policy_ledger(ledger);

    Ok(AppState::new(Arc::new(orchestrator), config.clone())
        .with_health_check(store)
        .with_health_check(audit))
}

/// Shared deployment over PostgreSQL
async fn build_postgres_state(config: &ApiConfig) -> anyhow::Result<AppState> {
    tracing::info!("Connecting to database...");
    let pool = create_pool(DatabaseConfig::new(&config.database_url))
        .await
        .context("connecting to database")?;
    run_migrations(&pool).await.context("running migrations")?;
    tracing::info!("Database ready");

    let store = Arc::new(PgReviewRepository::new(pool.clone()));
    let audit = Arc::new(PgAuditSink::new(pool.clone()));
    let ledger = Arc::new(PgPolicyLedger::new(pool.clone()));

    let orchestrator = DecisionOrchestrator::new(config.engine_config(), store, audit)
        .with_policy_ledger(ledger);

    Ok(AppState::new(Arc::new(orchestrator), config.clone())
        .with_health_check(Arc::new(PgHealth::new(pool))))
}

/// Redelivers audit events the sink rejected earlier
async fn retry_audit_backlog(audit: Arc<AuditDispatcher>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await;
    loop {
        interval.tick().await;
        match audit.retry_pending().await {
            Ok(0) => {}
            Ok(delivered) => tracing::info!(delivered, "Audit backlog redelivered"),
            Err(err) => {
                let backlog = audit.backlog_len().await;
                tracing::warn!(error = %err, backlog, "Audit backlog still undeliverable")
            }
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
