//! addressbook-api server binary.

use std::path::Path;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use addressbook_api::{parse_allowed_origins, router, AppState, LogConfig, ServerConfig};
use addressbook_db::{Database, PoolConfig};

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables daily-rotated file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter
///                 (default: "addressbook_api=debug,addressbook_db=info,tower_http=debug")
///
/// The returned guard must live as long as the process when logging to a file.
fn init_tracing(log: &LogConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "addressbook_api=debug,addressbook_db=info,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log.file {
        let file_dir = Path::new(path).parent().unwrap_or(Path::new("."));
        let file_name = Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("addressbook-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log.json {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            // No ANSI in files unless asked for
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log.ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log.json {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log.ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log = LogConfig::from_env();
    let _file_guard = init_tracing(&log);
    info!(
        log_format = if log.json { "json" } else { "text" },
        log_file = log.file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = ServerConfig::from_env()?;

    let pool_config = PoolConfig::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs));
    let db = Database::connect(&config.database_url, pool_config).await?;
    db.migrate().await?;
    info!(
        subsystem = "database",
        op = "migrate",
        "Database migrations applied"
    );

    let allowed_origins = parse_allowed_origins(&config.allowed_origins);
    info!(origins = allowed_origins.len(), "CORS whitelist loaded");

    let app = router(AppState::new(db, &config), allowed_origins);

    let addr = config.listen_addr()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
