use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pasarkampus::config::Config;
use pasarkampus::AppState;

#[derive(Parser, Debug)]
#[command(name = "pasarkampus")]
#[command(author, version, about = "Campus marketplace API server", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "pasarkampus.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PasarKampus v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data and upload directories exist
    pasarkampus::utils::ensure_dir(&config.server.data_dir)?;
    pasarkampus::utils::ensure_dir(&config.uploads_dir())?;

    // Initialize database
    let db = pasarkampus::db::init(&config.server.data_dir).await?;

    // Ensure default admin user exists
    pasarkampus::api::auth::ensure_admin_user(
        &db,
        &config.auth.admin_email,
        config.auth.admin_password.as_deref(),
    )
    .await?;

    let uploads_dir = config.uploads_dir();
    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create app state
    let state = Arc::new(AppState::new(config, db));

    // API routes plus uploaded images as static files
    let app = pasarkampus::api::create_router(state)
        .nest_service("/uploads", ServeDir::new(&uploads_dir));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
