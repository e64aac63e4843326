use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bbweb::config::{self, normalize_base};
use bbweb::context::SessionBinder;
use bbweb::database::{DatabaseManager, PgSessionProvider};
use bbweb::is_development;

/// Serve the bbweb API
#[derive(Debug, Parser)]
#[command(version, about)]
struct ServerArgs {
    /// Address to bind
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Prefix the API routes are mounted under
    #[arg(long, env = "SERVER_BASE_URL")]
    base: Option<String>,

    /// Database connection URL
    #[arg(long = "db-path", env = "DATABASE_URL")]
    db_path: Option<String>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECRET_KEY, etc.
    let _ = dotenvy::dotenv();

    let args = ServerArgs::parse();
    let config = config::config();

    let default_level = if args.debug || config.server.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!("Starting bbweb in {:?} mode", config.environment);
    if is_development!() {
        tracing::warn!("Development mode: token issuing is enabled and tracebacks are served");
    }

    let mut database = config.database.clone();
    if let Some(url) = args.db_path {
        database.url = Some(url);
    }
    let pool = DatabaseManager::init(&database).context("failed to configure database")?;

    let binder = SessionBinder::new(PgSessionProvider::new(pool));
    let base = args
        .base
        .as_deref()
        .map(normalize_base)
        .unwrap_or_else(|| config.server.base_url.clone());
    let app = bbweb::app(binder, &base);

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("bbweb listening on http://{}{}", bind_addr, base);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    DatabaseManager::close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
