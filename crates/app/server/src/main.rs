//! Herald Server - push notification registry and broadcast service.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::WrapErr as _;

#[derive(Parser)]
#[command(name = "herald-server")]
#[command(about = "Device token registry and push broadcast service")]
struct Cli {
    /// Path to the TOML settings file
    #[arg(long, env = "HERALD_CONFIG", default_value = "herald.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!(config = %cli.config.display(), "herald-server starting");

    let settings = herald_server::Settings::load(&cli.config).wrap_err("failed to load settings")?;

    let storage = herald_storage::SqliteStorage::new(&settings.database.url, settings.database.pool_size)
        .wrap_err("failed to initialize storage")?;

    storage
        .run_migrations()
        .wrap_err("failed to run migrations")?;

    let app = herald_server::build_app(&settings, storage)?;

    let addr = settings.server.listen_addr;
    tracing::info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err("failed to bind")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
