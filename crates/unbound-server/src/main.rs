//! Unbound gateway server.
//!
//! Usage:
//!   unbound-server --config unbound.toml
//!   unbound-server --bind 0.0.0.0:8001

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use unbound_server::{build, router, Settings};

/// Command policy gateway: authenticates callers, evaluates submitted
/// commands against ordered rules, charges credits and audits every verdict.
#[derive(Parser)]
#[command(name = "unbound-server", about = "Unbound command policy gateway")]
struct Cli {
    /// Settings file (TOML). Defaults apply when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Listen address; overrides `bind` from the settings file.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG=debug for per-evaluation detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    if let Some(bind) = cli.bind {
        settings.bind = bind;
    }

    let built = build(&settings)?;
    if let Some(admin) = &built.admin {
        println!("Bootstrap admin '{}' created.", admin.user.name);
        println!("API key (shown once): {}", admin.api_key);
    }

    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    info!(addr = %settings.bind, "unbound gateway listening");

    axum::serve(listener, router(built.gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("unbound gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
