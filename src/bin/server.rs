//! MathMotion server binary
//!
//! Loads configuration from the environment, builds the pipeline state, and
//! serves the HTTP surface.

use anyhow::Context;
use clap::Parser;
use mathmotion::config::load_config;
use mathmotion::server::{router, AppState};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mathmotion-server", about = "Equation-to-video pipeline server")]
struct Args {
    /// Bind address
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port
    #[arg(long, short, default_value = "8080")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = load_config().context("failed to load configuration")?;
    if let Err(e) = config.validate() {
        // Keys are checked again per request; starting without them keeps
        // the health endpoint available on fresh deployments.
        warn!(error = %e, "Starting without full credentials");
    }

    let state = AppState::from_config(config).context("failed to build provider clients")?;
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .context("invalid bind address")?;
    info!(%addr, "MathMotion server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
