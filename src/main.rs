use std::path::PathBuf;

use clap::Parser;
use jwtauth::config::Configuration;
use jwtauth::telemetry;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `config.yaml` file.
    #[arg(long, short, env = "CONFIG_PATH", default_value = "config.yaml")]
    config: PathBuf,
    /// Secret keying session tokens. Takes precedence over `token.secret`.
    #[arg(long, env = "SECRET", hide_env_values = true)]
    secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::setup_tracing();
    let args = Args::parse();

    let config = Configuration::default()
        .path(args.config)
        .read()
        .with_secret(args.secret);

    let metrics = if config.metrics {
        Some(telemetry::setup_metrics_recorder()?)
    } else {
        None
    };

    let state = jwtauth::initialize_state(config, metrics)?;
    let listener = tokio::net::TcpListener::bind(&state.config.address).await?;
    tracing::info!(address = %listener.local_addr()?, "server started");

    axum::serve(listener, jwtauth::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
