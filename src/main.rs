use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use webctl::{Config, DaemonError};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("WEBCTL_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::default();
    if let Ok(attach) = std::env::var("WEBCTL_ATTACH") {
        if !attach.is_empty() {
            config = config.with_attach_url(attach);
        }
    }

    match webctl::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(DaemonError::AlreadyRunning) => {
            error!("another webctl daemon is already running");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("daemon failed: {err}");
            ExitCode::FAILURE
        }
    }
}
