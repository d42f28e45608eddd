//! stc-agent Binary Entry Point
//!
//! Runs the statistics collection agent. Core functionality is provided by
//! the `stc_agent` library crate.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use stc_agent::{
    config::{AppConfig, parse_duration},
    server::{Listener, Server},
};
use tokio::signal::unix::{SignalKind, signal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// stc-agent - local statistics collection agent
#[derive(Parser, Debug)]
#[command(name = "stc-agent", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "STC_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Unix socket path (default: generated under the temp directory)
    #[arg(long, env = "STC_AGENT_UNIX_SOCKET", conflicts_with = "port")]
    unix_socket: Option<PathBuf>,

    /// TCP port to listen on instead of a Unix socket (0 = OS-assigned)
    #[arg(short, long, env = "STC_AGENT_PORT")]
    port: Option<u16>,

    /// TCP bind address (overrides config file)
    #[arg(long, env = "STC_AGENT_BIND")]
    bind: Option<String>,

    /// System-under-test name, used in the generated socket name
    #[arg(long, env = "STC_AGENT_SUT_NAME")]
    sut_name: Option<String>,

    /// How long a signaled tool gets to exit, e.g. "10s"
    #[arg(long, env = "STC_AGENT_EXIT_TIMEOUT", value_parser = parse_duration)]
    exit_timeout: Option<Duration>,

    /// Log filter, e.g. "info" or "stc_agent=debug" (RUST_LOG takes precedence)
    #[arg(long, env = "STC_AGENT_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (file is optional)
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(path) = cli.unix_socket {
        config.listener.unix_socket = Some(path);
        config.listener.tcp_port = None;
    }
    if let Some(port) = cli.port {
        config.listener.tcp_port = Some(port);
        config.listener.unix_socket = None;
    }
    if let Some(bind) = cli.bind {
        config.listener.bind = bind;
    }
    if let Some(sut_name) = cli.sut_name {
        config.listener.sut_name = Some(sut_name);
    }
    if let Some(exit_timeout) = cli.exit_timeout {
        config.collectors.exit_timeout = exit_timeout;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }
    config.validate()?;

    // Initialize tracing; stdout is reserved for the endpoint announcement
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("stc-agent - statistics collection agent");
    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "Configuration loaded");
    }

    let registry = config.collectors.build_registry()?;
    let listener = Listener::bind(&config.listener)?;
    let server = Server::new(listener, registry);

    println!("{}", server.endpoint());
    tracing::info!(endpoint = %server.endpoint(), "Listening");

    let shutdown = shutdown_signal()?;
    server.run_until(shutdown).await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Install SIGINT/SIGTERM handlers and return a future resolving on either.
fn shutdown_signal() -> std::io::Result<impl std::future::Future<Output = ()>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {
                tracing::info!("Received interrupt signal");
            }
            _ = terminate.recv() => {
                tracing::info!("Received terminate signal");
            }
        }
    })
}
