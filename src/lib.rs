//! stc-agent - Statistics Collection Agent
//!
//! A long-running local service that accepts command sessions over a socket
//! and, on command, launches, supervises, and tears down external
//! statistics-gathering tools. Each tool writes its raw output into a
//! dedicated file; this crate never parses the statistics themselves.
//!
//! # Architecture
//!
//! - **Collectors**: one adapter per statistics source (CPU frequency
//!   sampler, in-band and out-of-band power-management telemetry, AC power
//!   meter), plus the registry that drives them together
//! - **Protocol**: `--`-delimited text commands and `OK` / `error:` replies
//! - **Server**: Unix or TCP listener and the one-session-at-a-time loop
//! - **Config**: YAML file with CLI and environment overrides
//!
//! # Example
//!
//! ```rust,no_run
//! use stc_agent::{CollectorRegistry, Listener, ListenerConfig, Server};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let listener = Listener::bind(&ListenerConfig::default())?;
//! let server = Server::new(listener, CollectorRegistry::new());
//! println!("{}", server.endpoint());
//! server.run().await;
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod protocol;
pub mod server;

pub use collector::{CollectorAdapter, CollectorError, CollectorRegistry, RegistryError, Source};
pub use config::{AppConfig, ConfigError, ListenerConfig};
pub use protocol::{Command, ProtocolError, Response, Session, SessionEnd};
pub use server::{Endpoint, Listener, Server, ServiceError};
