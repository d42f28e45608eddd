//! One client connection: read a command, dispatch it, answer it.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::{FutureExt, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use super::codec::MessageCodec;
use super::command::{Command, ParseError, Response};
use super::error::ProtocolError;
use crate::collector::{CollectorRegistry, RegistryError};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent `exit`; the service should stop.
    Exit,
    /// The connection closed or became unusable.
    Disconnected,
}

/// A command session over any byte stream.
pub struct Session<T> {
    id: u64,
    framed: Framed<T, MessageCodec>,
}

impl<T> Session<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(id: u64, io: T) -> Self {
        Self {
            id,
            framed: Framed::new(io, MessageCodec::new()),
        }
    }

    /// Serve commands until `exit` or disconnect. Every command gets exactly
    /// one response.
    pub async fn run(mut self, registry: &mut CollectorRegistry) -> SessionEnd {
        tracing::info!(session = self.id, "Session started");

        loop {
            let message = match self.framed.next().await {
                Some(Ok(message)) => message,
                None | Some(Err(ProtocolError::Disconnected)) => {
                    tracing::info!(session = self.id, "Client disconnected");
                    return SessionEnd::Disconnected;
                }
                Some(Err(e @ (ProtocolError::Decode(_) | ProtocolError::FrameTooLarge { .. }))) => {
                    tracing::warn!(session = self.id, error = %e, "Unreadable message, closing session");
                    // Best effort: the peer may already be gone.
                    let _ = self.send(Response::error(&e)).await;
                    return SessionEnd::Disconnected;
                }
                Some(Err(e)) => {
                    tracing::warn!(session = self.id, error = %e, "Read failed, closing session");
                    return SessionEnd::Disconnected;
                }
            };

            let command = Command::parse(&message);
            let exit = matches!(command, Ok(Command::Exit));
            let response = self.dispatch_guarded(registry, command).await;

            if let Err(e) = self.send(response).await {
                tracing::warn!(session = self.id, error = %e, "Write failed, closing session");
                return SessionEnd::Disconnected;
            }
            if exit {
                tracing::info!(session = self.id, "Exit requested");
                return SessionEnd::Exit;
            }
        }
    }

    async fn send(&mut self, response: Response) -> Result<(), ProtocolError> {
        self.framed.send(response.to_string()).await
    }

    /// Dispatch a command, turning a panic into an error response.
    async fn dispatch_guarded(
        &self,
        registry: &mut CollectorRegistry,
        command: Result<Command, ParseError>,
    ) -> Response {
        let command = match command {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(session = self.id, error = %e, "Rejected command");
                return Response::error(e);
            }
        };
        let verb = command.verb();
        tracing::debug!(session = self.id, command = %verb, "Dispatching command");

        let response = match AssertUnwindSafe(dispatch(registry, command))
            .catch_unwind()
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => Response::error(e),
            Err(payload) => {
                let fault = panic_message(payload.as_ref());
                tracing::error!(session = self.id, command = %verb, fault, "Command panicked");
                Response::error(format!("internal fault: {fault}"))
            }
        };

        if response.is_ok() {
            tracing::info!(session = self.id, command = %verb, "Command succeeded");
        } else {
            tracing::warn!(session = self.id, command = %verb, response = %response, "Command failed");
        }
        response
    }
}

/// Run one command against the registry.
pub async fn dispatch(
    registry: &mut CollectorRegistry,
    command: Command,
) -> Result<Response, RegistryError> {
    match command {
        Command::SetStats(selection) => registry.create(&selection)?,
        Command::SetCollectorProperty { target, key, value } => {
            registry.set_property(&target, &key, &value)?;
        }
        Command::Configure => registry.configure().await?,
        Command::Start => registry.start().await?,
        Command::Stop => registry.stop().await?,
        Command::GetFailedCollectors => {
            let failed = registry
                .failed()
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join(",");
            return Ok(Response::ok_with(failed));
        }
        Command::Exit => {}
    }
    Ok(Response::ok())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
