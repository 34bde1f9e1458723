//! Trait seams for the transport and the completion backend.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::event::SessionEvent;
use crate::message::OutboundText;
use crate::turn::Turn;

/// Transport-level failure: opening a session or credential storage.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("credential storage: {0}")]
    Credentials(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Completion API failure, classified.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Network or HTTP-level failure, including request timeout.
    #[error("completion transport failure: {0}")]
    Transport(String),
    /// Success status but no usable content in the response.
    #[error("completion returned no usable content")]
    EmptyResponse,
    /// Rejected credential or API key.
    #[error("completion credential rejected: {0}")]
    Auth(String),
}

/// A live (pairing or connected) transport session.
///
/// The event channel ends when the connection dies; `Closed` is the final
/// event. Outbound sends issued after that point are dropped by the
/// transport.
pub struct LiveSession {
    /// Session events, in arrival order.
    pub events: mpsc::Receiver<SessionEvent>,
    /// Handle for outbound send requests.
    pub outbound: mpsc::Sender<OutboundText>,
}

/// A handle to the messaging network.
///
/// Implementations own credential persistence; the lifecycle controller
/// only decides *when* to open a session and when credentials are dead.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a session, using stored credentials when present.
    ///
    /// # Errors
    /// Returns an error if the session cannot be opened at all; the caller
    /// treats this like a transient disconnect and retries.
    async fn open(&self) -> Result<LiveSession, TransportError>;

    /// Drop stored credentials, forcing a fresh pairing cycle on the next
    /// `open`.
    ///
    /// # Errors
    /// Returns an error if the stored credential cannot be removed.
    async fn invalidate_credentials(&self) -> Result<(), TransportError>;
}

/// One round trip to the completion service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Submit the accumulated turns, in order, and return one reply text.
    ///
    /// No internal retry; retry policy belongs to the caller.
    ///
    /// # Errors
    /// Returns a classified [`CompletionError`] on failure.
    async fn complete(&self, turns: &[Turn]) -> Result<String, CompletionError>;
}
