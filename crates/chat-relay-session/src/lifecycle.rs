//! Transport session lifecycle.
//!
//! One supervised loop drives the session through pairing, connected, and
//! disconnected states. Reconnection is a plain loop iteration, never a
//! recursive restart, and at most one transport session is live at a time
//! by construction.

use serde::Serialize;
use tokio::sync::{mpsc, watch};

use chat_relay_core::{
    DisconnectCause, InboundMessage, LiveSession, OutboundText, SessionEvent, Transport,
};

use crate::backoff::ReconnectBackoff;

const INBOUND_CAPACITY: usize = 256;

/// Connection state as observed by display surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Session open, pairing token pending or expected.
    Pairing,
    /// Linked and receiving messages.
    Connected,
    /// No live session; a reconnect is pending.
    Disconnected,
}

/// Snapshot published for the pairing display.
///
/// `token` is only present while pairing; it is cleared the moment the
/// connection is established.
#[derive(Debug, Clone, Serialize)]
pub struct PairingView {
    /// Current connection state.
    pub state: ConnectionState,
    /// Pairing code awaiting scan, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Channels connecting the controller to the rest of the process.
pub struct SessionHandles {
    /// State + pairing token, for display surfaces.
    pub view: watch::Receiver<PairingView>,
    /// Inbound messages, in arrival order; feed this to the router.
    pub inbound: mpsc::Receiver<InboundMessage>,
    /// Outbound handle of the current session; `None` while disconnected.
    pub outbound: watch::Receiver<Option<mpsc::Sender<OutboundText>>>,
}

/// Drives a [`Transport`] through its connection lifecycle.
///
/// Never gives up: every non-logout disconnect is treated as transient and
/// retried with capped, jittered backoff. A logout additionally discards
/// the stored credential and restarts the pairing cycle immediately.
pub struct LifecycleController<T> {
    transport: T,
    backoff: ReconnectBackoff,
    view: watch::Sender<PairingView>,
    inbound: mpsc::Sender<InboundMessage>,
    outbound: watch::Sender<Option<mpsc::Sender<OutboundText>>>,
}

impl<T: Transport> LifecycleController<T> {
    /// Create a controller and the handle bundle for its consumers.
    #[must_use]
    pub fn new(transport: T) -> (Self, SessionHandles) {
        let (view_tx, view_rx) = watch::channel(PairingView {
            state: ConnectionState::Disconnected,
            token: None,
        });
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (outbound_tx, outbound_rx) = watch::channel(None);

        let controller = Self {
            transport,
            backoff: ReconnectBackoff::default(),
            view: view_tx,
            inbound: inbound_tx,
            outbound: outbound_tx,
        };
        let handles = SessionHandles {
            view: view_rx,
            inbound: inbound_rx,
            outbound: outbound_rx,
        };
        (controller, handles)
    }

    /// Override the reconnect delay policy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: ReconnectBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run the lifecycle loop. Returns only when the process shuts down
    /// (the task is dropped); there is no give-up path.
    pub async fn run(self) {
        let mut attempt: u32 = 0;
        loop {
            match self.transport.open().await {
                Ok(session) => {
                    self.publish(ConnectionState::Pairing, None);
                    let (cause, was_connected) = self.drive(session).await;
                    self.outbound.send_replace(None);
                    self.publish(ConnectionState::Disconnected, None);
                    if was_connected {
                        attempt = 0;
                    }

                    if cause.requires_repairing() {
                        tracing::warn!("logged out by remote end, discarding credentials");
                        if let Err(e) = self.transport.invalidate_credentials().await {
                            tracing::error!(error = %e, "failed to invalidate credentials");
                        }
                        // Straight into a fresh pairing cycle; the old
                        // credential is gone so waiting gains nothing.
                        attempt = 0;
                        continue;
                    }
                    tracing::warn!(cause = ?cause, "connection lost");
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "failed to open transport session");
                    self.publish(ConnectionState::Disconnected, None);
                }
            }

            let delay = self.backoff.delay(attempt);
            tracing::info!(delay_ms = delay.as_millis() as u64, "reconnecting");
            tokio::time::sleep(delay).await;
            attempt = attempt.saturating_add(1);
        }
    }

    /// Consume one session's events until it closes. Returns the
    /// disconnect cause and whether the session ever reached `Connected`.
    async fn drive(&self, session: LiveSession) -> (DisconnectCause, bool) {
        let LiveSession {
            mut events,
            outbound,
        } = session;
        self.outbound.send_replace(Some(outbound));

        let mut state = ConnectionState::Pairing;
        let mut was_connected = false;

        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::PairingToken(token) => {
                    if state == ConnectionState::Pairing {
                        tracing::info!(token = %token, "pairing token received, scan to link");
                        self.publish(ConnectionState::Pairing, Some(token));
                    } else {
                        tracing::debug!("pairing token outside pairing state, ignoring");
                    }
                }
                SessionEvent::Opened => {
                    tracing::info!("transport session connected");
                    state = ConnectionState::Connected;
                    was_connected = true;
                    self.publish(ConnectionState::Connected, None);
                }
                SessionEvent::Closed(cause) => return (cause, was_connected),
                SessionEvent::Message(message) => {
                    if self.inbound.send(message).await.is_err() {
                        tracing::error!("router channel closed, dropping inbound message");
                    }
                }
            }
        }

        (
            DisconnectCause::Other("event stream ended".to_string()),
            was_connected,
        )
    }

    fn publish(&self, state: ConnectionState, token: Option<String>) {
        self.view.send_replace(PairingView { state, token });
    }
}
