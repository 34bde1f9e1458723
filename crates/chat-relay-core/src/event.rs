//! Events raised by a live transport session.

use crate::message::InboundMessage;

/// Why a connection went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectCause {
    /// The remote end invalidated the pairing; stored credentials are dead.
    LoggedOut,
    /// Any other loss (network, server restart, stream error).
    Other(String),
}

impl DisconnectCause {
    /// True when stored credentials must be discarded before reconnecting.
    #[must_use]
    pub const fn requires_repairing(&self) -> bool {
        matches!(self, Self::LoggedOut)
    }
}

/// Notifications emitted by a live transport session, in order.
///
/// A session emits `Closed` exactly once, as its final event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A pairing code awaiting scan; only seen before `Opened`.
    PairingToken(String),
    /// The connection is established and messages will flow.
    Opened,
    /// The connection is gone; the session is finished.
    Closed(DisconnectCause),
    /// An inbound message arrived.
    Message(InboundMessage),
}
