//! Wire protocol spoken over the bridge socket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use chat_relay_core::MessageBody;

/// Message from the relay to the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayMessage {
    /// Handshake; carries stored credentials when a prior pairing exists.
    Init {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        credentials: Option<Value>,
    },
    /// Outbound text send.
    SendText {
        conversation_id: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quoted_message_id: Option<String>,
    },
}

/// Why the bridge closed the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseCause {
    /// The account was logged out; credentials are no longer valid.
    LoggedOut,
    /// Anything else; safe to reconnect with the same credentials.
    Other,
}

/// Message from the bridge to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    /// A pairing code awaiting scan.
    PairingToken { token: String },
    /// The connection to the messaging network is established.
    Opened,
    /// The connection is gone; final message for this session.
    Closed {
        cause: CloseCause,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    /// Updated credential blob to persist; opaque to the relay.
    CredsUpdate { credentials: Value },
    /// An inbound message event.
    Message {
        conversation_id: String,
        message_id: String,
        #[serde(default)]
        from_me: bool,
        payload: MessagePayload,
    },
}

/// Raw payload shapes the bridge forwards. Probed exactly once, here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Plain conversation text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<String>,
    /// Extended/quoted message shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_text: Option<ExtendedText>,
}

/// The extended message shape: text plus an optional quote target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedText {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_message_id: Option<String>,
}

impl MessagePayload {
    /// Decode into the closed body type: first non-empty shape wins.
    #[must_use]
    pub fn decode(&self) -> MessageBody {
        if let Some(text) = &self.conversation {
            if !text.is_empty() {
                return MessageBody::PlainText(text.clone());
            }
        }
        if let Some(extended) = &self.extended_text {
            if !extended.text.is_empty() {
                return MessageBody::QuotedText(extended.text.clone());
            }
        }
        MessageBody::Unsupported
    }
}
