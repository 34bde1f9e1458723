//! Message identities and decoded message shapes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque stable identifier for a remote conversation.
///
/// Equality is exact string match; no normalization beyond what the
/// transport provides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Wrap a transport-provided identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Transport-assigned identifier of a single message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap a transport-provided identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Textual payload of an inbound message, decoded once at the transport
/// boundary and consumed as a closed sum everywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// A plain conversation message.
    PlainText(String),
    /// An extended/quoted message carrying text.
    QuotedText(String),
    /// Anything without a usable text body (media, reactions, ...).
    Unsupported,
}

impl MessageBody {
    /// The text body, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::PlainText(text) | Self::QuotedText(text) => Some(text),
            Self::Unsupported => None,
        }
    }
}

/// An inbound message event delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// The conversation this message belongs to.
    pub conversation: ConversationId,
    /// Transport-assigned message identifier; replies quote it.
    pub id: MessageId,
    /// True when the message was authored by this relay itself.
    pub from_me: bool,
    /// Decoded payload.
    pub body: MessageBody,
}

/// An outbound text send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundText {
    /// Destination conversation.
    pub conversation: ConversationId,
    /// Text to deliver.
    pub text: String,
    /// Message to mark the send as a reply to.
    pub quoted: Option<MessageId>,
}
