//! Core abstractions for the chat relay.
//!
//! This crate provides the fundamental building blocks:
//! - `Turn` / `Role` - Conversation turn data model
//! - `ContextStore` - Per-conversation bounded context buffers
//! - `SessionEvent` - Events raised by a live transport session
//! - Transport and completion-backend traits

pub mod context;
pub mod event;
pub mod message;
pub mod traits;
pub mod turn;

pub use context::ContextStore;
pub use event::{DisconnectCause, SessionEvent};
pub use message::{ConversationId, InboundMessage, MessageBody, MessageId, OutboundText};
pub use traits::{CompletionBackend, CompletionError, LiveSession, Transport, TransportError};
pub use turn::{Role, Turn};
