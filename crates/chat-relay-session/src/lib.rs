//! Conversation-session lifecycle management.
//!
//! Provides:
//! - `LifecycleController` - Supervised connect/reconnect state machine
//! - `MessageRouter` - Per-message protocol against the completion backend
//! - `ReconnectBackoff` - Jittered exponential reconnect delays

pub mod backoff;
pub mod lifecycle;
pub mod router;

pub use backoff::ReconnectBackoff;
pub use lifecycle::{ConnectionState, LifecycleController, PairingView, SessionHandles};
pub use router::{FailurePolicy, MessageRouter};
