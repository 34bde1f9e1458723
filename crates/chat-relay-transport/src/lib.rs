//! Messaging-network transport for the chat relay.
//!
//! The messaging protocol proper (wire framing, encryption, multi-device
//! pairing cryptography) lives in a separate bridge process; this crate
//! connects to its local socket, decodes its JSON event stream into core
//! types once at the boundary, and persists the credential blobs it hands
//! us.
//!
//! Provides:
//! - Wire protocol (tagged JSON enums)
//! - `BridgeTransport` - the `Transport` implementation
//! - `CredentialStore` - session-directory credential persistence

pub mod bridge;
pub mod credential;
pub mod protocol;

pub use bridge::BridgeTransport;
pub use credential::CredentialStore;
pub use protocol::{BridgeMessage, CloseCause, MessagePayload, RelayMessage};
