//! Transport over the local bridge socket.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use chat_relay_core::{
    ConversationId, DisconnectCause, InboundMessage, LiveSession, MessageId, OutboundText,
    SessionEvent, Transport, TransportError,
};

use crate::credential::CredentialStore;
use crate::protocol::{BridgeMessage, CloseCause, RelayMessage};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

const CHANNEL_CAPACITY: usize = 64;

/// [`Transport`] implementation speaking the bridge wire protocol over a
/// WebSocket.
///
/// Each `open` dials the bridge, performs the `init` handshake with the
/// stored credential blob, and hands back the session's event/outbound
/// channels. Credential updates pushed by the bridge are persisted here,
/// invisibly to the caller.
pub struct BridgeTransport {
    url: String,
    credentials: CredentialStore,
}

impl BridgeTransport {
    /// Transport dialing `url`, persisting credentials in `credentials`.
    #[must_use]
    pub fn new(url: impl Into<String>, credentials: CredentialStore) -> Self {
        Self {
            url: url.into(),
            credentials,
        }
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn open(&self) -> Result<LiveSession, TransportError> {
        let (socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut sink, stream) = socket.split();

        let credentials = self.credentials.load().await?;
        let init = serde_json::to_string(&RelayMessage::Init { credentials })
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        sink.send(Message::Text(init))
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (event_tx, events) = mpsc::channel(CHANNEL_CAPACITY);
        let (outbound, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(read_loop(stream, event_tx, self.credentials.clone()));
        tokio::spawn(write_loop(sink, outbound_rx));

        Ok(LiveSession { events, outbound })
    }

    async fn invalidate_credentials(&self) -> Result<(), TransportError> {
        self.credentials.invalidate().await
    }
}

async fn read_loop(
    mut stream: WsStream,
    events: mpsc::Sender<SessionEvent>,
    credentials: CredentialStore,
) {
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "bridge socket error");
                break;
            }
        };

        let message: BridgeMessage = match serde_json::from_str(&text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable bridge frame, skipping");
                continue;
            }
        };

        match message {
            BridgeMessage::CredsUpdate { credentials: blob } => {
                if let Err(e) = credentials.store(&blob).await {
                    tracing::error!(error = %e, "failed to persist credential update");
                }
            }
            BridgeMessage::Closed { cause, detail } => {
                let cause = match cause {
                    CloseCause::LoggedOut => DisconnectCause::LoggedOut,
                    CloseCause::Other => DisconnectCause::Other(
                        detail.unwrap_or_else(|| "connection closed".to_string()),
                    ),
                };
                let _ = events.send(SessionEvent::Closed(cause)).await;
                return;
            }
            BridgeMessage::PairingToken { token } => {
                if events.send(SessionEvent::PairingToken(token)).await.is_err() {
                    return;
                }
            }
            BridgeMessage::Opened => {
                if events.send(SessionEvent::Opened).await.is_err() {
                    return;
                }
            }
            BridgeMessage::Message {
                conversation_id,
                message_id,
                from_me,
                payload,
            } => {
                let inbound = InboundMessage {
                    conversation: ConversationId::new(conversation_id),
                    id: MessageId::new(message_id),
                    from_me,
                    body: payload.decode(),
                };
                if events.send(SessionEvent::Message(inbound)).await.is_err() {
                    return;
                }
            }
        }
    }

    // The socket died without a proper close message.
    let _ = events
        .send(SessionEvent::Closed(DisconnectCause::Other(
            "bridge stream ended".to_string(),
        )))
        .await;
}

async fn write_loop(mut sink: WsSink, mut outbound: mpsc::Receiver<OutboundText>) {
    while let Some(send) = outbound.recv().await {
        let frame = RelayMessage::SendText {
            conversation_id: send.conversation.as_str().to_string(),
            text: send.text,
            quoted_message_id: send.quoted.map(|id| id.as_str().to_string()),
        };
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize outbound frame");
                continue;
            }
        };
        if sink.send(Message::Text(json)).await.is_err() {
            tracing::warn!("bridge socket closed, dropping outbound send");
            break;
        }
    }
}
