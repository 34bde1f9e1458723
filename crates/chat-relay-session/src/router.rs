//! Message routing: inbound text in, completion reply out.

use tokio::sync::{mpsc, watch};

use chat_relay_core::{
    CompletionBackend, ContextStore, InboundMessage, OutboundText, Turn,
};

/// Default text sent when the completion backend fails.
pub const DEFAULT_FALLBACK_TEXT: &str =
    "Sorry, I can't reply right now. Please try again in a bit.";

/// What happens to a conversation's buffer after a completion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Leave the buffer untouched; the next message retries with the full
    /// accumulated context.
    #[default]
    KeepContext,
    /// Drop the buffer back to the system turn alone.
    ResetContext,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(Self::KeepContext),
            "reset" => Ok(Self::ResetContext),
            other => Err(format!(
                "unknown failure policy `{other}` (expected `keep` or `reset`)"
            )),
        }
    }
}

/// Reacts to inbound messages: updates the context buffer, calls the
/// completion backend, and issues the outbound reply.
///
/// The router is the sole owner of the [`ContextStore`], and it processes
/// messages strictly in arrival order, so buffer mutations for a
/// conversation never interleave.
pub struct MessageRouter<B> {
    store: ContextStore,
    backend: B,
    outbound: watch::Receiver<Option<mpsc::Sender<OutboundText>>>,
    fallback_text: String,
    failure_policy: FailurePolicy,
}

impl<B: CompletionBackend> MessageRouter<B> {
    /// Create a router over `store` and `backend`, sending replies through
    /// whatever session `outbound` currently points at.
    #[must_use]
    pub fn new(
        store: ContextStore,
        backend: B,
        outbound: watch::Receiver<Option<mpsc::Sender<OutboundText>>>,
    ) -> Self {
        Self {
            store,
            backend,
            outbound,
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Override the fallback text.
    #[must_use]
    pub fn with_fallback_text(mut self, text: impl Into<String>) -> Self {
        self.fallback_text = text.into();
        self
    }

    /// Override the completion-failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Consume inbound messages until the channel closes.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<InboundMessage>) {
        while let Some(message) = inbound.recv().await {
            self.handle(message).await;
        }
        tracing::debug!("inbound channel closed, router stopping");
    }

    async fn handle(&mut self, message: InboundMessage) {
        if message.from_me {
            return;
        }
        let Some(text) = message.body.text() else {
            tracing::debug!(conversation = %message.conversation, "no text payload, ignoring");
            return;
        };
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        self.store.append(&message.conversation, Turn::user(text));

        match self
            .backend
            .complete(self.store.snapshot(&message.conversation))
            .await
        {
            Ok(reply) => {
                self.store
                    .append(&message.conversation, Turn::model(reply.clone()));
                self.send(OutboundText {
                    conversation: message.conversation,
                    text: reply,
                    quoted: Some(message.id),
                })
                .await;
            }
            Err(e) => {
                tracing::warn!(conversation = %message.conversation, error = %e, "completion failed");
                if self.failure_policy == FailurePolicy::ResetContext {
                    self.store.reset(&message.conversation);
                }
                self.send(OutboundText {
                    conversation: message.conversation,
                    text: self.fallback_text.clone(),
                    quoted: None,
                })
                .await;
            }
        }
    }

    async fn send(&self, outbound: OutboundText) {
        let sender = self.outbound.borrow().clone();
        match sender {
            Some(sender) => {
                if sender.send(outbound).await.is_err() {
                    tracing::warn!("transport outbound channel closed, dropping reply");
                }
            }
            None => tracing::warn!("no live transport session, dropping reply"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use chat_relay_core::{
        CompletionError, ConversationId, MessageBody, MessageId, Role,
    };

    use super::*;

    struct MockBackend {
        replies: Mutex<VecDeque<Result<String, CompletionError>>>,
        seen: Mutex<Vec<Vec<Turn>>>,
    }

    impl MockBackend {
        fn with(replies: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionBackend for &MockBackend {
        async fn complete(&self, turns: &[Turn]) -> Result<String, CompletionError> {
            self.seen.lock().unwrap().push(turns.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected completion call")
        }
    }

    struct Fixture {
        sent: mpsc::Receiver<OutboundText>,
        _outbound_tx: watch::Sender<Option<mpsc::Sender<OutboundText>>>,
    }

    fn router(backend: &MockBackend) -> (MessageRouter<&MockBackend>, Fixture) {
        let (sent_tx, sent) = mpsc::channel(8);
        let (outbound_tx, outbound_rx) = watch::channel(Some(sent_tx));
        let router = MessageRouter::new(ContextStore::new("be helpful"), backend, outbound_rx);
        (
            router,
            Fixture {
                sent,
                _outbound_tx: outbound_tx,
            },
        )
    }

    fn inbound(conversation: &str, id: &str, text: &str) -> InboundMessage {
        InboundMessage {
            conversation: ConversationId::from(conversation),
            id: MessageId::from(id),
            from_me: false,
            body: MessageBody::PlainText(text.to_string()),
        }
    }

    #[tokio::test]
    async fn fresh_conversation_happy_path() {
        let backend = MockBackend::with(vec![Ok("Hi!".to_string())]);
        let (mut router, mut fx) = router(&backend);

        router.handle(inbound("123@chat", "MSG1", "Hello")).await;

        // The completion saw system + user.
        let seen = backend.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 2);
        assert_eq!(seen[0][0].role, Role::System);
        assert_eq!(seen[0][1], Turn::user("Hello"));

        // The buffer gained the model turn.
        let turns = router.store.snapshot(&ConversationId::from("123@chat"));
        assert_eq!(
            turns,
            &[
                Turn::system("be helpful"),
                Turn::user("Hello"),
                Turn::model("Hi!"),
            ]
        );

        // The reply quotes the triggering message.
        let sent = fx.sent.try_recv().unwrap();
        assert_eq!(sent.conversation, ConversationId::from("123@chat"));
        assert_eq!(sent.text, "Hi!");
        assert_eq!(sent.quoted, Some(MessageId::from("MSG1")));
    }

    #[tokio::test]
    async fn quoted_text_shape_is_routed_too() {
        let backend = MockBackend::with(vec![Ok("sure".to_string())]);
        let (mut router, mut fx) = router(&backend);

        let mut message = inbound("c", "M2", "");
        message.body = MessageBody::QuotedText("what about this?".to_string());
        router.handle(message).await;

        assert_eq!(fx.sent.try_recv().unwrap().text, "sure");
    }

    #[tokio::test]
    async fn failure_sends_fallback_without_model_turn() {
        let backend = MockBackend::with(vec![Err(CompletionError::EmptyResponse)]);
        let (mut router, mut fx) = router(&backend);

        router.handle(inbound("c", "M1", "Hello")).await;

        let turns = router.store.snapshot(&ConversationId::from("c"));
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1], Turn::user("Hello"));

        let sent = fx.sent.try_recv().unwrap();
        assert_eq!(sent.text, DEFAULT_FALLBACK_TEXT);
        assert_eq!(sent.quoted, None);
    }

    #[tokio::test]
    async fn keep_policy_leaves_buffer_untouched_on_timeout() {
        let backend = MockBackend::with(vec![Err(CompletionError::Transport(
            "request timed out".to_string(),
        ))]);
        let (mut router, mut fx) = router(&backend);

        router.handle(inbound("c", "M1", "Hello")).await;

        // User turn survives for the next attempt.
        let turns = router.store.snapshot(&ConversationId::from("c"));
        assert_eq!(turns, &[Turn::system("be helpful"), Turn::user("Hello")]);
        assert_eq!(fx.sent.try_recv().unwrap().text, DEFAULT_FALLBACK_TEXT);
    }

    #[tokio::test]
    async fn reset_policy_drops_buffer_to_system_turn() {
        let backend = MockBackend::with(vec![
            Ok("fine".to_string()),
            Err(CompletionError::Transport("request timed out".to_string())),
        ]);
        let (mut router, mut fx) = router(&backend);
        router = router.with_failure_policy(FailurePolicy::ResetContext);

        router.handle(inbound("c", "M1", "Hello")).await;
        router.handle(inbound("c", "M2", "Still there?")).await;

        let turns = router.store.snapshot(&ConversationId::from("c"));
        assert_eq!(turns, &[Turn::system("be helpful")]);

        assert_eq!(fx.sent.try_recv().unwrap().text, "fine");
        assert_eq!(fx.sent.try_recv().unwrap().text, DEFAULT_FALLBACK_TEXT);
    }

    #[tokio::test]
    async fn own_messages_are_discarded() {
        let backend = MockBackend::with(vec![]);
        let (mut router, mut fx) = router(&backend);

        let mut message = inbound("c", "M1", "echo of my own reply");
        message.from_me = true;
        router.handle(message).await;

        assert_eq!(backend.calls(), 0);
        assert!(fx.sent.try_recv().is_err());
        assert!(
            router
                .store
                .snapshot(&ConversationId::from("c"))
                .is_empty()
        );
    }

    #[tokio::test]
    async fn unsupported_payloads_are_discarded() {
        let backend = MockBackend::with(vec![]);
        let (mut router, mut fx) = router(&backend);

        let mut message = inbound("c", "M1", "");
        message.body = MessageBody::Unsupported;
        router.handle(message).await;

        assert_eq!(backend.calls(), 0);
        assert!(fx.sent.try_recv().is_err());
    }

    #[tokio::test]
    async fn whitespace_only_text_is_discarded() {
        let backend = MockBackend::with(vec![]);
        let (mut router, mut fx) = router(&backend);

        router.handle(inbound("c", "M1", "   \n\t ")).await;

        assert_eq!(backend.calls(), 0);
        assert!(fx.sent.try_recv().is_err());
        assert!(
            router
                .store
                .snapshot(&ConversationId::from("c"))
                .is_empty()
        );
    }

    #[tokio::test]
    async fn text_is_trimmed_before_append() {
        let backend = MockBackend::with(vec![Ok("hey".to_string())]);
        let (mut router, _fx) = router(&backend);

        router.handle(inbound("c", "M1", "  Hello \n")).await;

        let turns = router.store.snapshot(&ConversationId::from("c"));
        assert_eq!(turns[1], Turn::user("Hello"));
    }

    #[tokio::test]
    async fn reply_is_dropped_when_disconnected() {
        let backend = MockBackend::with(vec![Ok("into the void".to_string())]);
        let (_outbound_tx, outbound_rx) = watch::channel(None);
        let mut router =
            MessageRouter::new(ContextStore::new("be helpful"), &backend, outbound_rx);

        router.handle(inbound("c", "M1", "Hello")).await;

        // Buffer still advanced; only the send was dropped.
        let turns = router.store.snapshot(&ConversationId::from("c"));
        assert_eq!(turns.len(), 3);
    }

    #[test]
    fn failure_policy_parsing() {
        assert_eq!("keep".parse(), Ok(FailurePolicy::KeepContext));
        assert_eq!("reset".parse(), Ok(FailurePolicy::ResetContext));
        assert!("panic".parse::<FailurePolicy>().is_err());
    }
}
