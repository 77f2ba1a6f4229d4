//! Routes inbound resend-response frames (`UnicastMessage`,
//! `ResendResponse*`) back to the in-flight [`crate::resend::strategy::AskStoragePeer`]
//! that requested them, keyed by `request_id`. The WS transport has no
//! concept of "this frame answers that request" — this is the node
//! engine's half of closing that loop, the counterpart of the socket demux
//! noted in `strategy.rs`.

use std::collections::HashMap;
use std::sync::Arc;

use streamr_protocol::StreamMessage;
use tokio::sync::{mpsc, Mutex};

#[derive(Clone, Default)]
pub struct ResendRouter {
    pending: Arc<Mutex<HashMap<String, mpsc::Sender<StreamMessage>>>>,
}

impl ResendRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, request_id: String, tx: mpsc::Sender<StreamMessage>) {
        self.pending.lock().await.insert(request_id, tx);
    }

    pub async fn route_message(&self, request_id: &str, message: StreamMessage) {
        let tx = self.pending.lock().await.get(request_id).cloned();
        if let Some(tx) = tx {
            let _ = tx.send(message).await;
        }
    }

    /// Drops the route once the peer signals the response is complete
    /// (`ResendResponseResent` / `ResendResponseNoResend`), closing the
    /// strategy's receiver.
    pub async fn complete(&self, request_id: &str) {
        self.pending.lock().await.remove(request_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamr_protocol::MessageId;

    fn message() -> StreamMessage {
        StreamMessage {
            message_id: MessageId::new("s", 0, 1, 1, "pub", "chain"),
            prev_msg_ref: None,
            content: vec![],
            signature: None,
        }
    }

    #[tokio::test]
    async fn routes_a_message_to_the_registered_sender_and_drops_after_complete() {
        let router = ResendRouter::new();
        let (tx, mut rx) = mpsc::channel(4);
        router.register("req-1".to_owned(), tx).await;
        router.route_message("req-1", message()).await;
        assert!(rx.recv().await.is_some());
        router.complete("req-1").await;
        router.route_message("req-1", message()).await; // no registered sender, silently dropped
        assert!(rx.recv().await.is_none());
    }
}
