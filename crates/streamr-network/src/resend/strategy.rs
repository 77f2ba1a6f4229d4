//! The resend-strategy seam (§4.7: "local in-memory storage, ask-one
//! storage-peer, ask-many-storage-peers"). `ResendHandler` tries strategies
//! in order, stopping at the first that proves satisfactory.

use async_trait::async_trait;
use streamr_protocol::{PeerInfo, ResendRequest, StreamMessage};
use tokio::sync::mpsc;

use crate::endpoint::EndpointHandle;
use crate::error::ResendError;
use crate::resend::router::ResendRouter;

#[async_trait]
pub trait ResendStrategy: Send + Sync {
    /// Begin resolving `request`, returning a lazy sequence of messages.
    /// An immediate `Err` means the strategy can't even attempt the
    /// request (e.g. no storage peers known); the handler moves straight
    /// to the next strategy. A channel that closes having yielded zero
    /// items is treated as unsatisfactory, not an error.
    async fn fetch(&self, request: &ResendRequest) -> Result<mpsc::Receiver<StreamMessage>, ResendError>;

    fn name(&self) -> &'static str;
}

/// Asks a single connected storage peer and relays whatever it sends back.
/// Grounded on the node-to-node resend request/response shapes in
/// `streamr_protocol::node_message`. The actual socket demux (matching an
/// inbound `UnicastMessage`/`ResendResponse*` frame to this in-flight
/// request) happens at the node engine's dispatch loop, which owns the
/// connections this strategy doesn't have direct access to — `router` is
/// the shared table that closes that loop.
pub struct AskStoragePeer {
    storage_peer: PeerInfo,
    endpoint: EndpointHandle,
    router: ResendRouter,
}

impl AskStoragePeer {
    pub fn new(storage_peer: PeerInfo, endpoint: EndpointHandle, router: ResendRouter) -> Self {
        Self {
            storage_peer,
            endpoint,
            router,
        }
    }
}

#[async_trait]
impl ResendStrategy for AskStoragePeer {
    async fn fetch(&self, request: &ResendRequest) -> Result<mpsc::Receiver<StreamMessage>, ResendError> {
        use streamr_protocol::{codec, NodeMessage};

        let (tx, rx) = mpsc::channel(16);
        self.router.register(request.request_id().to_owned(), tx).await;
        let msg = NodeMessage::resend_request(request.clone());
        let bytes = codec::encode_node_message(&msg);
        self.endpoint
            .send(&self.storage_peer.peer_id, bytes)
            .await
            .map_err(|e| ResendError::StrategyError(e.to_string()))?;
        // `rx` closes once the node's dispatch loop observes a terminal
        // response and calls `router.complete()`.
        Ok(rx)
    }

    fn name(&self) -> &'static str {
        "ask-one-storage-peer"
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    pub struct FixedStrategy {
        messages: Vec<StreamMessage>,
    }

    impl FixedStrategy {
        pub fn new(messages: Vec<StreamMessage>) -> Self {
            Self { messages }
        }
    }

    #[async_trait]
    impl ResendStrategy for FixedStrategy {
        async fn fetch(
            &self,
            _request: &ResendRequest,
        ) -> Result<mpsc::Receiver<StreamMessage>, ResendError> {
            let (tx, rx) = mpsc::channel(self.messages.len().max(1));
            for msg in self.messages.clone() {
                let _ = tx.send(msg).await;
            }
            Ok(rx)
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    pub struct FailingStrategy;

    #[async_trait]
    impl ResendStrategy for FailingStrategy {
        async fn fetch(
            &self,
            _request: &ResendRequest,
        ) -> Result<mpsc::Receiver<StreamMessage>, ResendError> {
            Err(ResendError::StrategyError("no storage peers known".to_owned()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }
}
