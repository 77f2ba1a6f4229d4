//! Local in-memory resend strategy (§4.7 "local in-memory storage"). Kept
//! in the core as the first strategy in the default chain so a node that
//! has recently relayed a stream can answer small resend requests itself
//! before falling back to asking a storage peer.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use streamr_protocol::{MessageRef, ResendRequest, StreamKey, StreamMessage};
use tokio::sync::mpsc;

use super::ResendStrategy;
use crate::error::ResendError;

/// Bounded ring of recently published/forwarded messages per stream key,
/// sorted by `(timestamp, sequenceNumber)`.
pub struct InMemoryMessageStore {
    capacity_per_stream: usize,
    messages: RwLock<HashMap<StreamKey, Vec<StreamMessage>>>,
}

impl InMemoryMessageStore {
    pub fn new(capacity_per_stream: usize) -> Self {
        Self {
            capacity_per_stream,
            messages: RwLock::new(HashMap::new()),
        }
    }

    pub fn record(&self, message: StreamMessage) {
        let key = message.stream_key().clone();
        let mut store = self.messages.write().unwrap();
        let entries = store.entry(key).or_default();
        let pos = entries.partition_point(|m| m.message_id.msg_ref < message.message_id.msg_ref);
        entries.insert(pos, message);
        if entries.len() > self.capacity_per_stream {
            entries.remove(0);
        }
    }

    fn last(&self, key: &StreamKey, n: u32) -> Vec<StreamMessage> {
        let store = self.messages.read().unwrap();
        match store.get(key) {
            Some(entries) => entries.iter().rev().take(n as usize).rev().cloned().collect(),
            None => Vec::new(),
        }
    }

    fn from(&self, key: &StreamKey, from: MessageRef, publisher_id: Option<&str>) -> Vec<StreamMessage> {
        let store = self.messages.read().unwrap();
        match store.get(key) {
            Some(entries) => entries
                .iter()
                .filter(|m| m.message_id.msg_ref >= from)
                .filter(|m| publisher_id.is_none_or(|p| m.message_id.publisher_id == p))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    fn range(
        &self,
        key: &StreamKey,
        from: MessageRef,
        to: MessageRef,
        publisher_id: Option<&str>,
        msg_chain_id: Option<&str>,
    ) -> Vec<StreamMessage> {
        let store = self.messages.read().unwrap();
        match store.get(key) {
            Some(entries) => entries
                .iter()
                .filter(|m| m.message_id.msg_ref >= from && m.message_id.msg_ref <= to)
                .filter(|m| publisher_id.is_none_or(|p| m.message_id.publisher_id == p))
                .filter(|m| msg_chain_id.is_none_or(|c| m.message_id.msg_chain_id == c))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}

pub struct LocalStorageStrategy {
    store: std::sync::Arc<InMemoryMessageStore>,
}

impl LocalStorageStrategy {
    pub fn new(store: std::sync::Arc<InMemoryMessageStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResendStrategy for LocalStorageStrategy {
    async fn fetch(&self, request: &ResendRequest) -> Result<mpsc::Receiver<StreamMessage>, ResendError> {
        let messages = match request {
            ResendRequest::Last(r) => self.store.last(&r.stream_key, r.number_of_last),
            ResendRequest::From(r) => self.store.from(&r.stream_key, r.from, r.publisher_id.as_deref()),
            ResendRequest::Range(r) => self.store.range(
                &r.stream_key,
                r.from,
                r.to,
                r.publisher_id.as_deref(),
                r.msg_chain_id.as_deref(),
            ),
        };
        let (tx, rx) = mpsc::channel(messages.len().max(1));
        for message in messages {
            let _ = tx.send(message).await;
        }
        Ok(rx)
    }

    fn name(&self) -> &'static str {
        "local-in-memory-storage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamr_protocol::{MessageId, ResendLastRequest, ResendRangeRequest};

    fn message(seq: u64, publisher: &str) -> StreamMessage {
        StreamMessage {
            message_id: MessageId::new("s", 0, 100 + seq, seq, publisher, "chain"),
            prev_msg_ref: None,
            content: vec![],
            signature: None,
        }
    }

    #[tokio::test]
    async fn last_returns_the_most_recent_n_in_order() {
        let store = std::sync::Arc::new(InMemoryMessageStore::new(100));
        for i in 0..5 {
            store.record(message(i, "pub-1"));
        }
        let strategy = LocalStorageStrategy::new(store);
        let req = ResendRequest::Last(ResendLastRequest {
            request_id: "r".to_owned(),
            stream_key: StreamKey::new("s", 0),
            number_of_last: 2,
        });
        let mut rx = strategy.fetch(&req).await.unwrap();
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.message_id.msg_ref.sequence_number, 3);
        assert_eq!(second.message_id.msg_ref.sequence_number, 4);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn range_filters_by_publisher_and_bounds() {
        let store = std::sync::Arc::new(InMemoryMessageStore::new(100));
        store.record(message(0, "pub-1"));
        store.record(message(1, "pub-2"));
        store.record(message(2, "pub-1"));
        let strategy = LocalStorageStrategy::new(store);
        let req = ResendRequest::Range(ResendRangeRequest {
            request_id: "r".to_owned(),
            stream_key: StreamKey::new("s", 0),
            from: MessageRef::new(100, 0),
            to: MessageRef::new(103, 3),
            publisher_id: Some("pub-1".to_owned()),
            msg_chain_id: None,
        });
        let mut rx = strategy.fetch(&req).await.unwrap();
        let mut received = Vec::new();
        while let Some(m) = rx.recv().await {
            received.push(m.message_id.publisher_id);
        }
        assert_eq!(received, vec!["pub-1".to_owned(), "pub-1".to_owned()]);
    }

    #[tokio::test]
    async fn empty_store_yields_an_empty_unsatisfactory_sequence() {
        let store = std::sync::Arc::new(InMemoryMessageStore::new(100));
        let strategy = LocalStorageStrategy::new(store);
        let req = ResendRequest::Last(ResendLastRequest {
            request_id: "r".to_owned(),
            stream_key: StreamKey::new("missing", 0),
            number_of_last: 5,
        });
        let mut rx = strategy.fetch(&req).await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
