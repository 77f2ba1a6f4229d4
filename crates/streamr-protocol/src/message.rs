//! Stream message identity and payload (§3).

use crate::stream_key::StreamKey;
use serde::{Deserialize, Serialize};

/// `(timestamp, sequenceNumber)` — the lexicographic order used for dedup
/// and gap bookkeeping (I4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub timestamp: u64,
    pub sequence_number: u64,
}

impl MessageRef {
    pub fn new(timestamp: u64, sequence_number: u64) -> Self {
        Self {
            timestamp,
            sequence_number,
        }
    }
}

/// Full message identity: `(streamId, partition, timestamp, sequenceNumber,
/// publisherId, msgChainId)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageId {
    pub stream_key: StreamKey,
    pub msg_ref: MessageRef,
    pub publisher_id: String,
    pub msg_chain_id: String,
}

impl MessageId {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stream_id: impl Into<String>,
        partition: u32,
        timestamp: u64,
        sequence_number: u64,
        publisher_id: impl Into<String>,
        msg_chain_id: impl Into<String>,
    ) -> Self {
        Self {
            stream_key: StreamKey::new(stream_id, partition),
            msg_ref: MessageRef::new(timestamp, sequence_number),
            publisher_id: publisher_id.into(),
            msg_chain_id: msg_chain_id.into(),
        }
    }

    /// `(publisherId, msgChainId)` — the dedup chain key.
    pub fn chain_key(&self) -> (String, String) {
        (self.publisher_id.clone(), self.msg_chain_id.clone())
    }
}

/// An opaque application message plus the bookkeeping fields the network
/// layer needs. `content` and `signature` are carried through without
/// interpretation (Non-goals: no cryptographic authentication in the core).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub message_id: MessageId,
    pub prev_msg_ref: Option<MessageRef>,
    pub content: Vec<u8>,
    pub signature: Option<Vec<u8>>,
}

impl StreamMessage {
    pub fn stream_key(&self) -> &StreamKey {
        &self.message_id.stream_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ref_orders_lexicographically() {
        let a = MessageRef::new(100, 5);
        let b = MessageRef::new(100, 6);
        let c = MessageRef::new(101, 0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn chain_key_groups_by_publisher_and_chain() {
        let id = MessageId::new("s", 0, 1, 1, "pub-1", "chain-a");
        assert_eq!(
            id.chain_key(),
            ("pub-1".to_owned(), "chain-a".to_owned())
        );
    }
}
