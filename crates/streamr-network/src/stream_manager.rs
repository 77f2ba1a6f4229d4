//! Stream manager (C4, §3 "Stream state"): per-node, per-subscribed
//! `(streamId, partition)` bookkeeping of inbound/outbound neighbours and
//! the per-chain dedup reference. Owned exclusively by its node (§5
//! "Shared-resource policy") — no interior locking here, the node engine
//! holds the one `&mut StreamManager`.

use std::collections::{HashMap, HashSet};

use streamr_protocol::{MessageRef, StreamKey};

#[derive(Debug, Default)]
pub struct StreamState {
    pub inbound: HashSet<String>,
    pub outbound: HashSet<String>,
    last_msg_by_chain: HashMap<(String, String), MessageRef>,
    pub counter: u32,
}

impl StreamState {
    /// I4: `lastMsgByChain` is monotone non-decreasing per chain. Returns
    /// `true` (fresh, reference updated) or `false` (duplicate/out-of-order,
    /// dropped per §5 "no reordering buffer in the core").
    fn observe(&mut self, publisher_id: &str, msg_chain_id: &str, msg_ref: MessageRef) -> bool {
        let key = (publisher_id.to_owned(), msg_chain_id.to_owned());
        match self.last_msg_by_chain.get(&key) {
            Some(last) if msg_ref <= *last => false,
            _ => {
                self.last_msg_by_chain.insert(key, msg_ref);
                true
            }
        }
    }

    pub fn has_any_neighbour(&self) -> bool {
        !self.inbound.is_empty() || !self.outbound.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct StreamManager {
    streams: HashMap<StreamKey, StreamState>,
}

impl StreamManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: ensures `key` is present without disturbing existing
    /// neighbour/dedup state.
    pub fn ensure_subscribed(&mut self, key: StreamKey) -> &mut StreamState {
        self.streams.entry(key).or_default()
    }

    pub fn is_subscribed(&self, key: &StreamKey) -> bool {
        self.streams.contains_key(key)
    }

    pub fn unsubscribe(&mut self, key: &StreamKey) -> Option<StreamState> {
        self.streams.remove(key)
    }

    pub fn get(&self, key: &StreamKey) -> Option<&StreamState> {
        self.streams.get(key)
    }

    pub fn get_mut(&mut self, key: &StreamKey) -> Option<&mut StreamState> {
        self.streams.get_mut(key)
    }

    pub fn subscribed_keys(&self) -> impl Iterator<Item = &StreamKey> {
        self.streams.keys()
    }

    /// Dedup-check and, if fresh, record the reference (§4.5 `publish`/
    /// `onData`, I4).
    pub fn observe_message(
        &mut self,
        key: &StreamKey,
        publisher_id: &str,
        msg_chain_id: &str,
        msg_ref: MessageRef,
    ) -> bool {
        match self.streams.get_mut(key) {
            Some(state) => state.observe(publisher_id, msg_chain_id, msg_ref),
            None => false,
        }
    }

    /// Remove `peer_id` from every stream's inbound/outbound sets (node
    /// engine's disconnect-handling fan-out). Returns the keys that lost
    /// their last neighbour, which the caller can use to consider
    /// unsubscribing/disconnecting further (§4.5 failure semantics).
    pub fn remove_peer_everywhere(&mut self, peer_id: &str) -> Vec<StreamKey> {
        let mut emptied = Vec::new();
        for (key, state) in self.streams.iter_mut() {
            let was_present = state.inbound.remove(peer_id) | state.outbound.remove(peer_id);
            if was_present && !state.has_any_neighbour() {
                emptied.push(key.clone());
            }
        }
        emptied
    }

    /// Streams `peer_id` currently shares with this node, either direction.
    pub fn shared_streams_with(&self, peer_id: &str) -> Vec<StreamKey> {
        self.streams
            .iter()
            .filter(|(_, state)| state.inbound.contains(peer_id) || state.outbound.contains(peer_id))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg_ref(ts: u64, seq: u64) -> MessageRef {
        MessageRef {
            timestamp: ts,
            sequence_number: seq,
        }
    }

    #[test]
    fn ensure_subscribed_is_idempotent() {
        let mut mgr = StreamManager::new();
        let key = StreamKey::new("s", 0);
        mgr.ensure_subscribed(key.clone())
            .outbound
            .insert("peer-a".to_owned());
        mgr.ensure_subscribed(key.clone());
        assert_eq!(mgr.get(&key).unwrap().outbound.len(), 1);
    }

    #[test]
    fn dedup_rejects_non_increasing_refs_per_chain() {
        let mut mgr = StreamManager::new();
        let key = StreamKey::new("s", 0);
        mgr.ensure_subscribed(key.clone());
        assert!(mgr.observe_message(&key, "pub-1", "chain-a", msg_ref(10, 0)));
        assert!(!mgr.observe_message(&key, "pub-1", "chain-a", msg_ref(10, 0)), "exact duplicate");
        assert!(!mgr.observe_message(&key, "pub-1", "chain-a", msg_ref(9, 5)), "out of order");
        assert!(mgr.observe_message(&key, "pub-1", "chain-a", msg_ref(11, 0)), "advances");
    }

    #[test]
    fn dedup_is_independent_per_chain() {
        let mut mgr = StreamManager::new();
        let key = StreamKey::new("s", 0);
        mgr.ensure_subscribed(key.clone());
        assert!(mgr.observe_message(&key, "pub-1", "chain-a", msg_ref(10, 0)));
        assert!(mgr.observe_message(&key, "pub-1", "chain-b", msg_ref(1, 0)));
    }

    #[test]
    fn removing_a_peer_everywhere_reports_streams_left_with_no_neighbours() {
        let mut mgr = StreamManager::new();
        let k1 = StreamKey::new("s1", 0);
        let k2 = StreamKey::new("s2", 0);
        mgr.ensure_subscribed(k1.clone()).outbound.insert("peer-a".to_owned());
        mgr.ensure_subscribed(k2.clone()).inbound.insert("peer-a".to_owned());
        mgr.ensure_subscribed(k2.clone()).inbound.insert("peer-b".to_owned());

        let emptied = mgr.remove_peer_everywhere("peer-a");
        assert_eq!(emptied, vec![k1]);
        assert!(mgr.get(&k2).unwrap().inbound.contains("peer-b"));
    }
}
