//! Topology manager (C6, §4.6). Maintains per-stream-partition overlay
//! graphs and issues routing instructions. Owned exclusively by its tracker
//! (§5) — serialised through one `tokio::sync::Mutex`, same reasoning as
//! `node::Node`.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use indexmap::IndexMap;
use streamr_protocol::{
    codec, InstructionMessage, NodeStatus, PeerInfo, PeerType, StorageNodesRequest,
    StorageNodesResponse, StreamKey, TrackerMessage,
};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::endpoint::EndpointHandle;
use crate::error::NetworkError;
use crate::metrics::TrackerMetrics;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub max_neighbours: usize,
    pub ping_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_neighbours: 4,
            ping_interval: Duration::from_secs(5),
        }
    }
}

/// One stream key's overlay: insertion-ordered so neighbour selection is
/// deterministic given the order nodes reported into it (§4.6
/// "Tie-breaking and determinism").
#[derive(Debug, Default, Clone)]
struct Overlay {
    /// node id -> its current neighbour set, in insertion order.
    neighbours: IndexMap<String, HashSet<String>>,
    counter: u32,
}

#[derive(Default)]
struct TopologyState {
    overlays: HashMap<StreamKey, Overlay>,
}

pub struct Tracker {
    own: PeerInfo,
    endpoint: EndpointHandle,
    config: TrackerConfig,
    state: Mutex<TopologyState>,
}

impl Tracker {
    pub fn new(own: PeerInfo, endpoint: EndpointHandle, config: TrackerConfig) -> Self {
        Self {
            own,
            endpoint,
            config,
            state: Mutex::new(TopologyState::default()),
        }
    }

    pub fn own_peer_info(&self) -> &PeerInfo {
        &self.own
    }

    pub async fn metrics(&self) -> TrackerMetrics {
        TrackerMetrics {
            connected_peer_count: self.endpoint.connected_peers().await.len(),
            overlay_count: self.state.lock().await.overlays.len(),
        }
    }

    /// Central inbound dispatch for decoded tracker<->node messages: the
    /// binary's reader loop hands every frame from a node to this method.
    pub async fn dispatch_tracker_message(&self, msg: TrackerMessage, source_node: &str) {
        let result = match msg {
            TrackerMessage::StatusMessage(status) => self.on_status(status.status, source_node).await,
            TrackerMessage::StorageNodesRequest(req) => {
                self.on_storage_nodes_request(req, source_node).await
            }
            TrackerMessage::InstructionMessage(_) | TrackerMessage::StorageNodesResponse(_) => {
                debug!(%source_node, "ignoring node-bound message received on the tracker side");
                Ok(())
            }
        };
        if let Err(err) = result {
            debug!(%source_node, %err, "failed to handle tracker-side message");
        }
    }

    /// `onStatus(status, nodeId)` (§4.6).
    pub async fn on_status(&self, status: NodeStatus, node_id: &str) -> Result<(), NetworkError> {
        for key in status.streams.keys() {
            let targets = {
                let mut state = self.state.lock().await;
                let overlay = state.overlays.entry(key.clone()).or_default();
                overlay.neighbours.entry(node_id.to_owned()).or_default();
                select_neighbours(overlay, node_id, self.config.max_neighbours)
            };
            self.reconcile_overlay(key, node_id, targets).await?;
        }
        Ok(())
    }

    /// Recomputes `node_id`'s neighbour set to `targets`, updates both
    /// sides' adjacency symmetrically (I3), bumps the per-key counter, and
    /// sends `InstructionMessage` to every node whose set changed.
    async fn reconcile_overlay(
        &self,
        key: &StreamKey,
        node_id: &str,
        targets: HashSet<String>,
    ) -> Result<(), NetworkError> {
        let mut changed: HashSet<String> = HashSet::new();
        let counter = {
            let mut state = self.state.lock().await;
            let overlay = state.overlays.entry(key.clone()).or_default();
            let current = overlay.neighbours.get(node_id).cloned().unwrap_or_default();

            if current == targets {
                // Already converged: an instruction here would just restate
                // the neighbour set the node already has, which would draw
                // another status reply and re-enter this same no-op
                // reconciliation — bump nothing and send nothing.
                return Ok(());
            }

            for added in targets.difference(&current) {
                overlay
                    .neighbours
                    .entry(added.clone())
                    .or_default()
                    .insert(node_id.to_owned());
                changed.insert(added.clone());
            }
            for removed in current.difference(&targets) {
                if let Some(set) = overlay.neighbours.get_mut(removed) {
                    set.remove(node_id);
                }
                changed.insert(removed.clone());
            }
            overlay.neighbours.insert(node_id.to_owned(), targets.clone());
            changed.insert(node_id.to_owned());

            overlay.counter += 1;
            overlay.counter
        };

        for target_node in &changed {
            let addresses = {
                let state = self.state.lock().await;
                let Some(overlay) = state.overlays.get(key) else {
                    continue;
                };
                let Some(neighbours) = overlay.neighbours.get(target_node) else {
                    continue;
                };
                self.addresses_of(neighbours).await
            };
            let instruction = TrackerMessage::InstructionMessage(InstructionMessage {
                stream_key: key.clone(),
                node_addresses: addresses,
                counter,
            });
            let bytes = codec::encode_tracker_message(&instruction);
            let _ = self.endpoint.send(target_node, bytes).await;
        }
        Ok(())
    }

    async fn addresses_of(&self, node_ids: &HashSet<String>) -> Vec<String> {
        let mut addresses = Vec::with_capacity(node_ids.len());
        for id in node_ids {
            if let Ok(address) = self
                .endpoint
                .peer_book_address_of(id)
                .await
            {
                addresses.push(address);
            }
        }
        addresses
    }

    /// `onNodeDisconnected(nodeId)` (§4.6).
    pub async fn on_node_disconnected(&self, node_id: &str) -> Result<(), NetworkError> {
        let affected: Vec<(StreamKey, HashSet<String>)> = {
            let mut state = self.state.lock().await;
            let mut affected = Vec::new();
            let mut emptied = Vec::new();
            for (key, overlay) in state.overlays.iter_mut() {
                if let Some(neighbours) = overlay.neighbours.shift_remove(node_id) {
                    let mut touched = HashSet::new();
                    for other in &neighbours {
                        if let Some(set) = overlay.neighbours.get_mut(other) {
                            set.remove(node_id);
                            touched.insert(other.clone());
                        }
                    }
                    overlay.counter += 1;
                    affected.push((key.clone(), touched));
                }
                if overlay.neighbours.is_empty() {
                    emptied.push(key.clone());
                }
            }
            for key in emptied {
                state.overlays.remove(&key);
            }
            affected
        };

        for (key, touched) in affected {
            for node in touched {
                let addresses = {
                    let state = self.state.lock().await;
                    match state.overlays.get(&key).and_then(|o| o.neighbours.get(&node)) {
                        Some(neighbours) => self.addresses_of(neighbours).await,
                        None => continue,
                    }
                };
                let counter = {
                    let state = self.state.lock().await;
                    state.overlays.get(&key).map(|o| o.counter).unwrap_or(0)
                };
                let instruction = TrackerMessage::InstructionMessage(InstructionMessage {
                    stream_key: key.clone(),
                    node_addresses: addresses,
                    counter,
                });
                let bytes = codec::encode_tracker_message(&instruction);
                let _ = self.endpoint.send(&node, bytes).await;
            }
        }
        Ok(())
    }

    /// `getTopology()` (§4.6): `{streamKey -> {nodeId -> [neighbourIds]}}`.
    pub async fn get_topology(&self) -> HashMap<StreamKey, HashMap<String, Vec<String>>> {
        let state = self.state.lock().await;
        state
            .overlays
            .iter()
            .map(|(key, overlay)| {
                let nodes = overlay
                    .neighbours
                    .iter()
                    .map(|(node, neighbours)| {
                        let mut sorted: Vec<String> = neighbours.iter().cloned().collect();
                        sorted.sort();
                        (node.clone(), sorted)
                    })
                    .collect();
                (key.clone(), nodes)
            })
            .collect()
    }

    /// Pumps endpoint events into this tracker's handlers for as long as
    /// the endpoint keeps producing them, so `services/tracker`'s binary
    /// and the crate's own integration tests share one decode/dispatch
    /// pump instead of each re-wiring it (mirrors `Node::spawn_event_loop`).
    pub fn spawn_event_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let tracker = self.clone();
        let mut events_rx = self.endpoint.subscribe_events();
        tokio::spawn(async move {
            loop {
                match events_rx.recv().await {
                    Ok(crate::events::EndpointEvent::MessageReceived(peer, bytes)) => {
                        match codec::decode_tracker_message(&bytes) {
                            Ok(msg) => tracker.dispatch_tracker_message(msg, &peer.peer_id).await,
                            Err(err) => {
                                warn!(%err, peer_id = %peer.peer_id, "dropping malformed frame from node");
                            }
                        }
                    }
                    Ok(crate::events::EndpointEvent::PeerConnected(peer)) => {
                        info!(peer_id = %peer.peer_id, "node connected");
                    }
                    Ok(crate::events::EndpointEvent::PeerDisconnected(peer, reason)) => {
                        if tracker.endpoint.has_live_connection(&peer.peer_id).await {
                            // Losing side of a duplicate-socket tiebreak; the winning
                            // connection already replaced this one in the endpoint.
                            info!(peer_id = %peer.peer_id, ?reason, "ignoring disconnect superseded by a live connection");
                        } else {
                            info!(peer_id = %peer.peer_id, ?reason, "node disconnected");
                            if let Err(err) = tracker.on_node_disconnected(&peer.peer_id).await {
                                warn!(%err, peer_id = %peer.peer_id, "failed to reconcile topology after disconnect");
                            }
                        }
                    }
                    Ok(crate::events::EndpointEvent::HighBackPressure(_))
                    | Ok(crate::events::EndpointEvent::LowBackPressure(_)) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "tracker event loop lagged behind the endpoint");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// `onStorageNodesRequest(key, sourceNode)` (§4.6).
    pub async fn on_storage_nodes_request(
        &self,
        req: StorageNodesRequest,
        source_node: &str,
    ) -> Result<(), NetworkError> {
        let state = self.state.lock().await;
        let node_ids: Vec<String> = state
            .overlays
            .get(&req.stream_key)
            .map(|overlay| overlay.neighbours.keys().cloned().collect())
            .unwrap_or_default();
        drop(state);

        let mut addresses = Vec::new();
        for id in node_ids {
            if let Ok(peer) = self.endpoint.peer_book_peer_info(&id).await {
                if peer.peer_type == PeerType::Storage {
                    if let Ok(address) = self.endpoint.peer_book_address_of(&id).await {
                        addresses.push(address);
                    }
                }
            }
        }
        debug!(node_count = addresses.len(), %source_node, "answering storage nodes request");

        let response = TrackerMessage::StorageNodesResponse(StorageNodesResponse {
            request_id: req.request_id,
            stream_key: req.stream_key,
            node_addresses: addresses,
        });
        let bytes = codec::encode_tracker_message(&response);
        self.endpoint.send(source_node, bytes).await?;
        Ok(())
    }
}

/// Target neighbour set of size up to `max_neighbours`: nodes currently
/// with the fewest neighbours in this overlay, ties broken by insertion
/// order (§4.6 "Tie-breaking and determinism").
fn select_neighbours(overlay: &Overlay, node_id: &str, max_neighbours: usize) -> HashSet<String> {
    let mut candidates: Vec<(String, usize)> = overlay
        .neighbours
        .iter()
        .filter(|(id, _)| id.as_str() != node_id)
        .map(|(id, neighbours)| (id.clone(), neighbours.len()))
        .collect();
    // IndexMap iteration order already reflects insertion order; a stable
    // sort on neighbour-count alone preserves it as the tiebreak.
    candidates.sort_by_key(|(_, count)| *count);
    candidates
        .into_iter()
        .take(max_neighbours)
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamr_protocol::StreamStatus;

    fn overlay_with(order: &[(&str, usize)]) -> Overlay {
        let mut overlay = Overlay::default();
        for (id, count) in order {
            overlay
                .neighbours
                .insert((*id).to_owned(), (0..*count).map(|n| format!("filler-{n}")).collect());
        }
        overlay
    }

    #[test]
    fn selects_nodes_with_fewest_neighbours_breaking_ties_by_insertion_order() {
        let overlay = overlay_with(&[("a", 2), ("b", 0), ("c", 0), ("d", 1)]);
        let selected = select_neighbours(&overlay, "self", 2);
        assert_eq!(selected.len(), 2);
        assert!(selected.contains("b"));
        assert!(selected.contains("c"));
    }

    #[test]
    fn excludes_the_node_itself() {
        let overlay = overlay_with(&[("self", 0), ("b", 0)]);
        let selected = select_neighbours(&overlay, "self", 4);
        assert_eq!(selected, HashSet::from(["b".to_owned()]));
    }

    #[test]
    fn caps_at_max_neighbours() {
        let overlay = overlay_with(&[("a", 0), ("b", 0), ("c", 0), ("d", 0), ("e", 0)]);
        let selected = select_neighbours(&overlay, "self", 3);
        assert_eq!(selected.len(), 3);
    }

    fn test_endpoint(id: &str) -> EndpointHandle {
        EndpointHandle::new(crate::endpoint::EndpointConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
            advertised_url: format!("ws://127.0.0.1:0/{id}"),
            peer_id: id.to_owned(),
            peer_type: PeerType::Tracker,
            ping_interval: Duration::from_secs(5),
        })
        .0
    }

    #[tokio::test]
    async fn per_key_instruction_counter_strictly_increases_across_statuses() {
        let tracker = Tracker::new(
            PeerInfo::tracker("t"),
            test_endpoint("t"),
            TrackerConfig::default(),
        );
        let key = StreamKey::new("s", 0);

        let mut seen_counters = Vec::new();
        for node_id in ["a", "b", "c"] {
            let mut streams = HashMap::new();
            streams.insert(key.clone(), StreamStatus { outbound: vec![], counter: 0 });
            tracker.on_status(NodeStatus { streams }, node_id).await.unwrap();
            seen_counters.push(tracker.state.lock().await.overlays.get(&key).unwrap().counter);
        }

        for pair in seen_counters.windows(2) {
            assert!(pair[1] > pair[0], "counter must strictly increase: {seen_counters:?}");
        }
    }

    #[tokio::test]
    async fn node_disconnect_bumps_the_counter_again_for_remaining_members() {
        let tracker = Tracker::new(
            PeerInfo::tracker("t"),
            test_endpoint("t"),
            TrackerConfig::default(),
        );
        let key = StreamKey::new("s", 0);
        for node_id in ["a", "b"] {
            let mut streams = HashMap::new();
            streams.insert(key.clone(), StreamStatus { outbound: vec![], counter: 0 });
            tracker.on_status(NodeStatus { streams }, node_id).await.unwrap();
        }
        let before = tracker.state.lock().await.overlays.get(&key).unwrap().counter;
        tracker.on_node_disconnected("b").await.unwrap();
        let after = tracker.state.lock().await.overlays.get(&key).unwrap().counter;
        assert!(after > before);
    }
}
