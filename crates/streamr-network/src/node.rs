//! Node engine (C5, §4.5). Drives subscription state, reacts to tracker
//! instructions, forwards published messages, and reports status. State
//! mutation is serialised through one `tokio::sync::Mutex` guarding the
//! stream manager, approximating the spec's single-threaded-cooperative
//! execution model (§5) without a hand-rolled actor/command-queue: every
//! operation here runs to its next `.await` with the lock held, so two
//! operations never interleave their state mutations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use streamr_protocol::{
    codec, InstructionMessage, NodeMessage, NodeStatus, PeerInfo, ResendRequest,
    ResendResponseNoResend, ResendResponseResent, ResendResponseResending, StatusMessage,
    StreamKey, StreamMessage, StreamStatus, SubscribeRequest, TrackerMessage, UnicastMessage,
    UnsubscribeRequest,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::close_codes::DisconnectReason;
use crate::endpoint::EndpointHandle;
use crate::error::NetworkError;
use crate::events::NodeEvent;
use crate::resend::local_store::{InMemoryMessageStore, LocalStorageStrategy};
use crate::resend::strategy::AskStoragePeer;
use crate::metrics::NodeMetrics;
use crate::resend::{ResendHandler, ResendRouter};
use crate::stream_manager::StreamManager;

const LOCAL_STORE_CAPACITY_PER_STREAM: usize = 1000;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub max_neighbours: usize,
    pub disconnection_wait: Duration,
    pub trackers: Vec<String>,
    pub reconnect_backoff_base: Duration,
    pub reconnect_backoff_cap: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            max_neighbours: 4,
            disconnection_wait: Duration::from_secs(30),
            trackers: Vec::new(),
            reconnect_backoff_base: Duration::from_secs(2),
            reconnect_backoff_cap: Duration::from_secs(60),
        }
    }
}

struct NodeState {
    streams: StreamManager,
}

pub struct Node {
    own: PeerInfo,
    endpoint: EndpointHandle,
    config: NodeConfig,
    state: Mutex<NodeState>,
    events_tx: broadcast::Sender<NodeEvent>,
    local_store: Arc<InMemoryMessageStore>,
    resend_router: ResendRouter,
    known_storage_peers: Mutex<Vec<PeerInfo>>,
    ongoing_resends: Mutex<HashMap<String, Instant>>,
}

impl Node {
    pub fn new(own: PeerInfo, endpoint: EndpointHandle, config: NodeConfig) -> Self {
        let (events_tx, _) = broadcast::channel(1024);
        Self {
            own,
            endpoint,
            config,
            state: Mutex::new(NodeState {
                streams: StreamManager::new(),
            }),
            events_tx,
            local_store: Arc::new(InMemoryMessageStore::new(LOCAL_STORE_CAPACITY_PER_STREAM)),
            resend_router: ResendRouter::new(),
            known_storage_peers: Mutex::new(Vec::new()),
            ongoing_resends: Mutex::new(HashMap::new()),
        }
    }

    /// A snapshot of the queryable counters (§4.7/§8).
    pub async fn metrics(&self) -> NodeMetrics {
        let subscribed_stream_count = self.state.lock().await.streams.subscribed_keys().count();
        let connected_peer_count = self.endpoint.connected_peers().await.len();
        let ongoing = self.ongoing_resends.lock().await;
        let num_ongoing_resends = ongoing.len();
        let mean_resend_age_ms = if ongoing.is_empty() {
            None
        } else {
            let total_ms: u128 = ongoing.values().map(|started| started.elapsed().as_millis()).sum();
            Some((total_ms / ongoing.len() as u128) as u64)
        };
        NodeMetrics {
            connected_peer_count,
            subscribed_stream_count,
            num_ongoing_resends,
            mean_resend_age_ms,
        }
    }

    /// Registers a peer as a storage node usable as a resend fallback, as
    /// learned from a tracker's `StorageNodesResponse` (§4.7).
    pub async fn add_known_storage_peer(&self, peer: PeerInfo) {
        let mut peers = self.known_storage_peers.lock().await;
        if !peers.iter().any(|p| p.peer_id == peer.peer_id) {
            peers.push(peer);
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<NodeEvent> {
        self.events_tx.subscribe()
    }

    /// The ordered strategy chain for the resend handler (§4.7): local
    /// store first, then every known storage peer in registration order.
    async fn resend_strategies(&self) -> Vec<Arc<dyn crate::resend::ResendStrategy>> {
        let mut strategies: Vec<Arc<dyn crate::resend::ResendStrategy>> =
            vec![Arc::new(LocalStorageStrategy::new(self.local_store.clone()))];
        for peer in self.known_storage_peers.lock().await.iter() {
            strategies.push(Arc::new(AskStoragePeer::new(
                peer.clone(),
                self.endpoint.clone(),
                self.resend_router.clone(),
            )));
        }
        strategies
    }

    fn responsible_tracker(&self) -> Option<&str> {
        self.config.trackers.first().map(String::as_str)
    }

    /// `subscribe(streamId, partition)` (§4.5). Idempotent.
    pub async fn subscribe(&self, stream_id: &str, partition: u32) -> Result<(), NetworkError> {
        let key = StreamKey::new(stream_id, partition);
        {
            let mut state = self.state.lock().await;
            state.streams.ensure_subscribed(key.clone());
        }
        self.send_status_for_key(&key).await
    }

    /// `unsubscribe(streamId, partition)` (§4.5).
    pub async fn unsubscribe(&self, stream_id: &str, partition: u32) -> Result<(), NetworkError> {
        let key = StreamKey::new(stream_id, partition);
        let neighbours: Vec<String> = {
            let mut state = self.state.lock().await;
            let Some(removed) = state.streams.unsubscribe(&key) else {
                return Ok(()); // unsubscribe without subscribe is a no-op
            };
            removed.inbound.into_iter().chain(removed.outbound).collect()
        };

        for peer_id in &neighbours {
            let msg = NodeMessage::UnsubscribeRequest(UnsubscribeRequest {
                request_id: streamr_protocol::new_request_id(),
                stream_key: key.clone(),
            });
            let _ = self.send_node_message(peer_id, &msg).await;
        }
        for peer_id in neighbours {
            self.disconnect_if_idle_after_grace(peer_id).await;
        }
        Ok(())
    }

    /// `publish(streamMessage)` (§4.5): dedup then fan out to every
    /// outbound neighbour of the message's stream key.
    pub async fn publish(&self, message: StreamMessage) -> Result<(), NetworkError> {
        let key = message.stream_key().clone();
        let outbound = {
            let mut state = self.state.lock().await;
            let fresh = state.streams.observe_message(
                &key,
                &message.message_id.publisher_id,
                &message.message_id.msg_chain_id,
                message.message_id.msg_ref,
            );
            if !fresh {
                return Ok(());
            }
            state
                .streams
                .get(&key)
                .map(|s| s.outbound.iter().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        };
        self.local_store.record(message.clone());
        let msg = NodeMessage::BroadcastMessage(message);
        for peer_id in outbound {
            let _ = self.send_node_message(&peer_id, &msg).await;
        }
        Ok(())
    }

    /// Serves a resend request originating locally (e.g. from a client
    /// attached to this node), trying the local store first and falling
    /// back to any known storage peers (§4.7).
    pub async fn resend(&self, request: ResendRequest) -> tokio::sync::mpsc::Receiver<StreamMessage> {
        let handler = ResendHandler::new(self.resend_strategies().await);
        let (rx, _control) = handler.handle_request(request, self.own.peer_id.clone()).await;
        rx
    }

    /// `onData(msg, source)` (§4.5, I2/I4).
    pub async fn on_data(&self, message: StreamMessage, source: &str) {
        let key = message.stream_key().clone();
        let fan_out = {
            let mut state = self.state.lock().await;
            let Some(stream_state) = state.streams.get(&key) else {
                return;
            };
            if !stream_state.inbound.contains(source) {
                debug!(%source, %key, "dropping data from a non-inbound neighbour");
                return;
            }
            let fresh = state.streams.observe_message(
                &key,
                &message.message_id.publisher_id,
                &message.message_id.msg_chain_id,
                message.message_id.msg_ref,
            );
            if !fresh {
                return;
            }
            state
                .streams
                .get(&key)
                .map(|s| {
                    s.outbound
                        .iter()
                        .filter(|p| p.as_str() != source)
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        };

        self.local_store.record(message.clone());
        let msg = NodeMessage::BroadcastMessage(message.clone());
        for peer_id in fan_out {
            let _ = self.send_node_message(&peer_id, &msg).await;
        }
        let _ = self.events_tx.send(NodeEvent::MessageReceived(message));
    }

    /// `onSubscribe(req, source)` (§4.5).
    pub async fn on_subscribe(&self, req: SubscribeRequest, source: &str) {
        {
            let mut state = self.state.lock().await;
            state
                .streams
                .ensure_subscribed(req.stream_key.clone())
                .inbound
                .insert(source.to_owned());
        }
        let _ = self
            .events_tx
            .send(NodeEvent::NodeSubscribed(source.to_owned(), req.stream_key));
    }

    /// `onUnsubscribe(req, source)` (§4.5).
    pub async fn on_unsubscribe(&self, req: UnsubscribeRequest, source: &str) {
        {
            let mut state = self.state.lock().await;
            if let Some(stream_state) = state.streams.get_mut(&req.stream_key) {
                stream_state.inbound.remove(source);
                stream_state.outbound.remove(source);
            }
        }
        let _ = self.events_tx.send(NodeEvent::NodeUnsubscribed(
            source.to_owned(),
            req.stream_key,
        ));
        self.disconnect_if_idle_after_grace(source.to_owned()).await;
    }

    /// Central inbound dispatch for decoded node<->node messages (§4.3/§4.5/§4.7):
    /// the binary's reader loop hands every frame from a node peer to this
    /// method instead of calling the individual handlers itself.
    pub async fn dispatch_node_message(&self, msg: NodeMessage, source: &str) {
        match msg {
            NodeMessage::BroadcastMessage(message) => self.on_data(message, source).await,
            NodeMessage::SubscribeRequest(req) => self.on_subscribe(req, source).await,
            NodeMessage::UnsubscribeRequest(req) => self.on_unsubscribe(req, source).await,
            NodeMessage::ResendLastRequest(r) => {
                self.handle_resend_request(ResendRequest::Last(r), source).await
            }
            NodeMessage::ResendFromRequest(r) => {
                self.handle_resend_request(ResendRequest::From(r), source).await
            }
            NodeMessage::ResendRangeRequest(r) => {
                self.handle_resend_request(ResendRequest::Range(r), source).await
            }
            NodeMessage::UnicastMessage(unicast) => {
                self.resend_router
                    .route_message(&unicast.request_id, unicast.stream_message)
                    .await;
            }
            NodeMessage::ResendResponseResending(_) => {}
            NodeMessage::ResendResponseResent(r) => self.resend_router.complete(&r.request_id).await,
            NodeMessage::ResendResponseNoResend(r) => self.resend_router.complete(&r.request_id).await,
        }
    }

    /// Serves an inbound resend request (we are acting as a storage node
    /// for `source`): tries the local message store, then any known
    /// storage peers, streaming results back as `UnicastMessage` frames
    /// bracketed by the resend response lifecycle (§4.7).
    async fn handle_resend_request(&self, request: ResendRequest, source: &str) {
        let handler = ResendHandler::new(self.resend_strategies().await);
        let (mut rx, _control) = handler.handle_request(request.clone(), source.to_owned()).await;

        let request_id = request.request_id().to_owned();
        let stream_key = request.stream_key().clone();
        let source = source.to_owned();
        self.ongoing_resends
            .lock()
            .await
            .insert(request_id.clone(), Instant::now());

        let _ = self
            .send_node_message(
                &source,
                &NodeMessage::ResendResponseResending(ResendResponseResending {
                    request_id: request_id.clone(),
                    stream_key: stream_key.clone(),
                }),
            )
            .await;

        let mut sent_any = false;
        while let Some(message) = rx.recv().await {
            sent_any = true;
            let unicast = NodeMessage::UnicastMessage(UnicastMessage {
                request_id: request_id.clone(),
                stream_message: message,
            });
            if self.send_node_message(&source, &unicast).await.is_err() {
                self.ongoing_resends.lock().await.remove(&request_id);
                return;
            }
        }

        let terminal = if sent_any {
            NodeMessage::ResendResponseResent(ResendResponseResent {
                request_id: request_id.clone(),
                stream_key,
            })
        } else {
            NodeMessage::ResendResponseNoResend(ResendResponseNoResend {
                request_id: request_id.clone(),
                stream_key,
            })
        };
        let _ = self.send_node_message(&source, &terminal).await;
        self.ongoing_resends.lock().await.remove(&request_id);
    }

    /// Central inbound dispatch for decoded tracker<->node messages: the
    /// binary's reader loop hands every frame from a tracker peer to this
    /// method.
    pub async fn dispatch_tracker_message(&self, msg: TrackerMessage, tracker_id: &str) {
        match msg {
            TrackerMessage::InstructionMessage(instr) => self.on_instruction(instr, tracker_id).await,
            TrackerMessage::StorageNodesResponse(resp) => {
                for address in resp.node_addresses {
                    if let Ok(peer_id) = self.connect_and_learn_storage_peer(&address).await {
                        debug!(%peer_id, %address, "learned storage peer");
                    }
                }
            }
            TrackerMessage::StatusMessage(_) | TrackerMessage::StorageNodesRequest(_) => {
                debug!(%tracker_id, "ignoring tracker-bound message received on the node side");
            }
        }
    }

    async fn connect_and_learn_storage_peer(&self, address: &str) -> Result<String, NetworkError> {
        let peer_id = match self.endpoint.peer_id_for_address(address).await {
            Some(id) => id,
            None => self.connect_tolerating_duplicate(address).await?,
        };
        if let Ok(peer) = self.endpoint.peer_book_peer_info(&peer_id).await {
            self.add_known_storage_peer(peer).await;
        }
        Ok(peer_id)
    }

    /// Dials `address` and treats losing the duplicate-socket tiebreak the
    /// same as success: a peer we're already connected to via the winning
    /// side of a simultaneous mutual dial is just as usable as one we
    /// connected ourselves (§4.2 "Duplicate-socket tiebreaker").
    async fn connect_tolerating_duplicate(&self, address: &str) -> Result<String, NetworkError> {
        match self.endpoint.connect(address.to_owned()).await {
            Ok(peer_id) => Ok(peer_id),
            Err(crate::error::EndpointError::Duplicate(peer_id)) => Ok(peer_id),
            Err(err) => Err(err.into()),
        }
    }

    /// `onInstruction(instr, trackerId)` (§4.5, I6).
    pub async fn on_instruction(&self, instr: InstructionMessage, tracker_id: &str) {
        let key = instr.stream_key.clone();
        let target_addresses: Vec<String> = instr
            .node_addresses
            .iter()
            .filter(|a| a.as_str() != self.endpoint.own_advertised_url())
            .cloned()
            .collect();

        // `outbound` is keyed by peer id, not address (see
        // `connect_and_subscribe`'s `outbound.insert(peer_id)` and this same
        // method's `to_remove`/status-reporting below), so each target
        // address is resolved to the peer id of its live connection, if any,
        // before diffing against `outbound` — comparing addresses to peer
        // ids directly would treat every already-converged neighbour as
        // both a fresh addition and a removal on every subsequent
        // instruction.
        let mut resolved_by_address: HashMap<String, String> = HashMap::new();
        for address in &target_addresses {
            if let Some(peer_id) = self.endpoint.peer_id_for_address(address).await {
                resolved_by_address.insert(address.clone(), peer_id);
            }
        }
        let target_peer_ids: std::collections::HashSet<String> =
            resolved_by_address.values().cloned().collect();

        let (to_add, to_remove) = {
            let mut state = self.state.lock().await;
            let stream_state = state.streams.ensure_subscribed(key.clone());
            if instr.counter < stream_state.counter {
                debug!(%key, "dropping stale instruction (counter regression)");
                return;
            }
            stream_state.counter = instr.counter;
            let to_remove: Vec<String> = stream_state
                .outbound
                .difference(&target_peer_ids)
                .cloned()
                .collect();
            let to_add: Vec<String> = target_addresses
                .into_iter()
                .filter(|address| match resolved_by_address.get(address) {
                    Some(peer_id) => !stream_state.outbound.contains(peer_id),
                    None => true,
                })
                .collect();
            (to_add, to_remove)
        };

        let locally_converged = to_add.is_empty() && to_remove.is_empty();

        for address in to_add {
            match self.connect_and_subscribe(&address, &key).await {
                Ok(()) => {}
                Err(err) => warn!(%address, %err, "failed to connect to instructed neighbour"),
            }
        }
        for peer_id in to_remove {
            let msg = NodeMessage::UnsubscribeRequest(UnsubscribeRequest {
                request_id: streamr_protocol::new_request_id(),
                stream_key: key.clone(),
            });
            let _ = self.send_node_message(&peer_id, &msg).await;
            let mut state = self.state.lock().await;
            if let Some(stream_state) = state.streams.get_mut(&key) {
                stream_state.outbound.remove(&peer_id);
            }
            drop(state);
            self.disconnect_if_idle_after_grace(peer_id).await;
        }

        let _ = tracker_id;
        if !locally_converged {
            // An instruction that named exactly the neighbour set we
            // already have needs no status reply: the tracker would see
            // the same already-converged status and, since its own
            // reconciliation is likewise a no-op on an unchanged target,
            // nothing would come of it but a wasted round trip. Only a
            // real local change is worth reporting back.
            let _ = self.send_status_for_key(&key).await;
        }
    }

    async fn connect_and_subscribe(
        &self,
        address: &str,
        key: &StreamKey,
    ) -> Result<(), NetworkError> {
        let peer_id = match self.endpoint.peer_id_for_address(address).await {
            Some(id) => id,
            None => self.connect_tolerating_duplicate(address).await?,
        };

        let msg = NodeMessage::SubscribeRequest(SubscribeRequest {
            request_id: streamr_protocol::new_request_id(),
            stream_key: key.clone(),
        });
        self.send_node_message(&peer_id, &msg).await?;

        let mut state = self.state.lock().await;
        state
            .streams
            .ensure_subscribed(key.clone())
            .outbound
            .insert(peer_id);
        Ok(())
    }

    /// Handles a `PEER_DISCONNECTED` endpoint event: clears the peer from
    /// every stream's inbound/outbound sets (§4.5 "Failure semantics").
    pub async fn on_peer_disconnected(&self, peer_id: &str) {
        let mut state = self.state.lock().await;
        state.streams.remove_peer_everywhere(peer_id);
        drop(state);
        let _ = self.events_tx.send(NodeEvent::NodeDisconnected(peer_id.to_owned()));
    }

    /// Grace-period disconnect: closes the socket only if the peer still
    /// shares no subscribed stream after `disconnection_wait` (a peer may
    /// resubscribe in the meantime).
    async fn disconnect_if_idle_after_grace(&self, peer_id: String) {
        let wait = self.config.disconnection_wait;
        let endpoint = self.endpoint.clone();
        let still_idle = {
            let state = self.state.lock().await;
            state.streams.shared_streams_with(&peer_id).is_empty()
        };
        if !still_idle {
            return;
        }
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            endpoint.close(&peer_id, DisconnectReason::NoSharedStreams).await;
        });
    }

    async fn send_status_for_key(&self, key: &StreamKey) -> Result<(), NetworkError> {
        let Some(tracker_id) = self.responsible_tracker().map(str::to_owned) else {
            return Ok(());
        };
        let status = {
            let state = self.state.lock().await;
            let stream_status = state.streams.get(key).map(|s| StreamStatus {
                outbound: s.outbound.iter().cloned().collect(),
                counter: s.counter,
            });
            let mut streams = HashMap::new();
            if let Some(status) = stream_status {
                streams.insert(key.clone(), status);
            }
            NodeStatus { streams }
        };
        let msg = TrackerMessage::StatusMessage(StatusMessage { status });
        let bytes = codec::encode_tracker_message(&msg);
        if let Some(peer_id) = self.tracker_peer_id(&tracker_id).await {
            self.endpoint.send(&peer_id, bytes).await?;
        }
        Ok(())
    }

    async fn tracker_peer_id(&self, tracker_url: &str) -> Option<String> {
        match self.endpoint.peer_id_for_address(tracker_url).await {
            Some(id) => Some(id),
            None => self.connect_tolerating_duplicate(tracker_url).await.ok(),
        }
    }

    async fn send_node_message(&self, peer_id: &str, msg: &NodeMessage) -> Result<(), NetworkError> {
        let bytes = codec::encode_node_message(msg);
        self.endpoint.send(peer_id, bytes).await?;
        Ok(())
    }

    pub fn own_peer_info(&self) -> &PeerInfo {
        &self.own
    }

    /// Pumps endpoint events into this node's handlers for as long as the
    /// endpoint keeps producing them: a received frame is decoded as a
    /// node-protocol or tracker-protocol message depending on the sender's
    /// advertised `PeerInfo` and dispatched accordingly; disconnects clear
    /// the peer from stream bookkeeping (§4.5 "onPeerDisconnected"). Both
    /// `services/node`'s binary and the crate's own integration tests drive
    /// a `Node` through this one pump rather than each re-wiring the
    /// decode/dispatch glue.
    pub fn spawn_event_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let node = self.clone();
        let mut events_rx = self.endpoint.subscribe_events();
        tokio::spawn(async move {
            loop {
                match events_rx.recv().await {
                    Ok(crate::events::EndpointEvent::MessageReceived(peer, bytes)) => {
                        if peer.is_tracker() {
                            match codec::decode_tracker_message(&bytes) {
                                Ok(msg) => node.dispatch_tracker_message(msg, &peer.peer_id).await,
                                Err(err) => {
                                    warn!(%err, peer_id = %peer.peer_id, "dropping malformed tracker frame");
                                }
                            }
                        } else {
                            match codec::decode_node_message(&bytes) {
                                Ok(msg) => node.dispatch_node_message(msg, &peer.peer_id).await,
                                Err(err) => {
                                    warn!(%err, peer_id = %peer.peer_id, "dropping malformed node frame");
                                }
                            }
                        }
                    }
                    Ok(crate::events::EndpointEvent::PeerConnected(peer)) => {
                        info!(peer_id = %peer.peer_id, "peer connected");
                    }
                    Ok(crate::events::EndpointEvent::PeerDisconnected(peer, reason)) => {
                        if node.endpoint.has_live_connection(&peer.peer_id).await {
                            // A losing socket of a duplicate-socket tiebreak reports its
                            // own disconnect after the winning connection already took
                            // its place in the endpoint's connection map; nothing shared
                            // with this peer actually went away.
                            debug!(peer_id = %peer.peer_id, ?reason, "ignoring disconnect superseded by a live connection");
                        } else {
                            debug!(peer_id = %peer.peer_id, ?reason, "peer disconnected");
                            node.on_peer_disconnected(&peer.peer_id).await;
                        }
                    }
                    Ok(crate::events::EndpointEvent::HighBackPressure(_))
                    | Ok(crate::events::EndpointEvent::LowBackPressure(_)) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "node event loop lagged behind the endpoint");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Bootstraps connections to every configured tracker, with exponential
    /// backoff on failure (base 2s, cap 60s — §4.5 "Failure semantics").
    pub async fn connect_to_trackers(&self) {
        for tracker_url in self.config.trackers.clone() {
            let endpoint = self.endpoint.clone();
            let base = self.config.reconnect_backoff_base;
            let cap = self.config.reconnect_backoff_cap;
            tokio::spawn(async move {
                let mut backoff = base;
                loop {
                    match endpoint.connect(tracker_url.clone()).await {
                        Ok(peer_id) | Err(crate::error::EndpointError::Duplicate(peer_id)) => {
                            info!(%peer_id, %tracker_url, "connected to tracker");
                            break;
                        }
                        Err(err) => {
                            warn!(%tracker_url, %err, ?backoff, "tracker connect failed, retrying");
                            tokio::time::sleep(backoff).await;
                            backoff = std::cmp::min(backoff * 2, cap);
                        }
                    }
                }
            });
        }
    }
}
