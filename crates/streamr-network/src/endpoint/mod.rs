//! WS Endpoint (C2, §4.2). Bidirectional WebSocket transport: accepts
//! inbound connections (`server.rs`) and opens outbound ones (`client.rs`),
//! enforces one connection per peer (`duplicate.rs`), and emits
//! connect/disconnect/message/back-pressure events over a broadcast
//! channel. The pure decision logic (tiebreak, watermarks, liveness) lives
//! in their own modules so it's testable without a real socket; this module
//! is the thin stateful glue around them.

pub mod backpressure;
pub mod client;
pub mod connection;
pub mod duplicate;
pub mod frame;
pub mod liveness;
pub mod server;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, Stream};
use streamr_protocol::{PeerInfo, PeerType};
use tokio::sync::{broadcast, RwLock};

use crate::close_codes::DisconnectReason;
use crate::error::EndpointError;
use crate::peerbook::PeerBook;

use connection::{spawn_connection, ConnectionHandle};
use duplicate::{resolve_duplicate, ConnDirection, DuplicateDecision};
use frame::Frame;

pub const PEER_ID_HEADER: &str = "streamr-peer-id";
pub const PEER_TYPE_HEADER: &str = "streamr-peer-type";

#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
    pub advertised_url: String,
    pub peer_id: String,
    pub peer_type: PeerType,
    pub ping_interval: Duration,
}

struct EndpointInner {
    own_peer_id: String,
    own_peer_type: PeerType,
    own_advertised_url: String,
    ping_interval: Duration,
    connections: RwLock<HashMap<String, ConnectionHandle>>,
    peer_book: RwLock<PeerBook>,
    events_tx: broadcast::Sender<EndpointEvent>,
    stopped: std::sync::atomic::AtomicBool,
}

use crate::events::EndpointEvent;

/// Cheaply cloneable handle to the endpoint; this is what gets handed to
/// axum as router `State` and held by the node/tracker engine layer.
#[derive(Clone)]
pub struct EndpointHandle(Arc<EndpointInner>);

impl EndpointHandle {
    pub fn new(config: EndpointConfig) -> (Self, broadcast::Receiver<EndpointEvent>) {
        let (events_tx, events_rx) = broadcast::channel(1024);
        let inner = EndpointInner {
            own_peer_id: config.peer_id,
            own_peer_type: config.peer_type,
            own_advertised_url: config.advertised_url,
            ping_interval: config.ping_interval,
            connections: RwLock::new(HashMap::new()),
            peer_book: RwLock::new(PeerBook::new()),
            events_tx,
            stopped: std::sync::atomic::AtomicBool::new(false),
        };
        let handle = Self(Arc::new(inner));
        handle.spawn_disconnect_reaper();
        (handle, events_rx)
    }

    /// A disconnect surfaced by the connection actor itself (remote close,
    /// dead-connection timeout) only emits an event; nothing else removes
    /// the stale entry from the connection map or peer book. This task does
    /// that bookkeeping so `is_connected`/`connected_peers`/the peer book
    /// stay accurate without every caller having to remember to call
    /// `close()` after observing a `PeerDisconnected` event.
    fn spawn_disconnect_reaper(&self) {
        let weak = Arc::downgrade(&self.0);
        let mut events_rx = self.0.events_tx.subscribe();
        tokio::spawn(async move {
            loop {
                let event = match events_rx.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else { break };
                if let EndpointEvent::PeerDisconnected(peer, _reason) = event {
                    let removed = {
                        let mut connections = inner.connections.write().await;
                        match connections.get(&peer.peer_id) {
                            Some(existing) if existing.is_closed() => {
                                connections.remove(&peer.peer_id);
                                true
                            }
                            _ => false,
                        }
                    };
                    if removed {
                        inner.peer_book.write().await.remove_by_id(&peer.peer_id);
                    }
                }
            }
        });
    }

    pub fn own_peer_id(&self) -> &str {
        &self.0.own_peer_id
    }

    pub fn own_peer_type(&self) -> PeerType {
        self.0.own_peer_type
    }

    pub fn own_advertised_url(&self) -> &str {
        &self.0.own_advertised_url
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EndpointEvent> {
        self.0.events_tx.subscribe()
    }

    pub fn peer_book_contains_address(&self, address: &str) -> bool {
        self.0
            .peer_book
            .try_read()
            .map(|book| book.connected_to_address(address))
            .unwrap_or(false)
    }

    pub async fn peer_id_for_address(&self, address: &str) -> Option<String> {
        self.0
            .peer_book
            .read()
            .await
            .peer_id_of(address)
            .ok()
            .map(str::to_owned)
    }

    pub async fn peer_book_address_of(&self, peer_id: &str) -> Result<String, EndpointError> {
        self.0
            .peer_book
            .read()
            .await
            .address_of(peer_id)
            .map(str::to_owned)
            .map_err(|_| EndpointError::NotConnected(peer_id.to_owned()))
    }

    pub async fn peer_book_peer_info(&self, peer_id: &str) -> Result<PeerInfo, EndpointError> {
        self.0
            .peer_book
            .read()
            .await
            .peer_info(peer_id)
            .cloned()
            .map_err(|_| EndpointError::NotConnected(peer_id.to_owned()))
    }

    /// `connect(peerUrl) -> peerId` (§4.2).
    pub async fn connect(&self, peer_url: String) -> Result<String, EndpointError> {
        if self.0.stopped.load(std::sync::atomic::Ordering::Acquire) {
            return Err(EndpointError::Stopped);
        }
        client::connect(self.clone(), peer_url).await
    }

    /// `send(peerId, frame) -> Promise<peerId>` (§4.2). A failed send
    /// terminates the socket, matching "A send that raises terminates the
    /// socket."
    pub async fn send(&self, peer_id: &str, payload: Vec<u8>) -> Result<(), EndpointError> {
        let handle = {
            let connections = self.0.connections.read().await;
            connections
                .get(peer_id)
                .cloned()
                .ok_or_else(|| EndpointError::NotConnected(peer_id.to_owned()))?
        };
        match handle.send(Frame::Binary(payload)) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.close(peer_id, DisconnectReason::DeadConnection).await;
                Err(err)
            }
        }
    }

    /// `close(peerId, reason)` (§4.2): sends the close frame, swallows
    /// transport errors, removes the peer from bookkeeping.
    pub async fn close(&self, peer_id: &str, reason: DisconnectReason) {
        let handle = self.0.connections.write().await.remove(peer_id);
        if let Some(handle) = handle {
            handle.close(reason);
        }
        self.0.peer_book.write().await.remove_by_id(peer_id);
    }

    /// `stop()` (§4.2): closes every connection with `GRACEFUL_SHUTDOWN`.
    pub async fn stop(&self) {
        self.0.stopped.store(true, std::sync::atomic::Ordering::Release);
        let peer_ids: Vec<String> = self.0.connections.read().await.keys().cloned().collect();
        for peer_id in peer_ids {
            self.close(&peer_id, DisconnectReason::GracefulShutdown).await;
        }
    }

    pub async fn is_connected(&self, peer_id: &str) -> bool {
        self.0.connections.read().await.contains_key(peer_id)
    }

    /// Whether the connection currently registered for `peer_id` is still
    /// live. A `PeerDisconnected` event names the peer, not the specific
    /// socket that died, so a losing side of a duplicate-socket tiebreak can
    /// report a disconnect for a peer the winning socket has already
    /// replaced in the connection map; callers reacting to disconnect events
    /// should treat the peer as still connected when this returns `true`
    /// rather than tearing down bookkeeping for a connection that survives.
    pub async fn has_live_connection(&self, peer_id: &str) -> bool {
        self.0
            .connections
            .read()
            .await
            .get(peer_id)
            .is_some_and(|handle| !handle.is_closed())
    }

    pub async fn connected_peers(&self) -> Vec<PeerInfo> {
        self.0
            .connections
            .read()
            .await
            .values()
            .map(|h| h.peer.clone())
            .collect()
    }

    /// Registers a freshly split, already-framed connection, running it
    /// through the duplicate-socket tiebreak before admitting it. Returns
    /// whether the newly registered connection is the one that survived —
    /// `false` means `spawned` was closed as the loser of the tiebreak (or
    /// the remote shares our own advertised URL), which `client::connect`
    /// surfaces to its caller as [`EndpointError::Duplicate`].
    pub(crate) async fn register_connection<Sk, St>(
        &self,
        remote: PeerInfo,
        remote_address: String,
        direction: ConnDirection,
        sink: Sk,
        stream: St,
    ) -> bool
    where
        Sk: Sink<Frame, Error = EndpointError> + Unpin + Send + 'static,
        St: Stream<Item = Result<Frame, EndpointError>> + Unpin + Send + 'static,
    {
        let spawned = spawn_connection(
            remote.clone(),
            remote_address.clone(),
            direction,
            sink,
            stream,
            self.0.ping_interval,
            self.0.events_tx.clone(),
        );

        let mut connections = self.0.connections.write().await;
        if let Some(existing) = connections.get(&remote.peer_id) {
            let decision = resolve_duplicate(
                &self.0.own_advertised_url,
                &remote_address,
                existing.direction,
                direction,
            );
            match decision {
                Ok(DuplicateDecision::KeepExisting) | Err(_) => {
                    spawned.handle.close(DisconnectReason::DuplicateSocket);
                    return false;
                }
                Ok(DuplicateDecision::ReplaceWithNew) => {
                    existing.close(DisconnectReason::DuplicateSocket);
                }
            }
        }

        drop(self.0.peer_book.write().await.insert(remote.clone(), remote_address.clone()));
        connections.insert(remote.peer_id.clone(), spawned.handle);
        drop(connections);
        let _ = self.0.events_tx.send(EndpointEvent::PeerConnected(remote));
        true
    }
}
