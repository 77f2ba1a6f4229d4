//! Multi-node scenarios driven over real sockets: a tracker and several
//! nodes each bound to `127.0.0.1:0`, wired together the way
//! `services/tracker`/`services/node` wire them, interacted with only
//! through `Tracker`/`Node`'s public API. Mirrors the in-process-real-server
//! idiom from `tests/integration/chaos_network.rs` rather than mocking the
//! transport.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use streamr_network::endpoint::server::upgrade_handler;
use streamr_network::{EndpointConfig, EndpointHandle, Node, NodeConfig, NodeEvent, Tracker, TrackerConfig};
use streamr_protocol::{MessageId, PeerInfo, PeerType, ResendLastRequest, ResendRequest, StreamMessage};

async fn bind_endpoint(id: &str, peer_type: PeerType) -> (EndpointHandle, String, tokio::net::TcpListener) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().unwrap().port();
    let advertised_url = format!("ws://127.0.0.1:{port}/ws");
    let (endpoint, _events_rx) = EndpointHandle::new(EndpointConfig {
        host: "127.0.0.1".to_owned(),
        port,
        advertised_url: advertised_url.clone(),
        peer_id: id.to_owned(),
        peer_type,
        ping_interval: Duration::from_secs(5),
    });
    (endpoint, advertised_url, listener)
}

fn serve(listener: tokio::net::TcpListener, endpoint: EndpointHandle) {
    let router = Router::new().route("/ws", get(upgrade_handler)).with_state(endpoint);
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server error");
    });
}

async fn spawn_tracker(id: &str) -> (Arc<Tracker>, String) {
    let (endpoint, url, listener) = bind_endpoint(id, PeerType::Tracker).await;
    let tracker = Arc::new(Tracker::new(
        PeerInfo::tracker(id),
        endpoint.clone(),
        TrackerConfig::default(),
    ));
    tracker.spawn_event_loop();
    serve(listener, endpoint);
    (tracker, url)
}

async fn spawn_node(id: &str, trackers: Vec<String>) -> (Arc<Node>, String) {
    let (endpoint, url, listener) = bind_endpoint(id, PeerType::Node).await;
    let node = Arc::new(Node::new(
        PeerInfo::node(id),
        endpoint.clone(),
        NodeConfig {
            trackers,
            disconnection_wait: Duration::from_millis(150),
            ..NodeConfig::default()
        },
    ));
    node.spawn_event_loop();
    serve(listener, endpoint);
    node.connect_to_trackers().await;
    (node, url)
}

fn sample_message(stream_id: &str, partition: u32, publisher: &str, seq: u64, payload: &[u8]) -> StreamMessage {
    StreamMessage {
        message_id: MessageId::new(stream_id, partition, seq, 0, publisher, "chain-1"),
        prev_msg_ref: None,
        content: payload.to_vec(),
        signature: None,
    }
}

#[tokio::test]
async fn forms_a_connected_overlay_and_dedups_broadcast_across_redundant_paths() {
    let (tracker, tracker_url) = spawn_tracker("tracker-1").await;
    let (node_a, _) = spawn_node("node-a", vec![tracker_url.clone()]).await;
    let (node_b, _) = spawn_node("node-b", vec![tracker_url.clone()]).await;
    let (node_c, _) = spawn_node("node-c", vec![tracker_url.clone()]).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    node_a.subscribe("orders", 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    node_b.subscribe("orders", 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    node_c.subscribe("orders", 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    // Three nodes under the default max_neighbours of 4 converge on a full
    // triangle: every node ends up directly connected to the other two.
    let topology = tracker.get_topology().await;
    let key = streamr_protocol::StreamKey::new("orders", 0);
    let nodes = topology.get(&key).expect("overlay exists for the subscribed key");
    assert_eq!(nodes.get("node-a").unwrap().len(), 2);
    assert_eq!(nodes.get("node-b").unwrap().len(), 2);
    assert_eq!(nodes.get("node-c").unwrap().len(), 2);

    // Exactly one socket per peer pair survives the simultaneous mutual
    // dial the triangle's formation triggers (I1).
    assert_eq!(node_a.metrics().await.connected_peer_count, 2);
    assert_eq!(node_b.metrics().await.connected_peer_count, 2);
    assert_eq!(node_c.metrics().await.connected_peer_count, 2);

    let mut a_events = node_a.subscribe_events();
    let mut b_events = node_b.subscribe_events();

    // Node C's message can reach node A both directly and relayed through
    // node B; the per-chain dedup must still deliver it to A exactly once.
    node_c.publish(sample_message("orders", 0, "pub-1", 1, b"hello")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let mut a_delivered = 0;
    while let Ok(event) = a_events.try_recv() {
        if let NodeEvent::MessageReceived(msg) = event {
            if msg.message_id.publisher_id == "pub-1" {
                a_delivered += 1;
            }
        }
    }
    assert_eq!(a_delivered, 1, "node-a must not receive the same message twice");

    let mut b_delivered = 0;
    while let Ok(event) = b_events.try_recv() {
        if let NodeEvent::MessageReceived(msg) = event {
            if msg.message_id.publisher_id == "pub-1" {
                b_delivered += 1;
            }
        }
    }
    assert_eq!(b_delivered, 1, "node-b must not receive the same message twice");
}

#[tokio::test]
async fn unsubscribe_from_the_last_shared_stream_disconnects_after_the_grace_period() {
    let (tracker, tracker_url) = spawn_tracker("tracker-2").await;
    let (node_a, _) = spawn_node("node-a2", vec![tracker_url.clone()]).await;
    let (node_b, _) = spawn_node("node-b2", vec![tracker_url.clone()]).await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    node_a.subscribe("ticks", 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    node_b.subscribe("ticks", 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(node_a.metrics().await.connected_peer_count, 1);
    assert_eq!(node_b.metrics().await.connected_peer_count, 1);

    node_a.unsubscribe("ticks", 0).await.unwrap();
    // disconnection_wait is 150ms for these test nodes; give the grace
    // period time to elapse and the deferred close to run.
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(node_a.metrics().await.connected_peer_count, 0);
    assert_eq!(node_b.metrics().await.connected_peer_count, 0);
    let _ = tracker;
}

#[tokio::test]
async fn resend_falls_back_to_a_connected_peer_when_the_local_store_is_empty() {
    let (tracker, tracker_url) = spawn_tracker("tracker-3").await;
    let (requester, _) = spawn_node("requester", vec![tracker_url.clone()]).await;
    let (storage, _) = spawn_node("storage", vec![tracker_url.clone()]).await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Subscribing both to the same key gives them a real socket to each
    // other without needing a standalone connect() on Node's public API.
    requester.subscribe("shared", 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    storage.subscribe("shared", 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(requester.metrics().await.connected_peer_count, 1);

    // The storage node publishes on a key the requester never subscribed
    // to, so the message lands only in the storage node's local store.
    storage
        .publish(sample_message("history", 0, "pub-9", 1, b"archived"))
        .await
        .unwrap();

    requester.add_known_storage_peer(storage.own_peer_info().clone()).await;

    let mut rx = requester
        .resend(ResendRequest::Last(ResendLastRequest {
            request_id: streamr_protocol::new_request_id(),
            stream_key: streamr_protocol::StreamKey::new("history", 0),
            number_of_last: 10,
        }))
        .await;

    let received = rx.recv().await.expect("storage peer resends the archived message");
    assert_eq!(received.message_id.publisher_id, "pub-9");
    assert_eq!(received.content, b"archived");
    assert!(rx.recv().await.is_none(), "exactly one message was ever published");
    let _ = tracker;
}
