// node: runs a stream node (C5) behind a WebSocket listener, dialling its
// configured trackers and exposing a local admin/application surface for
// subscribe/unsubscribe/publish/resend.

use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::extract::Query;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use streamr_network::endpoint::server::upgrade_handler;
use streamr_network::{config, EndpointConfig, EndpointHandle, Node, NodeConfig};
use streamr_protocol::{
    MessageId, MessageRef, PeerInfo, ResendFromRequest, ResendLastRequest, ResendRangeRequest,
    ResendRequest, StreamMessage,
};
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "node starting");

    let config_path = env::var("STREAMR_CONFIG").unwrap_or_else(|_| "/etc/streamr/node.toml".to_owned());
    let network_config = match config::load_config_from_path(Path::new(&config_path)) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("FATAL: failed to load config '{config_path}': {err}");
            std::process::exit(1);
        }
    };

    let own = PeerInfo::new(network_config.id.clone(), network_config.peer_type);
    let (endpoint, events_rx) = EndpointHandle::new(EndpointConfig {
        host: network_config.host.clone(),
        port: network_config.port,
        advertised_url: network_config.advertised_ws_url.clone(),
        peer_id: network_config.id.clone(),
        peer_type: own.peer_type,
        ping_interval: network_config.ping_interval,
    });
    drop(events_rx);

    let node = Arc::new(Node::new(
        own,
        endpoint.clone(),
        NodeConfig {
            max_neighbours: network_config.max_neighbours,
            disconnection_wait: network_config.disconnection_wait_time,
            trackers: network_config.trackers.clone(),
            ..NodeConfig::default()
        },
    ));

    node.spawn_event_loop();
    node.connect_to_trackers().await;

    let router = build_router(endpoint.clone(), node.clone());
    let bind_addr = format!("{}:{}", network_config.host, network_config.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("FATAL: failed to bind {bind_addr}: {err}");
            std::process::exit(1);
        }
    };
    info!(addr = %bind_addr, advertised = %network_config.advertised_ws_url, "node listening");

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("node server error");

    endpoint.stop().await;
    info!("node shut down gracefully");
}

fn build_router(endpoint: EndpointHandle, node: Arc<Node>) -> Router {
    let metrics_node = node.clone();
    Router::new()
        .route("/ws", get(upgrade_handler))
        .route(
            "/subscribe",
            post({
                let node = node.clone();
                move |Json(body): Json<SubscriptionBody>| {
                    let node = node.clone();
                    async move { subscribe(&node, body).await }
                }
            }),
        )
        .route(
            "/unsubscribe",
            post({
                let node = node.clone();
                move |Json(body): Json<SubscriptionBody>| {
                    let node = node.clone();
                    async move { unsubscribe(&node, body).await }
                }
            }),
        )
        .route(
            "/publish",
            post({
                let node = node.clone();
                move |Json(body): Json<PublishBody>| {
                    let node = node.clone();
                    async move { publish(&node, body).await }
                }
            }),
        )
        .route(
            "/resend",
            get({
                let node = node.clone();
                move |Query(query): Query<ResendQuery>| {
                    let node = node.clone();
                    async move { resend(&node, query).await }
                }
            }),
        )
        .route(
            "/metrics",
            get(move || {
                let node = metrics_node.clone();
                async move { Json(node.metrics().await) }
            }),
        )
        .with_state(endpoint)
}

#[derive(Debug, Deserialize)]
struct SubscriptionBody {
    stream_id: String,
    partition: u32,
}

async fn subscribe(node: &Node, body: SubscriptionBody) -> Response {
    match node.subscribe(&body.stream_id, body.partition).await {
        Ok(()) => axum::http::StatusCode::OK.into_response(),
        Err(err) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn unsubscribe(node: &Node, body: SubscriptionBody) -> Response {
    match node.unsubscribe(&body.stream_id, body.partition).await {
        Ok(()) => axum::http::StatusCode::OK.into_response(),
        Err(err) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct PublishBody {
    stream_id: String,
    partition: u32,
    timestamp: u64,
    sequence_number: u64,
    publisher_id: String,
    msg_chain_id: String,
    prev_timestamp: Option<u64>,
    prev_sequence_number: Option<u64>,
    content: Vec<u8>,
    signature: Option<Vec<u8>>,
}

async fn publish(node: &Node, body: PublishBody) -> Response {
    let message = StreamMessage {
        message_id: MessageId::new(
            body.stream_id,
            body.partition,
            body.timestamp,
            body.sequence_number,
            body.publisher_id,
            body.msg_chain_id,
        ),
        prev_msg_ref: body
            .prev_timestamp
            .zip(body.prev_sequence_number)
            .map(|(ts, seq)| MessageRef::new(ts, seq)),
        content: body.content,
        signature: body.signature,
    };
    match node.publish(message).await {
        Ok(()) => axum::http::StatusCode::OK.into_response(),
        Err(err) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

/// `?streamId=...&partition=...&kind=last&numberOfLast=...` or
/// `kind=from&fromTimestamp=...&fromSequence=...[&publisherId=...]` or
/// `kind=range&...&toTimestamp=...&toSequence=...[&msgChainId=...]`
/// (§4.7 "Resend request shapes").
#[derive(Debug, Deserialize)]
struct ResendQuery {
    stream_id: String,
    partition: u32,
    kind: String,
    number_of_last: Option<u32>,
    from_timestamp: Option<u64>,
    from_sequence: Option<u64>,
    to_timestamp: Option<u64>,
    to_sequence: Option<u64>,
    publisher_id: Option<String>,
    msg_chain_id: Option<String>,
}

async fn resend(node: &Node, query: ResendQuery) -> Response {
    let stream_key = streamr_protocol::StreamKey::new(query.stream_id, query.partition);
    let request_id = streamr_protocol::new_request_id();
    let request = match query.kind.as_str() {
        "last" => {
            let Some(number_of_last) = query.number_of_last else {
                return (axum::http::StatusCode::BAD_REQUEST, "missing number_of_last").into_response();
            };
            ResendRequest::Last(ResendLastRequest {
                request_id,
                stream_key,
                number_of_last,
            })
        }
        "from" => {
            let (Some(ts), Some(seq)) = (query.from_timestamp, query.from_sequence) else {
                return (axum::http::StatusCode::BAD_REQUEST, "missing from_timestamp/from_sequence")
                    .into_response();
            };
            ResendRequest::From(ResendFromRequest {
                request_id,
                stream_key,
                from: MessageRef::new(ts, seq),
                publisher_id: query.publisher_id,
            })
        }
        "range" => {
            let (Some(from_ts), Some(from_seq), Some(to_ts), Some(to_seq)) = (
                query.from_timestamp,
                query.from_sequence,
                query.to_timestamp,
                query.to_sequence,
            ) else {
                return (axum::http::StatusCode::BAD_REQUEST, "missing from/to bounds").into_response();
            };
            ResendRequest::Range(ResendRangeRequest {
                request_id,
                stream_key,
                from: MessageRef::new(from_ts, from_seq),
                to: MessageRef::new(to_ts, to_seq),
                publisher_id: query.publisher_id,
                msg_chain_id: query.msg_chain_id,
            })
        }
        other => {
            return (axum::http::StatusCode::BAD_REQUEST, format!("unknown resend kind '{other}'"))
                .into_response();
        }
    };

    let mut rx = node.resend(request).await;
    let mut messages = Vec::new();
    while let Some(message) = rx.recv().await {
        messages.push(message);
    }
    Json(messages).into_response()
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
