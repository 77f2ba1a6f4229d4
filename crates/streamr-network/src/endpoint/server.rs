//! Inbound half of the WS endpoint (§4.2 "Incoming upgrade"): pull the
//! handshake headers, validate, split the socket, hand off to the shared
//! connection actor.

use std::time::Duration;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures_util::future::ready;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use streamr_protocol::{PeerInfo, PeerType};
use tracing::{info, warn};

use super::duplicate::ConnDirection;
use super::frame::Frame;
use super::{EndpointHandle, PEER_ID_HEADER, PEER_TYPE_HEADER};
use crate::close_codes::DisconnectReason;
use crate::error::EndpointError;

#[derive(Debug, Deserialize)]
pub struct UpgradeQuery {
    pub address: Option<String>,
}

/// axum handler: `GET /ws?address=<advertisedUrl>` with
/// `streamr-peer-id`/`streamr-peer-type` headers (§6 "Wire transport").
pub async fn upgrade_handler(
    ws: WebSocketUpgrade,
    State(endpoint): State<EndpointHandle>,
    Query(query): Query<UpgradeQuery>,
    headers: HeaderMap,
) -> Response {
    let peer_id = headers
        .get(PEER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let peer_type = headers
        .get(PEER_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<PeerType>().ok());
    let address = query.address;

    let (peer_id, peer_type, address) = match (peer_id, peer_type, address) {
        (Some(p), Some(t), Some(a)) => (p, t, a),
        _ => {
            warn!("rejecting upgrade missing required handshake parameter");
            return (
                axum::http::StatusCode::BAD_REQUEST,
                "missing address, streamr-peer-id, or streamr-peer-type",
            )
                .into_response();
        }
    };

    if endpoint.peer_book_contains_address(&address) {
        warn!(%address, "rejecting upgrade: already connected to that address");
        return (axum::http::StatusCode::CONFLICT, "duplicate connection").into_response();
    }

    let own_peer_id = endpoint.own_peer_id().to_owned();
    let own_peer_type = endpoint.own_peer_type();
    let mut response = ws.on_upgrade(move |socket| async move {
        accept_connection(
            endpoint,
            socket,
            PeerInfo::new(peer_id, peer_type),
            address,
        )
        .await;
    });

    // "the upgrade response echoes the same two headers" (§6) — the
    // client's `connect()` reads these back to learn our `PeerInfo`.
    if let (Ok(id_value), Ok(type_value)) = (
        axum::http::HeaderValue::from_str(&own_peer_id),
        axum::http::HeaderValue::from_str(own_peer_type.as_str()),
    ) {
        response.headers_mut().insert(PEER_ID_HEADER, id_value);
        response.headers_mut().insert(PEER_TYPE_HEADER, type_value);
    }
    response
}

async fn accept_connection(
    endpoint: EndpointHandle,
    socket: WebSocket,
    remote: PeerInfo,
    remote_address: String,
) {
    info!(peer_id = %remote.peer_id, %remote_address, "accepted inbound connection");
    let (sink, stream) = socket.split();
    let sink = sink
        .with(|frame: Frame| ready(Ok::<_, axum::Error>(frame.into())))
        .sink_map_err(|e: axum::Error| EndpointError::Transport(e.to_string()));
    let stream = stream.map(|item| {
        item.map(Frame::from)
            .map_err(|e| EndpointError::Transport(e.to_string()))
    });

    endpoint
        .register_connection(
            remote,
            remote_address,
            ConnDirection::Inbound,
            sink,
            stream,
        )
        .await;
}

pub const PING_INTERVAL_DEFAULT: Duration = Duration::from_secs(5);

pub(super) fn dead_connection_reason() -> DisconnectReason {
    DisconnectReason::DeadConnection
}
