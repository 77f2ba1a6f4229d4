//! Outbound half of the WS endpoint (§4.2 `connect(peerUrl)`): build a
//! client request carrying the handshake headers, dial with
//! `tokio_tungstenite::connect_async`, read the response headers back for
//! the remote `PeerInfo`.

use futures_util::future::ready;
use futures_util::{SinkExt, StreamExt};
use streamr_protocol::{PeerInfo, PeerType};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::info;

use super::duplicate::ConnDirection;
use super::frame::Frame;
use super::{EndpointHandle, PEER_ID_HEADER, PEER_TYPE_HEADER};
use crate::error::EndpointError;

fn build_request(
    peer_url: &str,
    own_address: &str,
    own_peer_id: &str,
    own_peer_type: PeerType,
) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, EndpointError> {
    let url = format!(
        "{peer_url}?address={}",
        urlencoding::encode(own_address)
    );
    let mut request = url
        .into_client_request()
        .map_err(|e| EndpointError::Transport(e.to_string()))?;
    let headers = request.headers_mut();
    headers.insert(
        PEER_ID_HEADER,
        own_peer_id
            .parse()
            .map_err(|_| EndpointError::Transport("invalid peer id header value".to_owned()))?,
    );
    headers.insert(
        PEER_TYPE_HEADER,
        own_peer_type
            .as_str()
            .parse()
            .map_err(|_| EndpointError::Transport("invalid peer type header value".to_owned()))?,
    );
    Ok(request)
}

/// Dial `peer_url`, validate the handshake response headers, and hand the
/// split socket off to the shared connection actor. Returns the connected
/// peer id on success.
pub async fn connect(endpoint: EndpointHandle, peer_url: String) -> Result<String, EndpointError> {
    if peer_url == endpoint.own_advertised_url() {
        return Err(EndpointError::OwnAddress(peer_url));
    }

    let request = build_request(
        &peer_url,
        endpoint.own_advertised_url(),
        endpoint.own_peer_id(),
        endpoint.own_peer_type(),
    )?;

    let (ws_stream, response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| EndpointError::Transport(e.to_string()))?;

    let peer_id = response
        .headers()
        .get(PEER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .ok_or_else(|| EndpointError::HeadersMissing(peer_url.clone()))?;
    let peer_type = response
        .headers()
        .get(PEER_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<PeerType>().ok())
        .ok_or_else(|| EndpointError::HeadersMissing(peer_url.clone()))?;

    info!(%peer_id, %peer_url, "dialed outbound connection");

    let (sink, stream) = ws_stream.split();
    let sink = sink
        .with(|frame: Frame| {
            ready(Ok::<_, tokio_tungstenite::tungstenite::Error>(frame.into()))
        })
        .sink_map_err(|e| EndpointError::Transport(e.to_string()));
    let stream = stream.map(|item| {
        item.map(Frame::from)
            .map_err(|e| EndpointError::Transport(e.to_string()))
    });

    let kept = endpoint
        .register_connection(
            PeerInfo::new(peer_id.clone(), peer_type),
            peer_url,
            ConnDirection::Outbound,
            sink,
            stream,
        )
        .await;

    if !kept {
        return Err(EndpointError::Duplicate(peer_id));
    }

    Ok(peer_id)
}
