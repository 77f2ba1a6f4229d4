//! Event types emitted by the endpoint (C2) and node engine (C5). Modelled
//! as plain enums carried over `tokio::sync::broadcast` channels rather than
//! dynamic-dispatch event emitters — see §9 "dynamic dispatch -> tagged
//! variants".

use streamr_protocol::{PeerInfo, StreamKey, StreamMessage};

use crate::close_codes::DisconnectReason;

/// Emitted by the WS endpoint (C2).
#[derive(Debug, Clone)]
pub enum EndpointEvent {
    PeerConnected(PeerInfo),
    PeerDisconnected(PeerInfo, DisconnectReason),
    MessageReceived(PeerInfo, Vec<u8>),
    HighBackPressure(PeerInfo),
    LowBackPressure(PeerInfo),
}

/// Emitted by the node engine (C5).
#[derive(Debug, Clone)]
pub enum NodeEvent {
    NodeSubscribed(String, StreamKey),
    NodeUnsubscribed(String, StreamKey),
    NodeDisconnected(String),
    MessageReceived(StreamMessage),
}
