//! Tracker <-> node control messages (C3).

use crate::stream_key::StreamKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A node's self-reported view of one stream key: the outbound neighbours
/// it currently forwards to, and the last instruction counter it applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatus {
    pub outbound: Vec<String>,
    pub counter: u32,
}

/// A node's full status report, one entry per currently subscribed stream
/// key (§4.5 "Status message").
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeStatus {
    pub streams: HashMap<StreamKey, StreamStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: NodeStatus,
}

/// Tracker-to-node routing instruction: the addresses this node should have
/// as forwarding neighbours for `stream_key`. `counter` is strictly
/// increasing per stream key at the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionMessage {
    pub stream_key: StreamKey,
    pub node_addresses: Vec<String>,
    pub counter: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageNodesRequest {
    pub request_id: String,
    pub stream_key: StreamKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageNodesResponse {
    pub request_id: String,
    pub stream_key: StreamKey,
    pub node_addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrackerMessage {
    StatusMessage(StatusMessage),
    InstructionMessage(InstructionMessage),
    StorageNodesRequest(StorageNodesRequest),
    StorageNodesResponse(StorageNodesResponse),
}
