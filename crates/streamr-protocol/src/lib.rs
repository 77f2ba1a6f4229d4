//! streamr-protocol: wire schema for the node<->node and tracker<->node
//! control protocols (C3), plus the peer identity (C1), stream key, and
//! message identity types (§3) shared by every layer above it.
//!
//! This crate holds data and (de)serialization only — no I/O, no event
//! loop. `streamr-network` is the crate that drives it.

pub mod codec;
pub mod error;
pub mod message;
pub mod node_message;
pub mod peer;
pub mod stream_key;
pub mod tracker_message;

pub use error::ProtocolError;
pub use message::{MessageId, MessageRef, StreamMessage};
pub use node_message::{
    new_request_id, NodeMessage, ResendFromRequest, ResendLastRequest, ResendRangeRequest,
    ResendRequest, ResendResponseNoResend, ResendResponseResending, ResendResponseResent,
    SubscribeRequest, UnicastMessage, UnsubscribeRequest,
};
pub use peer::{InvalidPeerType, PeerInfo, PeerType};
pub use stream_key::{StreamKey, StreamKeyParseError};
pub use tracker_message::{
    InstructionMessage, NodeStatus, StatusMessage, StorageNodesRequest, StorageNodesResponse,
    StreamStatus, TrackerMessage,
};
