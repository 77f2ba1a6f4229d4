//! Node <-> node control messages (C3).
//!
//! All request variants carry a `request_id`; [`NodeMessage::new_request_id`]
//! mints a UUIDv4 for callers that don't already have one (the requester
//! decides the id — this mirrors the source's "minted at send time when
//! absent" rule without needing an `Option` on every variant).

use crate::message::{MessageRef, StreamMessage};
use crate::stream_key::StreamKey;
use serde::{Deserialize, Serialize};

pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub request_id: String,
    pub stream_key: StreamKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeRequest {
    pub request_id: String,
    pub stream_key: StreamKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendLastRequest {
    pub request_id: String,
    pub stream_key: StreamKey,
    pub number_of_last: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendFromRequest {
    pub request_id: String,
    pub stream_key: StreamKey,
    pub from: MessageRef,
    pub publisher_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendRangeRequest {
    pub request_id: String,
    pub stream_key: StreamKey,
    pub from: MessageRef,
    pub to: MessageRef,
    pub publisher_id: Option<String>,
    pub msg_chain_id: Option<String>,
}

/// Any of the three resend request shapes, for code that handles all of
/// them uniformly (the resend handler, C7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ResendRequest {
    Last(ResendLastRequest),
    From(ResendFromRequest),
    Range(ResendRangeRequest),
}

impl ResendRequest {
    pub fn request_id(&self) -> &str {
        match self {
            ResendRequest::Last(r) => &r.request_id,
            ResendRequest::From(r) => &r.request_id,
            ResendRequest::Range(r) => &r.request_id,
        }
    }

    pub fn stream_key(&self) -> &StreamKey {
        match self {
            ResendRequest::Last(r) => &r.stream_key,
            ResendRequest::From(r) => &r.stream_key,
            ResendRequest::Range(r) => &r.stream_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendResponseResending {
    pub request_id: String,
    pub stream_key: StreamKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendResponseResent {
    pub request_id: String,
    pub stream_key: StreamKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendResponseNoResend {
    pub request_id: String,
    pub stream_key: StreamKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnicastMessage {
    pub request_id: String,
    pub stream_message: StreamMessage,
}

/// The full node<->node tagged union, internally tagged on `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeMessage {
    BroadcastMessage(StreamMessage),
    UnicastMessage(UnicastMessage),
    SubscribeRequest(SubscribeRequest),
    UnsubscribeRequest(UnsubscribeRequest),
    ResendLastRequest(ResendLastRequest),
    ResendFromRequest(ResendFromRequest),
    ResendRangeRequest(ResendRangeRequest),
    ResendResponseResending(ResendResponseResending),
    ResendResponseResent(ResendResponseResent),
    ResendResponseNoResend(ResendResponseNoResend),
}

impl NodeMessage {
    pub fn resend_request(req: ResendRequest) -> Self {
        match req {
            ResendRequest::Last(r) => NodeMessage::ResendLastRequest(r),
            ResendRequest::From(r) => NodeMessage::ResendFromRequest(r),
            ResendRequest::Range(r) => NodeMessage::ResendRangeRequest(r),
        }
    }

    pub fn as_resend_request(&self) -> Option<ResendRequest> {
        match self {
            NodeMessage::ResendLastRequest(r) => Some(ResendRequest::Last(r.clone())),
            NodeMessage::ResendFromRequest(r) => Some(ResendRequest::From(r.clone())),
            NodeMessage::ResendRangeRequest(r) => Some(ResendRequest::Range(r.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_id_mints_distinct_uuids() {
        let a = new_request_id();
        let b = new_request_id();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn broadcast_message_round_trips_through_json() {
        let msg = NodeMessage::BroadcastMessage(StreamMessage {
            message_id: crate::message::MessageId::new("s", 0, 1, 1, "pub", "chain"),
            prev_msg_ref: None,
            content: b"hello".to_vec(),
            signature: None,
        });
        let json = serde_json::to_string(&msg).unwrap();
        let back: NodeMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn resend_request_round_trips_through_node_message() {
        let req = ResendRequest::Range(ResendRangeRequest {
            request_id: "r1".to_owned(),
            stream_key: StreamKey::new("s", 0),
            from: MessageRef::new(0, 0),
            to: MessageRef::new(10, 0),
            publisher_id: None,
            msg_chain_id: None,
        });
        let msg = NodeMessage::resend_request(req.clone());
        assert_eq!(msg.as_resend_request(), Some(req));
    }
}
