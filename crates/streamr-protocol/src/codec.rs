//! Byte <-> tagged-message codec (§6 "Control-message schema", §7 decode
//! errors). The spec treats wire encoding as an external collaborator; this
//! module is the thin seam C3 adapters call through so that seam can be
//! swapped without touching [`crate::NodeMessage`]/[`crate::TrackerMessage`].

use crate::error::ProtocolError;
use crate::node_message::NodeMessage;
use crate::tracker_message::TrackerMessage;

const UNKNOWN_VARIANT_MARKER: &str = "unknown variant";

fn classify(err: serde_json::Error, raw: &str) -> ProtocolError {
    if err.is_data() && err.to_string().contains(UNKNOWN_VARIANT_MARKER) {
        let tag = serde_json::from_str::<serde_json::Value>(raw)
            .ok()
            .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_owned))
            .unwrap_or_else(|| "<unreadable>".to_owned());
        ProtocolError::UnknownFrame(tag)
    } else {
        ProtocolError::MalformedPayload(err.to_string())
    }
}

pub fn encode_node_message(msg: &NodeMessage) -> Vec<u8> {
    serde_json::to_vec(msg).expect("NodeMessage always serializes")
}

pub fn decode_node_message(bytes: &[u8]) -> Result<NodeMessage, ProtocolError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ProtocolError::MalformedPayload(e.to_string()))?;
    serde_json::from_str(text).map_err(|e| classify(e, text))
}

pub fn encode_tracker_message(msg: &TrackerMessage) -> Vec<u8> {
    serde_json::to_vec(msg).expect("TrackerMessage always serializes")
}

pub fn decode_tracker_message(bytes: &[u8]) -> Result<TrackerMessage, ProtocolError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ProtocolError::MalformedPayload(e.to_string()))?;
    serde_json::from_str(text).map_err(|e| classify(e, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageId, StreamMessage};
    use crate::node_message::SubscribeRequest;
    use crate::stream_key::StreamKey;

    #[test]
    fn encodes_and_decodes_a_subscribe_request() {
        let msg = NodeMessage::SubscribeRequest(SubscribeRequest {
            request_id: "req-1".to_owned(),
            stream_key: StreamKey::new("s", 0),
        });
        let bytes = encode_node_message(&msg);
        assert_eq!(decode_node_message(&bytes).unwrap(), msg);
    }

    #[test]
    fn unrecognised_tag_is_reported_as_unknown_frame() {
        let bytes = br#"{"type":"SomethingElse","field":1}"#;
        match decode_node_message(bytes) {
            Err(ProtocolError::UnknownFrame(tag)) => assert_eq!(tag, "SomethingElse"),
            other => panic!("expected UnknownFrame, got {other:?}"),
        }
    }

    #[test]
    fn truncated_json_is_reported_as_malformed_payload() {
        let bytes = br#"{"type":"SubscribeRequest","request_id":"#;
        match decode_node_message(bytes) {
            Err(ProtocolError::MalformedPayload(_)) => {}
            other => panic!("expected MalformedPayload, got {other:?}"),
        }
    }

    #[test]
    fn instruction_message_round_trips() {
        let msg = TrackerMessage::InstructionMessage(crate::tracker_message::InstructionMessage {
            stream_key: StreamKey::new("s", 1),
            node_addresses: vec!["ws://a".to_owned()],
            counter: 1,
        });
        let bytes = encode_tracker_message(&msg);
        assert_eq!(decode_tracker_message(&bytes).unwrap(), msg);
    }

    #[test]
    fn broadcast_message_carries_opaque_content_through() {
        let msg = NodeMessage::BroadcastMessage(StreamMessage {
            message_id: MessageId::new("s", 0, 1, 1, "pub", "chain"),
            prev_msg_ref: None,
            content: vec![0, 159, 146, 150],
            signature: Some(vec![1, 2, 3]),
        });
        let bytes = encode_node_message(&msg);
        assert_eq!(decode_node_message(&bytes).unwrap(), msg);
    }
}
