//! Protocol-level error taxonomy (§7 "Protocol errors").

use thiserror::Error;

/// Errors produced while decoding a frame into a [`crate::NodeMessage`] or
/// [`crate::TrackerMessage`]. Per §7, the caller logs and closes the
/// offending connection with code 1002; application state is unchanged.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unrecognised control message tag: {0}")]
    UnknownFrame(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl ProtocolError {
    pub fn from_json_error(err: serde_json::Error) -> Self {
        ProtocolError::MalformedPayload(err.to_string())
    }
}
