//! Error taxonomy (§7). Grouped by the layer that raises them rather than
//! collapsed into one enum, so a caller's `match` stays meaningful: the
//! node engine only ever sees `EndpointError` out of `send`/`connect`, the
//! resend handler only ever sees `ResendError` out of a strategy.

use streamr_protocol::ProtocolError;
use thiserror::Error;

/// Transport errors (§7 "Transport errors"), returned by
/// [`crate::endpoint::EndpointHandle`] operations.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("not connected to peer {0}")]
    NotConnected(String),
    #[error("send to peer {0} failed: {1}")]
    SendFailed(String, String),
    #[error("upgrade response from {0} is missing required headers")]
    HeadersMissing(String),
    #[error("refusing to connect to our own advertised url {0}")]
    OwnAddress(String),
    #[error("duplicate connection to {0} lost the tiebreak")]
    Duplicate(String),
    #[error("endpoint is stopped")]
    Stopped,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Resend-strategy errors (§7 "Resend errors"). The resend loop logs these
/// and moves on to the next strategy; they never propagate to the requester
/// directly.
#[derive(Debug, Error)]
pub enum ResendError {
    #[error("resend strategy failed: {0}")]
    StrategyError(String),
    #[error("resend strategy timed out after {0:?} of inactivity")]
    StrategyTimeout(std::time::Duration),
}

/// Umbrella used only at the node/tracker engine layer, where an operation
/// may fail for transport or protocol reasons. §7's third error kind,
/// invariant violations (unknown peer id in the peer book, a tracker
/// instruction counter moving backwards), never arises from a correct
/// caller of this crate's own API and so has no constructor here — the
/// one place a counter could regress (`Node::on_instruction`) already
/// drops the stale instruction rather than raising, since that's an
/// expected race between two in-flight instructions, not a bug.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
