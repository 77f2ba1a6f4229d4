//! Close-code/reason table (§6). Reasons are plain strings on the wire —
//! tracked here as constants so call sites and tests don't restate them.

pub const NORMAL: u16 = 1000;
pub const PROTOCOL_ERROR: u16 = 1002;

pub const GRACEFUL_SHUTDOWN: &str = "streamr:node:graceful-shutdown";
pub const NO_SHARED_STREAMS: &str = "streamr:node:no-shared-streams";
pub const DUPLICATE_SOCKET: &str = "streamr:endpoint:duplicate-connection";
pub const MISSING_REQUIRED_PARAMETER: &str = "streamr:node:missing-required-parameter";
pub const DEAD_CONNECTION: &str = "streamr:endpoint:dead-connection";

/// Reason a live connection was (or is about to be) closed, paired with its
/// wire code/reason-string per the §6 table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    GracefulShutdown,
    NoSharedStreams,
    DuplicateSocket,
    MissingRequiredParameter,
    DeadConnection,
}

impl DisconnectReason {
    pub fn code(self) -> u16 {
        match self {
            DisconnectReason::GracefulShutdown | DisconnectReason::NoSharedStreams => NORMAL,
            DisconnectReason::DuplicateSocket
            | DisconnectReason::MissingRequiredParameter
            | DisconnectReason::DeadConnection => PROTOCOL_ERROR,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            DisconnectReason::GracefulShutdown => GRACEFUL_SHUTDOWN,
            DisconnectReason::NoSharedStreams => NO_SHARED_STREAMS,
            DisconnectReason::DuplicateSocket => DUPLICATE_SOCKET,
            DisconnectReason::MissingRequiredParameter => MISSING_REQUIRED_PARAMETER,
            DisconnectReason::DeadConnection => DEAD_CONNECTION,
        }
    }

    /// A close received with this reason string is self-inflicted noise
    /// (the winning socket of a duplicate tiebreak is already live) and
    /// should not be surfaced as a `PEER_DISCONNECTED` failure.
    pub fn is_silently_ignored_on_receipt(reason_str: &str) -> bool {
        reason_str == DUPLICATE_SOCKET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_external_interface_table() {
        assert_eq!(DisconnectReason::GracefulShutdown.code(), 1000);
        assert_eq!(DisconnectReason::NoSharedStreams.code(), 1000);
        assert_eq!(DisconnectReason::DuplicateSocket.code(), 1002);
        assert_eq!(DisconnectReason::MissingRequiredParameter.code(), 1002);
        assert_eq!(DisconnectReason::DeadConnection.code(), 1002);
    }

    #[test]
    fn duplicate_socket_close_is_the_only_one_silently_ignored() {
        assert!(DisconnectReason::is_silently_ignored_on_receipt(
            DUPLICATE_SOCKET
        ));
        assert!(!DisconnectReason::is_silently_ignored_on_receipt(
            DEAD_CONNECTION
        ));
    }
}
