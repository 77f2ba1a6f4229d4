//! Peer identity (C1).
//!
//! A `PeerInfo` is an opaque peer identifier paired with a type drawn from a
//! closed set. Equality is by identifier alone — two `PeerInfo` values with
//! the same id but different recorded types are still "the same peer" as far
//! as maps keyed by id are concerned, but constructing one is always
//! validated against the closed set first.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of peer roles. `storage` is a node that also answers
/// resend requests; `unknown` covers peers whose role has not been
/// established yet (e.g. mid-handshake).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerType {
    Node,
    Storage,
    Tracker,
    Unknown,
}

impl PeerType {
    const ALL: [PeerType; 4] = [
        PeerType::Node,
        PeerType::Storage,
        PeerType::Tracker,
        PeerType::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PeerType::Node => "node",
            PeerType::Storage => "storage",
            PeerType::Tracker => "tracker",
            PeerType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PeerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a peer-type string falls outside `{node, storage,
/// tracker, unknown}`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unrecognised peer type {0:?}, expected one of node/storage/tracker/unknown")]
pub struct InvalidPeerType(pub String);

impl std::str::FromStr for PeerType {
    type Err = InvalidPeerType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PeerType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| InvalidPeerType(s.to_owned()))
    }
}

/// Peer identity: an opaque id plus a role. Equality and hashing are by id
/// only, mirroring the source's "identifier is the key" contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub peer_id: String,
    pub peer_type: PeerType,
}

impl PeerInfo {
    pub fn new(peer_id: impl Into<String>, peer_type: PeerType) -> Self {
        Self {
            peer_id: peer_id.into(),
            peer_type,
        }
    }

    pub fn node(peer_id: impl Into<String>) -> Self {
        Self::new(peer_id, PeerType::Node)
    }

    pub fn storage(peer_id: impl Into<String>) -> Self {
        Self::new(peer_id, PeerType::Storage)
    }

    pub fn tracker(peer_id: impl Into<String>) -> Self {
        Self::new(peer_id, PeerType::Tracker)
    }

    /// `storage` counts as a node: both forward and accept stream traffic.
    pub fn is_node(&self) -> bool {
        matches!(self.peer_type, PeerType::Node | PeerType::Storage)
    }

    pub fn is_storage(&self) -> bool {
        matches!(self.peer_type, PeerType::Storage)
    }

    pub fn is_tracker(&self) -> bool {
        matches!(self.peer_type, PeerType::Tracker)
    }
}

impl PartialEq for PeerInfo {
    fn eq(&self, other: &Self) -> bool {
        self.peer_id == other.peer_id
    }
}
impl Eq for PeerInfo {}

impl std::hash::Hash for PeerInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.peer_id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_type_parses_closed_set_case_insensitively() {
        assert_eq!("Node".parse::<PeerType>().unwrap(), PeerType::Node);
        assert_eq!("STORAGE".parse::<PeerType>().unwrap(), PeerType::Storage);
        assert!("relay".parse::<PeerType>().is_err());
    }

    #[test]
    fn storage_is_a_node_but_not_vice_versa() {
        let storage = PeerInfo::storage("s-1");
        assert!(storage.is_node());
        assert!(storage.is_storage());

        let node = PeerInfo::node("n-1");
        assert!(node.is_node());
        assert!(!node.is_storage());
    }

    #[test]
    fn equality_and_hashing_are_by_id_only() {
        let a = PeerInfo::new("peer-1", PeerType::Node);
        let b = PeerInfo::new("peer-1", PeerType::Tracker);
        assert_eq!(a, b);

        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }
}
