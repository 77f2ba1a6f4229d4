//! Peer book (C1, §3 "Peer book"): the bidirectional peer-id <-> advertised
//! address map. Each direction is a function — ids and addresses are both
//! unique — so lookups are `O(1)` both ways and a malformed insert (an id or
//! address already bound elsewhere) is rejected rather than silently
//! overwriting the other binding.

use std::collections::HashMap;

use streamr_protocol::PeerInfo;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeerBookError {
    #[error("no peer book entry for peer id {0}")]
    UnknownPeerId(String),
    #[error("no peer book entry for address {0}")]
    UnknownAddress(String),
    #[error("peer id {0} is already bound to a different address")]
    PeerIdConflict(String),
    #[error("address {0} is already bound to a different peer id")]
    AddressConflict(String),
}

#[derive(Debug, Default)]
pub struct PeerBook {
    by_id: HashMap<String, (PeerInfo, String)>,
    by_address: HashMap<String, String>,
}

impl PeerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, peer: PeerInfo, address: String) -> Result<(), PeerBookError> {
        if let Some((existing, existing_addr)) = self.by_id.get(&peer.peer_id) {
            if existing_addr != &address || existing.peer_type != peer.peer_type {
                return Err(PeerBookError::PeerIdConflict(peer.peer_id.clone()));
            }
        }
        if let Some(existing_id) = self.by_address.get(&address) {
            if existing_id != &peer.peer_id {
                return Err(PeerBookError::AddressConflict(address));
            }
        }
        self.by_address.insert(address.clone(), peer.peer_id.clone());
        self.by_id.insert(peer.peer_id.clone(), (peer, address));
        Ok(())
    }

    pub fn remove_by_id(&mut self, peer_id: &str) -> Option<(PeerInfo, String)> {
        let entry = self.by_id.remove(peer_id)?;
        self.by_address.remove(&entry.1);
        Some(entry)
    }

    pub fn peer_info(&self, peer_id: &str) -> Result<&PeerInfo, PeerBookError> {
        self.by_id
            .get(peer_id)
            .map(|(info, _)| info)
            .ok_or_else(|| PeerBookError::UnknownPeerId(peer_id.to_owned()))
    }

    pub fn address_of(&self, peer_id: &str) -> Result<&str, PeerBookError> {
        self.by_id
            .get(peer_id)
            .map(|(_, addr)| addr.as_str())
            .ok_or_else(|| PeerBookError::UnknownPeerId(peer_id.to_owned()))
    }

    pub fn peer_id_of(&self, address: &str) -> Result<&str, PeerBookError> {
        self.by_address
            .get(address)
            .map(String::as_str)
            .ok_or_else(|| PeerBookError::UnknownAddress(address.to_owned()))
    }

    pub fn contains(&self, peer_id: &str) -> bool {
        self.by_id.contains_key(peer_id)
    }

    pub fn connected_to_address(&self, address: &str) -> bool {
        self.by_address.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PeerInfo, &str)> {
        self.by_id.values().map(|(info, addr)| (info, addr.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamr_protocol::PeerType;

    #[test]
    fn looks_up_both_directions() {
        let mut book = PeerBook::new();
        book.insert(PeerInfo::node("peer-a"), "ws://a:1".to_owned())
            .unwrap();
        assert_eq!(book.address_of("peer-a").unwrap(), "ws://a:1");
        assert_eq!(book.peer_id_of("ws://a:1").unwrap(), "peer-a");
        assert_eq!(book.peer_info("peer-a").unwrap().peer_type, PeerType::Node);
    }

    #[test]
    fn missing_entries_fail_explicitly() {
        let book = PeerBook::new();
        assert_eq!(
            book.address_of("ghost").unwrap_err(),
            PeerBookError::UnknownPeerId("ghost".to_owned())
        );
        assert_eq!(
            book.peer_id_of("ws://ghost").unwrap_err(),
            PeerBookError::UnknownAddress("ws://ghost".to_owned())
        );
    }

    #[test]
    fn rejects_conflicting_rebind() {
        let mut book = PeerBook::new();
        book.insert(PeerInfo::node("peer-a"), "ws://a:1".to_owned())
            .unwrap();
        assert_eq!(
            book.insert(PeerInfo::node("peer-a"), "ws://a:2".to_owned())
                .unwrap_err(),
            PeerBookError::PeerIdConflict("peer-a".to_owned())
        );
        assert_eq!(
            book.insert(PeerInfo::node("peer-b"), "ws://a:1".to_owned())
                .unwrap_err(),
            PeerBookError::AddressConflict("ws://a:1".to_owned())
        );
    }

    #[test]
    fn remove_clears_both_directions() {
        let mut book = PeerBook::new();
        book.insert(PeerInfo::node("peer-a"), "ws://a:1".to_owned())
            .unwrap();
        book.remove_by_id("peer-a");
        assert!(book.address_of("peer-a").is_err());
        assert!(book.peer_id_of("ws://a:1").is_err());
        assert!(book.is_empty());
    }
}
