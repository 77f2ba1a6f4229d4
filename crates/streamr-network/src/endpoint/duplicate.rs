//! Duplicate-socket tiebreak (§4.2 "Duplicate-socket tiebreaker", §8
//! boundary test). Pure decision function, independent of real sockets, so
//! the tiebreak can be exercised without spinning up a transport.
//!
//! Resolution of the spec's one open ambiguity (own URL == remote URL):
//! treated as [`crate::error::EndpointError::OwnAddress`] rather than an
//! arbitrary tiebreak, since connecting to oneself is already a distinct
//! rejected case in §4.2 ("Connecting to one's own advertised URL fails
//! with OwnAddress"). See DESIGN.md.

use std::cmp::Ordering;

use crate::error::EndpointError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateDecision {
    KeepExisting,
    ReplaceWithNew,
}

/// Decide which of two simultaneous connections to the same peer survives.
///
/// The surviving connection is always the one dialed *by* the
/// lexicographically greater-URL peer: that peer keeps (or adopts) its
/// outbound leg, and the lesser-URL peer keeps (or adopts) the matching
/// inbound leg — the same physical socket, viewed from either side. This
/// makes the outcome agree regardless of which side observes the race
/// first, which a pure "newest wins" rule would not guarantee.
pub fn resolve_duplicate(
    own_url: &str,
    remote_url: &str,
    existing_direction: ConnDirection,
    new_direction: ConnDirection,
) -> Result<DuplicateDecision, EndpointError> {
    match own_url.cmp(remote_url) {
        Ordering::Equal => Err(EndpointError::OwnAddress(own_url.to_owned())),
        Ordering::Greater => {
            // We are the greater-URL peer: our outbound leg always wins.
            if new_direction == ConnDirection::Outbound
                && existing_direction == ConnDirection::Inbound
            {
                Ok(DuplicateDecision::ReplaceWithNew)
            } else {
                Ok(DuplicateDecision::KeepExisting)
            }
        }
        Ordering::Less => {
            // We are the lesser-URL peer: the remote's inbound leg always wins.
            if new_direction == ConnDirection::Inbound
                && existing_direction == ConnDirection::Outbound
            {
                Ok(DuplicateDecision::ReplaceWithNew)
            } else {
                Ok(DuplicateDecision::KeepExisting)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connecting_to_own_advertised_url_is_rejected() {
        let err = resolve_duplicate(
            "ws://same:1",
            "ws://same:1",
            ConnDirection::Outbound,
            ConnDirection::Outbound,
        )
        .unwrap_err();
        assert!(matches!(err, EndpointError::OwnAddress(_)));
    }

    #[test]
    fn greater_url_peer_keeps_its_own_outbound_leg() {
        // q ("ws://z") already has an inbound connection from p ("ws://a"),
        // then dials p itself: its own new outbound leg should win.
        let decision = resolve_duplicate(
            "ws://z",
            "ws://a",
            ConnDirection::Inbound,
            ConnDirection::Outbound,
        )
        .unwrap();
        assert_eq!(decision, DuplicateDecision::ReplaceWithNew);
    }

    #[test]
    fn lesser_url_peer_yields_to_an_inbound_connection_from_the_greater_peer() {
        // p ("ws://a") has its own outbound dial to q ("ws://z") established,
        // then q's dial arrives inbound: the inbound leg should win.
        let decision = resolve_duplicate(
            "ws://a",
            "ws://z",
            ConnDirection::Outbound,
            ConnDirection::Inbound,
        )
        .unwrap();
        assert_eq!(decision, DuplicateDecision::ReplaceWithNew);
    }

    #[test]
    fn simultaneous_dial_boundary_case_the_socket_opened_by_the_greater_peer_survives() {
        // Per §8: p.url < q.url, both dial simultaneously -> the socket
        // opened by q survives. From q's side that's its own outbound leg
        // racing an inbound leg from p; q keeps outbound.
        let q_decision = resolve_duplicate(
            "ws://q-greater",
            "ws://p-lesser",
            ConnDirection::Inbound,
            ConnDirection::Outbound,
        )
        .unwrap();
        assert_eq!(q_decision, DuplicateDecision::ReplaceWithNew);

        // From p's side that's its own outbound leg racing an inbound leg
        // from q; p yields to the inbound leg (the very socket q kept).
        let p_decision = resolve_duplicate(
            "ws://p-lesser",
            "ws://q-greater",
            ConnDirection::Outbound,
            ConnDirection::Inbound,
        )
        .unwrap();
        assert_eq!(p_decision, DuplicateDecision::ReplaceWithNew);
    }
}
