//! Queryable runtime counters (C8, §4.7/§8: "numOfOngoingResends",
//! "meanAge" and friends). Plain serializable snapshots rather than a
//! dynamic metrics-registry abstraction — each service binary exposes these
//! over its own status/admin HTTP surface.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct NodeMetrics {
    pub connected_peer_count: usize,
    pub subscribed_stream_count: usize,
    pub num_ongoing_resends: usize,
    pub mean_resend_age_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackerMetrics {
    pub connected_peer_count: usize,
    pub overlay_count: usize,
}
