//! Ping-based liveness (§4.2 "Liveness", §8 "after 2 x pingInterval with no
//! pong"). Pure tick/pong state machine; the real timer and ping/pong frame
//! I/O live in `connection.rs`.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessAction {
    SendPing,
    Terminate,
}

#[derive(Debug)]
pub struct LivenessTracker {
    pong_received: bool,
    rtt_start: Option<Instant>,
    rtt: Option<Duration>,
}

impl Default for LivenessTracker {
    fn default() -> Self {
        // A fresh connection hasn't missed a pong yet.
        Self {
            pong_received: true,
            rtt_start: None,
            rtt: None,
        }
    }
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rtt(&self) -> Option<Duration> {
        self.rtt
    }

    /// Call when the `pingInterval` timer fires for this connection.
    /// If the previous ping went unanswered, the connection is dead.
    pub fn on_tick(&mut self, now: Instant) -> LivenessAction {
        if !self.pong_received {
            return LivenessAction::Terminate;
        }
        self.pong_received = false;
        self.rtt_start = Some(now);
        LivenessAction::SendPing
    }

    pub fn on_pong(&mut self, now: Instant) {
        self.pong_received = true;
        if let Some(start) = self.rtt_start.take() {
            self.rtt = Some(now.saturating_duration_since(start));
        }
    }
}
