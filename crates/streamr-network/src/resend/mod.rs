//! Resend handler (C7, §4.7). Fulfils historical-message requests by
//! trying an ordered list of resend strategies, each producing a lazy
//! sequence of messages pulled in the background and forwarded to one
//! outbound sequence until a strategy proves satisfactory.

pub mod local_store;
pub mod router;
pub mod strategy;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use streamr_protocol::{ResendRequest, StreamMessage};
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, warn};

pub use router::ResendRouter;
pub use strategy::ResendStrategy;

const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

struct ResendContext {
    request: ResendRequest,
    started: Instant,
    stopped: Arc<AtomicBool>,
    resume_notify: Arc<Notify>,
}

type OngoingBySource = Arc<Mutex<HashMap<String, HashMap<String, ResendContext>>>>;

pub struct ResendHandler {
    strategies: Vec<Arc<dyn ResendStrategy>>,
    inactivity_timeout: Duration,
    ongoing: OngoingBySource,
}

/// A handle the caller uses to pause/resume/cancel one in-flight resend
/// (§4.7 "Pause/resume/cancel").
#[derive(Clone)]
pub struct ResendControl {
    stopped: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    resume_notify: Arc<Notify>,
}

impl ResendControl {
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_waiters();
    }

    pub fn cancel(&self) {
        self.stopped.store(true, Ordering::Release);
        self.resume_notify.notify_waiters();
    }
}

impl ResendHandler {
    pub fn new(strategies: Vec<Arc<dyn ResendStrategy>>) -> Self {
        Self {
            strategies,
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            ongoing: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    /// `handleRequest(request, source)` (§4.7). Returns the outbound lazy
    /// sequence (a receiver) and a control handle for pause/resume/cancel.
    /// The context is dropped from bookkeeping automatically once the
    /// strategy chain finishes or is cancelled.
    pub async fn handle_request(
        &self,
        request: ResendRequest,
        source: String,
    ) -> (mpsc::Receiver<StreamMessage>, ResendControl) {
        let (tx, rx) = mpsc::channel(64);
        let stopped = Arc::new(AtomicBool::new(false));
        let paused = Arc::new(AtomicBool::new(false));
        let resume_notify = Arc::new(Notify::new());

        let control = ResendControl {
            stopped: stopped.clone(),
            paused: paused.clone(),
            resume_notify: resume_notify.clone(),
        };

        let request_id = request.request_id().to_owned();
        {
            let mut ongoing = self.ongoing.lock().await;
            ongoing.entry(source.clone()).or_default().insert(
                request_id.clone(),
                ResendContext {
                    request: request.clone(),
                    started: Instant::now(),
                    stopped: stopped.clone(),
                    resume_notify: resume_notify.clone(),
                },
            );
        }

        let strategies = self.strategies.clone();
        let inactivity_timeout = self.inactivity_timeout;
        let ongoing = self.ongoing.clone();

        tokio::spawn(async move {
            run_strategy_chain(
                strategies,
                request,
                tx,
                stopped,
                paused,
                resume_notify,
                inactivity_timeout,
            )
            .await;
            forget(&ongoing, &source, &request_id).await;
        });

        (rx, control)
    }

    /// Cancelling by source id cancels every outstanding context for that
    /// source and returns their original requests (§4.7), so the caller
    /// can re-inform the requester when a peer disconnects mid-resend.
    pub async fn cancel_by_source(&self, source: &str) -> Vec<ResendRequest> {
        let mut ongoing = self.ongoing.lock().await;
        match ongoing.remove(source) {
            Some(contexts) => contexts
                .into_values()
                .map(|ctx| {
                    ctx.stopped.store(true, Ordering::Release);
                    ctx.resume_notify.notify_waiters();
                    ctx.request
                })
                .collect(),
            None => Vec::new(),
        }
    }

    pub async fn num_ongoing_resends(&self) -> usize {
        self.ongoing.lock().await.values().map(HashMap::len).sum()
    }

    pub async fn mean_age(&self) -> Option<Duration> {
        let ongoing = self.ongoing.lock().await;
        let ages: Vec<Duration> = ongoing
            .values()
            .flat_map(|m| m.values())
            .map(|ctx| ctx.started.elapsed())
            .collect();
        if ages.is_empty() {
            return None;
        }
        let total: Duration = ages.iter().sum();
        Some(total / ages.len() as u32)
    }
}

async fn forget(ongoing: &OngoingBySource, source: &str, request_id: &str) {
    let mut ongoing = ongoing.lock().await;
    if let Some(by_request) = ongoing.get_mut(source) {
        by_request.remove(request_id);
        if by_request.is_empty() {
            ongoing.remove(source);
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_strategy_chain(
    strategies: Vec<Arc<dyn ResendStrategy>>,
    request: ResendRequest,
    tx: mpsc::Sender<StreamMessage>,
    stopped: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    resume_notify: Arc<Notify>,
    inactivity_timeout: Duration,
) {
    for strategy in &strategies {
        if stopped.load(Ordering::Acquire) {
            return;
        }
        let mut strategy_rx = match strategy.fetch(&request).await {
            Ok(rx) => rx,
            Err(err) => {
                warn!(strategy = strategy.name(), %err, "resend strategy errored, trying next");
                continue;
            }
        };

        let mut satisfactory = false;
        loop {
            if stopped.load(Ordering::Acquire) {
                return;
            }
            if paused.load(Ordering::Acquire) {
                resume_notify.notified().await;
                continue;
            }
            match tokio::time::timeout(inactivity_timeout, strategy_rx.recv()).await {
                Ok(Some(message)) => {
                    satisfactory = true;
                    if tx.send(message).await.is_err() {
                        return; // requester went away
                    }
                }
                Ok(None) => break, // strategy's sequence closed
                Err(_) => {
                    warn!(
                        strategy = strategy.name(),
                        timeout = ?inactivity_timeout,
                        "resend strategy timed out"
                    );
                    break;
                }
            }
        }

        if satisfactory {
            debug!(strategy = strategy.name(), "resend strategy satisfied the request");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resend::strategy::test_support::{FailingStrategy, FixedStrategy};
    use streamr_protocol::{MessageId, ResendLastRequest, StreamKey};

    fn sample_message(seq: u64) -> StreamMessage {
        StreamMessage {
            message_id: MessageId::new("s", 0, 1, seq, "pub", "chain"),
            prev_msg_ref: None,
            content: vec![],
            signature: None,
        }
    }

    fn sample_request() -> ResendRequest {
        ResendRequest::Last(ResendLastRequest {
            request_id: "req-1".to_owned(),
            stream_key: StreamKey::new("s", 0),
            number_of_last: 10,
        })
    }

    #[tokio::test]
    async fn falls_through_to_the_next_strategy_when_the_first_is_unsatisfactory() {
        let handler = ResendHandler::new(vec![
            Arc::new(FailingStrategy),
            Arc::new(FixedStrategy::new(vec![sample_message(1), sample_message(2)])),
        ]);
        let (mut rx, _control) = handler.handle_request(sample_request(), "source-a".to_owned()).await;
        let mut received = Vec::new();
        while let Some(msg) = rx.recv().await {
            received.push(msg);
        }
        assert_eq!(received.len(), 2);
    }

    #[tokio::test]
    async fn stops_at_the_first_satisfactory_strategy() {
        let handler = ResendHandler::new(vec![
            Arc::new(FixedStrategy::new(vec![sample_message(1)])),
            Arc::new(FixedStrategy::new(vec![sample_message(99)])),
        ]);
        let (mut rx, _control) = handler.handle_request(sample_request(), "source-a".to_owned()).await;
        let first = rx.recv().await.unwrap();
        assert_eq!(first.message_id.msg_ref.sequence_number, 1);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn cancel_by_source_returns_original_requests() {
        let handler = ResendHandler::new(vec![Arc::new(FixedStrategy::new(vec![sample_message(1)]))]);
        let (_rx, control) = handler
            .handle_request(sample_request(), "source-a".to_owned())
            .await;
        let returned = handler.cancel_by_source("source-a").await;
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].request_id(), "req-1");
        control.cancel();
    }
}
