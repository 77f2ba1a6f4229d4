//! Connection actor shared by the server (`server.rs`, axum-accepted
//! sockets) and client (`client.rs`, tokio-tungstenite-dialed sockets)
//! halves of the endpoint. Both concrete transports implement
//! `futures_util::{Sink, Stream}` over their own message type, so the
//! reader/writer loops here are generic over that pair and the
//! back-pressure/liveness bookkeeping is written once.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use streamr_protocol::PeerInfo;
use tokio::sync::{broadcast, mpsc};

use super::backpressure::{BackPressureEdge, BackPressureTracker};
use super::duplicate::ConnDirection;
use super::frame::Frame;
use super::liveness::{LivenessAction, LivenessTracker};
use crate::close_codes::DisconnectReason;
use crate::events::EndpointEvent;

#[derive(Debug)]
pub enum WriterCommand {
    Send(Frame),
    Close(DisconnectReason),
}

/// Handle to a live connection, held by `EndpointInner`'s connection map.
/// Cloning shares the same underlying connection; only the endpoint itself
/// holds the canonical clone used for bookkeeping.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub peer: PeerInfo,
    pub address: String,
    pub direction: ConnDirection,
    writer_tx: mpsc::UnboundedSender<WriterCommand>,
    backpressure: Arc<StdMutex<BackPressureTracker>>,
    liveness: Arc<StdMutex<LivenessTracker>>,
    closed: Arc<AtomicBool>,
    events_tx: broadcast::Sender<EndpointEvent>,
}

impl ConnectionHandle {
    pub fn send(&self, frame: Frame) -> Result<(), crate::error::EndpointError> {
        if self.closed.load(AtomicOrdering::Acquire) {
            return Err(crate::error::EndpointError::NotConnected(
                self.peer.peer_id.clone(),
            ));
        }
        let n = frame.len();
        self.writer_tx
            .send(WriterCommand::Send(frame))
            .map_err(|_| crate::error::EndpointError::SendFailed(
                self.peer.peer_id.clone(),
                "connection writer task is gone".to_owned(),
            ))?;
        if let Some(edge) = self.backpressure.lock().unwrap().on_enqueue(n) {
            emit_backpressure_edge(&self.events_tx, &self.peer, edge);
        }
        Ok(())
    }

    pub fn close(&self, reason: DisconnectReason) {
        let _ = self.writer_tx.send(WriterCommand::Close(reason));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(AtomicOrdering::Acquire)
    }

    pub fn buffered_bytes(&self) -> usize {
        self.backpressure.lock().unwrap().buffered()
    }

    pub fn rtt(&self) -> Option<Duration> {
        self.liveness.lock().unwrap().rtt()
    }
}

/// Everything needed to drive one connection's reader loop, writer loop,
/// and liveness timer. Returned by `spawn_connection` so the caller (the
/// endpoint) can register the handle and await task completion if needed.
pub struct SpawnedConnection {
    pub handle: ConnectionHandle,
    pub reader_task: tokio::task::JoinHandle<()>,
    pub writer_task: tokio::task::JoinHandle<()>,
    pub liveness_task: tokio::task::JoinHandle<()>,
}

/// Drives one connection given a split sink/stream pair already converted
/// to/from `Frame`. `server.rs` and `client.rs` each supply their concrete
/// axum/tungstenite halves wrapped to satisfy these bounds.
#[allow(clippy::too_many_arguments)]
pub fn spawn_connection<Sk, St>(
    peer: PeerInfo,
    address: String,
    direction: ConnDirection,
    mut sink: Sk,
    mut stream: St,
    ping_interval: Duration,
    events_tx: broadcast::Sender<EndpointEvent>,
) -> SpawnedConnection
where
    Sk: Sink<Frame, Error = crate::error::EndpointError> + Unpin + Send + 'static,
    St: Stream<Item = Result<Frame, crate::error::EndpointError>> + Unpin + Send + 'static,
{
    let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<WriterCommand>();
    let backpressure = Arc::new(StdMutex::new(BackPressureTracker::new()));
    let liveness = Arc::new(StdMutex::new(LivenessTracker::new()));
    let closed = Arc::new(AtomicBool::new(false));

    let handle = ConnectionHandle {
        peer: peer.clone(),
        address: address.clone(),
        direction,
        writer_tx: writer_tx.clone(),
        backpressure: backpressure.clone(),
        liveness: liveness.clone(),
        closed: closed.clone(),
        events_tx: events_tx.clone(),
    };

    let writer_task = {
        let peer = peer.clone();
        let backpressure = backpressure.clone();
        let closed = closed.clone();
        let events_tx = events_tx.clone();
        tokio::spawn(async move {
            while let Some(cmd) = writer_rx.recv().await {
                match cmd {
                    WriterCommand::Send(frame) => {
                        let n = frame.len();
                        if sink.send(frame).await.is_err() {
                            closed.store(true, AtomicOrdering::Release);
                            break;
                        }
                        if let Some(edge) = backpressure.lock().unwrap().on_drain(n) {
                            emit_backpressure_edge(&events_tx, &peer, edge);
                        }
                    }
                    WriterCommand::Close(reason) => {
                        let _ = sink
                            .send(Frame::Close(Some(reason.code()), reason.reason().to_owned()))
                            .await;
                        closed.store(true, AtomicOrdering::Release);
                        break;
                    }
                }
            }
            let _ = sink.close().await;
        })
    };

    let reader_task = {
        let peer = peer.clone();
        let closed = closed.clone();
        let events_tx = events_tx.clone();
        let writer_tx = writer_tx.clone();
        tokio::spawn(async move {
            let mut disconnect_reason = DisconnectReason::DeadConnection;
            while let Some(item) = stream.next().await {
                match item {
                    Ok(Frame::Binary(bytes)) => {
                        let _ = events_tx.send(EndpointEvent::MessageReceived(peer.clone(), bytes));
                    }
                    Ok(Frame::Text(text)) => {
                        let _ =
                            events_tx.send(EndpointEvent::MessageReceived(peer.clone(), text.into_bytes()));
                    }
                    Ok(Frame::Pong(_)) => {
                        liveness.lock().unwrap().on_pong(std::time::Instant::now());
                    }
                    Ok(Frame::Ping(payload)) => {
                        let _ = writer_tx.send(WriterCommand::Send(Frame::Pong(payload)));
                    }
                    Ok(Frame::Close(_, reason)) => {
                        if !DisconnectReason::is_silently_ignored_on_receipt(&reason) {
                            disconnect_reason = DisconnectReason::GracefulShutdown;
                        }
                        break;
                    }
                    Err(_) => break,
                }
            }
            closed.store(true, AtomicOrdering::Release);
            let _ = events_tx.send(EndpointEvent::PeerDisconnected(peer, disconnect_reason));
        })
    };

    let liveness_task = {
        let peer = peer.clone();
        let closed = closed.clone();
        let liveness = liveness.clone();
        let writer_tx = writer_tx.clone();
        let events_tx = events_tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(ping_interval);
            interval.tick().await; // first tick fires immediately; skip it
            loop {
                interval.tick().await;
                if closed.load(AtomicOrdering::Acquire) {
                    break;
                }
                let action = liveness.lock().unwrap().on_tick(std::time::Instant::now());
                match action {
                    LivenessAction::SendPing => {
                        if writer_tx.send(WriterCommand::Send(Frame::Ping(Vec::new()))).is_err() {
                            break;
                        }
                    }
                    LivenessAction::Terminate => {
                        closed.store(true, AtomicOrdering::Release);
                        let _ = writer_tx.send(WriterCommand::Close(DisconnectReason::DeadConnection));
                        let _ = events_tx
                            .send(EndpointEvent::PeerDisconnected(peer, DisconnectReason::DeadConnection));
                        break;
                    }
                }
            }
        })
    };

    SpawnedConnection {
        handle,
        reader_task,
        writer_task,
        liveness_task,
    }
}

fn emit_backpressure_edge(
    events_tx: &broadcast::Sender<EndpointEvent>,
    peer: &PeerInfo,
    edge: BackPressureEdge,
) {
    let event = match edge {
        BackPressureEdge::WentHigh => EndpointEvent::HighBackPressure(peer.clone()),
        BackPressureEdge::WentLow => EndpointEvent::LowBackPressure(peer.clone()),
    };
    let _ = events_tx.send(event);
}
