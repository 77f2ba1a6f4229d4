//! Wire frame unification. axum's server-side `Message` and
//! tokio-tungstenite's client-side `Message` are distinct types from
//! distinct crates; `Frame` is the one internal shape both connection
//! loops (`server.rs`, `client.rs`) translate to and from before handing
//! off to the shared connection actor in `connection.rs`.

use axum::extract::ws::Message as AxumMessage;
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;

#[derive(Debug, Clone)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<u16>, String),
}

impl Frame {
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(s) => s.len(),
            Frame::Binary(b) | Frame::Ping(b) | Frame::Pong(b) => b.len(),
            Frame::Close(_, reason) => reason.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Frame::Binary(b) => Some(b),
            Frame::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

impl From<Frame> for AxumMessage {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(s) => AxumMessage::Text(s.into()),
            Frame::Binary(b) => AxumMessage::Binary(b.into()),
            Frame::Ping(b) => AxumMessage::Ping(b.into()),
            Frame::Pong(b) => AxumMessage::Pong(b.into()),
            Frame::Close(code, reason) => AxumMessage::Close(Some(axum::extract::ws::CloseFrame {
                code: code.unwrap_or(1000),
                reason: reason.into(),
            })),
        }
    }
}

impl From<AxumMessage> for Frame {
    fn from(msg: AxumMessage) -> Self {
        match msg {
            AxumMessage::Text(s) => Frame::Text(s.to_string()),
            AxumMessage::Binary(b) => Frame::Binary(b.to_vec()),
            AxumMessage::Ping(b) => Frame::Ping(b.to_vec()),
            AxumMessage::Pong(b) => Frame::Pong(b.to_vec()),
            AxumMessage::Close(frame) => {
                let (code, reason) = frame
                    .map(|f| (Some(f.code), f.reason.to_string()))
                    .unwrap_or((None, String::new()));
                Frame::Close(code, reason)
            }
        }
    }
}

impl From<Frame> for TungsteniteMessage {
    fn from(frame: Frame) -> Self {
        use tokio_tungstenite::tungstenite::protocol::{frame::coding::CloseCode, CloseFrame};
        match frame {
            Frame::Text(s) => TungsteniteMessage::Text(s.into()),
            Frame::Binary(b) => TungsteniteMessage::Binary(b.into()),
            Frame::Ping(b) => TungsteniteMessage::Ping(b.into()),
            Frame::Pong(b) => TungsteniteMessage::Pong(b.into()),
            Frame::Close(code, reason) => TungsteniteMessage::Close(Some(CloseFrame {
                code: CloseCode::from(code.unwrap_or(1000)),
                reason: reason.into(),
            })),
        }
    }
}

impl From<TungsteniteMessage> for Frame {
    fn from(msg: TungsteniteMessage) -> Self {
        match msg {
            TungsteniteMessage::Text(s) => Frame::Text(s.to_string()),
            TungsteniteMessage::Binary(b) => Frame::Binary(b.to_vec()),
            TungsteniteMessage::Ping(b) => Frame::Ping(b.to_vec()),
            TungsteniteMessage::Pong(b) => Frame::Pong(b.to_vec()),
            TungsteniteMessage::Close(frame) => {
                let (code, reason) = frame
                    .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                    .unwrap_or((None, String::new()));
                Frame::Close(code, reason)
            }
            TungsteniteMessage::Frame(_) => Frame::Binary(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_frame_round_trips_through_both_concrete_message_types() {
        let frame = Frame::Text("hello".to_owned());
        let axum_msg: AxumMessage = frame.clone().into();
        assert!(matches!(Frame::from(axum_msg), Frame::Text(s) if s == "hello"));

        let tungstenite_msg: TungsteniteMessage = frame.into();
        assert!(matches!(Frame::from(tungstenite_msg), Frame::Text(s) if s == "hello"));
    }

    #[test]
    fn binary_payload_len_is_reported_for_backpressure_accounting() {
        let frame = Frame::Binary(vec![0u8; 42]);
        assert_eq!(frame.len(), 42);
        assert!(!frame.is_empty());
    }
}
