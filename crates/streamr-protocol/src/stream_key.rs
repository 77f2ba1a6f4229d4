//! Stream keys (§3) — `(streamId, partition)` pairs with a canonical
//! `"<streamId>::<partition>"` textual form used as a map key and in
//! log/event payloads.

use serde::de::{Error as DeError, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Serialized as its canonical `"<streamId>::<partition>"` text form rather
/// than as a nested object, so it can be used directly as a JSON map key
/// (`HashMap<StreamKey, _>` in [`crate::tracker_message::NodeStatus`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamKey {
    pub stream_id: String,
    pub partition: u32,
}

impl StreamKey {
    pub fn new(stream_id: impl Into<String>, partition: u32) -> Self {
        Self {
            stream_id: stream_id.into(),
            partition,
        }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.stream_id, self.partition)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed stream key {0:?}, expected \"<streamId>::<partition>\"")]
pub struct StreamKeyParseError(pub String);

impl FromStr for StreamKey {
    type Err = StreamKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stream_id, partition) = s
            .rsplit_once("::")
            .ok_or_else(|| StreamKeyParseError(s.to_owned()))?;
        let partition = partition
            .parse::<u32>()
            .map_err(|_| StreamKeyParseError(s.to_owned()))?;
        if stream_id.is_empty() {
            return Err(StreamKeyParseError(s.to_owned()));
        }
        Ok(StreamKey::new(stream_id, partition))
    }
}

impl Serialize for StreamKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct StreamKeyVisitor;

impl Visitor<'_> for StreamKeyVisitor {
    type Value = StreamKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string of the form \"<streamId>::<partition>\"")
    }

    fn visit_str<E: DeError>(self, v: &str) -> Result<Self::Value, E> {
        v.parse::<StreamKey>().map_err(DeError::custom)
    }
}

impl<'de> Deserialize<'de> for StreamKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(StreamKeyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_canonical_text_form() {
        let key = StreamKey::new("stream-1", 0);
        assert_eq!(key.to_string(), "stream-1::0");
        assert_eq!(key.to_string().parse::<StreamKey>().unwrap(), key);
    }

    #[test]
    fn rejects_malformed_text() {
        assert!("no-separator".parse::<StreamKey>().is_err());
        assert!("stream::not-a-number".parse::<StreamKey>().is_err());
        assert!("::0".parse::<StreamKey>().is_err());
    }

    #[test]
    fn stream_id_may_itself_contain_colons() {
        let key = StreamKey::new("a::b", 3);
        assert_eq!(key.to_string(), "a::b::3");
        assert_eq!(key.to_string().parse::<StreamKey>().unwrap(), key);
    }

    #[test]
    fn serializes_as_a_plain_json_string_usable_as_a_map_key() {
        let key = StreamKey::new("stream-1", 2);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"stream-1::2\"");
        let back: StreamKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
