//! Network-layer configuration loading (§6 "Configuration (recognised
//! options)"). TOML is the sole config source: every field is `Option` on
//! the wire, defaults are applied while validating, and a missing required
//! field produces a typed [`ConfigError`] rather than a panic.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use streamr_protocol::{InvalidPeerType, PeerType};

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
    pub id: String,
    pub peer_type: PeerType,
    pub trackers: Vec<String>,
    pub advertised_ws_url: String,
    pub ping_interval: Duration,
    pub max_neighbours: usize,
    pub max_inactivity_period: Duration,
    pub disconnection_wait_time: Duration,
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub key_path: String,
    pub cert_path: String,
}

// ---------------------------------------------------------------------------
// Raw TOML deserialization types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawConfig {
    host: Option<String>,
    port: Option<u16>,
    id: Option<String>,
    peer_type: Option<String>,
    trackers: Option<Vec<String>>,
    advertised_ws_url: Option<String>,
    ping_interval: Option<u64>,
    max_neighbours: Option<usize>,
    max_inactivity_period_in_ms: Option<u64>,
    disconnection_wait_time: Option<u64>,
    tls: Option<RawTlsConfig>,
}

#[derive(Debug, Deserialize)]
struct RawTlsConfig {
    key_path: Option<String>,
    cert_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn load_config_from_path(path: &Path) -> Result<NetworkConfig, ConfigError> {
    let toml_str = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("reading config file '{}': {}", path.display(), e)))?;
    load_config_from_str(&toml_str)
}

pub fn load_config_from_str(toml_str: &str) -> Result<NetworkConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let host = raw.host.ok_or_else(|| ConfigError::MissingField("host".to_owned()))?;
    let port = raw.port.ok_or_else(|| ConfigError::MissingField("port".to_owned()))?;
    let id = raw.id.ok_or_else(|| ConfigError::MissingField("id".to_owned()))?;

    let peer_type = match raw.peer_type.as_deref() {
        Some(s) => s
            .parse::<PeerType>()
            .map_err(|InvalidPeerType(bad)| ConfigError::InvalidValue(format!("peer_type '{bad}'"))),
        None => Ok(PeerType::Node),
    }?;

    let advertised_ws_url = raw
        .advertised_ws_url
        .ok_or_else(|| ConfigError::MissingField("advertised_ws_url".to_owned()))?;

    let ping_interval = Duration::from_millis(raw.ping_interval.unwrap_or(5_000));
    let max_neighbours = raw.max_neighbours.unwrap_or(4);
    let max_inactivity_period = Duration::from_millis(raw.max_inactivity_period_in_ms.unwrap_or(300_000));
    let disconnection_wait_time = Duration::from_millis(raw.disconnection_wait_time.unwrap_or(30_000));

    let tls = match raw.tls {
        Some(t) => {
            let key_path = t
                .key_path
                .ok_or_else(|| ConfigError::MissingField("tls.key_path".to_owned()))?;
            let cert_path = t
                .cert_path
                .ok_or_else(|| ConfigError::MissingField("tls.cert_path".to_owned()))?;
            Some(TlsConfig { key_path, cert_path })
        }
        None => None,
    };

    Ok(NetworkConfig {
        host,
        port,
        id,
        peer_type,
        trackers: raw.trackers.unwrap_or_default(),
        advertised_ws_url,
        ping_interval,
        max_neighbours,
        max_inactivity_period,
        disconnection_wait_time,
        tls,
    })
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    MissingField(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(s) => write!(f, "IO error: {s}"),
            ConfigError::Parse(s) => write!(f, "parse error: {s}"),
            ConfigError::MissingField(s) => write!(f, "missing required field: {s}"),
            ConfigError::InvalidValue(s) => write!(f, "invalid config value: {s}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_documented_defaults_when_optional_fields_are_absent() {
        let toml = r#"
            host = "0.0.0.0"
            port = 30300
            id = "node-1"
            advertised_ws_url = "ws://127.0.0.1:30300"
            trackers = ["ws://tracker:30301"]
        "#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.ping_interval, Duration::from_secs(5));
        assert_eq!(config.max_neighbours, 4);
        assert_eq!(config.max_inactivity_period, Duration::from_secs(300));
        assert_eq!(config.disconnection_wait_time, Duration::from_secs(30));
        assert_eq!(config.peer_type, PeerType::Node);
        assert!(config.tls.is_none());
    }

    #[test]
    fn rejects_a_config_missing_a_required_field() {
        let toml = r#"
            host = "0.0.0.0"
            port = 30300
        "#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(f) if f == "id"));
    }

    #[test]
    fn parses_an_explicit_storage_peer_type() {
        let toml = r#"
            host = "0.0.0.0"
            port = 30300
            id = "storage-1"
            peer_type = "storage"
            advertised_ws_url = "ws://127.0.0.1:30300"
        "#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.peer_type, PeerType::Storage);
    }

    #[test]
    fn rejects_an_unrecognised_peer_type() {
        let toml = r#"
            host = "0.0.0.0"
            port = 30300
            id = "node-1"
            peer_type = "bogus"
            advertised_ws_url = "ws://127.0.0.1:30300"
        "#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
