// tracker: runs the topology manager (C6) behind a WebSocket listener.
//
// Accepts node connections, decodes tracker<->node control frames, and
// drives `streamr_network::Tracker`'s status/instruction/disconnect
// handling loop.

use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use streamr_network::endpoint::server::upgrade_handler;
use streamr_network::{config, EndpointConfig, EndpointHandle, Tracker, TrackerConfig};
use streamr_protocol::PeerInfo;
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "tracker starting");

    let config_path = env::var("STREAMR_CONFIG").unwrap_or_else(|_| "/etc/streamr/tracker.toml".to_owned());
    let network_config = match config::load_config_from_path(Path::new(&config_path)) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("FATAL: failed to load config '{config_path}': {err}");
            std::process::exit(1);
        }
    };

    let own = PeerInfo::tracker(network_config.id.clone());
    let (endpoint, events_rx) = EndpointHandle::new(EndpointConfig {
        host: network_config.host.clone(),
        port: network_config.port,
        advertised_url: network_config.advertised_ws_url.clone(),
        peer_id: network_config.id.clone(),
        peer_type: own.peer_type,
        ping_interval: network_config.ping_interval,
    });

    let tracker = Arc::new(Tracker::new(
        own,
        endpoint.clone(),
        TrackerConfig {
            max_neighbours: network_config.max_neighbours,
            ping_interval: network_config.ping_interval,
        },
    ));

    // The initial receiver returned by `EndpointHandle::new` is only needed
    // to size the broadcast channel before anyone else subscribes; the
    // shared dispatch pump subscribes its own.
    drop(events_rx);
    tracker.spawn_event_loop();

    let router = build_router(endpoint.clone(), tracker.clone());
    let bind_addr = format!("{}:{}", network_config.host, network_config.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("FATAL: failed to bind {bind_addr}: {err}");
            std::process::exit(1);
        }
    };
    info!(addr = %bind_addr, advertised = %network_config.advertised_ws_url, "tracker listening");

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("tracker server error");

    endpoint.stop().await;
    info!("tracker shut down gracefully");
}

fn build_router(endpoint: EndpointHandle, tracker: Arc<Tracker>) -> Router {
    let topology_tracker = tracker.clone();
    let metrics_tracker = tracker;
    Router::new()
        .route("/ws", get(upgrade_handler))
        .route(
            "/topology",
            get(move || {
                let tracker = topology_tracker.clone();
                async move { Json(tracker.get_topology().await) }
            }),
        )
        .route(
            "/metrics",
            get(move || {
                let tracker = metrics_tracker.clone();
                async move { Json(tracker.metrics().await) }
            }),
        )
        .with_state(endpoint)
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
