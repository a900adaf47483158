use super::application::Application;
use super::server::{parse_addr, Server};
use super::settings::Settings;

use crate::Result;

use tokio::net::TcpListener;
use tracing::{info, warn};

use std::sync::Arc;

/// Starts a relay node: binds the listener, starts the heartbeat scheduler and dials the
/// bootstrap peers. Returns once the node is up; it runs until [Server::shutdown].
pub async fn run(settings: Settings, application: Arc<dyn Application>) -> Result<Arc<Server>> {
    let listener_ip = parse_addr(&settings.listener_ip)?;
    let bootstrap_peers = settings
        .bootstrap_peers
        .iter()
        .map(|ip| parse_addr(ip))
        .collect::<Result<Vec<_>>>()?;

    let server = Server::new(settings, application);
    info!("node {} is starting", server.id());

    let listener = TcpListener::bind(listener_ip).await?;
    let listener_execution = server.clone().serve(listener);
    let _ = tokio::spawn(async move {
        if let Err(err) = listener_execution.await {
            warn!("listener stopped: {}", err);
        }
    });
    let _ = server.start_heartbeats();

    for ip in bootstrap_peers {
        match server.dial(ip).await {
            Ok(connection) => info!("bootstrapped with {} at {}", connection.id(), ip),
            Err(err) => warn!("could not reach bootstrap peer {}: {}", ip, err),
        }
    }

    Ok(server)
}
