use crate::message::{Envelope, Metadata, Payload};
use crate::p2p::Connection;
use crate::peer_id::PeerId;
use crate::Result;

use tokio::time::Duration;
use tracing::debug;

/// Notifications raised by the relay towards the application.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The peer is gone, whether it left, timed out or its transport failed.
    Disconnect(PeerId),
    /// A heartbeat arrived carrying the sender's metadata.
    Heartbeat { peer: PeerId, metadata: Metadata },
    /// A fresh round-trip sample was taken for the peer.
    Latency { peer: PeerId, rtt: Duration },
}

/// The layer above the relay: consumes application messages addressed to this instance and
/// observes peer lifecycle events.
pub trait Application: Send + Sync {
    /// Handles an envelope addressed to this instance.
    ///
    /// `Ok(Some(payload))` is sent back to the sender as a reply, `Err(e)` is sent back as an
    /// `Error` envelope and `Ok(None)` sends nothing.
    fn process_message(&self, from: &Connection, envelope: &Envelope) -> Result<Option<Payload>>;

    fn on_event(&self, _event: Event) {}

    /// Attached to every outgoing heartbeat.
    fn heartbeat_metadata(&self) -> Metadata {
        Metadata::empty()
    }
}

/// Accepts everything and answers nothing.
pub struct NullApplication;

impl Application for NullApplication {
    fn process_message(&self, from: &Connection, envelope: &Envelope) -> Result<Option<Payload>> {
        debug!("dropping {} from {}", envelope.kind(), from.id().short());
        Ok(None)
    }

    fn on_event(&self, event: Event) {
        debug!("event {:?}", event);
    }
}
