use super::application::Event;
use super::server::Server;

use crate::message::{Heartbeat, HeartbeatReply, Metadata};
use crate::p2p::prelude::*;
use crate::p2p::{Connection, Tables};

impl Server {
    /// Dispatches one envelope received on `connection`.
    ///
    /// Envelopes addressed elsewhere are forwarded unchanged; envelopes addressed to this
    /// instance are handled locally, and any reply goes back on `connection` addressed to the
    /// original sender.
    pub async fn handle_message(&self, connection: &Arc<Connection>, envelope: Envelope) {
        let awaited = self.network.signal_received(&envelope);

        if self.settings.debug {
            info!(
                "{} {} from {} to {}",
                "[router]".yellow(),
                envelope.kind(),
                envelope.sender().short(),
                envelope.recipient().short()
            );
        } else {
            let sender = envelope.sender().short();
            debug!("{} {} from {}", "[router]".yellow(), envelope.kind(), sender);
        }

        if let Payload::Disconnect = envelope.payload {
            self.drop_connection(connection).await;
            return;
        }
        // Heartbeats concern a single hop and are never relayed.
        if !envelope.kind().is_liveness() && envelope.recipient() != self.id() {
            self.forward(connection, envelope).await;
            return;
        }

        let reply = match &envelope.payload {
            Payload::Heartbeat(Heartbeat { seq, metadata }) => {
                self.receive_heartbeat(connection, &envelope, metadata.clone());
                Some(Ok(Payload::HeartbeatReply(HeartbeatReply { seq: *seq })))
            }
            Payload::HeartbeatReply(HeartbeatReply { seq }) => {
                if envelope.recipient() == self.id() {
                    self.receive_heartbeat_reply(&envelope, *seq);
                } else {
                    let recipient = envelope.recipient().short();
                    debug!("{} ignoring heartbeat reply for {}", "[router]".yellow(), recipient);
                }
                None
            }
            Payload::Handshake(_) => {
                let peer = connection.id();
                error!("{} handshake from registered peer {}", "[router]".yellow(), peer);
                Some(Err(Error::UnexpectedHandshake))
            }
            // A relay still takes replies to its own requests, it just has nobody else to
            // hand them to.
            _ if self.settings.relay_only && awaited => None,
            Payload::Error(err) if self.settings.relay_only => {
                let peer = connection.id().short();
                warn!("{} error from {}: {}", "[router]".yellow(), peer, err.message);
                None
            }
            _ if self.settings.relay_only => {
                error!("{} refusing {} addressed to relay", "[router]".yellow(), envelope.kind());
                Some(Err(Error::RelayOnly))
            }
            _ => self.application.process_message(connection, &envelope).transpose(),
        };

        let payload = match reply {
            Some(reply) => reply.unwrap_or_else(Payload::from),
            None => return,
        };
        // An error is never answered with another error.
        if let (Payload::Error(_), Payload::Error(err)) = (&envelope.payload, &payload) {
            warn!("{} dropping error reply to an error: {}", "[router]".yellow(), err.message);
            return;
        }
        self.reply(connection, Envelope::reply_to(&envelope, self.id(), payload)).await;
    }

    /// Relays `envelope` to its recipient, or answers the sender with an error if the
    /// recipient is not connected here. Undeliverable `Error` envelopes are dropped.
    async fn forward(&self, connection: &Arc<Connection>, envelope: Envelope) {
        let recipient = envelope.recipient();
        let unreachable = Error::InvalidRecipient(recipient).into();
        let bounce = match envelope.payload {
            Payload::Error(_) => None,
            _ => Some(Envelope::reply_to(&envelope, self.id(), unreachable)),
        };
        let target = match self.network.lookup(&recipient) {
            Some(target) => target,
            None => {
                warn!("{} no route to {}", "[router]".yellow(), recipient.short());
                if let Some(bounce) = bounce {
                    self.reply(connection, bounce).await;
                }
                return;
            }
        };
        debug!("{} forwarding {} to {}", "[router]".yellow(), envelope.kind(), recipient.short());
        if let Err(err) = self.network.send(&target, envelope).await {
            warn!("{} forwarding to {} failed: {}", "[router]".yellow(), recipient.short(), err);
            self.drop_connection(&target).await;
            if let Some(bounce) = bounce {
                self.reply(connection, bounce).await;
            }
        }
    }

    /// Sends a locally generated reply; a failed write drops the peer.
    async fn reply(&self, connection: &Arc<Connection>, envelope: Envelope) {
        if let Err(err) = self.network.send(connection, envelope).await {
            warn!("{} reply to {} failed: {}", "[router]".yellow(), connection.id().short(), err);
            self.drop_connection(connection).await;
        }
    }

    fn receive_heartbeat(
        &self,
        connection: &Arc<Connection>,
        envelope: &Envelope,
        metadata: Metadata,
    ) {
        let now = self.clock.now();
        let sender = envelope.sender();
        {
            let mut tables = self.network.write();
            let Tables { clients, liveness } = &mut *tables;
            if let Some(record) = liveness.get_mut(&sender) {
                record.touch(now);
                let distance = record.mean_rtt();
                if let Some(client) = clients.get_mut(&connection.id()) {
                    client.distance = distance;
                }
            }
        }
        self.application.on_event(Event::Heartbeat { peer: sender, metadata });
    }

    fn receive_heartbeat_reply(&self, envelope: &Envelope, seq: u64) {
        let now = self.clock.now();
        let peer = envelope.sender();
        let rtt = {
            let mut tables = self.network.write();
            match tables.liveness.get_mut(&peer) {
                Some(record) => record.record_reply(seq, now),
                None => None,
            }
        };
        if let Some(rtt) = rtt {
            debug!("{} rtt to {}: {:?}", "[router]".yellow(), peer.short(), rtt);
            self.application.on_event(Event::Latency { peer, rtt });
        }
    }
}
