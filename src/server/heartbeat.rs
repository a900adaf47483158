//! Liveness tracking: periodic heartbeats, round-trip sampling and timeout eviction.

use super::application::Event;
use super::server::Server;

use crate::message::Heartbeat;
use crate::p2p::prelude::*;
use crate::p2p::{LivenessRecord, LivenessSnapshot, Tables};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

impl Server {
    /// Starts tracking `id`. Its last-seen time starts now.
    pub fn begin_heartbeats(&self, id: &PeerId) -> Result<()> {
        let now = self.clock.now();
        let window = self.liveness.rtt_average_num;
        let mut tables = self.network.write();
        if !tables.clients.contains_key(id) {
            return Err(Error::UnknownPeer(*id));
        }
        let _ = tables.liveness.entry(*id).or_insert_with(|| LivenessRecord::new(now, window));
        Ok(())
    }

    /// Stops tracking `id` without disconnecting it.
    pub fn end_heartbeats(&self, id: &PeerId) -> bool {
        self.network.write().liveness.remove(id).is_some()
    }

    pub fn end_all_heartbeats(&self) {
        self.network.write().liveness.clear();
    }

    /// Snapshots of every tracked peer.
    pub fn heartbeat_clients(&self) -> HashMap<PeerId, LivenessSnapshot> {
        self.network.read().liveness.iter().map(|(id, record)| (*id, record.snapshot())).collect()
    }

    pub fn liveness(&self, id: &PeerId) -> Option<LivenessSnapshot> {
        self.network.read().liveness.get(id).map(LivenessRecord::snapshot)
    }

    /// Mean of the most recent round-trip samples for `id`, `None` while unknown.
    pub fn mean_rtt(&self, id: &PeerId) -> Option<Duration> {
        self.network.read().liveness.get(id).and_then(LivenessRecord::mean_rtt)
    }

    /// One round of the heartbeat scheduler.
    ///
    /// Peers silent for at least the timeout interval are evicted, each raising exactly one
    /// disconnect event. Every other tracked peer is sent a heartbeat carrying the sequence
    /// number of its connection, and the send instant is recorded against that number.
    pub async fn tick(&self) {
        let now = self.clock.now();
        let timeout = self.liveness.timeout_interval;

        let (evicted, due) = {
            let mut tables = self.network.write();
            let Tables { clients, liveness } = &mut *tables;
            let mut evicted = vec![];
            let mut due = vec![];
            liveness.retain(|id, record| {
                let timed_out = record.is_timed_out(now, timeout);
                let client = clients.get(id).map(|client| (client.seq, client.connection.clone()));
                match client {
                    Some((seq, connection)) if !timed_out => {
                        record.record_send(seq, now);
                        due.push((seq, connection));
                        true
                    }
                    Some(_) => {
                        if let Some(client) = clients.remove(id) {
                            evicted.push(client.connection);
                        }
                        false
                    }
                    // Already disconnected.
                    None => false,
                }
            });
            (evicted, due)
        };

        for connection in evicted {
            warn!("{} {} timed out", "[heartbeat]".magenta(), connection.id());
            connection.close().await;
            self.application.on_event(Event::Disconnect(connection.id()));
        }

        if due.is_empty() {
            return;
        }
        let metadata = self.application.heartbeat_metadata();
        for (seq, connection) in due {
            let heartbeat = Payload::Heartbeat(Heartbeat { seq, metadata: metadata.clone() });
            let envelope = Envelope::new(self.id(), connection.id(), heartbeat);
            if let Err(err) = self.network.send(&connection, envelope).await {
                let peer = connection.id().short();
                warn!("{} heartbeat to {} failed: {}", "[heartbeat]".magenta(), peer, err);
                self.drop_connection(&connection).await;
            }
        }
    }

    /// Runs [Server::tick] every heartbeat interval until shutdown.
    pub fn start_heartbeats(self: &Arc<Self>) -> JoinHandle<()> {
        let server = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(server.liveness.heartbeat_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = server.shutdown.cancelled() => break,
                    _ = interval.tick() => server.tick().await,
                }
            }
            debug!("{} stopped", "[heartbeat]".magenta());
        })
    }
}
