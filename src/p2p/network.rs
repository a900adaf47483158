//! The connection registry.
//!
//! `Network` maps logical peer identities to live transport connections. It owns the
//! connection lifecycle (handshake, registration, disconnect), writes envelopes, and
//! correlates replies with callers of [Network::send_and_await].
//!
//! The connection table and the liveness table sit behind one reader/writer lock so that a
//! peer is always removed from both at once. The lock is never held across a write to the
//! network.

use super::connection::{Connection, EnvelopeReceiver};
use super::correlation::{self, Waiters};
use super::liveness::LivenessRecord;
use super::prelude::*;

use crate::message::Handshake;
use crate::version::{self, CURRENT_VERSION};

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registry entry for a connected peer.
#[derive(Debug)]
pub struct ClientRecord {
    pub connection: Arc<Connection>,
    /// Sequence number assigned to the next envelope sent on this connection.
    pub seq: u64,
    /// Latest mean round-trip estimate, `None` while unknown.
    pub distance: Option<Duration>,
}

/// The state shared by the registry and the liveness tracker.
#[derive(Debug, Default)]
pub struct Tables {
    pub clients: HashMap<PeerId, ClientRecord>,
    pub liveness: HashMap<PeerId, LivenessRecord>,
}

impl Tables {
    /// Removes a peer from both tables.
    pub fn remove(&mut self, id: &PeerId) -> Option<ClientRecord> {
        let _ = self.liveness.remove(id);
        self.clients.remove(id)
    }
}

/// Which side of the handshake this instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Dialed the connection and speaks first.
    Initiator,
    /// Accepted the connection and answers.
    Acceptor,
}

pub struct Network {
    /// The identity of this instance.
    id: PeerId,
    tables: RwLock<Tables>,
    waiters: Waiters,
    handshake_timeout: Duration,
}

impl Network {
    pub fn new(id: PeerId, handshake_timeout: Duration) -> Self {
        Network {
            id,
            tables: RwLock::new(Tables::default()),
            waiters: Waiters::new(),
            handshake_timeout,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn handshake_envelope(&self, recipient: PeerId) -> Envelope {
        let handshake = Handshake { version: CURRENT_VERSION };
        Envelope::new(self.id, recipient, Payload::Handshake(handshake))
    }

    /// Runs the handshake over `channel` and registers the resulting connection.
    ///
    /// A peer whose identity is already registered is refused with
    /// [Error::DuplicateConnection]; the existing connection is left untouched.
    pub async fn connect(
        &self,
        addr: SocketAddr,
        channel: Channel<Envelope, Envelope>,
        role: Role,
    ) -> Result<(Arc<Connection>, EnvelopeReceiver)> {
        let (mut sender, mut receiver) = channel.split();

        let remote = match role {
            Role::Initiator => {
                sender.send(self.handshake_envelope(PeerId::nil())).await?;
                self.await_handshake(&mut receiver).await?
            }
            Role::Acceptor => {
                let remote = self.await_handshake(&mut receiver).await?;
                if self.lookup(&remote).is_some() {
                    let err = Error::DuplicateConnection(remote);
                    let refusal = Envelope::new(self.id, remote, Payload::error(err.to_string()));
                    let _ = sender.send(refusal).await;
                    let _ = sender.close().await;
                    return Err(err);
                }
                sender.send(self.handshake_envelope(remote)).await?;
                remote
            }
        };

        let connection = Connection::new(remote, addr, sender);
        if let Err(err) = self.register(connection.clone()) {
            connection.close().await;
            return Err(err);
        }
        info!("{} connected to {} at {}", "[network]".cyan(), remote, addr);
        Ok((connection, receiver))
    }

    async fn await_handshake(&self, receiver: &mut EnvelopeReceiver) -> Result<PeerId> {
        let envelope = match timeout(self.handshake_timeout, receiver.recv()).await {
            Ok(Ok(Some(envelope))) => envelope,
            Ok(Ok(None)) => return Err(Error::Handshake("closed during handshake".to_string())),
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(Error::Timeout),
        };
        match envelope.payload {
            Payload::Handshake(Handshake { version }) => {
                if !version::is_compatible(version) {
                    let local = CURRENT_VERSION;
                    return Err(Error::IncompatibleVersion { local, remote: version });
                }
                let remote = envelope.header.sender;
                if remote.is_nil() || remote == self.id {
                    return Err(Error::Handshake(format!("invalid peer identity {}", remote)));
                }
                Ok(remote)
            }
            Payload::Error(err) => Err(Error::ConnectionRefused(err.message)),
            other => Err(Error::Handshake(format!("expected handshake, got {}", other.kind()))),
        }
    }

    fn register(&self, connection: Arc<Connection>) -> Result<()> {
        let id = connection.id();
        let mut tables = self.write();
        if tables.clients.contains_key(&id) {
            return Err(Error::DuplicateConnection(id));
        }
        let _ = tables.clients.insert(id, ClientRecord { connection, seq: 0, distance: None });
        Ok(())
    }

    /// Returns the connection registered for `id`. Never waits on the network.
    pub fn lookup(&self, id: &PeerId) -> Option<Arc<Connection>> {
        self.read().clients.get(id).map(|record| record.connection.clone())
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.read().clients.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The latest latency estimate recorded for `id`.
    pub fn distance(&self, id: &PeerId) -> Option<Duration> {
        self.read().clients.get(id).and_then(|record| record.distance)
    }

    /// Writes `envelope` on `connection`, returning the sequence number assigned to it.
    ///
    /// A failed write yields [Error::TransportWrite]; the caller must treat the peer as gone.
    pub async fn send(&self, connection: &Arc<Connection>, envelope: Envelope) -> Result<u64> {
        if envelope.sender().is_nil() {
            return Err(Error::InvalidEnvelope("missing sender"));
        }
        let seq = {
            let mut tables = self.write();
            match tables.clients.get_mut(&connection.id()) {
                Some(record) if Arc::ptr_eq(&record.connection, connection) => {
                    let seq = record.seq;
                    record.seq += 1;
                    seq
                }
                _ => 0,
            }
        };
        debug!("-> {} {} (seq {})", envelope.kind(), connection.id().short(), seq);
        connection.write(envelope).await?;
        Ok(seq)
    }

    /// Removes `id` from the registry and the liveness table, then closes its transport.
    ///
    /// Returns the removed connection; disconnecting an absent peer is a no-op.
    pub async fn disconnect(&self, id: &PeerId) -> Option<Arc<Connection>> {
        let removed = self.write().remove(id);
        match removed {
            Some(record) => {
                record.connection.close().await;
                info!("{} disconnected {}", "[network]".cyan(), id);
                Some(record.connection)
            }
            None => None,
        }
    }

    /// Like [Network::disconnect], but only if `connection` is still the registered one.
    pub async fn disconnect_connection(&self, connection: &Arc<Connection>) -> bool {
        let removed = {
            let mut tables = self.write();
            let registered = match tables.clients.get(&connection.id()) {
                Some(record) => Arc::ptr_eq(&record.connection, connection),
                None => false,
            };
            if registered {
                tables.remove(&connection.id())
            } else {
                None
            }
        };
        connection.close().await;
        if removed.is_some() {
            info!("{} disconnected {}", "[network]".cyan(), connection.id());
        }
        removed.is_some()
    }

    /// Resolves a pending [Network::send_and_await] waiting for `envelope`.
    pub fn signal_received(&self, envelope: &Envelope) -> bool {
        self.waiters.resolve(envelope)
    }

    /// Sends `envelope` and waits up to `delta` for the correlated reply.
    ///
    /// A fresh correlation id is assigned when the envelope carries none. Any envelope echoing
    /// that id resolves the wait, including an `Error` from a hop that could not deliver the
    /// request. On timeout the waiter is discarded and [Error::Timeout] is returned.
    pub async fn send_and_await(
        &self,
        connection: &Arc<Connection>,
        mut envelope: Envelope,
        delta: Duration,
    ) -> Result<Envelope> {
        if envelope.recipient().is_nil() {
            return Err(Error::InvalidEnvelope("missing recipient"));
        }
        let correlation_id = match envelope.correlation_id() {
            Some(id) => id,
            None => {
                let id = correlation::fresh_id();
                envelope.set_correlation_id(Some(id));
                id
            }
        };

        let waiter = self.waiters.register(correlation_id);
        if let Err(err) = self.send(connection, envelope).await {
            self.waiters.cancel(correlation_id);
            return Err(err);
        }

        match timeout(delta, waiter).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => {
                self.waiters.cancel(correlation_id);
                Err(Error::EmptyResponse)
            }
            Err(_) => {
                self.waiters.cancel(correlation_id);
                Err(Error::Timeout)
            }
        }
    }

    /// Number of callers currently waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.waiters.len()
    }
}
