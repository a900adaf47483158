use super::application::{Application, Event};
use super::clock::{Clock, SystemClock};
use super::settings::{LivenessSettings, Settings};

use crate::p2p::prelude::*;
use crate::p2p::{Connection, EnvelopeReceiver, Network, Role};

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info_span;
use tracing_futures::Instrument;

/// A relay instance: accepts and dials peers, dispatches their envelopes and keeps track of
/// their liveness.
pub struct Server {
    pub(super) settings: Settings,
    pub(super) liveness: LivenessSettings,
    pub(super) network: Network,
    pub(super) application: Arc<dyn Application>,
    pub(super) clock: Arc<dyn Clock>,
    /// Stops the accept loop and the heartbeat task.
    pub(super) shutdown: CancellationToken,
}

pub fn parse_addr(ip: &str) -> Result<SocketAddr> {
    ip.parse().map_err(|_| Error::InvalidAddress(ip.to_string()))
}

impl Server {
    pub fn new(settings: Settings, application: Arc<dyn Application>) -> Arc<Server> {
        Server::with_clock(settings, application, Arc::new(SystemClock))
    }

    pub fn with_clock(
        settings: Settings,
        application: Arc<dyn Application>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Server> {
        let id = PeerId::generate();
        let network = Network::new(id, settings.handshake_timeout());
        let liveness = settings.liveness();
        Arc::new(Server {
            settings,
            liveness,
            network,
            application,
            clock,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn id(&self) -> PeerId {
        self.network.id()
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Binds `ip` and accepts peers until [Server::shutdown] is called.
    pub async fn listen(self: Arc<Self>, ip: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(ip).await?;
        self.serve(listener).await
    }

    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        info!("{} listening on {} as {}", "[server]".green(), listener.local_addr()?, self.id());
        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = Channel::<Envelope, Envelope>::accept(&listener) => accepted,
            };
            let (channel, addr) = match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!("{} accept failed: {}", "[server]".green(), err);
                    continue;
                }
            };
            // A slow handshake must not hold up the accept loop.
            let server = self.clone();
            let _ = tokio::spawn(async move {
                if let Err(err) = server.attach(addr, channel, Role::Acceptor).await {
                    warn!("{} rejected {}: {}", "[server]".green(), addr, err);
                }
            });
        }
        info!("{} stopped listening", "[server]".green());
        Ok(())
    }

    /// Dials `ip` and registers the peer found there.
    pub async fn dial(self: &Arc<Self>, ip: SocketAddr) -> Result<Arc<Connection>> {
        let channel = Channel::<Envelope, Envelope>::connect(&ip).await?;
        self.attach(ip, channel, Role::Initiator).await
    }

    /// Registers a peer reached over an already established transport.
    pub async fn connect_stream(
        self: &Arc<Self>,
        addr: SocketAddr,
        stream: BoxedStream,
    ) -> Result<Arc<Connection>> {
        self.attach(addr, Channel::wrap(stream), Role::Initiator).await
    }

    /// Registers a peer that reached this instance over an already established transport.
    pub async fn accept_stream(
        self: &Arc<Self>,
        addr: SocketAddr,
        stream: BoxedStream,
    ) -> Result<Arc<Connection>> {
        self.attach(addr, Channel::wrap(stream), Role::Acceptor).await
    }

    async fn attach(
        self: &Arc<Self>,
        addr: SocketAddr,
        channel: Channel<Envelope, Envelope>,
        role: Role,
    ) -> Result<Arc<Connection>> {
        let (connection, receiver) = self.network.connect(addr, channel, role).await?;
        if self.settings.track_on_connect {
            self.begin_heartbeats(&connection.id())?;
        }
        let _ = self.spawn_reader(connection.clone(), receiver);
        Ok(connection)
    }

    /// Reads envelopes off `connection` one at a time until it closes or fails, then tears
    /// the peer down.
    fn spawn_reader(
        self: &Arc<Self>,
        connection: Arc<Connection>,
        mut receiver: EnvelopeReceiver,
    ) -> JoinHandle<()> {
        let server = self.clone();
        let span = info_span!("peer", id = %connection.id().short());
        tokio::spawn(
            async move {
                loop {
                    let next = tokio::select! {
                        _ = connection.closed() => break,
                        next = receiver.recv() => next,
                    };
                    match next {
                        Ok(Some(envelope)) => server.handle_message(&connection, envelope).await,
                        Ok(None) => {
                            debug!("stream closed by peer");
                            break;
                        }
                        Err(err) => {
                            warn!("read failed: {}", err);
                            break;
                        }
                    }
                }
                server.drop_connection(&connection).await;
            }
            .instrument(span),
        )
    }

    /// Disconnects `id`, raising its disconnect event. Returns `false` if it was not connected.
    pub async fn disconnect(&self, id: &PeerId) -> bool {
        match self.network.disconnect(id).await {
            Some(_) => {
                self.application.on_event(Event::Disconnect(*id));
                true
            }
            None => false,
        }
    }

    /// Disconnects the peer behind `connection` unless a newer connection replaced it.
    pub(super) async fn drop_connection(&self, connection: &Arc<Connection>) {
        if self.network.disconnect_connection(connection).await {
            self.application.on_event(Event::Disconnect(connection.id()));
        }
    }

    /// Tells `id` we are leaving, then disconnects it.
    pub async fn leave(&self, id: &PeerId) -> Result<()> {
        let connection = self.network.lookup(id).ok_or(Error::UnknownPeer(*id))?;
        let farewell = Envelope::new(self.id(), *id, Payload::Disconnect);
        let result = self.network.send(&connection, farewell).await;
        let _ = self.disconnect(id).await;
        result.map(|_| ())
    }

    /// Sends `payload` to `recipient` through the connected peer `via` without waiting.
    pub async fn send_to(&self, via: &PeerId, recipient: PeerId, payload: Payload) -> Result<u64> {
        let connection = self.network.lookup(via).ok_or(Error::UnknownPeer(*via))?;
        let envelope = Envelope::new(self.id(), recipient, payload);
        let result = self.network.send(&connection, envelope).await;
        if let Err(Error::TransportWrite(_)) = result {
            self.drop_connection(&connection).await;
        }
        result
    }

    /// Sends `payload` to `recipient` through `via` and waits for the correlated reply.
    ///
    /// If a hop cannot deliver the request, its `Error` reply is returned as the answer.
    pub async fn request(
        &self,
        via: &PeerId,
        recipient: PeerId,
        payload: Payload,
    ) -> Result<Envelope> {
        let connection = self.network.lookup(via).ok_or(Error::UnknownPeer(*via))?;
        let envelope = Envelope::new(self.id(), recipient, payload);
        let delta = self.settings.request_timeout();
        let result = self.network.send_and_await(&connection, envelope, delta).await;
        if let Err(Error::TransportWrite(_)) = result {
            self.drop_connection(&connection).await;
        }
        result
    }

    /// Stops accepting and heartbeating, then disconnects every peer.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        for id in self.network.peers() {
            let _ = self.disconnect(&id).await;
        }
        info!("{} {} shut down", "[server]".green(), self.id());
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
