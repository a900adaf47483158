use super::prelude::*;

use crate::channel;

use tokio_util::sync::CancellationToken;

use std::fmt;

pub type EnvelopeSender = channel::Sender<Envelope, Envelope>;
pub type EnvelopeReceiver = channel::Receiver<Envelope, Envelope>;

/// A live transport connection to a remote peer.
///
/// Writes are serialised through the connection's own lock, so concurrent senders never
/// interleave frames and never need to hold the registry lock while writing.
pub struct Connection {
    /// The identity learned from the peer's handshake.
    id: PeerId,
    /// The remote transport address.
    addr: SocketAddr,
    /// The framed writing half of the stream.
    sender: tokio::sync::Mutex<EnvelopeSender>,
    /// Cancelled once the connection is torn down; stops the reader task.
    closed: CancellationToken,
}

impl Connection {
    pub fn new(id: PeerId, addr: SocketAddr, sender: EnvelopeSender) -> Arc<Connection> {
        Arc::new(Connection {
            id,
            addr,
            sender: tokio::sync::Mutex::new(sender),
            closed: CancellationToken::new(),
        })
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the connection has been closed locally.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    /// Serialises and writes one envelope.
    pub(crate) async fn write(&self, envelope: Envelope) -> Result<()> {
        if self.is_closed() {
            return Err(Error::TransportWrite("connection closed".to_string()));
        }
        let mut sender = self.sender.lock().await;
        sender.send(envelope).await
    }

    /// Closes the write side and signals the reader to stop. Closing twice is harmless.
    pub async fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();
        let mut sender = self.sender.lock().await;
        if let Err(err) = sender.close().await {
            debug!("closing {}: {}", self.id.short(), err);
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Payload;

    #[actix_rt::test]
    async fn writes_fail_after_close() {
        let (a, b) = tokio::io::duplex(1024);
        let (sender, _) = Channel::<Envelope, Envelope>::wrap(Box::new(a)).split();
        let (_, mut receiver) = Channel::<Envelope, Envelope>::wrap(Box::new(b)).split();

        let id = PeerId::generate();
        let connection = Connection::new(id, "127.0.0.1:4000".parse().unwrap(), sender);
        let envelope = Envelope::new(PeerId::generate(), id, Payload::Hello);
        connection.write(envelope.clone()).await.unwrap();
        assert_eq!(receiver.recv().await.unwrap(), Some(envelope.clone()));

        connection.close().await;
        connection.close().await;
        assert!(connection.is_closed());
        match connection.write(envelope).await {
            Err(Error::TransportWrite(_)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(receiver.recv().await.unwrap(), None);
    }
}
