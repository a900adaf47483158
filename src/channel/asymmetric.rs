use futures::prelude::*;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio_serde::formats::*;
use tokio_serde::Framed;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use crate::{Error, Result};

pub trait AsyncReadWrite: AsyncRead + AsyncWrite {}

impl<T> AsyncReadWrite for T where T: AsyncRead + AsyncWrite {}

/// Any reliable, ordered byte stream a channel can be layered on (TCP, in-memory duplex, ...).
pub type BoxedStream = Box<dyn AsyncReadWrite + Unpin + Send>;

pub type Reader<I, O> =
    Framed<FramedRead<ReadHalf<BoxedStream>, LengthDelimitedCodec>, O, I, Bincode<O, I>>;

pub type Writer<I, O> =
    Framed<FramedWrite<WriteHalf<BoxedStream>, LengthDelimitedCodec>, O, I, Bincode<O, I>>;

/// Reading half of a channel, yields `O`s.
pub struct Receiver<I, O> {
    reader: Reader<I, O>,
}

impl<I, O> Receiver<I, O>
where
    I: Serialize + Unpin,
    O: for<'de> Deserialize<'de> + Unpin,
{
    /// Returns `Ok(None)` once the remote end has closed the stream.
    pub async fn recv(&mut self) -> Result<Option<O>> {
        self.reader.try_next().await.map_err(|err| Error::ChannelError(err.to_string()))
    }
}

/// Writing half of a channel, accepts `I`s.
pub struct Sender<I, O> {
    writer: Writer<I, O>,
}

impl<I, O> Sender<I, O>
where
    I: Serialize + Unpin,
    O: for<'de> Deserialize<'de> + Unpin,
{
    pub async fn send(&mut self, item: I) -> Result<()> {
        self.writer.send(item).await.map_err(|err| Error::TransportWrite(err.to_string()))
    }

    /// Flushes pending frames and shuts the write side down.
    pub async fn close(&mut self) -> Result<()> {
        self.writer.close().await.map_err(|err| Error::TransportWrite(err.to_string()))
    }
}

pub struct Channel<I, O> {
    stream: BoxedStream,
    ghost: std::marker::PhantomData<(I, O)>,
}

impl<I, O> Channel<I, O>
where
    I: Serialize + Unpin,
    O: for<'de> Deserialize<'de> + Unpin,
{
    pub fn wrap(stream: BoxedStream) -> Channel<I, O> {
        Channel { stream, ghost: Default::default() }
    }

    pub async fn connect(address: &SocketAddr) -> Result<Channel<I, O>> {
        let socket = TcpStream::connect(address).await?;
        socket.set_nodelay(true)?;
        Ok(Channel::wrap(Box::new(socket)))
    }

    pub async fn accept(listener: &TcpListener) -> Result<(Channel<I, O>, SocketAddr)> {
        let (socket, address) = listener.accept().await?;
        socket.set_nodelay(true)?;
        Ok((Channel::wrap(Box::new(socket)), address))
    }

    pub fn split(self) -> (Sender<I, O>, Receiver<I, O>) {
        let (reader, writer) = tokio::io::split(self.stream);

        let reader = FramedRead::new(reader, LengthDelimitedCodec::new());
        let reader = Framed::new(reader, Bincode::default());

        let writer = FramedWrite::new(writer, LengthDelimitedCodec::new());
        let writer = Framed::new(writer, Bincode::default());

        (Sender { writer }, Receiver { reader })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Deserialize, Serialize)]
    pub struct Request(String);
    #[derive(Debug, PartialEq, Deserialize, Serialize)]
    pub struct Response(String);

    #[actix_rt::test]
    async fn asymmetric_send_recv() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let handle_1 = tokio::spawn(async move {
            let (channel, _) = Channel::<Request, Response>::accept(&listener)
                .await
                .expect("failed to accept connection");
            let (mut sender, mut receiver) = channel.split();

            sender.send(Request(String::from("123"))).await.unwrap();
            let msg = receiver.recv().await.unwrap();
            assert_eq!(msg, Some(Response(String::from("321"))));
        });

        let handle_2 = tokio::spawn(async move {
            let channel: Channel<Response, Request> =
                Channel::connect(&address).await.expect("failed to connect");
            let (mut sender, mut receiver) = channel.split();

            let msg = receiver.recv().await.unwrap();
            assert_eq!(msg, Some(Request(String::from("123"))));
            sender.send(Response(String::from("321"))).await.unwrap();
        });

        handle_2.await.unwrap();
        handle_1.await.unwrap();
    }

    #[actix_rt::test]
    async fn recv_returns_none_after_close() {
        let (a, b) = tokio::io::duplex(1024);
        let (mut sender, _r) = Channel::<Request, Response>::wrap(Box::new(a)).split();
        let (_s, mut receiver) = Channel::<Response, Request>::wrap(Box::new(b)).split();

        sender.send(Request(String::from("last"))).await.unwrap();
        sender.close().await.unwrap();

        assert_eq!(receiver.recv().await.unwrap(), Some(Request(String::from("last"))));
        assert_eq!(receiver.recv().await.unwrap(), None);
    }
}
