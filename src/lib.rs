#[macro_use]
extern crate serde_derive;
extern crate colored;

pub mod channel;
pub mod message;
pub mod p2p;
pub mod peer_id;
pub mod server;
pub mod version;

use peer_id::PeerId;

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    Config(config::ConfigError),
    /// A configured socket address could not be parsed.
    InvalidAddress(String),

    // channel errors
    ChannelError(String),
    /// The underlying connection failed while writing; the peer is treated as gone.
    TransportWrite(String),

    // registry errors
    /// An envelope was addressed to a peer that is not connected to this instance.
    InvalidRecipient(PeerId),
    /// The peer is not present in the connection registry.
    UnknownPeer(PeerId),
    /// A connection for this identity is already registered.
    DuplicateConnection(PeerId),
    /// The remote refused the connection during the handshake.
    ConnectionRefused(String),
    Handshake(String),
    IncompatibleVersion { local: u16, remote: u16 },
    InvalidEnvelope(&'static str),
    UnexpectedHandshake,

    // correlation errors
    Timeout,
    EmptyResponse,

    /// Raised by the application layer while processing a message.
    Application(String),
    /// The instance only relays and never consumes application messages.
    RelayOnly,

    /// Error caused by converting from a `String` to a `PeerId`
    TryFromStringError,
}

impl std::error::Error for Error {}

impl std::convert::From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IO(error)
    }
}

impl std::convert::From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Error::Config(error)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            // This text travels back to remote peers inside `Error` envelopes.
            Error::InvalidRecipient(_) => write!(f, "Invalid recipient"),
            Error::UnexpectedHandshake => write!(f, "Unexpected handshake"),
            Error::RelayOnly => write!(f, "Relay does not process application messages"),
            Error::DuplicateConnection(id) => write!(f, "Duplicate connection for {}", id),
            Error::Application(s) => write!(f, "{}", s),
            err => write!(f, "{:?}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_of_wire_errors() {
        let err = Error::InvalidRecipient(PeerId::generate());
        assert_eq!(err.to_string(), "Invalid recipient");
        let err = Error::Application("lobby is full".to_string());
        assert_eq!(err.to_string(), "lobby is full");
        assert!(format!("{}", Error::Timeout).contains("Timeout"));
    }
}
