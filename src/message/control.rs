//! Reserved control payloads, interpretable independently of the application schema.

/// Opaque application state attached to outgoing heartbeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Metadata(pub Vec<u8>);

impl Metadata {
    pub fn empty() -> Self {
        Metadata(vec![])
    }
}

/// Liveness probe, carrying the sender's current send-sequence number for this connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub seq: u64,
    pub metadata: Metadata,
}

/// Echoes the sequence number of the [Heartbeat] being answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatReply {
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorMessage {
    pub fn new<S: Into<String>>(message: S) -> Self {
        ErrorMessage { message: message.into() }
    }
}

/// First frame in each direction of a new connection. The identity travels in the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub version: u16,
}
