use super::control::{ErrorMessage, Handshake, Heartbeat, HeartbeatReply};
use super::lobby::{GameUpdate, Join, JoinReply, Leave, LobbyInfo};
use crate::peer_id::PeerId;

use std::fmt;

/// Links a request to its reply.
pub type CorrelationId = u64;

/// Addressing fields shared by every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Header {
    pub sender: PeerId,
    pub recipient: PeerId,
    /// Present for request/reply pairs only.
    pub correlation_id: Option<CorrelationId>,
}

/// The closed set of message variants understood on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    // Control
    Heartbeat(Heartbeat),
    HeartbeatReply(HeartbeatReply),
    Disconnect,
    Error(ErrorMessage),
    // Transport
    Handshake(Handshake),
    // Lobby
    Hello,
    LobbyInfo(LobbyInfo),
    Join(Join),
    JoinReply(JoinReply),
    Leave(Leave),
    // Game
    GameUpdate(GameUpdate),
}

/// Discriminant of a [Payload], used for logging and routing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Heartbeat,
    HeartbeatReply,
    Disconnect,
    Error,
    Handshake,
    Hello,
    LobbyInfo,
    Join,
    JoinReply,
    Leave,
    GameUpdate,
}

impl Kind {
    /// Heartbeat envelopes only concern the two ends of a single connection.
    pub fn is_liveness(&self) -> bool {
        matches!(self, Kind::Heartbeat | Kind::HeartbeatReply)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Payload {
    pub fn kind(&self) -> Kind {
        match self {
            Payload::Heartbeat(_) => Kind::Heartbeat,
            Payload::HeartbeatReply(_) => Kind::HeartbeatReply,
            Payload::Disconnect => Kind::Disconnect,
            Payload::Error(_) => Kind::Error,
            Payload::Handshake(_) => Kind::Handshake,
            Payload::Hello => Kind::Hello,
            Payload::LobbyInfo(_) => Kind::LobbyInfo,
            Payload::Join(_) => Kind::Join,
            Payload::JoinReply(_) => Kind::JoinReply,
            Payload::Leave(_) => Kind::Leave,
            Payload::GameUpdate(_) => Kind::GameUpdate,
        }
    }

    pub fn error<S: Into<String>>(message: S) -> Payload {
        Payload::Error(ErrorMessage::new(message))
    }
}

impl From<crate::Error> for Payload {
    fn from(err: crate::Error) -> Self {
        Payload::error(err.to_string())
    }
}

/// Access to the addressing header of a message.
///
/// The dispatcher stamps replies through this trait rather than by inspecting payloads.
pub trait Addressed {
    fn header(&self) -> &Header;
    fn header_mut(&mut self) -> &mut Header;

    fn sender(&self) -> PeerId {
        self.header().sender
    }

    fn recipient(&self) -> PeerId {
        self.header().recipient
    }

    fn correlation_id(&self) -> Option<CorrelationId> {
        self.header().correlation_id
    }

    fn set_sender(&mut self, sender: PeerId) {
        self.header_mut().sender = sender;
    }

    fn set_recipient(&mut self, recipient: PeerId) {
        self.header_mut().recipient = recipient;
    }

    fn set_correlation_id(&mut self, correlation_id: Option<CorrelationId>) {
        self.header_mut().correlation_id = correlation_id;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub header: Header,
    pub payload: Payload,
}

impl Addressed for Envelope {
    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }
}

impl Envelope {
    pub fn new(sender: PeerId, recipient: PeerId, payload: Payload) -> Self {
        Envelope { header: Header { sender, recipient, correlation_id: None }, payload }
    }

    /// A payload with an empty header, to be stamped later.
    pub fn unaddressed(payload: Payload) -> Self {
        Envelope { header: Header::default(), payload }
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.header.correlation_id = Some(correlation_id);
        self
    }

    pub fn kind(&self) -> Kind {
        self.payload.kind()
    }

    /// Builds the reply to `request`: addressed back to its sender, sent by `self_id` and
    /// carrying the request's correlation id unchanged (including its absence).
    pub fn reply_to(request: &Envelope, self_id: PeerId, payload: Payload) -> Envelope {
        let mut reply = Envelope::unaddressed(payload);
        reply.set_recipient(request.sender());
        reply.set_sender(self_id);
        reply.set_correlation_id(request.correlation_id());
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Metadata;

    #[test]
    fn reply_is_stamped_from_request() {
        let a = PeerId::generate();
        let b = PeerId::generate();
        let request = Envelope::new(a, b, Payload::Hello).with_correlation_id(42);
        let reply = Envelope::reply_to(&request, b, Payload::error("nope"));
        assert_eq!(reply.sender(), b);
        assert_eq!(reply.recipient(), a);
        assert_eq!(reply.correlation_id(), Some(42));

        let request = Envelope::new(a, b, Payload::Hello);
        let reply = Envelope::reply_to(&request, b, Payload::Disconnect);
        assert_eq!(reply.correlation_id(), None);
    }

    #[test]
    fn liveness_kinds() {
        let heartbeat = Payload::Heartbeat(Heartbeat { seq: 5, metadata: Metadata::empty() });
        assert!(heartbeat.kind().is_liveness());
        assert!(Payload::HeartbeatReply(HeartbeatReply { seq: 5 }).kind().is_liveness());
        assert!(!Payload::Disconnect.kind().is_liveness());
        assert!(!Payload::Hello.kind().is_liveness());
        assert!(!Payload::error("x").kind().is_liveness());
    }

    #[test]
    fn errors_convert_to_error_payloads() {
        let payload: Payload = crate::Error::InvalidRecipient(PeerId::generate()).into();
        assert_eq!(payload, Payload::error("Invalid recipient"));
    }

    #[test]
    fn reserved_kinds_survive_bincode() {
        let a = PeerId::generate();
        let b = PeerId::generate();
        for payload in vec![
            Payload::Heartbeat(Heartbeat { seq: 7, metadata: Metadata(vec![1, 2, 3]) }),
            Payload::HeartbeatReply(HeartbeatReply { seq: 7 }),
            Payload::Disconnect,
            Payload::error("boom"),
        ] {
            let envelope = Envelope::new(a, b, payload).with_correlation_id(9);
            let bytes = bincode::serialize(&envelope).unwrap();
            let decoded: Envelope = bincode::deserialize(&bytes).unwrap();
            assert_eq!(decoded, envelope);
        }
    }
}
