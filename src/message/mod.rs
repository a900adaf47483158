//! Message envelope and payload definitions.
mod control;
mod envelope;
mod lobby;

pub use control::{ErrorMessage, Handshake, Heartbeat, HeartbeatReply, Metadata};
pub use envelope::{Addressed, CorrelationId, Envelope, Header, Kind, Payload};
pub use lobby::{GameUpdate, Join, JoinReply, JoinStatus, Leave, LobbyInfo};
