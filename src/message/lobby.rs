//! Application payloads exchanged by the lobby and game layers.
//!
//! Only the envelope contract lives here, the lobby rules themselves belong to the application.

use crate::peer_id::PeerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyInfo {
    pub name: String,
    /// The host authority of the session.
    pub host: PeerId,
    pub players: Vec<PeerId>,
    pub capacity: usize,
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    pub player: PeerId,
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinStatus {
    Ok,
    Capacity,
    WrongCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReply {
    pub lobby: Option<LobbyInfo>,
    pub status: JoinStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leave {
    pub player: PeerId,
}

/// Game state snapshot, opaque to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub tick: u64,
    pub state: Vec<u8>,
}
