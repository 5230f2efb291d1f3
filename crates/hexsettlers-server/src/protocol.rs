//! WebSocket protocol messages for Hex Settlers rooms.
//!
//! Every message is a JSON object tagged by `type` with camelCase fields.

use hexsettlers_core::{BuildOption, BuildTarget, GameAction, GameView, Rules, RulesPatch};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a new game room
    #[serde(rename_all = "camelCase")]
    CreateRoom {
        player_name: String,
        #[serde(default)]
        max_players: Option<u8>,
        #[serde(default)]
        rules: Option<RulesPatch>,
    },

    /// Join an existing room
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: Uuid, player_name: String },

    /// Leave current room
    LeaveRoom,

    /// Change table rules before the game starts (host only)
    SetRules { rules: RulesPatch },

    /// Start the game (host only)
    StartGame,

    /// Submit a game action
    GameAction { action: GameAction },

    /// Pause or resume; toggles when `paused` is omitted
    PauseGame {
        #[serde(default)]
        paused: Option<bool>,
    },

    /// Ask which builds would succeed on a node or edge
    #[serde(rename_all = "camelCase")]
    QueryBuildOptions { target_kind: TargetKind, target_id: usize },

    /// Resend the caller's view of the game
    GetState,

    /// Request room list
    ListRooms,

    /// Ping for keepalive
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Node,
    Edge,
}

impl TargetKind {
    pub fn target(self, id: usize) -> BuildTarget {
        match self {
            TargetKind::Node => BuildTarget::Node(id),
            TargetKind::Edge => BuildTarget::Edge(id),
        }
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Welcome message with assigned player ID
    #[serde(rename_all = "camelCase")]
    Welcome { player_id: Uuid },

    /// Room membership or settings changed
    Room { room: RoomInfo },

    /// Left room successfully
    LeftRoom,

    /// List of rooms still waiting for players
    RoomList { rooms: Vec<RoomInfo> },

    /// The game as this client may see it
    State { state: Box<GameView> },

    /// Answer to `query_build_options`
    BuildOptions { options: Vec<BuildOption> },

    /// Error occurred
    Error { error: String },

    /// Pong response
    Pong,
}

impl ServerMessage {
    pub fn error(error: impl ToString) -> Self {
        ServerMessage::Error {
            error: error.to_string(),
        }
    }
}

/// Room information for clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub id: Uuid,
    pub name: String,
    pub players: Vec<PlayerInfo>,
    pub max_players: u8,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub rules: Rules,
}

/// Player information in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: Uuid,
    pub name: String,
    pub connected: bool,
    /// Game seat once the game has started
    pub seat: Option<u8>,
}

/// Room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}
