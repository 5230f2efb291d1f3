//! Hex Settlers - authoritative engine for a hex-grid settlement game
//!
//! This crate holds the complete rules for 1 to 6 seats:
//! - Hex geometry and procedural board generation for five scenarios
//! - The resource bank and per-player ledgers
//! - A phase state machine with full rule enforcement
//! - Longest road, trading and timeout-driven default moves
//!
//! # Architecture
//!
//! The engine is platform-agnostic and has no clock of its own; callers pass
//! the current time in milliseconds. It compiles to:
//! - Native Rust for server-side game hosting
//! - WebAssembly for client-side local play
//!
//! # Modules
//!
//! - [`geometry`]: axial coordinates and the tile/node/edge graph
//! - [`generator`]: constrained board generation per [`scenario`]
//! - [`game`]: the state machine, driven through [`GameState::apply_action`]
//! - [`supervisor`]: default moves when a phase deadline passes
//! - [`view`]: per-viewer snapshots

pub mod actions;
pub mod bank;
pub mod board;
pub mod game;
pub mod generator;
pub mod geometry;
pub mod log;
pub mod longest_road;
pub mod phase;
pub mod player;
pub mod ports;
pub mod rules;
pub mod scenario;
pub mod supervisor;
pub mod timer;
pub mod trade;
pub mod view;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{ActionKind, BuildOption, BuildTarget, GameAction, GameEvent, ThiefTarget};
pub use bank::{Bank, GainSource, LossSource, ResourceTally};
pub use board::{Board, Building, BuildingKind, PlayerId, Port, PortKind, Resource, Route, RouteKind, Terrain, Tile};
pub use game::{ErrorCategory, GameError, GameState};
pub use generator::{generate_board, BoardGenerator, GeneratedBoard};
pub use geometry::{EdgeId, Geometry, HexCoord, NodeId, TileId};
pub use log::{GameLog, LogEntry, LogKind};
pub use phase::{Phase, PhaseKind};
pub use player::{DevCard, DevCardKind, Player, PlayerColor, ResourceHand};
pub use rules::{Rules, RulesPatch};
pub use scenario::Scenario;
pub use supervisor::TimeoutOutcome;
pub use timer::{ParkedDeadline, PauseState, PhaseTimer};
pub use trade::{PendingTrade, TradeResponse};
pub use view::{GameView, PlayerView};
