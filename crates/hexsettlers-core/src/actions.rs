//! Game actions that players can take.
//!
//! This module defines all possible actions in the game and the events
//! that result from those actions. Actions travel as JSON objects tagged by
//! `kind`, with camelCase fields.

use crate::board::{PlayerId, Resource, Terrain};
use crate::geometry::{EdgeId, NodeId, TileId};
use crate::player::{DevCardKind, ResourceHand};
use crate::trade::TradeResponse;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which thief a seafarers seven (or knight) moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThiefTarget {
    Robber,
    Pirate,
}

fn one() -> u32 {
    1
}

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameAction {
    // ==================== Building ====================
    #[serde(rename_all = "camelCase")]
    PlaceSettlement { node_id: NodeId },
    #[serde(rename_all = "camelCase")]
    PlaceRoad { edge_id: EdgeId },
    #[serde(rename_all = "camelCase")]
    PlaceShip { edge_id: EdgeId },
    #[serde(rename_all = "camelCase")]
    MoveShip {
        from_edge_id: EdgeId,
        to_edge_id: EdgeId,
    },
    #[serde(rename_all = "camelCase")]
    UpgradeCity { node_id: NodeId },

    // ==================== Development Cards ====================
    BuyDevCard,
    #[serde(rename_all = "camelCase")]
    PlayDevCard {
        card_id: u32,
        /// Two picks for an invention
        #[serde(default)]
        choices: Vec<Resource>,
        /// The resource named by a monopoly
        #[serde(default)]
        resource_kind: Option<Resource>,
    },

    // ==================== Dice & Thieves ====================
    RollDice,
    DiscardCards { cards: ResourceHand },
    ChooseThief { target: ThiefTarget },
    #[serde(rename_all = "camelCase")]
    MoveRobber { tile_id: TileId },
    #[serde(rename_all = "camelCase")]
    RobberSteal { victim_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    MovePirate { tile_id: TileId },
    #[serde(rename_all = "camelCase")]
    PirateSteal { victim_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    ChooseDiscovery { resource_kind: Resource },

    // ==================== Trading ====================
    #[serde(rename_all = "camelCase")]
    BankTrade {
        give_kind: Resource,
        take_kind: Resource,
        #[serde(default = "one")]
        take_qty: u32,
        /// Only 4 is accepted: trade at 4:1 even with a better port
        #[serde(default)]
        force_ratio: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    ProposeTrade {
        offer: ResourceHand,
        request: ResourceHand,
        #[serde(default)]
        replace_trade_id: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    RespondTrade {
        trade_id: u32,
        response: TradeResponse,
    },
    #[serde(rename_all = "camelCase")]
    FinalizeTrade {
        trade_id: u32,
        with_player_id: PlayerId,
    },

    // ==================== Turn ====================
    EndTurn,
}

impl GameAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            GameAction::PlaceSettlement { .. } => ActionKind::PlaceSettlement,
            GameAction::PlaceRoad { .. } => ActionKind::PlaceRoad,
            GameAction::PlaceShip { .. } => ActionKind::PlaceShip,
            GameAction::MoveShip { .. } => ActionKind::MoveShip,
            GameAction::UpgradeCity { .. } => ActionKind::UpgradeCity,
            GameAction::BuyDevCard => ActionKind::BuyDevCard,
            GameAction::PlayDevCard { .. } => ActionKind::PlayDevCard,
            GameAction::RollDice => ActionKind::RollDice,
            GameAction::DiscardCards { .. } => ActionKind::DiscardCards,
            GameAction::ChooseThief { .. } => ActionKind::ChooseThief,
            GameAction::MoveRobber { .. } => ActionKind::MoveRobber,
            GameAction::RobberSteal { .. } => ActionKind::RobberSteal,
            GameAction::MovePirate { .. } => ActionKind::MovePirate,
            GameAction::PirateSteal { .. } => ActionKind::PirateSteal,
            GameAction::ChooseDiscovery { .. } => ActionKind::ChooseDiscovery,
            GameAction::BankTrade { .. } => ActionKind::BankTrade,
            GameAction::ProposeTrade { .. } => ActionKind::ProposeTrade,
            GameAction::RespondTrade { .. } => ActionKind::RespondTrade,
            GameAction::FinalizeTrade { .. } => ActionKind::FinalizeTrade,
            GameAction::EndTurn => ActionKind::EndTurn,
        }
    }
}

/// Discriminant of [`GameAction`], used by the phase tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    PlaceSettlement,
    PlaceRoad,
    PlaceShip,
    MoveShip,
    UpgradeCity,
    BuyDevCard,
    PlayDevCard,
    RollDice,
    DiscardCards,
    ChooseThief,
    MoveRobber,
    RobberSteal,
    MovePirate,
    PirateSteal,
    ChooseDiscovery,
    BankTrade,
    ProposeTrade,
    RespondTrade,
    FinalizeTrade,
    EndTurn,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::PlaceSettlement => "place_settlement",
            ActionKind::PlaceRoad => "place_road",
            ActionKind::PlaceShip => "place_ship",
            ActionKind::MoveShip => "move_ship",
            ActionKind::UpgradeCity => "upgrade_city",
            ActionKind::BuyDevCard => "buy_dev_card",
            ActionKind::PlayDevCard => "play_dev_card",
            ActionKind::RollDice => "roll_dice",
            ActionKind::DiscardCards => "discard_cards",
            ActionKind::ChooseThief => "choose_thief",
            ActionKind::MoveRobber => "move_robber",
            ActionKind::RobberSteal => "robber_steal",
            ActionKind::MovePirate => "move_pirate",
            ActionKind::PirateSteal => "pirate_steal",
            ActionKind::ChooseDiscovery => "choose_discovery",
            ActionKind::BankTrade => "bank_trade",
            ActionKind::ProposeTrade => "propose_trade",
            ActionKind::RespondTrade => "respond_trade",
            ActionKind::FinalizeTrade => "finalize_trade",
            ActionKind::EndTurn => "end_turn",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a build-options query is asking about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "targetKind", content = "targetId", rename_all = "snake_case")]
pub enum BuildTarget {
    Node(NodeId),
    Edge(EdgeId),
}

/// A build that would currently succeed on the queried target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOption {
    pub action: GameAction,
    pub label: String,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    SettlementPlaced {
        player: PlayerId,
        node: NodeId,
    },
    CityBuilt {
        player: PlayerId,
        node: NodeId,
    },
    RoadPlaced {
        player: PlayerId,
        edge: EdgeId,
    },
    ShipPlaced {
        player: PlayerId,
        edge: EdgeId,
    },
    ShipMoved {
        player: PlayerId,
        from: EdgeId,
        to: EdgeId,
    },

    /// Round-two settlement paid out its neighbouring tiles
    StartingResources {
        player: PlayerId,
        resources: ResourceHand,
    },
    IslandBonus {
        player: PlayerId,
        points: u32,
    },
    FarSideBonus {
        player: PlayerId,
        points: u32,
    },

    DiceRolled {
        player: PlayerId,
        dice: (u8, u8),
        total: u8,
    },
    ResourcesProduced {
        gains: Vec<(PlayerId, ResourceHand)>,
    },
    DiscardRequired {
        players: Vec<(PlayerId, u32)>,
    },
    CardsDiscarded {
        player: PlayerId,
        count: u32,
    },

    RobberMoved {
        player: PlayerId,
        tile: TileId,
    },
    PirateMoved {
        player: PlayerId,
        tile: TileId,
    },
    ResourceStolen {
        thief: PlayerId,
        victim: PlayerId,
        resource: Option<Resource>,
    },

    FogRevealed {
        player: PlayerId,
        tile: TileId,
        terrain: Terrain,
    },
    DiscoveryClaimed {
        player: PlayerId,
        resource: Resource,
        amount: u32,
    },

    DevCardBought {
        player: PlayerId,
        card_id: u32,
    },
    DevCardPlayed {
        player: PlayerId,
        card: DevCardKind,
    },
    MonopolyCollected {
        player: PlayerId,
        resource: Resource,
        amount: u32,
    },

    BankTraded {
        player: PlayerId,
        gave: Resource,
        gave_amount: u32,
        took: Resource,
        took_amount: u32,
    },
    TradeProposed {
        trade_id: u32,
        from: PlayerId,
    },
    TradeResponded {
        trade_id: u32,
        player: PlayerId,
        response: TradeResponse,
    },
    TradeWithdrawn {
        trade_id: u32,
    },
    TradeCompleted {
        trade_id: u32,
        from: PlayerId,
        with: PlayerId,
    },

    LongestRoadChanged {
        holder: Option<PlayerId>,
        length: u32,
    },
    LargestArmyChanged {
        holder: PlayerId,
        size: u32,
    },

    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },
    SetupCompleted,
    GameWon {
        player: PlayerId,
        victory_points: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_action_wire_format() {
        let action: GameAction =
            serde_json::from_str(r#"{"kind":"place_settlement","nodeId":12}"#).unwrap();
        assert_eq!(action, GameAction::PlaceSettlement { node_id: 12 });

        let action: GameAction = serde_json::from_str(
            r#"{"kind":"bank_trade","giveKind":"ore","takeKind":"wool"}"#,
        )
        .unwrap();
        assert_eq!(
            action,
            GameAction::BankTrade {
                give_kind: Resource::Ore,
                take_kind: Resource::Wool,
                take_qty: 1,
                force_ratio: None,
            }
        );
    }

    #[test]
    fn test_partial_hands_deserialize() {
        let action: GameAction =
            serde_json::from_str(r#"{"kind":"discard_cards","cards":{"ore":2}}"#).unwrap();
        assert_eq!(
            action,
            GameAction::DiscardCards {
                cards: ResourceHand::single(Resource::Ore, 2)
            }
        );
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(serde_json::from_str::<GameAction>(r#"{"kind":"fly"}"#).is_err());
    }

    #[test]
    fn test_kind_names_match_wire_tags() {
        let json = serde_json::to_value(GameAction::EndTurn).unwrap();
        assert_eq!(json["kind"], ActionKind::EndTurn.as_str());
    }
}
