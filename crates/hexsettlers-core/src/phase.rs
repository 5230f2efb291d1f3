//! Turn phases and the tables that govern them.
//!
//! A [`Phase`] carries the context its sub-step needs (who still owes a
//! discard, who can be robbed), so the context disappears with the phase.
//! [`PhaseKind::successors`] lists every legal transition and
//! [`PhaseKind::permits`] lists which actions each phase accepts.

use crate::actions::ActionKind;
use crate::board::PlayerId;
use crate::geometry::TileId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Players who must discard after a seven, and who already have
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscardContext {
    pub id: u32,
    pub required: BTreeMap<PlayerId, u32>,
    pub done: BTreeSet<PlayerId>,
}

impl DiscardContext {
    pub fn owes(&self, player: PlayerId) -> Option<u32> {
        if self.done.contains(&player) {
            None
        } else {
            self.required.get(&player).copied()
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = (PlayerId, u32)> + '_ {
        self.required
            .iter()
            .filter(|(p, _)| !self.done.contains(p))
            .map(|(&p, &n)| (p, n))
    }

    pub fn is_complete(&self) -> bool {
        self.pending().next().is_none()
    }
}

/// A robber or pirate standing on a tile with players to rob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StealContext {
    pub id: u32,
    pub tile: TileId,
    pub victims: Vec<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Phase {
    SetupSettlement { round: u8 },
    SetupRoad { round: u8 },
    AwaitRoll,
    MainActions,
    Discard(DiscardContext),
    ThiefChoice,
    RobberMove,
    RobberSteal(StealContext),
    PirateMove,
    PirateSteal(StealContext),
    GameOver { winner: PlayerId },
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::SetupSettlement { .. } => PhaseKind::SetupSettlement,
            Phase::SetupRoad { .. } => PhaseKind::SetupRoad,
            Phase::AwaitRoll => PhaseKind::AwaitRoll,
            Phase::MainActions => PhaseKind::MainActions,
            Phase::Discard(_) => PhaseKind::Discard,
            Phase::ThiefChoice => PhaseKind::ThiefChoice,
            Phase::RobberMove => PhaseKind::RobberMove,
            Phase::RobberSteal(_) => PhaseKind::RobberSteal,
            Phase::PirateMove => PhaseKind::PirateMove,
            Phase::PirateSteal(_) => PhaseKind::PirateSteal,
            Phase::GameOver { .. } => PhaseKind::GameOver,
        }
    }

    pub fn setup_round(&self) -> Option<u8> {
        match self {
            Phase::SetupSettlement { round } | Phase::SetupRoad { round } => Some(*round),
            _ => None,
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self, Phase::GameOver { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    SetupSettlement,
    SetupRoad,
    AwaitRoll,
    MainActions,
    Discard,
    ThiefChoice,
    RobberMove,
    RobberSteal,
    PirateMove,
    PirateSteal,
    GameOver,
}

impl PhaseKind {
    /// Phases reachable in one step
    pub fn successors(self) -> &'static [PhaseKind] {
        use PhaseKind::*;
        match self {
            SetupSettlement => &[SetupRoad],
            SetupRoad => &[SetupSettlement, AwaitRoll],
            AwaitRoll => &[MainActions, Discard, ThiefChoice, RobberMove, GameOver],
            MainActions => &[AwaitRoll, ThiefChoice, RobberMove, GameOver],
            Discard => &[ThiefChoice, RobberMove],
            ThiefChoice => &[RobberMove, PirateMove],
            RobberMove => &[RobberSteal, MainActions],
            RobberSteal => &[MainActions],
            PirateMove => &[PirateSteal, MainActions],
            PirateSteal => &[MainActions],
            GameOver => &[],
        }
    }

    /// Staying in the same kind of phase is always allowed
    pub fn can_transition_to(self, next: PhaseKind) -> bool {
        self == next || self.successors().contains(&next)
    }

    /// Actions accepted while in this phase
    pub fn permits(self, action: ActionKind) -> bool {
        use ActionKind as A;
        if action == A::RespondTrade {
            return self != PhaseKind::GameOver;
        }
        match self {
            PhaseKind::SetupSettlement => matches!(action, A::PlaceSettlement),
            PhaseKind::SetupRoad => matches!(action, A::PlaceRoad | A::PlaceShip),
            PhaseKind::AwaitRoll => matches!(action, A::RollDice | A::MoveShip | A::ChooseDiscovery),
            PhaseKind::MainActions => matches!(
                action,
                A::PlaceSettlement
                    | A::PlaceRoad
                    | A::PlaceShip
                    | A::MoveShip
                    | A::UpgradeCity
                    | A::BuyDevCard
                    | A::PlayDevCard
                    | A::BankTrade
                    | A::ProposeTrade
                    | A::FinalizeTrade
                    | A::ChooseDiscovery
                    | A::EndTurn
            ),
            PhaseKind::Discard => matches!(action, A::DiscardCards),
            PhaseKind::ThiefChoice => matches!(action, A::ChooseThief),
            PhaseKind::RobberMove => matches!(action, A::MoveRobber),
            PhaseKind::RobberSteal => matches!(action, A::RobberSteal),
            PhaseKind::PirateMove => matches!(action, A::MovePirate),
            PhaseKind::PirateSteal => matches!(action, A::PirateSteal),
            PhaseKind::GameOver => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PhaseKind::SetupSettlement => "setup_settlement",
            PhaseKind::SetupRoad => "setup_road",
            PhaseKind::AwaitRoll => "await_roll",
            PhaseKind::MainActions => "main_actions",
            PhaseKind::Discard => "discard",
            PhaseKind::ThiefChoice => "thief_choice",
            PhaseKind::RobberMove => "robber_move",
            PhaseKind::RobberSteal => "robber_steal",
            PhaseKind::PirateMove => "pirate_move",
            PhaseKind::PirateSteal => "pirate_steal",
            PhaseKind::GameOver => "game_over",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
