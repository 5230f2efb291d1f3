//! Per-viewer snapshots of a game.
//!
//! A view never contains the deck order, an opponent's hand or unplayed
//! cards (until the game ends), private details of the last event, or what
//! an unexplored fog tile hides.

use crate::bank::ResourceTally;
use crate::board::{Board, PlayerId, Terrain};
use crate::game::{Award, DiceRoll, FreeRoads, GameState, GoldDiscovery, LastEvent, SetupAwaiting};
use crate::log::LogEntry;
use crate::phase::Phase;
use crate::player::{DevCard, PlayerColor, ResourceHand};
use crate::rules::Rules;
use crate::timer::{PauseState, PhaseTimer};
use crate::trade::PendingTrade;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub color: PlayerColor,
    pub victory_points: u32,
    pub army_size: u32,
    pub longest_road_length: u32,
    pub hand_count: u32,
    pub dev_count: usize,
    /// Only for the viewer themself, or everyone once the game is over
    pub resources: Option<ResourceHand>,
    pub dev_cards: Option<Vec<DevCard>>,
    pub tally: Option<ResourceTally>,
    /// Face-up cards are public
    pub revealed_vp_cards: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub viewer: Option<PlayerId>,
    pub rules: Rules,
    pub board: Board,
    pub players: Vec<PlayerView>,
    pub turn_order: Vec<PlayerId>,
    pub current_player: PlayerId,
    pub phase: Phase,
    pub turn_number: u32,
    pub bank: ResourceHand,
    pub dev_deck_count: usize,
    pub pending_trade: Option<PendingTrade>,
    pub longest_road: Award,
    pub largest_army: Award,
    pub free_roads: Option<FreeRoads>,
    pub gold_discovery: Option<GoldDiscovery>,
    pub setup_awaiting: Option<SetupAwaiting>,
    pub last_roll: Option<DiceRoll>,
    pub dice_histogram: [u32; 13],
    pub log: Vec<LogEntry>,
    pub last_event: Option<LastEvent>,
    pub timer: Option<PhaseTimer>,
    pub pause: Option<PauseState>,
}

impl GameState {
    /// Snapshot as seen by `viewer`; `None` is a spectator
    pub fn view_for(&self, viewer: Option<PlayerId>) -> GameView {
        let open = self.is_finished();
        let players = self
            .players
            .iter()
            .map(|p| {
                let visible = open || viewer == Some(p.id);
                PlayerView {
                    id: p.id,
                    name: p.name.clone(),
                    color: p.color,
                    victory_points: p.victory_points,
                    army_size: p.army_size,
                    longest_road_length: p.longest_road_length,
                    hand_count: p.resources.total(),
                    dev_count: p.unplayed_dev_cards(),
                    resources: visible.then(|| p.resources.clone()),
                    dev_cards: visible.then(|| p.dev_cards.clone()),
                    tally: visible.then(|| p.tally.clone()),
                    revealed_vp_cards: p.revealed_vp_cards,
                }
            })
            .collect();

        GameView {
            viewer,
            rules: self.rules.clone(),
            board: fogged_board(&self.board),
            players,
            turn_order: self.turn_order.clone(),
            current_player: self.current_player,
            phase: self.phase.clone(),
            turn_number: self.turn_number,
            bank: self.bank.stock().clone(),
            dev_deck_count: self.dev_deck_len(),
            pending_trade: self.pending_trade.clone(),
            longest_road: self.longest_road,
            largest_army: self.largest_army,
            free_roads: self.free_roads,
            gold_discovery: self.gold_discovery,
            setup_awaiting: self.setup_awaiting,
            last_roll: self.last_roll,
            dice_histogram: self.dice_histogram,
            log: self.log.entries().cloned().collect(),
            last_event: self.last_event.clone().map(|e| private_event(e, viewer, open)),
            timer: self.timer,
            pause: self.pause,
        }
    }
}

/// Unexplored fog reads as plain sea
fn fogged_board(board: &Board) -> Board {
    let mut board = board.clone();
    for tile in board.tiles.iter_mut().filter(|t| t.is_unexplored()) {
        tile.terrain = Terrain::Sea;
        tile.number = None;
        tile.hidden = None;
    }
    board
}

fn private_event(event: LastEvent, viewer: Option<PlayerId>, open: bool) -> LastEvent {
    if open {
        return event;
    }
    match event {
        LastEvent::DevCardDraw { id, player, card } => LastEvent::DevCardDraw {
            id,
            player,
            card: card.filter(|_| viewer == Some(player)),
        },
        LastEvent::Steal {
            id,
            thief,
            victim,
            resource,
        } => LastEvent::Steal {
            id,
            thief,
            victim,
            resource: resource.filter(|_| viewer == Some(thief) || viewer == Some(victim)),
        },
        other => other,
    }
}
