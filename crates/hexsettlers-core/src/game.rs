//! Game state machine and rule enforcement.
//!
//! [`GameState::apply_action`] is the single entry point for changing a game.
//! Every action passes the same gate (game over, paused, turn, pending gold
//! discovery, phase table) and each handler validates fully before it
//! mutates, so an `Err` leaves the state exactly as it was.

use crate::actions::{ActionKind, BuildOption, BuildTarget, GameAction, GameEvent, ThiefTarget};
use crate::bank::{Bank, GainSource, LossSource};
use crate::board::{Board, BuildingKind, PlayerId, Resource, RouteKind, Terrain};
use crate::generator::BoardGenerator;
use crate::geometry::{EdgeId, NodeId, TileId};
use crate::log::{GameLog, LogKind};
use crate::longest_road::{award_holder, longest_route};
use crate::phase::{DiscardContext, Phase, PhaseKind, StealContext};
use crate::player::{costs, DevCard, DevCardKind, Player, ResourceHand};
use crate::rules::Rules;
use crate::scenario::{self, Scenario};
use crate::timer::{ParkedDeadline, PauseState, PhaseTimer};
use crate::trade::PendingTrade;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub const MAX_PLAYERS: usize = 6;

/// Knights needed before Largest Army is awarded
pub const LARGEST_ARMY_MIN: u32 = 3;

/// Broad grouping of rule violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    TurnPhase,
    Resource,
    Topology,
    Protocol,
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    // Turn / phase
    #[error("Not your turn")]
    NotYourTurn,

    #[error("`{action}` is not allowed during {phase}")]
    WrongPhase { action: ActionKind, phase: PhaseKind },

    #[error("Game is over")]
    GameOver,

    #[error("Game is paused")]
    Paused,

    #[error("Choose your gold field resource first")]
    DiscoveryPending,

    #[error("No gold discovery to resolve")]
    NoDiscoveryPending,

    #[error("Ships are only used on seafarers maps")]
    SeafarersOnly,

    #[error("You already moved a ship this turn")]
    ShipAlreadyMoved,

    #[error("Development cards cannot be played on the turn they are bought")]
    CardTooNew,

    #[error("Only one development card per turn")]
    DevCardAlreadyPlayed,

    #[error("That card was already played")]
    CardAlreadyPlayed,

    #[error("You do not need to discard")]
    NoDiscardOwed,

    // Resources
    #[error("Cannot afford this")]
    CannotAfford,

    #[error("Not enough {0}")]
    NotEnough(Resource),

    #[error("The bank is out of {0}")]
    BankShort(Resource),

    #[error("No development cards left in deck")]
    EmptyDeck,

    #[error("You must discard exactly {required} cards")]
    WrongDiscardCount { required: u32 },

    #[error("Trading partner no longer has the requested cards")]
    CounterpartShort,

    #[error("You no longer hold the cards you offered")]
    ProposerShort,

    // Topology
    #[error("No such node: {0}")]
    UnknownNode(NodeId),

    #[error("No such edge: {0}")]
    UnknownEdge(EdgeId),

    #[error("No such tile: {0}")]
    UnknownTile(TileId),

    #[error("Must build on land")]
    NotOnLand,

    #[error("Starting settlements must go on the start island")]
    OutsideStartRegion,

    #[error("Starting settlements cannot touch a gold field")]
    TouchesGold,

    #[error("Too close to another settlement")]
    TooClose,

    #[error("Must connect to your network")]
    NotConnected,

    #[error("Must connect to the settlement you just placed")]
    NotAtNewSettlement,

    #[error("Edge already taken")]
    EdgeOccupied,

    #[error("Roads must touch land")]
    RoadOffLand,

    #[error("Ships must touch the sea")]
    ShipOffSea,

    #[error("The pirate blocks that edge")]
    PirateAdjacent,

    #[error("Not your settlement")]
    NotYourSettlement,

    #[error("Not your ship")]
    NotYourShip,

    #[error("That ship is locked in place")]
    ShipNotMovable,

    #[error("Choose a different destination")]
    SameEdge,

    #[error("The robber must move to a different tile")]
    RobberMustMove,

    #[error("The robber cannot go on the sea")]
    RobberOnSea,

    #[error("The pirate must move to a different sea tile")]
    PirateMustMove,

    #[error("The pirate must stay at sea")]
    PirateOnLand,

    // Protocol
    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("A game needs 1 to 6 players, got {0}")]
    InvalidPlayerCount(usize),

    #[error("Dice must show 1 to 6")]
    InvalidDice,

    #[error("Don't have that card")]
    NoSuchCard,

    #[error("Invalid card play: {0}")]
    InvalidCardPlay(String),

    #[error("That player cannot be robbed")]
    NotAVictim,

    #[error("Invalid trade: {0}")]
    InvalidTrade(String),

    #[error("No active trade")]
    NoActiveTrade,

    #[error("A trade is already open")]
    TradePending,

    #[error("That trade is no longer open")]
    TradeMismatch,

    #[error("You cannot answer your own trade")]
    OwnTrade,

    #[error("Only the proposer can finalize")]
    NotYourTrade,

    #[error("That player has not accepted")]
    NotAccepted,
}

impl GameError {
    pub fn category(&self) -> ErrorCategory {
        use GameError::*;
        match self {
            NotYourTurn | WrongPhase { .. } | GameOver | Paused | DiscoveryPending
            | NoDiscoveryPending | SeafarersOnly | ShipAlreadyMoved | CardTooNew
            | DevCardAlreadyPlayed | CardAlreadyPlayed | NoDiscardOwed => ErrorCategory::TurnPhase,
            CannotAfford | NotEnough(_) | BankShort(_) | EmptyDeck | WrongDiscardCount { .. }
            | CounterpartShort | ProposerShort => ErrorCategory::Resource,
            UnknownNode(_) | UnknownEdge(_) | UnknownTile(_) | NotOnLand | OutsideStartRegion
            | TouchesGold | TooClose | NotConnected | NotAtNewSettlement | EdgeOccupied
            | RoadOffLand | ShipOffSea | PirateAdjacent | NotYourSettlement | NotYourShip
            | ShipNotMovable | SameEdge | RobberMustMove | RobberOnSea | PirateMustMove
            | PirateOnLand => ErrorCategory::Topology,
            UnknownPlayer(_) | InvalidPlayerCount(_) | InvalidDice | NoSuchCard
            | InvalidCardPlay(_) | NotAVictim | InvalidTrade(_) | NoActiveTrade | TradePending
            | TradeMismatch | OwnTrade | NotYourTrade | NotAccepted => ErrorCategory::Protocol,
        }
    }

    /// The action failed but the game still moved on: a finalize whose
    /// re-check withdrew the trade or recorded a rejection.
    pub fn changes_state(&self) -> bool {
        matches!(self, GameError::ProposerShort | GameError::CounterpartShort)
    }
}

/// Holder of Longest Road or Largest Army
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub holder: Option<PlayerId>,
    pub size: u32,
}

/// Free roads left from a Road Building card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeRoads {
    pub player: PlayerId,
    pub remaining: u8,
}

/// A revealed gold field waiting for its discoverer to pick a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldDiscovery {
    pub id: u32,
    pub player: PlayerId,
    pub tile: TileId,
}

/// The settlement a setup road has to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupAwaiting {
    pub player: PlayerId,
    pub node: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub dice: (u8, u8),
    pub total: u8,
}

/// The most recent notable event, for client animation. Parts of it are
/// private to the players involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LastEvent {
    DevCardDraw {
        id: u32,
        player: PlayerId,
        card: Option<DevCardKind>,
    },
    Steal {
        id: u32,
        thief: PlayerId,
        victim: PlayerId,
        resource: Option<Resource>,
    },
    GoldDiscovered {
        id: u32,
        player: PlayerId,
        tile: TileId,
    },
}

/// Monotonic ids handed out by a game
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    dev_card: u32,
    trade: u32,
    context: u32,
    event: u32,
}

impl Counters {
    pub fn next_dev_card(&mut self) -> u32 {
        self.dev_card += 1;
        self.dev_card
    }

    pub fn next_trade(&mut self) -> u32 {
        self.trade += 1;
        self.trade
    }

    pub fn next_context(&mut self) -> u32 {
        self.context += 1;
        self.context
    }

    pub fn next_event(&mut self) -> u32 {
        self.event += 1;
        self.event
    }
}

fn fresh_rng() -> StdRng {
    StdRng::from_entropy()
}

/// The complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub rules: Rules,
    pub board: Board,
    /// Indexed by player id
    pub players: Vec<Player>,
    pub turn_order: Vec<PlayerId>,
    pub current_player: PlayerId,
    pub phase: Phase,
    pub turn_number: u32,
    pub bank: Bank,
    pub(crate) dev_deck: Vec<DevCardKind>,
    pub pending_trade: Option<PendingTrade>,
    pub longest_road: Award,
    pub largest_army: Award,
    pub free_roads: Option<FreeRoads>,
    pub gold_discovery: Option<GoldDiscovery>,
    /// Position in the snake-order setup sequence
    pub setup_index: usize,
    pub setup_awaiting: Option<SetupAwaiting>,
    /// Turn on which each player last moved a ship
    pub ship_moved_turn: BTreeMap<PlayerId, u32>,
    pub last_roll: Option<DiceRoll>,
    /// Count of each total, indexed 0..=12
    pub dice_histogram: [u32; 13],
    pub log: GameLog,
    pub last_event: Option<LastEvent>,
    pub timer: Option<PhaseTimer>,
    pub pause: Option<PauseState>,
    #[serde(default)]
    pub(crate) parked_main: Option<ParkedDeadline>,
    pub(crate) counters: Counters,
    #[serde(skip, default = "fresh_rng")]
    pub(crate) rng: StdRng,
}

impl GameState {
    /// Create a new game with a freshly generated board
    pub fn new(rules: Rules, player_names: Vec<String>) -> Result<Self, GameError> {
        Self::from_rng(rules, player_names, StdRng::from_entropy())
    }

    /// Create a reproducible game
    pub fn with_seed(rules: Rules, player_names: Vec<String>, seed: u64) -> Result<Self, GameError> {
        Self::from_rng(rules, player_names, StdRng::seed_from_u64(seed))
    }

    fn from_rng(rules: Rules, player_names: Vec<String>, mut rng: StdRng) -> Result<Self, GameError> {
        let generated = BoardGenerator::new(rules.scenario).generate(&mut rng);
        let mut game = Self::with_board(rules, player_names, generated.board, rng)?;
        if generated.used_fallback {
            game.log.push(
                LogKind::System,
                "Board generated without the 6/8 spacing constraint",
            );
        }
        Ok(game)
    }

    /// Create a game on a prepared board
    pub fn with_board(
        rules: Rules,
        player_names: Vec<String>,
        board: Board,
        mut rng: StdRng,
    ) -> Result<Self, GameError> {
        let count = player_names.len();
        if count == 0 || count > MAX_PLAYERS {
            return Err(GameError::InvalidPlayerCount(count));
        }
        let players: Vec<Player> = player_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Player::new(i as PlayerId, name))
            .collect();

        use rand::seq::SliceRandom;
        let mut turn_order: Vec<PlayerId> = players.iter().map(|p| p.id).collect();
        turn_order.shuffle(&mut rng);
        let dev_deck = DevCardKind::shuffled_deck(&mut rng);
        let current_player = turn_order[0];

        let mut log = GameLog::default();
        log.push(
            LogKind::System,
            format!("Game started on {} ({} players)", rules.scenario, count),
        );

        Ok(Self {
            rules,
            board,
            players,
            turn_order,
            current_player,
            phase: Phase::SetupSettlement { round: 1 },
            turn_number: 0,
            bank: Bank::new(),
            dev_deck,
            pending_trade: None,
            longest_road: Award::default(),
            largest_army: Award::default(),
            free_roads: None,
            gold_discovery: None,
            setup_index: 0,
            setup_awaiting: None,
            ship_moved_turn: BTreeMap::new(),
            last_roll: None,
            dice_histogram: [0; 13],
            log,
            last_event: None,
            timer: None,
            pause: None,
            parked_main: None,
            counters: Counters::default(),
            rng,
        })
    }

    // ==================== Queries ====================

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    /// Seat lookup for ids that already passed the gate
    pub(crate) fn seat(&self, id: PlayerId) -> &Player {
        &self.players[id as usize]
    }

    pub(crate) fn seat_mut(&mut self, id: PlayerId) -> &mut Player {
        &mut self.players[id as usize]
    }

    pub(crate) fn name_of(&self, id: PlayerId) -> String {
        self.get_player(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("Player {id}"))
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_over()
    }

    pub fn winner(&self) -> Option<PlayerId> {
        match self.phase {
            Phase::GameOver { winner } => Some(winner),
            _ => None,
        }
    }

    pub fn dev_deck_len(&self) -> usize {
        self.dev_deck.len()
    }

    pub fn is_seafarers(&self) -> bool {
        self.rules.scenario.is_seafarers()
    }

    /// Whether `player` still has a discard outstanding
    pub fn owes_discard(&self, player: PlayerId) -> bool {
        match &self.phase {
            Phase::Discard(ctx) => ctx.owes(player).is_some(),
            _ => false,
        }
    }

    /// Points from buildings, revealed cards, bonuses and both awards
    pub fn compute_victory_points(&self, player: PlayerId) -> u32 {
        let Some(seat) = self.get_player(player) else {
            return 0;
        };
        let mut vp = self.board.building_points(player) + seat.bonus_points();
        if self.largest_army.holder == Some(player) {
            vp += 2;
        }
        if self.longest_road.holder == Some(player) {
            vp += 2;
        }
        vp
    }

    // ==================== Action Entry ====================

    /// Apply an action for `player`. On error nothing changes.
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.check_gate(player, action.kind())?;
        let mut events = Vec::new();

        match action {
            // ==================== Building ====================
            GameAction::PlaceSettlement { node_id } => {
                self.place_settlement(player, node_id, &mut events)?
            }
            GameAction::PlaceRoad { edge_id } => self.place_road(player, edge_id, &mut events)?,
            GameAction::PlaceShip { edge_id } => self.place_ship(player, edge_id, &mut events)?,
            GameAction::MoveShip {
                from_edge_id,
                to_edge_id,
            } => self.move_ship(player, from_edge_id, to_edge_id, &mut events)?,
            GameAction::UpgradeCity { node_id } => {
                self.upgrade_city(player, node_id, &mut events)?
            }

            // ==================== Development Cards ====================
            GameAction::BuyDevCard => self.buy_dev_card(player, &mut events)?,
            GameAction::PlayDevCard {
                card_id,
                choices,
                resource_kind,
            } => self.play_dev_card(player, card_id, &choices, resource_kind, &mut events)?,

            // ==================== Dice & Thieves ====================
            GameAction::RollDice => {
                let d1 = self.rng.gen_range(1..=6);
                let d2 = self.rng.gen_range(1..=6);
                self.resolve_roll(player, d1, d2, &mut events);
            }
            GameAction::DiscardCards { cards } => {
                self.discard_cards(player, cards, &mut events)?
            }
            GameAction::ChooseThief { target } => self.choose_thief(target)?,
            GameAction::MoveRobber { tile_id } => {
                self.move_robber(player, tile_id, &mut events)?
            }
            GameAction::RobberSteal { victim_id } => {
                self.steal(player, victim_id, &mut events)?
            }
            GameAction::MovePirate { tile_id } => {
                self.move_pirate(player, tile_id, &mut events)?
            }
            GameAction::PirateSteal { victim_id } => {
                self.steal(player, victim_id, &mut events)?
            }
            GameAction::ChooseDiscovery { resource_kind } => {
                self.choose_discovery(player, resource_kind, &mut events)?
            }

            // ==================== Trading ====================
            GameAction::BankTrade {
                give_kind,
                take_kind,
                take_qty,
                force_ratio,
            } => self.bank_trade(player, give_kind, take_kind, take_qty, force_ratio, &mut events)?,
            GameAction::ProposeTrade {
                offer,
                request,
                replace_trade_id,
            } => self.propose_trade(player, offer, request, replace_trade_id, &mut events)?,
            GameAction::RespondTrade { trade_id, response } => {
                self.respond_trade(player, trade_id, response, &mut events)?
            }
            GameAction::FinalizeTrade {
                trade_id,
                with_player_id,
            } => self.finalize_trade(player, trade_id, with_player_id, &mut events)?,

            // ==================== Turn Management ====================
            GameAction::EndTurn => self.end_turn(player, &mut events),
        }

        Ok(events)
    }

    /// Roll with chosen dice instead of the game's RNG
    pub fn roll_dice_with(
        &mut self,
        player: PlayerId,
        d1: u8,
        d2: u8,
    ) -> Result<Vec<GameEvent>, GameError> {
        if !(1..=6).contains(&d1) || !(1..=6).contains(&d2) {
            return Err(GameError::InvalidDice);
        }
        self.check_gate(player, ActionKind::RollDice)?;
        let mut events = Vec::new();
        self.resolve_roll(player, d1, d2, &mut events);
        Ok(events)
    }

    /// Which builds would succeed on a node or edge right now, found by
    /// dry-running each candidate on a copy of the game
    pub fn build_options(&self, viewer: PlayerId, target: BuildTarget) -> Vec<BuildOption> {
        if self.is_paused() || self.is_finished() || viewer != self.current_player {
            return Vec::new();
        }
        let candidates = match target {
            BuildTarget::Node(node_id) => vec![
                (GameAction::PlaceSettlement { node_id }, "Settlement"),
                (GameAction::UpgradeCity { node_id }, "City"),
            ],
            BuildTarget::Edge(edge_id) => vec![
                (GameAction::PlaceRoad { edge_id }, "Road"),
                (GameAction::PlaceShip { edge_id }, "Ship"),
            ],
        };
        candidates
            .into_iter()
            .filter(|(action, _)| self.clone().apply_action(viewer, action.clone()).is_ok())
            .map(|(action, label)| BuildOption {
                action,
                label: label.to_string(),
            })
            .collect()
    }

    fn check_gate(&self, player: PlayerId, kind: ActionKind) -> Result<(), GameError> {
        if self.get_player(player).is_none() {
            return Err(GameError::UnknownPlayer(player));
        }
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        if self.is_paused() {
            return Err(GameError::Paused);
        }
        let out_of_turn_ok = match kind {
            ActionKind::RespondTrade => true,
            ActionKind::DiscardCards => self.owes_discard(player),
            _ => false,
        };
        if player != self.current_player && !out_of_turn_ok {
            return Err(GameError::NotYourTurn);
        }
        if let Some(discovery) = self.gold_discovery {
            if discovery.player == player && kind != ActionKind::ChooseDiscovery {
                return Err(GameError::DiscoveryPending);
            }
        }
        let phase = self.phase.kind();
        if !phase.permits(kind) {
            return Err(GameError::WrongPhase {
                action: kind,
                phase,
            });
        }
        Ok(())
    }

    // ==================== Ledger Helpers ====================

    /// Draw from the bank into a hand; returns what the bank could give
    pub(crate) fn grant(
        &mut self,
        player: PlayerId,
        resource: Resource,
        wanted: u32,
        source: GainSource,
    ) -> u32 {
        let given = self.bank.give(resource, wanted);
        let seat = self.seat_mut(player);
        seat.resources.add(resource, given);
        seat.tally.record_gain(source, resource, given);
        given
    }

    /// Pay a cost the caller already checked back into the bank
    pub(crate) fn pay(&mut self, player: PlayerId, cost: &ResourceHand, source: LossSource) {
        for (resource, amount) in cost.iter() {
            let seat = self.seat_mut(player);
            let taken = seat.resources.take(resource, amount);
            seat.tally.record_loss(source, resource, taken);
            self.bank.receive(resource, taken);
        }
    }

    /// Move cards between players without touching the bank
    pub(crate) fn transfer(
        &mut self,
        from: PlayerId,
        to: PlayerId,
        resource: Resource,
        amount: u32,
        gain: GainSource,
        loss: LossSource,
    ) -> u32 {
        let moved = {
            let giver = self.seat_mut(from);
            let moved = giver.resources.take(resource, amount);
            giver.tally.record_loss(loss, resource, moved);
            moved
        };
        let taker = self.seat_mut(to);
        taker.resources.add(resource, moved);
        taker.tally.record_gain(gain, resource, moved);
        moved
    }

    // ==================== Phase Helpers ====================

    pub(crate) fn set_phase(&mut self, next: Phase) {
        debug_assert!(
            self.phase.kind().can_transition_to(next.kind()),
            "illegal transition {} -> {}",
            self.phase.kind(),
            next.kind()
        );
        self.phase = next;
    }

    /// After a seven (or knight): choose a thief on seafarers maps, else move the robber
    pub(crate) fn begin_thief(&mut self) {
        if self.is_seafarers() && self.board.pirate.is_some() {
            self.set_phase(Phase::ThiefChoice);
        } else {
            self.set_phase(Phase::RobberMove);
        }
    }

    fn check_node(&self, node: NodeId) -> Result<NodeId, GameError> {
        if node < self.board.node_count() {
            Ok(node)
        } else {
            Err(GameError::UnknownNode(node))
        }
    }

    fn check_edge(&self, edge: EdgeId) -> Result<EdgeId, GameError> {
        if edge < self.board.edge_count() {
            Ok(edge)
        } else {
            Err(GameError::UnknownEdge(edge))
        }
    }

    fn check_tile(&self, tile: TileId) -> Result<TileId, GameError> {
        if tile < self.board.tile_count() {
            Ok(tile)
        } else {
            Err(GameError::UnknownTile(tile))
        }
    }

    // ==================== Scoring ====================

    fn refresh_victory_points(&mut self) {
        for id in 0..self.players.len() {
            let vp = self.compute_victory_points(id as PlayerId);
            self.players[id].victory_points = vp;
        }
    }

    /// Recompute route lengths, the Longest Road holder and every score
    pub(crate) fn refresh_standings(&mut self, events: &mut Vec<GameEvent>) {
        let lengths: Vec<(PlayerId, u32)> = self
            .players
            .iter()
            .map(|p| (p.id, longest_route(&self.board, p.id)))
            .collect();
        for &(id, length) in &lengths {
            self.seat_mut(id).longest_road_length = length;
        }
        let holder = award_holder(&lengths, self.longest_road.holder);
        let size = holder.map_or(0, |h| lengths[h as usize].1);
        if holder != self.longest_road.holder {
            events.push(GameEvent::LongestRoadChanged {
                holder,
                length: size,
            });
            let text = match holder {
                Some(h) => format!("{} takes Longest Road ({size})", self.name_of(h)),
                None => "Longest Road is unclaimed".to_string(),
            };
            self.log.push(LogKind::Victory, text);
        }
        self.longest_road = Award { holder, size };
        self.refresh_victory_points();
    }

    /// End the game if `player` reached the target
    pub(crate) fn check_win(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) -> bool {
        let vp = self.compute_victory_points(player);
        if vp < self.rules.victory_points_to_win {
            return false;
        }
        self.set_phase(Phase::GameOver { winner: player });
        self.pending_trade = None;
        events.push(GameEvent::GameWon {
            player,
            victory_points: vp,
        });
        let name = self.name_of(player);
        self.log
            .push(LogKind::Victory, format!("{name} wins with {vp} points"));
        true
    }

    // ==================== Setup ====================

    /// All land around the node lies within `regions`, unexplored fog
    /// counting as sea
    fn node_within(&self, node: NodeId, regions: &[&[(i32, i32)]]) -> bool {
        let mut saw_land = false;
        for &tile in &self.board.geometry.node_tiles[node] {
            let tile = &self.board.tiles[tile];
            if !tile.is_land() {
                continue;
            }
            saw_land = true;
            if !regions.iter().any(|keys| scenario::contains(keys, tile.coord)) {
                return false;
            }
        }
        saw_land
    }

    fn check_setup_region(&self, node: NodeId) -> Result<(), GameError> {
        match self.rules.scenario {
            Scenario::ThroughTheDesert => {
                if !self.node_within(node, &[&scenario::DESERT_START_ISLAND]) {
                    return Err(GameError::OutsideStartRegion);
                }
                if self.board.node_touches_terrain(node, Terrain::Gold) {
                    return Err(GameError::TouchesGold);
                }
            }
            Scenario::FogIsland => {
                if !self.node_within(node, &[&scenario::FOG_START_EAST, &scenario::FOG_START_WEST]) {
                    return Err(GameError::OutsideStartRegion);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn check_setup_route(&self, player: PlayerId, edge: EdgeId) -> Result<(), GameError> {
        let awaiting = self
            .setup_awaiting
            .filter(|a| a.player == player)
            .ok_or(GameError::NotAtNewSettlement)?;
        if !self.board.geometry.edges[edge]
            .endpoints()
            .contains(&awaiting.node)
        {
            return Err(GameError::NotAtNewSettlement);
        }
        Ok(())
    }

    /// Step the snake order on after a setup route
    fn advance_setup(&mut self, events: &mut Vec<GameEvent>) {
        let n = self.turn_order.len();
        self.setup_awaiting = None;
        self.setup_index += 1;
        if self.setup_index >= 2 * n {
            self.current_player = self.turn_order[0];
            self.set_phase(Phase::AwaitRoll);
            events.push(GameEvent::SetupCompleted);
            let name = self.name_of(self.current_player);
            self.log
                .push(LogKind::Turn, format!("Setup complete. {name} rolls first"));
            return;
        }
        let (round, seat) = if self.setup_index < n {
            (1, self.turn_order[self.setup_index])
        } else {
            (2, self.turn_order[2 * n - 1 - self.setup_index])
        };
        self.current_player = seat;
        self.set_phase(Phase::SetupSettlement { round });
    }

    // ==================== Placement ====================

    fn place_settlement(
        &mut self,
        player: PlayerId,
        node: NodeId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let node = self.check_node(node)?;
        let setup_round = self.phase.setup_round();
        if self.board.has_sea() && !self.board.node_touches_land(node) {
            return Err(GameError::NotOnLand);
        }
        if setup_round.is_some() {
            self.check_setup_region(node)?;
        }
        if !self.board.distance_rule_ok(node) {
            return Err(GameError::TooClose);
        }
        if setup_round.is_none() {
            if !self.seat(player).resources.can_afford(&costs::settlement()) {
                return Err(GameError::CannotAfford);
            }
            if !self
                .board
                .settlement_connected(node, player, self.is_seafarers())
            {
                return Err(GameError::NotConnected);
            }
        }

        let island_bonus = setup_round.is_none() && self.rules.scenario.awards_island_bonus() && {
            let islands = self.board.islands();
            self.board
                .island_of_node(node, &islands)
                .map_or(false, |island| {
                    !self.board.has_building_on_island(player, island, &islands)
                })
        };

        if setup_round.is_none() {
            self.pay(player, &costs::settlement(), LossSource::Build);
        }
        self.board.place_settlement(node, player);
        events.push(GameEvent::SettlementPlaced { player, node });
        let name = self.name_of(player);
        self.log
            .push(LogKind::Build, format!("{name} built a settlement"));

        if island_bonus {
            self.seat_mut(player).island_bonus_vp += 2;
            events.push(GameEvent::IslandBonus { player, points: 2 });
            self.log
                .push(LogKind::Victory, format!("{name} settled a new island (+2)"));
        }

        match setup_round {
            Some(round) => {
                self.setup_awaiting = Some(SetupAwaiting { player, node });
                if round == 2 {
                    let mut resources = ResourceHand::new();
                    for resource in self.board.starting_yield(node) {
                        let got = self.grant(player, resource, 1, GainSource::Setup);
                        resources.add(resource, got);
                    }
                    if !resources.is_empty() {
                        events.push(GameEvent::StartingResources { player, resources });
                    }
                }
                self.set_phase(Phase::SetupRoad { round });
            }
            None => {
                self.setup_awaiting = None;
                let far_side = self.rules.scenario == Scenario::ThroughTheDesert
                    && self.seat(player).far_side_bonus_vp == 0
                    && self.board.geometry.node_tiles[node].iter().any(|&t| {
                        scenario::contains(&scenario::DESERT_FAR_SIDE, self.board.tiles[t].coord)
                    });
                if far_side {
                    self.seat_mut(player).far_side_bonus_vp = 2;
                    events.push(GameEvent::FarSideBonus { player, points: 2 });
                    self.log.push(
                        LogKind::Victory,
                        format!("{name} crossed the desert (+2)"),
                    );
                }
            }
        }

        self.refresh_standings(events);
        if setup_round.is_none() {
            self.check_win(player, events);
        }
        Ok(())
    }

    fn free_road_available(&self, player: PlayerId) -> bool {
        self.free_roads
            .map_or(false, |f| f.player == player && f.remaining > 0)
    }

    fn place_road(
        &mut self,
        player: PlayerId,
        edge: EdgeId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let edge = self.check_edge(edge)?;
        if self.board.route(edge).is_some() {
            return Err(GameError::EdgeOccupied);
        }
        if self.board.has_sea() && !self.board.edge_touches_land(edge) {
            return Err(GameError::RoadOffLand);
        }
        let in_setup = self.phase.setup_round().is_some();
        let free = !in_setup && self.free_road_available(player);
        if in_setup {
            self.check_setup_route(player, edge)?;
        } else {
            if !self.board.route_connects(edge, player, RouteKind::Road, None) {
                return Err(GameError::NotConnected);
            }
            if !free && !self.seat(player).resources.can_afford(&costs::road()) {
                return Err(GameError::CannotAfford);
            }
        }

        if !in_setup && !free {
            self.pay(player, &costs::road(), LossSource::Build);
        }
        self.board.place_route(edge, player, RouteKind::Road);
        events.push(GameEvent::RoadPlaced { player, edge });
        let name = self.name_of(player);
        self.log.push(LogKind::Build, format!("{name} built a road"));

        if free {
            if let Some(f) = self.free_roads.as_mut() {
                f.remaining -= 1;
                if f.remaining == 0 {
                    self.free_roads = None;
                }
            }
        }
        self.explore_fog(player, edge, events);
        if in_setup {
            self.advance_setup(events);
        }

        self.refresh_standings(events);
        if !in_setup {
            self.check_win(player, events);
        }
        Ok(())
    }

    fn place_ship(
        &mut self,
        player: PlayerId,
        edge: EdgeId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        if !self.is_seafarers() {
            return Err(GameError::SeafarersOnly);
        }
        let edge = self.check_edge(edge)?;
        if self.board.route(edge).is_some() {
            return Err(GameError::EdgeOccupied);
        }
        if !self.board.edge_touches_sea(edge) {
            return Err(GameError::ShipOffSea);
        }
        if self.board.edge_near_pirate(edge) {
            return Err(GameError::PirateAdjacent);
        }
        let in_setup = self.phase.setup_round().is_some();
        if in_setup {
            self.check_setup_route(player, edge)?;
        } else {
            if !self.seat(player).resources.can_afford(&costs::ship()) {
                return Err(GameError::CannotAfford);
            }
            if !self.board.route_connects(edge, player, RouteKind::Ship, None) {
                return Err(GameError::NotConnected);
            }
        }

        if !in_setup {
            self.pay(player, &costs::ship(), LossSource::Build);
        }
        self.board.place_route(edge, player, RouteKind::Ship);
        events.push(GameEvent::ShipPlaced { player, edge });
        let name = self.name_of(player);
        self.log.push(LogKind::Build, format!("{name} built a ship"));

        self.explore_fog(player, edge, events);
        if in_setup {
            self.advance_setup(events);
        }

        self.refresh_standings(events);
        if !in_setup {
            self.check_win(player, events);
        }
        Ok(())
    }

    fn move_ship(
        &mut self,
        player: PlayerId,
        from: EdgeId,
        to: EdgeId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        if !self.is_seafarers() {
            return Err(GameError::SeafarersOnly);
        }
        let from = self.check_edge(from)?;
        let to = self.check_edge(to)?;
        if from == to {
            return Err(GameError::SameEdge);
        }
        if self.ship_moved_turn.get(&player) == Some(&self.turn_number) {
            return Err(GameError::ShipAlreadyMoved);
        }
        if self.board.edge_near_pirate(from) {
            return Err(GameError::PirateAdjacent);
        }
        let owns_ship = self
            .board
            .route(from)
            .map_or(false, |r| r.owner == player && r.kind == RouteKind::Ship);
        if !owns_ship {
            return Err(GameError::NotYourShip);
        }
        if self.board.route(to).is_some() {
            return Err(GameError::EdgeOccupied);
        }
        if !self.board.ship_is_movable(from, player) {
            return Err(GameError::ShipNotMovable);
        }
        if !self.board.edge_touches_sea(to) {
            return Err(GameError::ShipOffSea);
        }
        if self.board.edge_near_pirate(to) {
            return Err(GameError::PirateAdjacent);
        }
        if !self
            .board
            .route_connects(to, player, RouteKind::Ship, Some(from))
        {
            return Err(GameError::NotConnected);
        }

        self.board.remove_route(from);
        self.board.place_route(to, player, RouteKind::Ship);
        self.ship_moved_turn.insert(player, self.turn_number);
        events.push(GameEvent::ShipMoved { player, from, to });
        let name = self.name_of(player);
        self.log.push(LogKind::Build, format!("{name} moved a ship"));

        self.explore_fog(player, to, events);
        self.refresh_standings(events);
        self.check_win(player, events);
        Ok(())
    }

    fn upgrade_city(
        &mut self,
        player: PlayerId,
        node: NodeId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let node = self.check_node(node)?;
        match self.board.building(node) {
            Some(b) if b.owner == player && b.kind == BuildingKind::Settlement => {}
            _ => return Err(GameError::NotYourSettlement),
        }
        if !self.seat(player).resources.can_afford(&costs::city()) {
            return Err(GameError::CannotAfford);
        }

        self.pay(player, &costs::city(), LossSource::Build);
        self.board.upgrade_to_city(node);
        events.push(GameEvent::CityBuilt { player, node });
        let name = self.name_of(player);
        self.log.push(LogKind::Build, format!("{name} built a city"));

        self.refresh_standings(events);
        self.check_win(player, events);
        Ok(())
    }

    // ==================== Fog ====================

    /// Reveal the fog tile next to a freshly placed route, paying out what
    /// it hid
    fn explore_fog(&mut self, player: PlayerId, edge: EdgeId, events: &mut Vec<GameEvent>) {
        if self.rules.scenario != Scenario::FogIsland
            || !matches!(
                self.phase.kind(),
                PhaseKind::MainActions | PhaseKind::AwaitRoll
            )
            || self.gold_discovery.is_some()
        {
            return;
        }
        let Some(tile) = self.board.unexplored_tile_on_edge(edge) else {
            return;
        };
        let Some(terrain) = self.board.reveal(tile) else {
            return;
        };
        events.push(GameEvent::FogRevealed {
            player,
            tile,
            terrain,
        });
        let name = self.name_of(player);
        match terrain {
            Terrain::Gold => {
                let id = self.counters.next_event();
                self.gold_discovery = Some(GoldDiscovery { id, player, tile });
                self.last_event = Some(LastEvent::GoldDiscovered { id, player, tile });
                self.log
                    .push(LogKind::Discover, format!("{name} discovered a gold field"));
            }
            other => match other.resource() {
                Some(resource) => {
                    let amount = self.grant(player, resource, 1, GainSource::Discovery);
                    events.push(GameEvent::DiscoveryClaimed {
                        player,
                        resource,
                        amount,
                    });
                    self.log.push(
                        LogKind::Discover,
                        format!("{name} discovered {resource} land"),
                    );
                }
                None => self
                    .log
                    .push(LogKind::Discover, format!("{name} found open sea")),
            },
        }
    }

    fn choose_discovery(
        &mut self,
        player: PlayerId,
        resource: Resource,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        match self.gold_discovery {
            Some(d) if d.player == player => {}
            _ => return Err(GameError::NoDiscoveryPending),
        }
        self.gold_discovery = None;
        let amount = self.grant(player, resource, 1, GainSource::Discovery);
        events.push(GameEvent::DiscoveryClaimed {
            player,
            resource,
            amount,
        });
        let name = self.name_of(player);
        self.log
            .push(LogKind::Discover, format!("{name} took {amount} {resource} from gold"));
        Ok(())
    }

    // ==================== Development Cards ====================

    fn buy_dev_card(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        if !self
            .seat(player)
            .resources
            .can_afford(&costs::development_card())
        {
            return Err(GameError::CannotAfford);
        }
        if self.dev_deck.is_empty() {
            return Err(GameError::EmptyDeck);
        }

        self.pay(player, &costs::development_card(), LossSource::Build);
        let Some(kind) = self.dev_deck.pop() else {
            return Err(GameError::EmptyDeck);
        };
        let id = self.counters.next_dev_card();
        let turn = self.turn_number;
        self.seat_mut(player).dev_cards.push(DevCard {
            id,
            kind,
            bought_on_turn: turn,
            played: false,
        });
        self.last_event = Some(LastEvent::DevCardDraw {
            id: self.counters.next_event(),
            player,
            card: Some(kind),
        });
        events.push(GameEvent::DevCardBought {
            player,
            card_id: id,
        });
        let name = self.name_of(player);
        self.log
            .push(LogKind::Dev, format!("{name} bought a development card"));
        Ok(())
    }

    fn play_dev_card(
        &mut self,
        player: PlayerId,
        card_id: u32,
        choices: &[Resource],
        resource_kind: Option<Resource>,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let card = self
            .seat(player)
            .dev_card(card_id)
            .cloned()
            .ok_or(GameError::NoSuchCard)?;
        if card.played {
            return Err(GameError::CardAlreadyPlayed);
        }
        if card.kind != DevCardKind::VictoryPoint {
            if card.bought_on_turn == self.turn_number {
                return Err(GameError::CardTooNew);
            }
            if self.seat(player).dev_played_turn == Some(self.turn_number) {
                return Err(GameError::DevCardAlreadyPlayed);
            }
        }
        let monopoly_kind = match card.kind {
            DevCardKind::Invention if choices.len() != 2 => {
                return Err(GameError::InvalidCardPlay(
                    "invention needs exactly two choices".into(),
                ))
            }
            DevCardKind::Monopoly => Some(resource_kind.ok_or_else(|| {
                GameError::InvalidCardPlay("monopoly needs a resource".into())
            })?),
            _ => None,
        };

        let turn = self.turn_number;
        let seat = self.seat_mut(player);
        if let Some(c) = seat.dev_card_mut(card_id) {
            c.played = true;
        }
        if card.kind != DevCardKind::VictoryPoint {
            seat.dev_played_turn = Some(turn);
        }
        events.push(GameEvent::DevCardPlayed {
            player,
            card: card.kind,
        });
        let name = self.name_of(player);
        self.log
            .push(LogKind::Dev, format!("{name} played {}", card.kind.label()));

        match card.kind {
            DevCardKind::VictoryPoint => {
                self.seat_mut(player).revealed_vp_cards += 1;
                self.refresh_victory_points();
                self.check_win(player, events);
            }
            DevCardKind::Knight => {
                let army = {
                    let seat = self.seat_mut(player);
                    seat.army_size += 1;
                    seat.army_size
                };
                let overtakes = army >= LARGEST_ARMY_MIN
                    && (self.largest_army.holder.is_none() || army > self.largest_army.size);
                if overtakes {
                    if self.largest_army.holder != Some(player) {
                        events.push(GameEvent::LargestArmyChanged {
                            holder: player,
                            size: army,
                        });
                        self.log
                            .push(LogKind::Victory, format!("{name} takes Largest Army"));
                    }
                    self.largest_army = Award {
                        holder: Some(player),
                        size: army,
                    };
                }
                self.refresh_victory_points();
                if !self.check_win(player, events) {
                    self.begin_thief();
                }
            }
            DevCardKind::RoadBuilding => {
                self.free_roads = Some(FreeRoads {
                    player,
                    remaining: 2,
                });
            }
            DevCardKind::Invention => {
                for &resource in choices {
                    self.grant(player, resource, 1, GainSource::DevCard);
                }
            }
            DevCardKind::Monopoly => {
                if let Some(resource) = monopoly_kind {
                    self.collect_monopoly(player, resource, events);
                }
            }
        }
        Ok(())
    }

    fn collect_monopoly(&mut self, player: PlayerId, resource: Resource, events: &mut Vec<GameEvent>) {
        let opponents: Vec<PlayerId> = self
            .players
            .iter()
            .map(|p| p.id)
            .filter(|&id| id != player)
            .collect();
        let mut amount = 0;
        for opponent in opponents {
            amount += self.transfer(
                opponent,
                player,
                resource,
                u32::MAX,
                GainSource::DevCard,
                LossSource::DevCard,
            );
        }
        events.push(GameEvent::MonopolyCollected {
            player,
            resource,
            amount,
        });
        let name = self.name_of(player);
        self.log
            .push(LogKind::Dev, format!("{name} collected {amount} {resource}"));
    }

    // ==================== Dice ====================

    fn resolve_roll(&mut self, player: PlayerId, d1: u8, d2: u8, events: &mut Vec<GameEvent>) {
        let total = d1 + d2;
        self.last_roll = Some(DiceRoll {
            dice: (d1, d2),
            total,
        });
        self.dice_histogram[total as usize] += 1;
        events.push(GameEvent::DiceRolled {
            player,
            dice: (d1, d2),
            total,
        });
        let name = self.name_of(player);
        self.log.push(LogKind::Roll, format!("{name} rolled {total}"));

        if total == 7 {
            let limit = self.rules.discard_limit;
            let required: BTreeMap<PlayerId, u32> = self
                .players
                .iter()
                .filter(|p| p.resources.total() > limit)
                .map(|p| (p.id, p.resources.total() / 2))
                .collect();
            if required.is_empty() {
                self.begin_thief();
            } else {
                events.push(GameEvent::DiscardRequired {
                    players: required.iter().map(|(&p, &n)| (p, n)).collect(),
                });
                let id = self.counters.next_context();
                self.set_phase(Phase::Discard(DiscardContext {
                    id,
                    required,
                    done: BTreeSet::new(),
                }));
            }
            return;
        }

        let mut gains: BTreeMap<PlayerId, ResourceHand> = BTreeMap::new();
        for (owner, resource, wanted) in self.board.production(total) {
            let got = self.grant(owner, resource, wanted, GainSource::Production);
            if got > 0 {
                gains.entry(owner).or_default().add(resource, got);
            }
        }
        for (owner, hand) in &gains {
            let text = hand
                .iter()
                .map(|(r, n)| format!("{n} {r}"))
                .collect::<Vec<_>>()
                .join(", ");
            let who = self.name_of(*owner);
            self.log
                .push(LogKind::Production, format!("{who} received {text}"));
        }
        if !gains.is_empty() {
            events.push(GameEvent::ResourcesProduced {
                gains: gains.into_iter().collect(),
            });
        }
        self.set_phase(Phase::MainActions);
    }

    fn discard_cards(
        &mut self,
        player: PlayerId,
        cards: ResourceHand,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let Phase::Discard(ctx) = &self.phase else {
            return Err(GameError::NoDiscardOwed);
        };
        let required = ctx.owes(player).ok_or(GameError::NoDiscardOwed)?;
        let hand = &self.seat(player).resources;
        if let Some((resource, _)) = cards.iter().find(|&(r, n)| hand.get(r) < n) {
            return Err(GameError::NotEnough(resource));
        }
        if cards.total() != required {
            return Err(GameError::WrongDiscardCount { required });
        }

        self.pay(player, &cards, LossSource::Discard);
        let complete = match &mut self.phase {
            Phase::Discard(ctx) => {
                ctx.done.insert(player);
                ctx.is_complete()
            }
            _ => true,
        };
        events.push(GameEvent::CardsDiscarded {
            player,
            count: required,
        });
        let name = self.name_of(player);
        self.log
            .push(LogKind::Discard, format!("{name} discarded {required} cards"));
        if complete {
            self.begin_thief();
        }
        Ok(())
    }

    // ==================== Robber & Pirate ====================

    fn choose_thief(&mut self, target: ThiefTarget) -> Result<(), GameError> {
        if !self.is_seafarers() {
            return Err(GameError::SeafarersOnly);
        }
        match target {
            ThiefTarget::Robber => self.set_phase(Phase::RobberMove),
            ThiefTarget::Pirate => self.set_phase(Phase::PirateMove),
        }
        Ok(())
    }

    fn move_robber(
        &mut self,
        player: PlayerId,
        tile: TileId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let tile = self.check_tile(tile)?;
        if self.board.is_sea(tile) {
            return Err(GameError::RobberOnSea);
        }
        if self.board.robber == Some(tile) {
            return Err(GameError::RobberMustMove);
        }

        self.board.robber = Some(tile);
        events.push(GameEvent::RobberMoved { player, tile });
        let name = self.name_of(player);
        self.log.push(LogKind::Robber, format!("{name} moved the robber"));
        let victims = self.board.robber_victims(tile, player);
        if victims.is_empty() {
            self.set_phase(Phase::MainActions);
        } else {
            let id = self.counters.next_context();
            self.set_phase(Phase::RobberSteal(StealContext { id, tile, victims }));
        }
        Ok(())
    }

    fn move_pirate(
        &mut self,
        player: PlayerId,
        tile: TileId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        if !self.is_seafarers() {
            return Err(GameError::SeafarersOnly);
        }
        let tile = self.check_tile(tile)?;
        if !self.board.is_sea(tile) {
            return Err(GameError::PirateOnLand);
        }
        if self.board.pirate == Some(tile) {
            return Err(GameError::PirateMustMove);
        }

        self.board.pirate = Some(tile);
        events.push(GameEvent::PirateMoved { player, tile });
        let name = self.name_of(player);
        self.log.push(LogKind::Robber, format!("{name} moved the pirate"));
        let victims = self.board.pirate_victims(tile, player);
        if victims.is_empty() {
            self.set_phase(Phase::MainActions);
        } else {
            let id = self.counters.next_context();
            self.set_phase(Phase::PirateSteal(StealContext { id, tile, victims }));
        }
        Ok(())
    }

    /// Take one random card from a victim of the robber or pirate
    fn steal(
        &mut self,
        thief: PlayerId,
        victim: PlayerId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let ctx = match &self.phase {
            Phase::RobberSteal(ctx) | Phase::PirateSteal(ctx) => ctx,
            _ => return Err(GameError::NotAVictim),
        };
        if !ctx.victims.contains(&victim) {
            return Err(GameError::NotAVictim);
        }

        let resource = self.players[victim as usize]
            .resources
            .random_kind(&mut self.rng);
        if let Some(resource) = resource {
            self.transfer(victim, thief, resource, 1, GainSource::Steal, LossSource::Steal);
        }
        self.last_event = Some(LastEvent::Steal {
            id: self.counters.next_event(),
            thief,
            victim,
            resource,
        });
        events.push(GameEvent::ResourceStolen {
            thief,
            victim,
            resource,
        });
        let (a, b) = (self.name_of(thief), self.name_of(victim));
        let text = match resource {
            Some(_) => format!("{a} stole a card from {b}"),
            None => format!("{a} found nothing to steal from {b}"),
        };
        self.log.push(LogKind::Robber, text);
        self.set_phase(Phase::MainActions);
        Ok(())
    }

    // ==================== Turn Management ====================

    fn end_turn(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) {
        self.pending_trade = None;
        if self.free_roads.map_or(false, |f| f.player == player) {
            self.free_roads = None;
        }
        let position = self
            .turn_order
            .iter()
            .position(|&p| p == player)
            .unwrap_or(0);
        let next = self.turn_order[(position + 1) % self.turn_order.len()];
        self.current_player = next;
        self.turn_number += 1;
        self.set_phase(Phase::AwaitRoll);
        events.push(GameEvent::TurnEnded {
            player,
            next_player: next,
        });
        let name = self.name_of(next);
        self.log.push(LogKind::Turn, format!("{name}'s turn"));
    }
}
