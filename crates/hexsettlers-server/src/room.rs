//! Game room management.

use hexsettlers_core::{
    BuildOption, BuildTarget, GameAction, GameError, GameEvent, GameState, GameView, PlayerId,
    Rules, RulesPatch, TimeoutOutcome,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::protocol::{PlayerInfo, RoomInfo, RoomStatus};

pub const MAX_SEATS: u8 = 6;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room is full")]
    RoomFull,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Not the host")]
    NotHost,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Need at least {needed} players")]
    NotEnoughPlayers { needed: usize },

    #[error("Game not started")]
    GameNotStarted,

    #[error(transparent)]
    Game(#[from] GameError),
}

impl RoomError {
    /// Failed, but other seats still need the new state
    pub fn changes_state(&self) -> bool {
        matches!(self, RoomError::Game(e) if e.changes_state())
    }
}

/// A player in a game room.
#[derive(Debug, Clone)]
pub struct RoomPlayer {
    pub id: Uuid,
    pub name: String,
    pub connected: bool,
    /// Seat in the game, assigned when the game starts
    pub seat: Option<PlayerId>,
}

impl RoomPlayer {
    pub fn new(id: Uuid, name: String) -> Self {
        Self {
            id,
            name,
            connected: true,
            seat: None,
        }
    }

    pub fn to_info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name.clone(),
            connected: self.connected,
            seat: self.seat,
        }
    }
}

/// A game room that can hold up to six players.
pub struct GameRoom {
    pub id: Uuid,
    pub name: String,
    pub max_players: u8,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub players: HashMap<Uuid, RoomPlayer>,
    /// Join order; becomes seat order when the game starts
    pub player_order: Vec<Uuid>,
    pub rules: Rules,
    /// The game state (once started)
    pub game: Option<GameState>,
}

impl GameRoom {
    pub fn new(id: Uuid, host_id: Uuid, host_name: String, max_players: u8) -> Self {
        let mut players = HashMap::new();
        players.insert(host_id, RoomPlayer::new(host_id, host_name.clone()));

        Self {
            id,
            name: format!("{}'s Game", host_name),
            max_players: max_players.clamp(1, MAX_SEATS),
            host_id,
            status: RoomStatus::Waiting,
            players,
            player_order: vec![host_id],
            rules: Rules::default(),
            game: None,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players as usize
    }

    pub fn add_player(&mut self, player_id: Uuid, name: String) -> Result<(), RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }

        self.players.insert(player_id, RoomPlayer::new(player_id, name));
        self.player_order.push(player_id);
        Ok(())
    }

    pub fn remove_player(&mut self, player_id: Uuid) -> Result<bool, RoomError> {
        if !self.players.contains_key(&player_id) {
            return Err(RoomError::PlayerNotInRoom);
        }

        self.players.remove(&player_id);
        self.player_order.retain(|&id| id != player_id);

        // If host left, assign new host
        if player_id == self.host_id && !self.player_order.is_empty() {
            self.host_id = self.player_order[0];
        }

        // Return true if room is now empty
        Ok(self.players.is_empty())
    }

    pub fn set_player_connected(&mut self, player_id: Uuid, connected: bool) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.connected = connected;
        }
    }

    pub fn set_rules(&mut self, requester_id: Uuid, patch: &RulesPatch) -> Result<(), RoomError> {
        if requester_id != self.host_id {
            return Err(RoomError::NotHost);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        self.rules = patch.apply(&self.rules);
        Ok(())
    }

    pub fn start_game(&mut self, requester_id: Uuid, now_ms: u64) -> Result<(), RoomError> {
        if requester_id != self.host_id {
            return Err(RoomError::NotHost);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        let needed = if self.rules.scenario.allows_solo() { 1 } else { 2 };
        if self.players.len() < needed {
            return Err(RoomError::NotEnoughPlayers { needed });
        }

        let player_names: Vec<String> = self
            .player_order
            .iter()
            .filter_map(|id| self.players.get(id).map(|p| p.name.clone()))
            .collect();

        let mut game = GameState::new(self.rules.clone(), player_names)?;
        game.sync_timer(now_ms);

        for (seat, &player_id) in self.player_order.iter().enumerate() {
            if let Some(player) = self.players.get_mut(&player_id) {
                player.seat = Some(seat as PlayerId);
            }
        }

        self.game = Some(game);
        self.status = RoomStatus::InGame;
        Ok(())
    }

    pub fn seat_of(&self, player_id: Uuid) -> Result<PlayerId, RoomError> {
        self.players
            .get(&player_id)
            .and_then(|p| p.seat)
            .ok_or(RoomError::PlayerNotInRoom)
    }

    pub fn apply_action(
        &mut self,
        player_id: Uuid,
        action: GameAction,
        now_ms: u64,
    ) -> Result<Vec<GameEvent>, RoomError> {
        let seat = self.seat_of(player_id)?;
        let game = self.game.as_mut().ok_or(RoomError::GameNotStarted)?;

        let result = game.apply_action(seat, action);
        game.sync_timer(now_ms);
        let events = result?;

        if game.is_finished() {
            self.status = RoomStatus::Finished;
        }
        Ok(events)
    }

    /// Pause or resume; `None` toggles. Returns whether anything changed.
    pub fn set_paused(
        &mut self,
        player_id: Uuid,
        paused: Option<bool>,
        now_ms: u64,
    ) -> Result<bool, RoomError> {
        let seat = self.seat_of(player_id)?;
        let game = self.game.as_mut().ok_or(RoomError::GameNotStarted)?;
        let paused = paused.unwrap_or(!game.is_paused());
        Ok(game.set_paused(seat, paused, now_ms))
    }

    pub fn build_options(
        &self,
        player_id: Uuid,
        target: BuildTarget,
    ) -> Result<Vec<BuildOption>, RoomError> {
        let seat = self.seat_of(player_id)?;
        let game = self.game.as_ref().ok_or(RoomError::GameNotStarted)?;
        Ok(game.build_options(seat, target))
    }

    /// Apply default moves if the current phase deadline has passed
    pub fn tick(&mut self, now_ms: u64) -> Option<TimeoutOutcome> {
        let game = self.game.as_mut()?;
        let outcome = game.handle_timeout(now_ms)?;
        debug!(
            room = %self.id,
            phase = %outcome.phase,
            forced = outcome.forced,
            "Phase timed out"
        );
        if game.is_finished() {
            self.status = RoomStatus::Finished;
        }
        Some(outcome)
    }

    /// The game as `player_id` may see it; non-members get a spectator view
    pub fn view_for(&self, player_id: Uuid) -> Option<GameView> {
        let game = self.game.as_ref()?;
        let seat = self.players.get(&player_id).and_then(|p| p.seat);
        Some(game.view_for(seat))
    }

    pub fn get_winner(&self) -> Option<(PlayerId, String)> {
        let game = self.game.as_ref()?;
        let winner = game.winner()?;
        let winner_id = self.player_order.get(winner as usize)?;
        let winner_name = self.players.get(winner_id)?.name.clone();
        Some((winner, winner_name))
    }

    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            players: self
                .player_order
                .iter()
                .filter_map(|id| self.players.get(id).map(|p| p.to_info()))
                .collect(),
            max_players: self.max_players,
            host_id: self.host_id,
            status: self.status,
            rules: self.rules.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexsettlers_core::{Phase, PhaseKind, Resource, ResourceHand, Scenario, TradeResponse};

    fn room_with(players: usize) -> (GameRoom, Vec<Uuid>) {
        let host_id = Uuid::new_v4();
        let mut room = GameRoom::new(Uuid::new_v4(), host_id, "Host".to_string(), MAX_SEATS);
        let mut ids = vec![host_id];
        for i in 1..players {
            let id = Uuid::new_v4();
            room.add_player(id, format!("Player {}", i + 1)).unwrap();
            ids.push(id);
        }
        (room, ids)
    }

    #[test]
    fn test_create_room() {
        let host_id = Uuid::new_v4();
        let room = GameRoom::new(Uuid::new_v4(), host_id, "Host".to_string(), 4);

        assert_eq!(room.player_count(), 1);
        assert!(!room.is_full());
        assert_eq!(room.host_id, host_id);
        assert_eq!(room.status, RoomStatus::Waiting);
    }

    #[test]
    fn test_max_players_clamped_to_six() {
        let room = GameRoom::new(Uuid::new_v4(), Uuid::new_v4(), "Host".to_string(), 9);
        assert_eq!(room.max_players, 6);
    }

    #[test]
    fn test_add_remove_players() {
        let host_id = Uuid::new_v4();
        let mut room = GameRoom::new(Uuid::new_v4(), host_id, "Host".to_string(), 2);

        let player2 = Uuid::new_v4();
        room.add_player(player2, "Player 2".to_string()).unwrap();

        assert_eq!(room.player_count(), 2);
        assert!(room.is_full());

        // Can't add more players
        let player3 = Uuid::new_v4();
        assert!(room.add_player(player3, "Player 3".to_string()).is_err());

        // Remove a player
        let empty = room.remove_player(player2).unwrap();
        assert!(!empty);
        assert_eq!(room.player_count(), 1);
    }

    #[test]
    fn test_host_passes_on_leave() {
        let (mut room, ids) = room_with(3);
        room.remove_player(ids[0]).unwrap();
        assert_eq!(room.host_id, ids[1]);
    }

    #[test]
    fn test_start_game() {
        let (mut room, _) = room_with(1);
        let host_id = room.host_id;

        // Can't start with only 1 player
        assert!(matches!(
            room.start_game(host_id, 0),
            Err(RoomError::NotEnoughPlayers { needed: 2 })
        ));

        // Add another player
        let player2 = Uuid::new_v4();
        room.add_player(player2, "Player 2".to_string()).unwrap();

        // Non-host can't start
        assert!(matches!(room.start_game(player2, 0), Err(RoomError::NotHost)));

        // Host can start
        room.start_game(host_id, 0).unwrap();
        assert_eq!(room.status, RoomStatus::InGame);
        assert_eq!(room.seat_of(player2).unwrap(), 1);
        let game = room.game.as_ref().unwrap();
        assert_eq!(game.phase.kind(), PhaseKind::SetupSettlement);
        assert!(game.timer.is_some());
    }

    #[test]
    fn test_builder_scenario_starts_solo() {
        let (mut room, ids) = room_with(1);
        let patch = RulesPatch {
            map_mode: Some("seafarers".to_string()),
            seafarers_scenario: Some("test_builder".to_string()),
            ..RulesPatch::default()
        };
        room.set_rules(ids[0], &patch).unwrap();
        assert_eq!(room.rules.scenario, Scenario::TestBuilder);
        room.start_game(ids[0], 0).unwrap();
    }

    #[test]
    fn test_rules_locked_after_start() {
        let (mut room, ids) = room_with(2);
        assert!(matches!(
            room.set_rules(ids[1], &RulesPatch::default()),
            Err(RoomError::NotHost)
        ));
        room.start_game(ids[0], 0).unwrap();
        assert!(matches!(
            room.set_rules(ids[0], &RulesPatch::default()),
            Err(RoomError::GameAlreadyStarted)
        ));
    }

    #[test]
    fn test_out_of_turn_action_rejected() {
        let (mut room, ids) = room_with(2);
        room.start_game(ids[0], 0).unwrap();
        let current = room.game.as_ref().unwrap().current_player;
        let idle = ids[if current == 0 { 1 } else { 0 }];
        let err = room
            .apply_action(idle, GameAction::EndTurn, 10)
            .unwrap_err();
        assert!(matches!(err, RoomError::Game(GameError::NotYourTurn)));
    }

    #[test]
    fn test_failed_finalize_still_reports_state_change() {
        let (mut room, ids) = room_with(2);
        room.start_game(ids[0], 0).unwrap();
        let game = room.game.as_mut().unwrap();
        game.phase = Phase::MainActions;
        game.current_player = 0;
        game.players[0].resources = ResourceHand::single(Resource::Brick, 1);
        game.players[1].resources = ResourceHand::single(Resource::Ore, 1);

        room.apply_action(
            ids[0],
            GameAction::ProposeTrade {
                offer: ResourceHand::single(Resource::Brick, 1),
                request: ResourceHand::single(Resource::Ore, 1),
                replace_trade_id: None,
            },
            10,
        )
        .unwrap();
        let trade_id = room.game.as_ref().unwrap().pending_trade.as_ref().unwrap().id;
        room.apply_action(
            ids[1],
            GameAction::RespondTrade {
                trade_id,
                response: TradeResponse::Accept,
            },
            20,
        )
        .unwrap();
        room.game.as_mut().unwrap().players[1].resources = ResourceHand::new();

        let err = room
            .apply_action(
                ids[0],
                GameAction::FinalizeTrade {
                    trade_id,
                    with_player_id: 1,
                },
                30,
            )
            .unwrap_err();
        assert!(matches!(err, RoomError::Game(GameError::CounterpartShort)));
        assert!(err.changes_state());
        assert!(room.game.as_ref().unwrap().pending_trade.is_none());
    }

    #[test]
    fn test_pause_toggles() {
        let (mut room, ids) = room_with(2);
        room.start_game(ids[0], 0).unwrap();
        assert!(room.set_paused(ids[1], None, 100).unwrap());
        assert!(room.game.as_ref().unwrap().is_paused());
        assert!(room.set_paused(ids[0], None, 200).unwrap());
        assert!(!room.game.as_ref().unwrap().is_paused());
    }

    #[test]
    fn test_tick_after_deadline_moves_setup_on() {
        let (mut room, ids) = room_with(2);
        room.start_game(ids[0], 0).unwrap();
        assert!(room.tick(1).is_none());
        let deadline = room.game.as_ref().unwrap().timer.unwrap().ends_at;
        let outcome = room.tick(deadline).unwrap();
        assert_eq!(outcome.phase, PhaseKind::SetupSettlement);
        assert_eq!(
            room.game.as_ref().unwrap().phase.kind(),
            PhaseKind::SetupRoad
        );
    }

    #[test]
    fn test_spectator_view() {
        let (mut room, ids) = room_with(2);
        room.start_game(ids[0], 0).unwrap();
        let view = room.view_for(Uuid::new_v4()).unwrap();
        assert_eq!(view.viewer, None);
        assert!(view.players.iter().all(|p| p.resources.is_none()));
    }
}
