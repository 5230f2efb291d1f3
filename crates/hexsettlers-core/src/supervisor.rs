//! Default moves for players who let a phase deadline pass.
//!
//! Every synthesized move goes through [`GameState::apply_action`] like any
//! client action. When no legal move exists the phase is forced forward to
//! the nearest state where play can continue.

use crate::actions::{GameAction, GameEvent, ThiefTarget};
use crate::board::{PlayerId, Resource};
use crate::game::GameState;
use crate::geometry::{NodeId, TileId};
use crate::log::LogKind;
use crate::phase::{Phase, PhaseKind};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// What a timeout did to the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutOutcome {
    /// Phase whose deadline expired
    pub phase: PhaseKind,
    pub actions: Vec<(PlayerId, GameAction)>,
    pub events: Vec<GameEvent>,
    /// The phase was left without a regular action
    pub forced: bool,
}

impl GameState {
    /// Act for whoever is holding the game up if the deadline has passed.
    /// Returns `None` when nothing was due.
    pub fn handle_timeout(&mut self, now_ms: u64) -> Option<TimeoutOutcome> {
        if self.is_finished() || self.is_paused() {
            return None;
        }
        let Some(timer) = self.timer else {
            self.sync_timer(now_ms);
            return None;
        };
        if !timer.expired(now_ms) {
            return None;
        }

        let mut outcome = TimeoutOutcome {
            phase: self.phase.kind(),
            actions: Vec::new(),
            events: Vec::new(),
            forced: false,
        };

        if let Some(discovery) = self.gold_discovery {
            let resource = *Resource::ALL.choose(&mut self.rng).unwrap_or(&Resource::Grain);
            self.run(
                discovery.player,
                GameAction::ChooseDiscovery {
                    resource_kind: resource,
                },
                &mut outcome,
            );
        }

        let current = self.current_player;
        match self.phase.kind() {
            PhaseKind::SetupSettlement => {
                let nodes = self.legal_setup_nodes(current);
                match nodes.choose(&mut self.rng).copied() {
                    Some(node_id) => {
                        self.run(current, GameAction::PlaceSettlement { node_id }, &mut outcome);
                    }
                    None => self.log.push(
                        LogKind::System,
                        "No legal settlement spot left; waiting",
                    ),
                }
            }
            PhaseKind::SetupRoad => {
                let routes = self.legal_setup_routes(current);
                if let Some(action) = routes.choose(&mut self.rng).cloned() {
                    self.run(current, action, &mut outcome);
                }
            }
            PhaseKind::AwaitRoll => {
                self.run(current, GameAction::RollDice, &mut outcome);
            }
            PhaseKind::Discard => {
                let pending: Vec<(PlayerId, u32)> = match &self.phase {
                    Phase::Discard(ctx) => ctx.pending().collect(),
                    _ => Vec::new(),
                };
                for (player, count) in pending {
                    let cards = self.players[player as usize]
                        .resources
                        .random_cards(count, &mut self.rng);
                    self.run(player, GameAction::DiscardCards { cards }, &mut outcome);
                }
                if self.phase.kind() == PhaseKind::Discard {
                    self.begin_thief();
                    outcome.forced = true;
                }
            }
            PhaseKind::ThiefChoice => {
                self.run(
                    current,
                    GameAction::ChooseThief {
                        target: ThiefTarget::Robber,
                    },
                    &mut outcome,
                );
            }
            PhaseKind::RobberMove => {
                let tiles: Vec<TileId> = (0..self.board.tile_count())
                    .filter(|&t| !self.board.is_sea(t) && self.board.robber != Some(t))
                    .collect();
                match tiles.choose(&mut self.rng).copied() {
                    Some(tile_id) => {
                        self.run(current, GameAction::MoveRobber { tile_id }, &mut outcome)
                    }
                    None => self.force_main(&mut outcome),
                }
            }
            PhaseKind::PirateMove => {
                let tiles: Vec<TileId> = (0..self.board.tile_count())
                    .filter(|&t| self.board.is_sea(t) && self.board.pirate != Some(t))
                    .collect();
                match tiles.choose(&mut self.rng).copied() {
                    Some(tile_id) => {
                        self.run(current, GameAction::MovePirate { tile_id }, &mut outcome)
                    }
                    None => self.force_main(&mut outcome),
                }
            }
            PhaseKind::RobberSteal | PhaseKind::PirateSteal => {
                let victim = self.richest_victim();
                let is_robber = self.phase.kind() == PhaseKind::RobberSteal;
                match victim {
                    Some(victim_id) if is_robber => {
                        self.run(current, GameAction::RobberSteal { victim_id }, &mut outcome)
                    }
                    Some(victim_id) => {
                        self.run(current, GameAction::PirateSteal { victim_id }, &mut outcome)
                    }
                    None => self.force_main(&mut outcome),
                }
            }
            PhaseKind::MainActions => {
                self.run(current, GameAction::EndTurn, &mut outcome);
            }
            PhaseKind::GameOver => {}
        }

        // a still-stuck phase gets a fresh deadline rather than a tight loop
        self.restart_timer(now_ms);
        self.sync_timer(now_ms);
        Some(outcome)
    }

    fn run(&mut self, player: PlayerId, action: GameAction, outcome: &mut TimeoutOutcome) {
        if let Ok(events) = self.apply_action(player, action.clone()) {
            outcome.actions.push((player, action));
            outcome.events.extend(events);
        }
    }

    fn force_main(&mut self, outcome: &mut TimeoutOutcome) {
        self.set_phase(Phase::MainActions);
        outcome.forced = true;
    }

    fn legal_setup_nodes(&self, player: PlayerId) -> Vec<NodeId> {
        (0..self.board.node_count())
            .filter(|&node_id| {
                self.clone()
                    .apply_action(player, GameAction::PlaceSettlement { node_id })
                    .is_ok()
            })
            .collect()
    }

    fn legal_setup_routes(&self, player: PlayerId) -> Vec<GameAction> {
        let Some(awaiting) = self.setup_awaiting else {
            return Vec::new();
        };
        self.board.geometry.node_edges[awaiting.node]
            .iter()
            .flat_map(|&edge_id| {
                [
                    GameAction::PlaceRoad { edge_id },
                    GameAction::PlaceShip { edge_id },
                ]
            })
            .filter(|action| self.clone().apply_action(player, action.clone()).is_ok())
            .collect()
    }

    /// The steal victim holding the most cards, ties broken at random
    fn richest_victim(&mut self) -> Option<PlayerId> {
        let victims = match &self.phase {
            Phase::RobberSteal(ctx) | Phase::PirateSteal(ctx) => ctx.victims.clone(),
            _ => return None,
        };
        let most = victims
            .iter()
            .map(|&v| self.players[v as usize].resources.total())
            .max()?;
        let richest: Vec<PlayerId> = victims
            .into_iter()
            .filter(|&v| self.players[v as usize].resources.total() == most)
            .collect();
        richest.choose(&mut self.rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tests::game_in_main;
    use crate::phase::{DiscardContext, StealContext};
    use crate::player::ResourceHand;
    use crate::rules::Rules;
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, BTreeSet};

    fn expire(game: &mut GameState) -> u64 {
        game.restart_timer(0);
        game.timer.unwrap().ends_at
    }

    #[test]
    fn test_nothing_happens_before_deadline() {
        let mut game = game_in_main(2);
        game.restart_timer(0);
        assert_eq!(game.handle_timeout(1), None);
        assert_eq!(game.phase, Phase::MainActions);
    }

    #[test]
    fn test_paused_game_never_times_out() {
        let mut game = game_in_main(2);
        let deadline = expire(&mut game);
        game.pause(game.current_player, 0);
        assert_eq!(game.handle_timeout(deadline + 1), None);
    }

    #[test]
    fn test_main_phase_timeout_ends_turn() {
        let mut game = game_in_main(3);
        let deadline = expire(&mut game);
        let outcome = game.handle_timeout(deadline).unwrap();
        assert_eq!(outcome.phase, PhaseKind::MainActions);
        assert_eq!(game.phase, Phase::AwaitRoll);
        assert_eq!(game.current_player, game.turn_order[1]);
        assert_eq!(game.timer.unwrap().phase, PhaseKind::AwaitRoll);
    }

    #[test]
    fn test_setup_runs_to_completion_on_timeouts() {
        let mut game =
            GameState::with_seed(Rules::default(), vec!["a".into(), "b".into(), "c".into()], 4)
                .unwrap();
        let mut now = 0;
        game.sync_timer(now);
        for _ in 0..12 {
            now = game.timer.unwrap().ends_at;
            game.handle_timeout(now);
        }
        assert_eq!(game.phase, Phase::AwaitRoll);
        assert!(game.players.iter().all(|p| p.victory_points == 2));
    }

    #[test]
    fn test_discard_timeout_takes_exact_counts() {
        let mut game = game_in_main(2);
        let p = game.current_player;
        game.players[p as usize].resources = ResourceHand::uniform(2);
        game.phase = Phase::Discard(DiscardContext {
            id: 1,
            required: BTreeMap::from([(p, 5)]),
            done: BTreeSet::new(),
        });
        let deadline = expire(&mut game);
        let outcome = game.handle_timeout(deadline).unwrap();
        assert!(!outcome.forced);
        assert_eq!(game.players[p as usize].resources.total(), 5);
        assert_eq!(game.phase, Phase::RobberMove);
    }

    #[test]
    fn test_steal_timeout_picks_richest() {
        let mut game = game_in_main(3);
        let p = game.current_player;
        let others: Vec<PlayerId> = game.turn_order[1..].to_vec();
        game.players[others[0] as usize].resources = ResourceHand::uniform(1);
        game.players[others[1] as usize].resources = ResourceHand::uniform(3);
        game.phase = Phase::RobberSteal(StealContext {
            id: 1,
            tile: 0,
            victims: others.clone(),
        });
        let deadline = expire(&mut game);
        let outcome = game.handle_timeout(deadline).unwrap();
        assert_eq!(
            outcome.actions,
            vec![(
                p,
                GameAction::RobberSteal {
                    victim_id: others[1]
                }
            )]
        );
        assert_eq!(game.players[p as usize].resources.total(), 1);
        assert_eq!(game.phase, Phase::MainActions);
    }

    #[test]
    fn test_steal_without_victims_forces_exit() {
        let mut game = game_in_main(2);
        game.phase = Phase::RobberSteal(StealContext {
            id: 1,
            tile: 0,
            victims: vec![],
        });
        let deadline = expire(&mut game);
        let outcome = game.handle_timeout(deadline).unwrap();
        assert!(outcome.forced);
        assert_eq!(game.phase, Phase::MainActions);
    }
}
