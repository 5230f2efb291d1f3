//! Integration tests for the Hex Settlers engine.
//!
//! These drive complete games through the public API, from board generation
//! and setup through production, sevens, trading and timeouts.

use hexsettlers_core::geometry::hexagon;
use hexsettlers_core::longest_road::longest_route;
use hexsettlers_core::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("Player{i}")).collect()
}

fn first_legal(game: &GameState, candidates: impl IntoIterator<Item = GameAction>) -> Option<GameAction> {
    let player = game.current_player;
    candidates
        .into_iter()
        .find(|action| game.clone().apply_action(player, action.clone()).is_ok())
}

/// Place every setup settlement and road on the first legal spot
fn complete_setup(game: &mut GameState) {
    let mut iterations = 0;
    while game.phase.setup_round().is_some() && iterations < 100 {
        let player = game.current_player;
        let action = match game.phase.kind() {
            PhaseKind::SetupSettlement => first_legal(
                game,
                (0..game.board.node_count()).map(|node_id| GameAction::PlaceSettlement { node_id }),
            ),
            _ => first_legal(
                game,
                (0..game.board.edge_count()).map(|edge_id| GameAction::PlaceRoad { edge_id }),
            ),
        };
        let action = action.expect("setup always has a legal placement");
        game.apply_action(player, action).unwrap();
        iterations += 1;
    }
    assert_eq!(game.phase, Phase::AwaitRoll, "setup should finish");
}

/// A board with no sea: every tile is `terrain`
fn land_board(radius: i32, terrain: Terrain) -> Board {
    let mut board = Board::blank(Geometry::from_axials(&hexagon(radius)));
    for tile in board.tiles.iter_mut() {
        tile.terrain = terrain;
    }
    board
}

/// A two-player game on `board`, already past setup
fn game_on(board: Board, phase: Phase) -> GameState {
    let mut game =
        GameState::with_board(Rules::default(), names(2), board, StdRng::seed_from_u64(1)).unwrap();
    game.setup_index = 4;
    game.turn_number = 1;
    game.phase = phase;
    game
}

/// A path of `len` edges from `start` that never revisits a node or enters `blocked`
fn simple_path(geometry: &Geometry, start: NodeId, len: usize, blocked: &BTreeSet<NodeId>) -> Option<Vec<NodeId>> {
    fn extend(geometry: &Geometry, path: &mut Vec<NodeId>, len: usize, blocked: &BTreeSet<NodeId>) -> bool {
        if path.len() > len {
            return true;
        }
        let last = path[path.len() - 1];
        for &next in &geometry.nodes[last].adj {
            if path.contains(&next) || blocked.contains(&next) {
                continue;
            }
            path.push(next);
            if extend(geometry, path, len, blocked) {
                return true;
            }
            path.pop();
        }
        false
    }
    let mut path = vec![start];
    extend(geometry, &mut path, len, blocked).then_some(path)
}

/// Buy and place a road on each consecutive pair of `path`
fn build_roads(game: &mut GameState, player: PlayerId, path: &[NodeId]) {
    game.current_player = player;
    for pair in path.windows(2) {
        let edge_id = game.board.geometry.edge_between(pair[0], pair[1]).unwrap();
        game.players[player as usize]
            .resources
            .add_hand(&ResourceHand::with_amounts(1, 1, 0, 0, 0));
        game.apply_action(player, GameAction::PlaceRoad { edge_id })
            .unwrap();
    }
}

fn assert_bank_conserved(game: &GameState) {
    for resource in Resource::ALL {
        let held: u32 = game.players.iter().map(|p| p.resources.get(resource)).sum();
        assert!(
            game.bank.available(resource) + held <= 19,
            "{resource} exceeds the supply"
        );
    }
}

// ==================== Board Generation ====================

#[test]
fn test_red_numbers_never_touch() {
    let scenarios = [
        Scenario::Classic,
        Scenario::FourIslands,
        Scenario::ThroughTheDesert,
        Scenario::FogIsland,
    ];
    let mut checked = 0;
    for scenario in scenarios {
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let generated = BoardGenerator::new(scenario).generate(&mut rng);
            if generated.used_fallback {
                continue;
            }
            let board = &generated.board;
            let red = |t: TileId| {
                board.tiles[t]
                    .eventual_number()
                    .map_or(false, |n| n == 6 || n == 8)
            };
            for tile in 0..board.tile_count() {
                if !red(tile) {
                    continue;
                }
                for &n in &board.geometry.tile_neighbors[tile] {
                    assert!(!red(n), "{scenario} seed {seed}: reds at {tile} and {n}");
                }
            }
            checked += 1;
        }
    }
    assert!(checked > 0, "every board fell back");
}

#[test]
fn test_fallback_still_yields_full_board() {
    let mut rng = StdRng::seed_from_u64(3);
    let generated = BoardGenerator::new(Scenario::Classic)
        .with_max_attempts(0)
        .generate(&mut rng);
    assert!(generated.used_fallback);
    let numbered = generated
        .board
        .tiles
        .iter()
        .filter(|t| t.number.is_some())
        .count();
    assert_eq!(numbered, 18);
    assert!(generated.board.robber.is_some());
}

// ==================== Setup ====================

#[test]
fn test_setup_road_must_touch_prior_settlement() {
    let mut game = GameState::with_seed(Rules::default(), names(2), 21).unwrap();
    let player = game.current_player;
    let a = (0..game.board.node_count())
        .find(|&node_id| {
            game.clone()
                .apply_action(player, GameAction::PlaceSettlement { node_id })
                .is_ok()
        })
        .unwrap();
    game.apply_action(player, GameAction::PlaceSettlement { node_id: a })
        .unwrap();

    let away = (0..game.board.edge_count())
        .find(|&e| {
            !game.board.geometry.edges[e].endpoints().contains(&a)
                && game.board.edge_touches_land(e)
        })
        .unwrap();
    let err = game
        .apply_action(player, GameAction::PlaceRoad { edge_id: away })
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Topology);
    assert_eq!(game.phase.kind(), PhaseKind::SetupRoad);

    let touching = game.board.geometry.node_edges[a]
        .iter()
        .copied()
        .find(|&e| game.board.edge_touches_land(e))
        .unwrap();
    game.apply_action(player, GameAction::PlaceRoad { edge_id: touching })
        .unwrap();
}

#[test]
fn test_victory_points_after_setup() {
    let mut game = GameState::with_seed(Rules::default(), names(4), 2).unwrap();
    complete_setup(&mut game);
    for player in &game.players {
        assert_eq!(player.victory_points, 2, "{} should have 2 VP", player.name);
        assert_eq!(game.compute_victory_points(player.id), 2);
    }
    assert_bank_conserved(&game);
}

// ==================== Dice ====================

/// One grain field numbered 6 with a settlement of player 0 and a city of
/// player 1 on opposite corners
fn six_field_game() -> GameState {
    let mut board = land_board(1, Terrain::Desert);
    board.tiles[0].terrain = Terrain::Field;
    board.tiles[0].number = Some(6);
    let corners = board.geometry.tiles[0].corners;
    board.place_settlement(corners[0], 0);
    board.place_settlement(corners[3], 1);
    board.upgrade_to_city(corners[3]);
    game_on(board, Phase::AwaitRoll)
}

#[test]
fn test_roll_six_pays_exact_yield() {
    let mut game = six_field_game();
    let roller = game.current_player;
    game.roll_dice_with(roller, 3, 3).unwrap();

    assert_eq!(game.phase, Phase::MainActions);
    assert_eq!(game.players[0].resources, ResourceHand::single(Resource::Grain, 1));
    assert_eq!(game.players[1].resources, ResourceHand::single(Resource::Grain, 2));
    assert_eq!(game.bank.available(Resource::Grain), 16);
    assert_eq!(game.dice_histogram[6], 1);
}

#[test]
fn test_roll_six_clamped_by_bank_shortage() {
    let mut game = six_field_game();
    assert_eq!(game.bank.give(Resource::Grain, 17), 17);
    let roller = game.current_player;
    game.roll_dice_with(roller, 2, 4).unwrap();

    assert_eq!(game.players[0].resources, ResourceHand::single(Resource::Grain, 1));
    assert_eq!(game.players[1].resources, ResourceHand::single(Resource::Grain, 1));
    assert_eq!(game.bank.available(Resource::Grain), 0);
}

#[test]
fn test_seven_blocks_robber_until_discards() {
    let mut game = GameState::with_seed(Rules::default(), names(3), 11).unwrap();
    complete_setup(&mut game);
    let roller = game.current_player;
    let rich = game.turn_order[1];
    for p in game.players.iter_mut() {
        p.resources = ResourceHand::new();
    }
    game.players[rich as usize].resources = ResourceHand::with_amounts(3, 2, 2, 1, 1);

    game.roll_dice_with(roller, 3, 4).unwrap();
    assert_eq!(game.phase.kind(), PhaseKind::Discard);
    assert!(game.owes_discard(rich));

    let target = (0..game.board.tile_count())
        .find(|&t| !game.board.is_sea(t) && game.board.robber != Some(t))
        .unwrap();
    let blocked = game.apply_action(roller, GameAction::MoveRobber { tile_id: target });
    assert!(matches!(blocked, Err(GameError::WrongPhase { .. })));

    let wrong = game.apply_action(
        rich,
        GameAction::DiscardCards {
            cards: ResourceHand::single(Resource::Brick, 3),
        },
    );
    assert_eq!(wrong, Err(GameError::WrongDiscardCount { required: 4 }));

    game.apply_action(
        rich,
        GameAction::DiscardCards {
            cards: ResourceHand::with_amounts(2, 2, 0, 0, 0),
        },
    )
    .unwrap();
    assert_eq!(game.players[rich as usize].resources.total(), 5);
    assert_eq!(game.phase, Phase::RobberMove);
    game.apply_action(roller, GameAction::MoveRobber { tile_id: target })
        .unwrap();
    assert_bank_conserved(&game);
}

#[test]
fn test_seven_without_big_hands_goes_to_robber() {
    let mut game = GameState::with_seed(Rules::default(), names(2), 13).unwrap();
    complete_setup(&mut game);
    let roller = game.current_player;
    game.roll_dice_with(roller, 6, 1).unwrap();
    assert_eq!(game.phase, Phase::RobberMove);
    assert_eq!(
        game.roll_dice_with(roller, 7, 1),
        Err(GameError::InvalidDice)
    );
}

// ==================== Trading ====================

#[test]
fn test_forced_four_to_one() {
    let mut game = GameState::with_seed(Rules::default(), names(2), 17).unwrap();
    complete_setup(&mut game);
    let p = game.current_player;
    game.phase = Phase::MainActions;
    game.players[p as usize].resources = ResourceHand::single(Resource::Grain, 3);
    let trade = GameAction::BankTrade {
        give_kind: Resource::Grain,
        take_kind: Resource::Brick,
        take_qty: 1,
        force_ratio: Some(4),
    };
    assert_eq!(
        game.apply_action(p, trade.clone()),
        Err(GameError::NotEnough(Resource::Grain))
    );
    game.players[p as usize].resources = ResourceHand::single(Resource::Grain, 5);
    game.apply_action(p, trade).unwrap();
    assert_eq!(
        game.players[p as usize].resources,
        ResourceHand::with_amounts(1, 0, 0, 1, 0)
    );
}

// ==================== Longest Road ====================

#[test]
fn test_single_edge_has_length_one() {
    let mut board = land_board(1, Terrain::Forest);
    assert_eq!(longest_route(&board, 0), 0);
    board.place_route(0, 0, RouteKind::Road);
    assert_eq!(longest_route(&board, 0), 1);
}

#[test]
fn test_longest_road_tie_keeps_holder_and_overtake_transfers() {
    let mut game = game_on(land_board(3, Terrain::Forest), Phase::MainActions);
    let (a, b) = (game.turn_order[0], game.turn_order[1]);
    let geometry = game.board.geometry.clone();
    let path_a = simple_path(&geometry, 0, 5, &BTreeSet::new()).unwrap();
    let mut blocked = BTreeSet::new();
    for &n in &path_a {
        blocked.insert(n);
        blocked.extend(geometry.nodes[n].adj.iter().copied());
    }
    let path_b = (0..geometry.nodes.len())
        .rev()
        .filter(|n| !blocked.contains(n))
        .find_map(|start| simple_path(&geometry, start, 6, &blocked))
        .unwrap();
    game.board.place_settlement(path_a[0], a);
    game.board.place_settlement(path_b[0], b);

    build_roads(&mut game, a, &path_a[..5]);
    assert_eq!(game.longest_road.holder, None);
    build_roads(&mut game, a, &path_a[4..]);
    assert_eq!(game.longest_road.holder, Some(a));
    assert_eq!(game.longest_road.size, 5);
    assert_eq!(game.compute_victory_points(a), 3);

    build_roads(&mut game, b, &path_b[..6]);
    assert_eq!(game.players[b as usize].longest_road_length, 5);
    assert_eq!(game.longest_road.holder, Some(a), "a tie keeps the holder");

    build_roads(&mut game, b, &path_b[5..]);
    assert_eq!(game.longest_road.holder, Some(b));
    assert_eq!(game.longest_road.size, 6);
    assert_eq!(game.compute_victory_points(a), 1);
    assert_eq!(game.compute_victory_points(b), 3);
}

#[test]
fn test_opponent_settlement_splits_longest_road() {
    let mut game = game_on(land_board(3, Terrain::Forest), Phase::MainActions);
    let (a, b) = (game.turn_order[0], game.turn_order[1]);
    let geometry = game.board.geometry.clone();
    // middle node of the path with a spare neighbour for the opponent's road
    let (path, side) = (0..geometry.nodes.len())
        .filter_map(|start| simple_path(&geometry, start, 5, &BTreeSet::new()))
        .find_map(|path| {
            let spare = geometry.nodes[path[3]]
                .adj
                .iter()
                .copied()
                .find(|n| !path.contains(n))?;
            Some((path, spare))
        })
        .unwrap();
    game.board.place_settlement(path[0], a);
    build_roads(&mut game, a, &path);
    assert_eq!(game.longest_road.holder, Some(a));

    let spur = geometry.edge_between(side, path[3]).unwrap();
    game.board.place_route(spur, b, RouteKind::Road);
    game.current_player = b;
    game.players[b as usize].resources = ResourceHand::with_amounts(1, 1, 0, 1, 1);
    game.apply_action(b, GameAction::PlaceSettlement { node_id: path[3] })
        .unwrap();

    assert_eq!(game.players[a as usize].longest_road_length, 3);
    assert_eq!(game.longest_road.holder, None);
    assert_eq!(game.compute_victory_points(a), 1);
}

// ==================== Timeouts ====================

#[test]
fn test_timeouts_keep_game_moving() {
    for seed in 0..4 {
        let players = 2 + (seed % 3) as usize;
        let mut game = GameState::with_seed(Rules::default(), names(players), seed).unwrap();
        let mut now = 0;
        game.sync_timer(now);
        let mut rolls = 0;
        for _ in 0..200 {
            let phase = game.phase.kind();
            now = game.timer.map_or(now, |t| t.ends_at);
            let outcome = game.handle_timeout(now).expect("deadline passed");
            assert_eq!(outcome.phase, phase);
            if phase == PhaseKind::AwaitRoll {
                rolls += 1;
            }
            assert_bank_conserved(&game);
            if game.is_finished() {
                break;
            }
        }
        assert!(rolls > 10, "seed {seed} only rolled {rolls} times");
    }
}

#[test]
fn test_view_hides_opponent_hands() {
    let mut game = GameState::with_seed(Rules::default(), names(2), 5).unwrap();
    complete_setup(&mut game);
    let me = game.turn_order[0];
    let them = game.turn_order[1];
    let view = game.view_for(Some(me));
    let json = serde_json::to_value(&view).unwrap();
    assert!(json.get("devDeck").is_none());
    assert_eq!(view.players[them as usize].resources, None);
    assert_eq!(
        view.players[them as usize].hand_count,
        game.players[them as usize].resources.total()
    );
}
