//! Procedural board generation.
//!
//! Each scenario shuffles its terrain and number pools until no two 6/8 tiles
//! touch (plus any scenario-specific constraint). Searches are bounded: when
//! the attempt ceiling runs out the generator falls back to an unconstrained
//! shuffle and says so in [`GeneratedBoard::used_fallback`].

use crate::board::{is_red_number, Board, HiddenTile, Terrain};
use crate::geometry::{Geometry, TileId};
use crate::ports::place_ports;
use crate::scenario::{self, Scenario};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

// ==================== Pools ====================

const CLASSIC_TERRAIN: [(Terrain, usize); 6] = [
    (Terrain::Forest, 4),
    (Terrain::Pasture, 4),
    (Terrain::Field, 4),
    (Terrain::Hills, 3),
    (Terrain::Mountains, 3),
    (Terrain::Desert, 1),
];
const CLASSIC_NUMBERS: [u8; 18] = [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

const FOUR_ISLANDS_TERRAIN: [(Terrain, usize); 5] = [
    (Terrain::Forest, 5),
    (Terrain::Pasture, 5),
    (Terrain::Field, 5),
    (Terrain::Hills, 4),
    (Terrain::Mountains, 4),
];
const FOUR_ISLANDS_NUMBERS: [u8; 23] = [
    2, 3, 3, 4, 4, 4, 5, 5, 5, 6, 6, 8, 8, 9, 9, 9, 10, 10, 10, 11, 11, 11, 12,
];

const DESERT_STRIP_TERRAIN: [(Terrain, usize); 5] = [
    (Terrain::Forest, 6),
    (Terrain::Pasture, 6),
    (Terrain::Field, 5),
    (Terrain::Hills, 5),
    (Terrain::Mountains, 5),
];
const DESERT_OUTER_NUMBERS: [u8; 10] = [2, 3, 4, 5, 6, 8, 9, 10, 11, 12];
const DESERT_INNER_NUMBERS: [u8; 17] = [3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

const FOG_START_TERRAIN: [(Terrain, usize); 5] = [
    (Terrain::Hills, 3),
    (Terrain::Forest, 4),
    (Terrain::Pasture, 4),
    (Terrain::Field, 3),
    (Terrain::Mountains, 3),
];
const FOG_START_NUMBERS: [u8; 17] = [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 12];
const FOG_HIDDEN_TERRAIN: [(Terrain, usize); 7] = [
    (Terrain::Sea, 2),
    (Terrain::Gold, 2),
    (Terrain::Hills, 2),
    (Terrain::Forest, 1),
    (Terrain::Pasture, 1),
    (Terrain::Field, 2),
    (Terrain::Mountains, 2),
];
const FOG_HIDDEN_NUMBERS: [u8; 10] = [3, 4, 5, 6, 8, 9, 10, 11, 11, 12];

// ==================== Attempt Ceilings ====================

const CLASSIC_ATTEMPTS: usize = 300;
const FOUR_ISLANDS_ATTEMPTS: usize = 120;
const DESERT_STRIP_ATTEMPTS: usize = 420;
const FOG_ISLAND_ATTEMPTS: usize = 2000;

fn expand(pool: &[(Terrain, usize)]) -> Vec<Terrain> {
    pool.iter()
        .flat_map(|&(terrain, count)| std::iter::repeat(terrain).take(count))
        .collect()
}

/// One tile's generated contents
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    tile: TileId,
    terrain: Terrain,
    number: Option<u8>,
    hidden: Option<HiddenTile>,
}

impl Placement {
    fn visible(tile: TileId, terrain: Terrain, number: Option<u8>) -> Self {
        Self {
            tile,
            terrain,
            number,
            hidden: None,
        }
    }

    fn fog(tile: TileId, hidden: HiddenTile) -> Self {
        Self {
            tile,
            terrain: Terrain::Sea,
            number: None,
            hidden: Some(hidden),
        }
    }

    fn eventual_number(&self) -> Option<u8> {
        self.hidden.map_or(self.number, |h| h.number)
    }
}

/// Whether any two red-numbered placements are neighbours
fn reds_touch(geometry: &Geometry, placements: &[Placement]) -> bool {
    let reds: HashSet<TileId> = placements
        .iter()
        .filter(|p| p.eventual_number().map_or(false, is_red_number))
        .map(|p| p.tile)
        .collect();
    reds.iter()
        .any(|&t| geometry.tile_neighbors[t].iter().any(|n| reds.contains(n)))
}

/// Deal shuffled terrain onto tiles in order; numbers go to terrain that takes one.
fn deal(tiles: &[TileId], terrain: &[Terrain], numbers: &[u8]) -> Vec<Placement> {
    let mut numbers = numbers.iter().copied();
    tiles
        .iter()
        .zip(terrain.iter())
        .map(|(&tile, &terrain)| {
            let number = if terrain.takes_number() {
                numbers.next()
            } else {
                None
            };
            Placement::visible(tile, terrain, number)
        })
        .collect()
}

/// A generated board and how the search went
#[derive(Debug, Clone)]
pub struct GeneratedBoard {
    pub board: Board,
    pub attempts: usize,
    pub used_fallback: bool,
}

/// Board generator for one scenario
#[derive(Debug, Clone, Copy)]
pub struct BoardGenerator {
    scenario: Scenario,
    max_attempts: Option<usize>,
}

impl BoardGenerator {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            max_attempts: None,
        }
    }

    /// Override the scenario's attempt ceiling. Zero forces the fallback.
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    pub fn generate<R: Rng>(&self, rng: &mut R) -> GeneratedBoard {
        let geometry = Geometry::from_axials(&self.scenario.layout());
        let mut board = Board::blank(geometry);
        let (attempts, used_fallback) = match self.scenario {
            Scenario::Classic => self.classic(&mut board, rng),
            Scenario::FourIslands => self.four_islands(&mut board, rng),
            Scenario::ThroughTheDesert => self.desert_strip(&mut board, rng),
            Scenario::FogIsland => self.fog_island(&mut board, rng),
            Scenario::TestBuilder => {
                self.test_builder(&mut board, rng);
                (0, false)
            }
        };
        if self.scenario != Scenario::TestBuilder {
            place_ports(&mut board, rng);
        }
        GeneratedBoard {
            board,
            attempts,
            used_fallback,
        }
    }

    /// Draw candidates until one passes `valid` or the ceiling runs out, then
    /// take one unchecked draw.
    fn search<R, F, V>(
        &self,
        ceiling: usize,
        rng: &mut R,
        mut draw: F,
        valid: V,
    ) -> (Vec<Placement>, usize, bool)
    where
        R: Rng,
        F: FnMut(&mut R) -> Vec<Placement>,
        V: Fn(&[Placement]) -> bool,
    {
        let ceiling = self.max_attempts.unwrap_or(ceiling);
        for attempt in 1..=ceiling {
            let placements = draw(rng);
            if valid(&placements) {
                return (placements, attempt, false);
            }
        }
        (draw(rng), ceiling, true)
    }

    fn tiles_matching(board: &Board, keys: &[(i32, i32)]) -> Vec<TileId> {
        board
            .tiles
            .iter()
            .filter(|t| scenario::contains(keys, t.coord))
            .map(|t| t.id)
            .collect()
    }

    fn apply(board: &mut Board, placements: &[Placement]) {
        for p in placements {
            let tile = &mut board.tiles[p.tile];
            tile.terrain = p.terrain;
            tile.number = p.number;
            tile.fog = p.hidden.is_some();
            tile.revealed = false;
            tile.hidden = p.hidden;
        }
    }

    // ==================== Classic ====================

    fn classic<R: Rng>(&self, board: &mut Board, rng: &mut R) -> (usize, bool) {
        let inner: Vec<TileId> = board
            .tiles
            .iter()
            .filter(|t| t.coord.distance_from_origin() <= 2)
            .map(|t| t.id)
            .collect();
        let geometry = &board.geometry;
        let (placements, attempts, fallback) = self.search(
            CLASSIC_ATTEMPTS,
            rng,
            |rng| {
                let mut terrain = expand(&CLASSIC_TERRAIN);
                terrain.shuffle(rng);
                let mut numbers = CLASSIC_NUMBERS.to_vec();
                numbers.shuffle(rng);
                deal(&inner, &terrain, &numbers)
            },
            |p| !reds_touch(geometry, p),
        );
        Self::apply(board, &placements);
        board.robber = board
            .tiles
            .iter()
            .find(|t| t.terrain == Terrain::Desert)
            .map(|t| t.id);
        (attempts, fallback)
    }

    // ==================== Four Islands ====================

    fn four_islands<R: Rng>(&self, board: &mut Board, rng: &mut R) -> (usize, bool) {
        let land = Self::tiles_matching(board, &scenario::FOUR_ISLANDS_LAND);
        let geometry = &board.geometry;
        let (placements, attempts, fallback) = self.search(
            FOUR_ISLANDS_ATTEMPTS,
            rng,
            |rng| {
                let mut terrain = expand(&FOUR_ISLANDS_TERRAIN);
                terrain.shuffle(rng);
                let mut numbers = FOUR_ISLANDS_NUMBERS.to_vec();
                numbers.shuffle(rng);
                deal(&land, &terrain, &numbers)
            },
            |p| !reds_touch(geometry, p),
        );
        Self::apply(board, &placements);
        place_robber_and_pirate(board, rng);
        (attempts, fallback)
    }

    // ==================== Through the Desert ====================

    fn desert_strip<R: Rng>(&self, board: &mut Board, rng: &mut R) -> (usize, bool) {
        let geometry = &board.geometry;
        let land = Self::tiles_matching(board, &scenario::DESERT_STRIP_LAND);
        let deserts = Self::tiles_matching(board, &scenario::DESERT_STRIP_DESERTS);
        let producing: Vec<TileId> = land
            .iter()
            .copied()
            .filter(|t| !deserts.contains(t))
            .collect();
        let outer: Vec<TileId> = land
            .iter()
            .copied()
            .filter(|&t| !scenario::contains(&scenario::DESERT_START_ISLAND, geometry.tiles[t].coord))
            .collect();
        let outer_groups = components(geometry, &outer);

        let (placements, attempts, fallback) = self.search(
            DESERT_STRIP_ATTEMPTS,
            rng,
            |rng| {
                let mut terrain = expand(&DESERT_STRIP_TERRAIN);
                terrain.shuffle(rng);
                let mut assigned: Vec<(TileId, Terrain)> =
                    producing.iter().copied().zip(terrain).collect();

                let mut groups: Vec<&Vec<TileId>> = outer_groups.iter().collect();
                groups.shuffle(rng);
                for group in groups.into_iter().take(2) {
                    if let Some(&gold) = group.choose(rng) {
                        if let Some(slot) = assigned.iter_mut().find(|(t, _)| *t == gold) {
                            slot.1 = Terrain::Gold;
                        }
                    }
                }

                let mut outer_numbers = DESERT_OUTER_NUMBERS.to_vec();
                outer_numbers.shuffle(rng);
                let mut inner_numbers = DESERT_INNER_NUMBERS.to_vec();
                inner_numbers.shuffle(rng);
                let mut outer_numbers = outer_numbers.into_iter();
                let mut inner_numbers = inner_numbers.into_iter();

                let mut placements: Vec<Placement> = deserts
                    .iter()
                    .map(|&t| Placement::visible(t, Terrain::Desert, None))
                    .collect();
                for (tile, terrain) in assigned {
                    let number = if outer.contains(&tile) {
                        outer_numbers.next()
                    } else {
                        inner_numbers.next()
                    };
                    placements.push(Placement::visible(tile, terrain, number));
                }
                placements
            },
            |p| !reds_touch(geometry, p),
        );
        Self::apply(board, &placements);
        board.robber = deserts.choose(rng).copied();
        (attempts, fallback)
    }

    // ==================== Fog Island ====================

    fn fog_island<R: Rng>(&self, board: &mut Board, rng: &mut R) -> (usize, bool) {
        let geometry = &board.geometry;
        let east = Self::tiles_matching(board, &scenario::FOG_START_EAST);
        let west = Self::tiles_matching(board, &scenario::FOG_START_WEST);
        let fog = Self::tiles_matching(board, &scenario::FOG_TILES);
        let start: Vec<TileId> = east.iter().chain(west.iter()).copied().collect();

        let reds_on = |placements: &[Placement], island: &[TileId]| {
            placements
                .iter()
                .filter(|p| island.contains(&p.tile))
                .filter(|p| p.number.map_or(false, is_red_number))
                .count()
        };

        let (placements, attempts, fallback) = self.search(
            FOG_ISLAND_ATTEMPTS,
            rng,
            |rng| {
                let mut terrain = expand(&FOG_START_TERRAIN);
                terrain.shuffle(rng);
                let mut numbers = FOG_START_NUMBERS.to_vec();
                numbers.shuffle(rng);
                let mut placements = deal(&start, &terrain, &numbers);

                let mut hidden_terrain = expand(&FOG_HIDDEN_TERRAIN);
                hidden_terrain.shuffle(rng);
                let mut hidden_numbers = FOG_HIDDEN_NUMBERS.to_vec();
                hidden_numbers.shuffle(rng);
                let mut hidden_numbers = hidden_numbers.into_iter();
                for (&tile, &terrain) in fog.iter().zip(hidden_terrain.iter()) {
                    let number = if terrain.takes_number() {
                        hidden_numbers.next()
                    } else {
                        None
                    };
                    placements.push(Placement::fog(tile, HiddenTile { terrain, number }));
                }
                placements
            },
            |p| reds_on(p, &east) == 2 && reds_on(p, &west) == 2 && !reds_touch(geometry, p),
        );
        Self::apply(board, &placements);
        place_robber_and_pirate(board, rng);
        (attempts, fallback)
    }

    // ==================== Test Builder ====================

    fn test_builder<R: Rng>(&self, board: &mut Board, rng: &mut R) {
        if let Some(center) = board.geometry.tile_at(Default::default()) {
            board.tiles[center].terrain = Terrain::Desert;
            board.robber = Some(center);
        }
        board.pirate = random_open_sea(board, rng);
    }
}

/// Robber on a desert when there is one, else anywhere on land; pirate on open sea
fn place_robber_and_pirate<R: Rng>(board: &mut Board, rng: &mut R) {
    let deserts: Vec<TileId> = board
        .tiles
        .iter()
        .filter(|t| t.terrain == Terrain::Desert)
        .map(|t| t.id)
        .collect();
    let land: Vec<TileId> = board
        .tiles
        .iter()
        .filter(|t| t.is_land())
        .map(|t| t.id)
        .collect();
    board.robber = deserts.choose(rng).or_else(|| land.choose(rng)).copied();
    board.pirate = random_open_sea(board, rng);
}

fn random_open_sea<R: Rng>(board: &Board, rng: &mut R) -> Option<TileId> {
    let sea: Vec<TileId> = board
        .tiles
        .iter()
        .filter(|t| t.terrain.is_sea() && !t.is_unexplored())
        .map(|t| t.id)
        .collect();
    sea.choose(rng).copied()
}

/// Connected groups within a subset of tiles
fn components(geometry: &Geometry, subset: &[TileId]) -> Vec<Vec<TileId>> {
    let mut seen: HashSet<TileId> = HashSet::new();
    let mut groups = Vec::new();
    for &start in subset {
        if !seen.insert(start) {
            continue;
        }
        let mut group = vec![start];
        let mut stack = vec![start];
        while let Some(tile) = stack.pop() {
            for &n in &geometry.tile_neighbors[tile] {
                if subset.contains(&n) && seen.insert(n) {
                    group.push(n);
                    stack.push(n);
                }
            }
        }
        groups.push(group);
    }
    groups
}

/// Generate a board for a scenario with the default ceilings
pub fn generate_board<R: Rng>(scenario: Scenario, rng: &mut R) -> Board {
    BoardGenerator::new(scenario).generate(rng).board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::HexCoord;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn red_neighbors(board: &Board) -> bool {
        board.tiles.iter().any(|t| {
            t.eventual_number().map_or(false, is_red_number)
                && board.geometry.tile_neighbors[t.id].iter().any(|&n| {
                    board.tiles[n]
                        .eventual_number()
                        .map_or(false, is_red_number)
                })
        })
    }

    fn count_terrain(board: &Board, terrain: Terrain) -> usize {
        board.tiles.iter().filter(|t| t.terrain == terrain).count()
    }

    #[test]
    fn test_classic_board_composition() {
        let mut rng = StdRng::seed_from_u64(42);
        let generated = BoardGenerator::new(Scenario::Classic).generate(&mut rng);
        let board = &generated.board;
        assert_eq!(board.tiles.len(), 37);
        assert_eq!(count_terrain(board, Terrain::Sea), 18);
        assert_eq!(count_terrain(board, Terrain::Desert), 1);
        assert_eq!(count_terrain(board, Terrain::Forest), 4);
        assert_eq!(count_terrain(board, Terrain::Mountains), 3);
        let numbered = board.tiles.iter().filter(|t| t.number.is_some()).count();
        assert_eq!(numbered, 18);
        let desert = board
            .tiles
            .iter()
            .find(|t| t.terrain == Terrain::Desert)
            .map(|t| t.id);
        assert_eq!(board.robber, desert);
        assert_eq!(board.ports.len(), 9);
    }

    #[test]
    fn test_no_adjacent_reds_across_seeds() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            for scenario in [Scenario::Classic, Scenario::FourIslands, Scenario::ThroughTheDesert] {
                let generated = BoardGenerator::new(scenario).generate(&mut rng);
                if !generated.used_fallback {
                    assert!(!red_neighbors(&generated.board), "{scenario} seed {seed}");
                }
            }
        }
    }

    #[test]
    fn test_zero_ceiling_takes_fallback() {
        let mut rng = StdRng::seed_from_u64(5);
        let generated = BoardGenerator::new(Scenario::Classic)
            .with_max_attempts(0)
            .generate(&mut rng);
        assert!(generated.used_fallback);
        assert_eq!(generated.attempts, 0);
        assert_eq!(count_terrain(&generated.board, Terrain::Desert), 1);
        assert_eq!(generated.board.ports.len(), 9);
    }

    #[test]
    fn test_four_islands_layout() {
        let mut rng = StdRng::seed_from_u64(8);
        let board = generate_board(Scenario::FourIslands, &mut rng);
        assert_eq!(board.tiles.len(), 61);
        assert_eq!(board.tiles.iter().filter(|t| t.is_land()).count(), 23);
        assert!(board.robber.map_or(false, |t| board.tiles[t].is_land()));
        assert!(board.pirate.map_or(false, |t| board.is_sea(t)));
        assert!(board.islands().iter().flatten().max().copied().unwrap_or(0) >= 1);
    }

    #[test]
    fn test_desert_strip_has_two_gold_and_fixed_deserts() {
        let mut rng = StdRng::seed_from_u64(13);
        let board = generate_board(Scenario::ThroughTheDesert, &mut rng);
        assert_eq!(board.tiles.len(), 70);
        assert_eq!(count_terrain(&board, Terrain::Gold), 2);
        assert_eq!(count_terrain(&board, Terrain::Desert), 3);
        for key in scenario::DESERT_STRIP_DESERTS {
            let coord = HexCoord::from(key);
            let tile = board.tiles.iter().find(|t| t.coord == coord).unwrap();
            assert_eq!(tile.terrain, Terrain::Desert);
            assert_eq!(tile.number, None);
        }
        let robber = board.robber.unwrap();
        assert_eq!(board.tiles[robber].terrain, Terrain::Desert);
        let gold_outer = board
            .tiles
            .iter()
            .filter(|t| t.terrain == Terrain::Gold)
            .all(|t| !scenario::contains(&scenario::DESERT_START_ISLAND, t.coord));
        assert!(gold_outer);
    }

    #[test]
    fn test_fog_island_hides_contents() {
        let mut rng = StdRng::seed_from_u64(21);
        let generated = BoardGenerator::new(Scenario::FogIsland).generate(&mut rng);
        let board = &generated.board;
        let fog: Vec<_> = board.tiles.iter().filter(|t| t.fog).collect();
        assert_eq!(fog.len(), 12);
        assert!(fog.iter().all(|t| t.terrain == Terrain::Sea && t.hidden.is_some()));
        let hidden_gold = fog
            .iter()
            .filter(|t| t.hidden.map(|h| h.terrain) == Some(Terrain::Gold))
            .count();
        assert_eq!(hidden_gold, 2);
        if !generated.used_fallback {
            assert!(!red_neighbors(board));
        }
    }

    #[test]
    fn test_test_builder_is_open_sea() {
        let mut rng = StdRng::seed_from_u64(2);
        let board = generate_board(Scenario::TestBuilder, &mut rng);
        assert_eq!(board.tiles.iter().filter(|t| t.is_land()).count(), 1);
        assert!(board.ports.is_empty());
        let center = board.geometry.tile_at(HexCoord::new(0, 0));
        assert_eq!(board.robber, center);
        assert!(board.pirate.is_some());
    }
}
