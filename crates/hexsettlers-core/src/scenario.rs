//! Map selection and the fixed coordinate tables of each seafaring map.

use crate::geometry::{hexagon, wide_desert_layout, HexCoord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which board is generated and which scenario rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    #[default]
    Classic,
    FourIslands,
    ThroughTheDesert,
    FogIsland,
    TestBuilder,
}

impl Scenario {
    /// Parse the lenient `mapMode` / scenario selector pair sent by clients.
    pub fn parse(map_mode: &str, scenario: &str) -> Self {
        if !map_mode.trim().eq_ignore_ascii_case("seafarers") {
            return Scenario::Classic;
        }
        match scenario.trim().to_ascii_lowercase().as_str() {
            "through_the_desert" | "through-the-desert" | "desert" | "throughdesert" => {
                Scenario::ThroughTheDesert
            }
            "fog_island" | "fog-island" | "fog" | "fogisland" => Scenario::FogIsland,
            "test_builder" | "test-builder" | "test" | "builder" => Scenario::TestBuilder,
            _ => Scenario::FourIslands,
        }
    }

    pub fn is_seafarers(self) -> bool {
        self != Scenario::Classic
    }

    pub fn default_victory_points(self) -> u32 {
        match self {
            Scenario::Classic => 10,
            Scenario::FogIsland => 12,
            Scenario::ThroughTheDesert => 14,
            Scenario::FourIslands | Scenario::TestBuilder => 13,
        }
    }

    /// Builder sandbox games may be started by a single seat.
    pub fn allows_solo(self) -> bool {
        self == Scenario::TestBuilder
    }

    /// Settling a new island for the first time is worth two points.
    pub fn awards_island_bonus(self) -> bool {
        self.is_seafarers() && self != Scenario::FogIsland
    }

    pub fn layout(self) -> Vec<HexCoord> {
        match self {
            Scenario::Classic => hexagon(3),
            Scenario::FourIslands | Scenario::TestBuilder => hexagon(4),
            Scenario::ThroughTheDesert | Scenario::FogIsland => wide_desert_layout(),
        }
    }

    pub fn map_mode(self) -> &'static str {
        if self.is_seafarers() {
            "seafarers"
        } else {
            "classic"
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::Classic => "classic",
            Scenario::FourIslands => "four_islands",
            Scenario::ThroughTheDesert => "through_the_desert",
            Scenario::FogIsland => "fog_island",
            Scenario::TestBuilder => "test_builder",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn contains(keys: &[(i32, i32)], coord: HexCoord) -> bool {
    keys.contains(&(coord.q, coord.r))
}

// ==================== Four Islands ====================

#[rustfmt::skip]
pub(crate) const FOUR_ISLANDS_LAND: [(i32, i32); 23] = [
    (0, -3), (2, -3), (3, -3),
    (-1, -2), (1, -2), (2, -2), (3, -2),
    (-2, -1), (-1, -1), (1, -1), (2, -1),
    (0, 0),
    (-3, 1), (-2, 1), (1, 1), (2, 1),
    (-3, 2), (-2, 2), (-1, 2), (1, 2),
    (-3, 3), (-2, 3), (0, 3),
];

// ==================== Through the Desert ====================

#[rustfmt::skip]
pub(crate) const DESERT_STRIP_LAND: [(i32, i32); 30] = [
    (0, -3), (1, -3), (2, -3), (4, -3),
    (-1, -2), (0, -2), (1, -2), (2, -2), (4, -2),
    (-2, -1), (-1, -1), (0, -1), (1, -1), (2, -1), (4, -1),
    (-1, 0), (0, 0), (1, 0),
    (-3, 1), (-2, 1), (-1, 1), (0, 1), (2, 1), (3, 1),
    (-3, 2), (-2, 2), (-1, 2),
    (-2, 3), (0, 3), (1, 3),
];

pub(crate) const DESERT_STRIP_DESERTS: [(i32, i32); 3] = [(-1, -1), (0, -2), (1, -3)];

/// The main island, desert strip included. Setup placements stay here.
#[rustfmt::skip]
pub(crate) const DESERT_START_ISLAND: [(i32, i32); 20] = [
    (2, -3), (1, -2), (2, -2), (0, -1), (1, -1), (2, -1),
    (-1, 0), (0, 0), (1, 0),
    (-3, 1), (-2, 1), (-1, 1), (0, 1),
    (-3, 2), (-2, 2), (-1, 2), (-2, 3),
    (1, -3), (0, -2), (-1, -1),
];

/// Land beyond the desert; the first settlement touching it scores once.
pub(crate) const DESERT_FAR_SIDE: [(i32, i32); 3] = [(0, -3), (-1, -2), (-2, -1)];

// ==================== Fog Island ====================

#[rustfmt::skip]
pub(crate) const FOG_TILES: [(i32, i32); 12] = [
    (0, -3), (-1, -2), (0, -2), (0, -1), (0, 0), (1, 0),
    (0, 1), (1, 1), (0, 2), (1, 2), (0, 3), (1, 3),
];

#[rustfmt::skip]
pub(crate) const FOG_START_EAST: [(i32, i32); 10] = [
    (2, -3), (3, -3), (4, -3), (2, -2), (3, -2),
    (4, -2), (3, -1), (4, -1), (3, 0), (3, 1),
];

pub(crate) const FOG_START_WEST: [(i32, i32); 7] =
    [(-2, 0), (-3, 1), (-2, 1), (-3, 2), (-2, 2), (-3, 3), (-2, 3)];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Scenario::parse("classic", "fog"), Scenario::Classic);
        assert_eq!(Scenario::parse("seafarers", "desert"), Scenario::ThroughTheDesert);
        assert_eq!(Scenario::parse("Seafarers", "fog-island"), Scenario::FogIsland);
        assert_eq!(Scenario::parse("seafarers", "builder"), Scenario::TestBuilder);
        assert_eq!(Scenario::parse("seafarers", "whatever"), Scenario::FourIslands);
        assert_eq!(Scenario::parse("nonsense", ""), Scenario::Classic);
    }

    #[test]
    fn test_fixed_tables_fit_their_layouts() {
        let wide = wide_desert_layout();
        for key in DESERT_STRIP_LAND
            .iter()
            .chain(FOG_TILES.iter())
            .chain(FOG_START_EAST.iter())
            .chain(FOG_START_WEST.iter())
        {
            assert!(wide.contains(&HexCoord::from(*key)), "{key:?} off the map");
        }
        let four = hexagon(4);
        assert!(FOUR_ISLANDS_LAND.iter().all(|k| four.contains(&HexCoord::from(*k))));
        assert!(DESERT_START_ISLAND
            .iter()
            .all(|k| DESERT_STRIP_LAND.contains(k)));
    }

    #[test]
    fn test_default_victory_points() {
        assert_eq!(Scenario::Classic.default_victory_points(), 10);
        assert_eq!(Scenario::FourIslands.default_victory_points(), 13);
        assert_eq!(Scenario::ThroughTheDesert.default_victory_points(), 14);
        assert_eq!(Scenario::FogIsland.default_victory_points(), 12);
    }
}
