//! Game board representation: terrain, buildings, routes and ports layered
//! over an immutable [`Geometry`].
//!
//! This module contains:
//! - Resource and terrain types
//! - Buildings (settlements, cities) and routes (roads, ships)
//! - Ports for maritime trading
//! - Placement, connectivity and production queries

use crate::geometry::{EdgeId, Geometry, HexCoord, NodeId, TileId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Seat index within a game
pub type PlayerId = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Brick,
    Lumber,
    Ore,
    Grain,
    Wool,
}

impl Resource {
    /// All resource types
    pub const ALL: [Resource; 5] = [
        Resource::Brick,
        Resource::Lumber,
        Resource::Ore,
        Resource::Grain,
        Resource::Wool,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Brick => "brick",
            Resource::Lumber => "lumber",
            Resource::Ore => "ore",
            Resource::Grain => "grain",
            Resource::Wool => "wool",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type of hex tile on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Forest,
    Hills,
    Pasture,
    Field,
    Mountains,
    Gold,
    Desert,
    Sea,
}

impl Terrain {
    /// The resource this terrain produces, if it produces a fixed one
    pub fn resource(self) -> Option<Resource> {
        match self {
            Terrain::Forest => Some(Resource::Lumber),
            Terrain::Hills => Some(Resource::Brick),
            Terrain::Pasture => Some(Resource::Wool),
            Terrain::Field => Some(Resource::Grain),
            Terrain::Mountains => Some(Resource::Ore),
            Terrain::Gold | Terrain::Desert | Terrain::Sea => None,
        }
    }

    pub fn is_sea(self) -> bool {
        self == Terrain::Sea
    }

    /// Whether a number token belongs on this terrain
    pub fn takes_number(self) -> bool {
        !matches!(self, Terrain::Desert | Terrain::Sea)
    }
}

/// Contents of a fog tile until it is explored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenTile {
    pub terrain: Terrain,
    pub number: Option<u8>,
}

/// Per-tile mutable state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub coord: HexCoord,
    pub terrain: Terrain,
    /// Dice number that triggers production
    pub number: Option<u8>,
    pub fog: bool,
    pub revealed: bool,
    pub hidden: Option<HiddenTile>,
}

impl Tile {
    pub fn sea(id: TileId, coord: HexCoord) -> Self {
        Self {
            id,
            coord,
            terrain: Terrain::Sea,
            number: None,
            fog: false,
            revealed: false,
            hidden: None,
        }
    }

    /// Fog that nobody has explored yet
    pub fn is_unexplored(&self) -> bool {
        self.fog && !self.revealed
    }

    pub fn is_land(&self) -> bool {
        !self.terrain.is_sea()
    }

    /// The number this tile will carry once everything is revealed
    pub fn eventual_number(&self) -> Option<u8> {
        match self.hidden {
            Some(hidden) if self.is_unexplored() => hidden.number,
            _ => self.number,
        }
    }
}

/// 6 and 8, the most likely non-seven rolls
pub fn is_red_number(number: u8) -> bool {
    number == 6 || number == 8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingKind {
    Settlement,
    City,
}

impl BuildingKind {
    pub fn victory_points(self) -> u32 {
        match self {
            BuildingKind::Settlement => 1,
            BuildingKind::City => 2,
        }
    }

    /// Cards produced per matching roll
    pub fn yield_count(self) -> u32 {
        self.victory_points()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub owner: PlayerId,
    pub kind: BuildingKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Road,
    Ship,
}

/// A road or ship. One slot per edge, so the two never share an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub owner: PlayerId,
    pub kind: RouteKind,
}

/// Port types for maritime trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specific(Resource),
}

impl PortKind {
    /// The exchange rate for this port
    pub fn rate(&self) -> u32 {
        match self {
            PortKind::Generic => 3,
            PortKind::Specific(_) => 2,
        }
    }

    /// Whether trading away `resource` here gets this port's rate
    pub fn applies_to(&self, resource: Resource) -> bool {
        match self {
            PortKind::Generic => true,
            PortKind::Specific(r) => *r == resource,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: usize,
    pub edge: EdgeId,
    pub nodes: [NodeId; 2],
    pub kind: PortKind,
    pub land_tile: Option<TileId>,
    pub sea_tile: Option<TileId>,
}

/// The complete game board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub geometry: Geometry,
    pub tiles: Vec<Tile>,
    pub buildings: Vec<Option<Building>>,
    pub routes: Vec<Option<Route>>,
    pub ports: Vec<Port>,
    pub robber: Option<TileId>,
    pub pirate: Option<TileId>,
}

impl Board {
    /// A board of open sea over the given geometry
    pub fn blank(geometry: Geometry) -> Self {
        let tiles = geometry
            .tiles
            .iter()
            .map(|t| Tile::sea(t.id, t.coord))
            .collect();
        let buildings = vec![None; geometry.nodes.len()];
        let routes = vec![None; geometry.edges.len()];
        Self {
            geometry,
            tiles,
            buildings,
            routes,
            ports: Vec::new(),
            robber: None,
            pirate: None,
        }
    }

    pub fn node_count(&self) -> usize {
        self.geometry.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.geometry.edges.len()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn building(&self, node: NodeId) -> Option<Building> {
        self.buildings.get(node).copied().flatten()
    }

    pub fn route(&self, edge: EdgeId) -> Option<Route> {
        self.routes.get(edge).copied().flatten()
    }

    // ==================== Terrain Queries ====================

    pub fn has_sea(&self) -> bool {
        self.tiles.iter().any(|t| t.terrain.is_sea())
    }

    pub fn is_sea(&self, tile: TileId) -> bool {
        self.tiles.get(tile).map_or(false, |t| t.terrain.is_sea())
    }

    pub fn node_touches_land(&self, node: NodeId) -> bool {
        self.geometry.node_tiles[node].iter().any(|&t| !self.is_sea(t))
    }

    pub fn edge_touches_land(&self, edge: EdgeId) -> bool {
        self.geometry.edge_tiles[edge].iter().any(|&t| !self.is_sea(t))
    }

    /// Open water on either side, or the outer rim of the map
    pub fn edge_touches_sea(&self, edge: EdgeId) -> bool {
        self.geometry.is_boundary_edge(edge)
            || self.geometry.edge_tiles[edge].iter().any(|&t| self.is_sea(t))
    }

    pub fn edge_touches_tile(&self, edge: EdgeId, tile: TileId) -> bool {
        self.geometry.edge_tiles[edge].contains(&tile)
    }

    pub fn edge_near_pirate(&self, edge: EdgeId) -> bool {
        self.pirate
            .map_or(false, |pirate| self.edge_touches_tile(edge, pirate))
    }

    pub fn node_touches_terrain(&self, node: NodeId, terrain: Terrain) -> bool {
        self.geometry.node_tiles[node]
            .iter()
            .any(|&t| self.tiles[t].terrain == terrain)
    }

    // ==================== Placement Rules ====================

    /// Empty, and no building on any neighbouring node
    pub fn distance_rule_ok(&self, node: NodeId) -> bool {
        self.building(node).is_none()
            && self.geometry.nodes[node]
                .adj
                .iter()
                .all(|&n| self.building(n).is_none())
    }

    fn owns_route(&self, edge: EdgeId, player: PlayerId, kind: RouteKind) -> bool {
        self.route(edge)
            .map_or(false, |r| r.owner == player && r.kind == kind)
    }

    /// Whether a new route of `kind` on `edge` joins the player's network.
    /// Routes only link through an endpoint the player owns or one nobody
    /// has built on; `ignore` leaves one edge out of the network.
    pub fn route_connects(
        &self,
        edge: EdgeId,
        player: PlayerId,
        kind: RouteKind,
        ignore: Option<EdgeId>,
    ) -> bool {
        self.geometry.edges[edge].endpoints().iter().any(|&node| {
            match self.building(node) {
                Some(b) if b.owner == player => true,
                Some(_) => false,
                None => self.geometry.node_edges[node]
                    .iter()
                    .any(|&e| e != edge && Some(e) != ignore && self.owns_route(e, player, kind)),
            }
        })
    }

    /// Whether a settlement on `node` touches the player's roads (or ships)
    pub fn settlement_connected(&self, node: NodeId, player: PlayerId, ships_count: bool) -> bool {
        self.geometry.node_edges[node].iter().any(|&e| {
            self.owns_route(e, player, RouteKind::Road)
                || (ships_count && self.owns_route(e, player, RouteKind::Ship))
        })
    }

    /// A ship may move if one of its ends is open: no own building and no
    /// other own ship there.
    pub fn ship_is_movable(&self, edge: EdgeId, player: PlayerId) -> bool {
        self.geometry.edges[edge].endpoints().iter().any(|&node| {
            let own_building = self.building(node).map_or(false, |b| b.owner == player);
            let other_ship = self.geometry.node_edges[node]
                .iter()
                .any(|&e| e != edge && self.owns_route(e, player, RouteKind::Ship));
            !own_building && !other_ship
        })
    }

    // ==================== Mutation ====================

    pub fn place_settlement(&mut self, node: NodeId, owner: PlayerId) {
        self.buildings[node] = Some(Building {
            owner,
            kind: BuildingKind::Settlement,
        });
    }

    pub fn upgrade_to_city(&mut self, node: NodeId) {
        if let Some(building) = self.buildings[node].as_mut() {
            building.kind = BuildingKind::City;
        }
    }

    pub fn place_route(&mut self, edge: EdgeId, owner: PlayerId, kind: RouteKind) {
        self.routes[edge] = Some(Route { owner, kind });
    }

    pub fn remove_route(&mut self, edge: EdgeId) -> Option<Route> {
        self.routes[edge].take()
    }

    /// Turn an unexplored fog tile into what it was hiding
    pub fn reveal(&mut self, tile: TileId) -> Option<Terrain> {
        let tile = self.tiles.get_mut(tile)?;
        if !tile.is_unexplored() {
            return None;
        }
        let hidden = tile.hidden.take()?;
        tile.terrain = hidden.terrain;
        tile.number = if hidden.terrain.takes_number() {
            hidden.number
        } else {
            None
        };
        tile.revealed = true;
        Some(hidden.terrain)
    }

    /// Lowest-id unexplored fog tile next to an edge
    pub fn unexplored_tile_on_edge(&self, edge: EdgeId) -> Option<TileId> {
        self.geometry.edge_tiles[edge]
            .iter()
            .copied()
            .filter(|&t| self.tiles[t].is_unexplored())
            .min()
    }

    // ==================== Production ====================

    /// What each building earns on `roll`, tile by tile, before bank limits
    pub fn production(&self, roll: u8) -> Vec<(PlayerId, Resource, u32)> {
        let mut out = Vec::new();
        for tile in &self.tiles {
            if tile.number != Some(roll) || self.robber == Some(tile.id) {
                continue;
            }
            let Some(resource) = tile.terrain.resource() else {
                continue;
            };
            for &node in &self.geometry.tiles[tile.id].corners {
                if let Some(building) = self.building(node) {
                    out.push((building.owner, resource, building.kind.yield_count()));
                }
            }
        }
        out
    }

    /// One resource per producing tile around a node
    pub fn starting_yield(&self, node: NodeId) -> Vec<Resource> {
        self.geometry.node_tiles[node]
            .iter()
            .filter_map(|&t| self.tiles[t].terrain.resource())
            .collect()
    }

    // ==================== Robber & Pirate ====================

    /// Opponents of `thief` with a building on a corner of `tile`
    pub fn robber_victims(&self, tile: TileId, thief: PlayerId) -> Vec<PlayerId> {
        let mut victims: Vec<PlayerId> = self.geometry.tiles[tile]
            .corners
            .iter()
            .filter_map(|&n| self.building(n))
            .map(|b| b.owner)
            .filter(|&owner| owner != thief)
            .collect();
        victims.sort_unstable();
        victims.dedup();
        victims
    }

    /// Opponents of `thief` with a ship along a side of `tile`
    pub fn pirate_victims(&self, tile: TileId, thief: PlayerId) -> Vec<PlayerId> {
        let mut victims: Vec<PlayerId> = self
            .geometry
            .tile_edges(tile)
            .into_iter()
            .filter_map(|e| self.route(e))
            .filter(|r| r.kind == RouteKind::Ship && r.owner != thief)
            .map(|r| r.owner)
            .collect();
        victims.sort_unstable();
        victims.dedup();
        victims
    }

    // ==================== Islands ====================

    /// Label every land tile with the id of its connected land mass
    pub fn islands(&self) -> Vec<Option<usize>> {
        let mut labels = vec![None; self.tiles.len()];
        let mut next = 0;
        for start in 0..self.tiles.len() {
            if labels[start].is_some() || !self.tiles[start].is_land() {
                continue;
            }
            labels[start] = Some(next);
            let mut queue = VecDeque::from([start]);
            while let Some(tile) = queue.pop_front() {
                for &n in &self.geometry.tile_neighbors[tile] {
                    if labels[n].is_none() && self.tiles[n].is_land() {
                        labels[n] = Some(next);
                        queue.push_back(n);
                    }
                }
            }
            next += 1;
        }
        labels
    }

    pub fn island_of_node(&self, node: NodeId, islands: &[Option<usize>]) -> Option<usize> {
        self.geometry.node_tiles[node]
            .iter()
            .find_map(|&t| islands[t])
    }

    pub fn has_building_on_island(
        &self,
        player: PlayerId,
        island: usize,
        islands: &[Option<usize>],
    ) -> bool {
        self.buildings.iter().enumerate().any(|(node, b)| {
            b.map_or(false, |b| b.owner == player)
                && self.island_of_node(node, islands) == Some(island)
        })
    }

    // ==================== Ports ====================

    pub fn player_ports(&self, player: PlayerId) -> impl Iterator<Item = &Port> + '_ {
        self.ports.iter().filter(move |port| {
            port.nodes
                .iter()
                .any(|&n| self.building(n).map_or(false, |b| b.owner == player))
        })
    }

    /// Best bank rate for giving up `resource`
    pub fn trade_ratio(&self, player: PlayerId, resource: Resource) -> u32 {
        self.player_ports(player)
            .filter(|p| p.kind.applies_to(resource))
            .map(|p| p.kind.rate())
            .fold(4, u32::min)
    }

    // ==================== Scoring ====================

    pub fn building_points(&self, player: PlayerId) -> u32 {
        self.buildings
            .iter()
            .flatten()
            .filter(|b| b.owner == player)
            .map(|b| b.kind.victory_points())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::hexagon;
    use pretty_assertions::assert_eq;

    fn land_board() -> Board {
        let mut board = Board::blank(Geometry::from_axials(&hexagon(1)));
        for tile in board.tiles.iter_mut() {
            tile.terrain = Terrain::Field;
            tile.number = Some(5);
        }
        board
    }

    #[test]
    fn test_distance_rule() {
        let mut board = land_board();
        board.place_settlement(0, 0);
        assert!(!board.distance_rule_ok(0));
        let neighbor = board.geometry.nodes[0].adj[0];
        assert!(!board.distance_rule_ok(neighbor));
        let far = (0..board.node_count())
            .find(|&n| n != 0 && !board.geometry.nodes[0].adj.contains(&n))
            .unwrap();
        assert!(board.distance_rule_ok(far));
    }

    #[test]
    fn test_route_connects_through_own_building() {
        let mut board = land_board();
        board.place_settlement(0, 1);
        let edge = board.geometry.node_edges[0][0];
        assert!(board.route_connects(edge, 1, RouteKind::Road, None));
        assert!(!board.route_connects(edge, 2, RouteKind::Road, None));
    }

    #[test]
    fn test_opponent_building_breaks_connection() {
        let mut board = land_board();
        let node = 0;
        let edges = board.geometry.node_edges[node].clone();
        board.place_route(edges[0], 1, RouteKind::Road);
        assert!(board.route_connects(edges[1], 1, RouteKind::Road, None));
        board.place_settlement(node, 2);
        let other_end = board.geometry.edges[edges[1]].other_end(node).unwrap();
        let through_other_end = board.geometry.node_edges[other_end]
            .iter()
            .any(|&e| board.route(e).is_some());
        assert!(!through_other_end);
        assert!(!board.route_connects(edges[1], 1, RouteKind::Road, None));
    }

    #[test]
    fn test_production_respects_robber_and_cities() {
        let mut board = land_board();
        let center = board.geometry.tile_at(HexCoord::new(0, 0)).unwrap();
        let corner = board.geometry.tiles[center].corners[0];
        board.place_settlement(corner, 0);
        board.upgrade_to_city(corner);
        let produced: u32 = board
            .production(5)
            .iter()
            .filter(|(p, _, _)| *p == 0)
            .map(|(_, _, n)| n)
            .sum();
        // the corner touches three field tiles
        assert_eq!(produced, 6);
        board.robber = Some(center);
        let blocked: u32 = board.production(5).iter().map(|(_, _, n)| n).sum();
        assert_eq!(blocked, 4);
    }

    #[test]
    fn test_islands_split_on_sea() {
        let mut board = Board::blank(Geometry::from_axials(&hexagon(2)));
        let a = board.geometry.tile_at(HexCoord::new(-2, 0)).unwrap();
        let b = board.geometry.tile_at(HexCoord::new(2, 0)).unwrap();
        board.tiles[a].terrain = Terrain::Hills;
        board.tiles[b].terrain = Terrain::Hills;
        let islands = board.islands();
        assert!(islands[a].is_some());
        assert!(islands[b].is_some());
        assert!(islands[a] != islands[b]);
    }

    #[test]
    fn test_reveal_fog_tile() {
        let mut board = Board::blank(Geometry::from_axials(&hexagon(1)));
        board.tiles[0].fog = true;
        board.tiles[0].hidden = Some(HiddenTile {
            terrain: Terrain::Gold,
            number: Some(9),
        });
        let edge = board.geometry.tile_edges(0)[0];
        assert_eq!(board.unexplored_tile_on_edge(edge), Some(0));
        assert_eq!(board.reveal(0), Some(Terrain::Gold));
        assert_eq!(board.tiles[0].number, Some(9));
        assert_eq!(board.unexplored_tile_on_edge(edge), None);
        assert_eq!(board.reveal(0), None);
    }

    #[test]
    fn test_trade_ratio_uses_best_port() {
        let mut board = land_board();
        board.ports.push(Port {
            id: 0,
            edge: 0,
            nodes: [board.geometry.edges[0].a, board.geometry.edges[0].b],
            kind: PortKind::Specific(Resource::Ore),
            land_tile: None,
            sea_tile: None,
        });
        assert_eq!(board.trade_ratio(0, Resource::Ore), 4);
        board.place_settlement(board.geometry.edges[0].a, 0);
        assert_eq!(board.trade_ratio(0, Resource::Ore), 2);
        assert_eq!(board.trade_ratio(0, Resource::Wool), 4);
    }
}
