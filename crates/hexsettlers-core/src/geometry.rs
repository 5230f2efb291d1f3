//! Hex geometry: axial coordinates and the shared tile/node/edge graph.
//!
//! A board layout is just a list of axial coordinates. [`Geometry::from_axials`]
//! turns that list into integer-indexed tiles, corner nodes and edges, merging
//! the corners and sides that neighbouring hexes share. Everything else in the
//! engine addresses the board through these ids.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type TileId = usize;
pub type NodeId = usize;
pub type EdgeId = usize;

/// Neighbour offsets, starting east and turning counter-clockwise.
pub const HEX_DIRECTIONS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// Corner positions are merged after rounding to this many steps per unit.
const CORNER_PRECISION: f64 = 10_000.0;

/// Axial coordinate for hex grid.
///
/// In axial coordinates:
/// - `q` increases going east (right)
/// - `r` increases going southeast
/// - The third coordinate `s` (not stored) satisfies: q + r + s = 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The implicit third coordinate (s = -q - r)
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// The six neighbouring hexes in [`HEX_DIRECTIONS`] order
    pub fn neighbors(&self) -> [HexCoord; 6] {
        HEX_DIRECTIONS.map(|(dq, dr)| HexCoord::new(self.q + dq, self.r + dr))
    }

    pub fn distance_to(&self, other: &HexCoord) -> i32 {
        ((self.q - other.q).abs() + (self.r - other.r).abs() + (self.s() - other.s()).abs()) / 2
    }

    pub fn distance_from_origin(&self) -> i32 {
        self.distance_to(&HexCoord::default())
    }

    /// Pointy-top pixel centre for a hex of unit size.
    pub fn to_pixel(&self) -> (f64, f64) {
        let x = 3f64.sqrt() * (self.q as f64 + self.r as f64 / 2.0);
        let y = 1.5 * self.r as f64;
        (x, y)
    }

    /// Corner positions at 30° + 60°·i around the centre.
    pub fn corners(&self) -> [(f64, f64); 6] {
        let (cx, cy) = self.to_pixel();
        let mut corners = [(0.0, 0.0); 6];
        for (i, corner) in corners.iter_mut().enumerate() {
            let angle = (60.0 * i as f64 + 30.0).to_radians();
            *corner = (cx + angle.cos(), cy + angle.sin());
        }
        corners
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}

impl From<(i32, i32)> for HexCoord {
    fn from((q, r): (i32, i32)) -> Self {
        HexCoord::new(q, r)
    }
}

/// All coordinates within `radius` of the origin.
pub fn hexagon(radius: i32) -> Vec<HexCoord> {
    let mut coords = Vec::new();
    for q in -radius..=radius {
        let r1 = (-radius).max(-q - radius);
        let r2 = radius.min(-q + radius);
        for r in r1..=r2 {
            coords.push(HexCoord::new(q, r));
        }
    }
    coords
}

/// The 70-tile layout used by the wide desert and fog maps: nine rows,
/// wider toward the east.
pub fn wide_desert_layout() -> Vec<HexCoord> {
    let mut coords = Vec::with_capacity(70);
    for r in -4..=4 {
        let q_min = if r <= 0 { -4 - r } else { -4 };
        let q_max = if r <= 0 { 5 } else { 5 - r };
        for q in q_min..=q_max {
            coords.push(HexCoord::new(q, r));
        }
    }
    coords
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileGeom {
    pub id: TileId,
    pub coord: HexCoord,
    pub cx: f64,
    pub cy: f64,
    /// Corner nodes in angle order
    pub corners: [NodeId; 6],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGeom {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    /// Nodes one edge away
    pub adj: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeGeom {
    pub id: EdgeId,
    /// Lower endpoint id
    pub a: NodeId,
    /// Higher endpoint id
    pub b: NodeId,
    pub mx: f64,
    pub my: f64,
}

impl EdgeGeom {
    pub fn endpoints(&self) -> [NodeId; 2] {
        [self.a, self.b]
    }

    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if node == self.a {
            Some(self.b)
        } else if node == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

/// The immutable tile/node/edge graph of a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    pub tiles: Vec<TileGeom>,
    pub nodes: Vec<NodeGeom>,
    pub edges: Vec<EdgeGeom>,
    pub node_tiles: Vec<Vec<TileId>>,
    pub node_edges: Vec<Vec<EdgeId>>,
    pub edge_tiles: Vec<Vec<TileId>>,
    pub tile_neighbors: Vec<Vec<TileId>>,
}

impl Geometry {
    /// Build the graph for a list of axial coordinates. Tile ids follow the
    /// input order; node and edge ids follow first discovery.
    pub fn from_axials(coords: &[HexCoord]) -> Self {
        let mut tiles = Vec::with_capacity(coords.len());
        let mut nodes: Vec<NodeGeom> = Vec::new();
        let mut node_keys: HashMap<(i64, i64), NodeId> = HashMap::new();
        let mut node_tiles: Vec<Vec<TileId>> = Vec::new();
        let mut edges: Vec<EdgeGeom> = Vec::new();
        let mut edge_keys: HashMap<(NodeId, NodeId), EdgeId> = HashMap::new();
        let mut edge_tiles: Vec<Vec<TileId>> = Vec::new();

        for (tile_id, coord) in coords.iter().enumerate() {
            let (cx, cy) = coord.to_pixel();
            let mut corners = [0; 6];
            for (i, (x, y)) in coord.corners().into_iter().enumerate() {
                let key = (
                    (x * CORNER_PRECISION).round() as i64,
                    (y * CORNER_PRECISION).round() as i64,
                );
                let node_id = *node_keys.entry(key).or_insert_with(|| {
                    nodes.push(NodeGeom {
                        id: nodes.len(),
                        x,
                        y,
                        adj: Vec::new(),
                    });
                    node_tiles.push(Vec::new());
                    nodes.len() - 1
                });
                if !node_tiles[node_id].contains(&tile_id) {
                    node_tiles[node_id].push(tile_id);
                }
                corners[i] = node_id;
            }

            for i in 0..6 {
                let (n1, n2) = (corners[i], corners[(i + 1) % 6]);
                let (a, b) = if n1 < n2 { (n1, n2) } else { (n2, n1) };
                let edge_id = *edge_keys.entry((a, b)).or_insert_with(|| {
                    edges.push(EdgeGeom {
                        id: edges.len(),
                        a,
                        b,
                        mx: (nodes[a].x + nodes[b].x) / 2.0,
                        my: (nodes[a].y + nodes[b].y) / 2.0,
                    });
                    edge_tiles.push(Vec::new());
                    edges.len() - 1
                });
                if !edge_tiles[edge_id].contains(&tile_id) {
                    edge_tiles[edge_id].push(tile_id);
                }
            }

            tiles.push(TileGeom {
                id: tile_id,
                coord: *coord,
                cx,
                cy,
                corners,
            });
        }

        let mut node_edges: Vec<Vec<EdgeId>> = vec![Vec::new(); nodes.len()];
        for edge in &edges {
            node_edges[edge.a].push(edge.id);
            node_edges[edge.b].push(edge.id);
            nodes[edge.a].adj.push(edge.b);
            nodes[edge.b].adj.push(edge.a);
        }

        let index: HashMap<HexCoord, TileId> = coords
            .iter()
            .enumerate()
            .map(|(id, coord)| (*coord, id))
            .collect();
        let tile_neighbors = coords
            .iter()
            .map(|coord| {
                coord
                    .neighbors()
                    .iter()
                    .filter_map(|n| index.get(n).copied())
                    .collect()
            })
            .collect();

        Self {
            tiles,
            nodes,
            edges,
            node_tiles,
            node_edges,
            edge_tiles,
            tile_neighbors,
        }
    }

    pub fn tile_at(&self, coord: HexCoord) -> Option<TileId> {
        self.tiles.iter().find(|t| t.coord == coord).map(|t| t.id)
    }

    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.node_edges
            .get(a)?
            .iter()
            .copied()
            .find(|&e| self.edges[e].other_end(a) == Some(b))
    }

    /// Edges sharing an endpoint with `edge`, excluding itself.
    pub fn adjacent_edges(&self, edge: EdgeId) -> Vec<EdgeId> {
        let Some(geom) = self.edges.get(edge) else {
            return Vec::new();
        };
        let mut out: Vec<EdgeId> = geom
            .endpoints()
            .iter()
            .flat_map(|&n| self.node_edges[n].iter().copied())
            .filter(|&e| e != edge)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn is_boundary_edge(&self, edge: EdgeId) -> bool {
        self.edge_tiles.get(edge).map_or(false, |t| t.len() == 1)
    }

    /// Edges forming the six sides of a tile.
    pub fn tile_edges(&self, tile: TileId) -> Vec<EdgeId> {
        let Some(geom) = self.tiles.get(tile) else {
            return Vec::new();
        };
        (0..6)
            .filter_map(|i| self.edge_between(geom.corners[i], geom.corners[(i + 1) % 6]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hexagon_sizes() {
        assert_eq!(hexagon(0).len(), 1);
        assert_eq!(hexagon(2).len(), 19);
        assert_eq!(hexagon(3).len(), 37);
        assert_eq!(hexagon(4).len(), 61);
    }

    #[test]
    fn test_wide_desert_layout_size() {
        let coords = wide_desert_layout();
        assert_eq!(coords.len(), 70);
        assert!(coords.contains(&HexCoord::new(4, -3)));
        assert!(coords.contains(&HexCoord::new(-3, 3)));
    }

    #[test]
    fn test_distance() {
        let a = HexCoord::new(0, 0);
        assert_eq!(a.distance_to(&HexCoord::new(2, -1)), 2);
        assert_eq!(HexCoord::new(-3, 3).distance_from_origin(), 3);
    }

    #[test]
    fn test_single_hex_graph() {
        let g = Geometry::from_axials(&[HexCoord::new(0, 0)]);
        assert_eq!(g.nodes.len(), 6);
        assert_eq!(g.edges.len(), 6);
        assert!(g.edges.iter().all(|e| e.a < e.b));
        assert!(g.nodes.iter().all(|n| n.adj.len() == 2));
    }

    #[test]
    fn test_radius_two_counts() {
        let g = Geometry::from_axials(&hexagon(2));
        assert_eq!(g.tiles.len(), 19);
        assert_eq!(g.nodes.len(), 54);
        assert_eq!(g.edges.len(), 72);
    }

    #[test]
    fn test_adjacency_invariants() {
        let g = Geometry::from_axials(&wide_desert_layout());
        for tiles in &g.edge_tiles {
            assert!((1..=2).contains(&tiles.len()));
        }
        for tiles in &g.node_tiles {
            assert!((1..=3).contains(&tiles.len()));
        }
        for (node, edges) in g.node_edges.iter().enumerate() {
            assert!((2..=3).contains(&edges.len()));
            assert_eq!(edges.len(), g.nodes[node].adj.len());
        }
    }

    #[test]
    fn test_tile_neighbors_follow_direction_order() {
        let coords = hexagon(1);
        let g = Geometry::from_axials(&coords);
        let center = g.tile_at(HexCoord::new(0, 0)).unwrap();
        let neighbors: Vec<HexCoord> = g.tile_neighbors[center]
            .iter()
            .map(|&t| g.tiles[t].coord)
            .collect();
        assert_eq!(neighbors, HexCoord::new(0, 0).neighbors().to_vec());
    }

    #[test]
    fn test_tile_edges_and_shared_sides() {
        let g = Geometry::from_axials(&hexagon(1));
        let center = g.tile_at(HexCoord::new(0, 0)).unwrap();
        let edges = g.tile_edges(center);
        assert_eq!(edges.len(), 6);
        assert!(edges.iter().all(|&e| g.edge_tiles[e].len() == 2));
        assert!(edges.iter().all(|&e| !g.is_boundary_edge(e)));
    }
}
