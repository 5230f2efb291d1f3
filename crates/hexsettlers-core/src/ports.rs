//! Port placement around the coastline.
//!
//! Candidate edges are sorted by angle around the map centre and nine are
//! picked near evenly spaced targets, keeping a minimum circular gap and
//! avoiding shared nodes when the coastline allows it.

use crate::board::{Board, Port, PortKind, Resource};
use crate::geometry::EdgeId;
use rand::seq::SliceRandom;
use rand::Rng;

pub const PORT_COUNT: usize = 9;

/// Four generic ports and one 2:1 port per resource
pub fn standard_port_kinds() -> Vec<PortKind> {
    let mut kinds = vec![PortKind::Generic; 4];
    kinds.extend(Resource::ALL.into_iter().map(PortKind::Specific));
    kinds
}

/// Land/sea edges, or the outer rim when the map has no coastline
fn candidate_edges(board: &Board) -> Vec<EdgeId> {
    let geometry = &board.geometry;
    let coastline: Vec<EdgeId> = (0..board.edge_count())
        .filter(|&e| {
            let tiles = &geometry.edge_tiles[e];
            tiles.len() == 2 && board.is_sea(tiles[0]) != board.is_sea(tiles[1])
        })
        .collect();
    if !coastline.is_empty() {
        return coastline;
    }
    (0..board.edge_count())
        .filter(|&e| geometry.is_boundary_edge(e))
        .collect()
}

fn circular_gap(a: usize, b: usize, n: usize) -> usize {
    let d = a.abs_diff(b);
    d.min(n - d)
}

/// Choose port edges and assign shuffled kinds. Replaces any existing ports.
pub fn place_ports<R: Rng>(board: &mut Board, rng: &mut R) {
    board.ports.clear();
    let mut candidates = candidate_edges(board);
    if candidates.is_empty() {
        return;
    }
    let geometry = &board.geometry;
    candidates.sort_by(|&a, &b| {
        let ea = &geometry.edges[a];
        let eb = &geometry.edges[b];
        ea.my.atan2(ea.mx).total_cmp(&eb.my.atan2(eb.mx))
    });

    let n = candidates.len();
    let step = n as f64 / PORT_COUNT as f64;
    let min_gap = 2.max((step * 0.65).floor() as usize);

    let mut chosen: Vec<usize> = Vec::with_capacity(PORT_COUNT);
    let mut used_nodes: Vec<usize> = Vec::new();

    for i in 0..PORT_COUNT {
        let target = (i as f64 * step).round() as usize % n;
        let spaced = |idx: usize, chosen: &[usize]| {
            !chosen.contains(&idx) && chosen.iter().all(|&c| circular_gap(c, idx, n) >= min_gap)
        };
        let free_nodes = |idx: usize| {
            let edge = &geometry.edges[candidates[idx]];
            !used_nodes.contains(&edge.a) && !used_nodes.contains(&edge.b)
        };

        let mut pick = None;
        'strict: for d in 0..n {
            for idx in [(target + d) % n, (target + n - d % n) % n] {
                if spaced(idx, &chosen) && free_nodes(idx) {
                    pick = Some(idx);
                    break 'strict;
                }
            }
        }
        if pick.is_none() {
            'loose: for d in 0..n {
                for idx in [(target + d) % n, (target + n - d % n) % n] {
                    if spaced(idx, &chosen) {
                        pick = Some(idx);
                        break 'loose;
                    }
                }
            }
        }
        let idx = pick.unwrap_or(target);
        chosen.push(idx);
        let edge = &geometry.edges[candidates[idx]];
        used_nodes.push(edge.a);
        used_nodes.push(edge.b);
    }

    let mut kinds = standard_port_kinds();
    kinds.shuffle(rng);

    let mut ports = Vec::with_capacity(PORT_COUNT);
    for (id, (idx, kind)) in chosen.into_iter().zip(kinds).enumerate() {
        let edge_id = candidates[idx];
        let edge = &geometry.edges[edge_id];
        let tiles = &geometry.edge_tiles[edge_id];
        let land_tile = tiles.iter().copied().find(|&t| !board.is_sea(t));
        let sea_tile = tiles.iter().copied().find(|&t| board.is_sea(t));
        ports.push(Port {
            id,
            edge: edge_id,
            nodes: [edge.a, edge.b],
            kind,
            land_tile,
            sea_tile,
        });
    }
    board.ports = ports;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Terrain;
    use crate::geometry::{hexagon, Geometry};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn island_board() -> Board {
        let mut board = Board::blank(Geometry::from_axials(&hexagon(3)));
        for tile in board.tiles.iter_mut() {
            if tile.coord.distance_from_origin() <= 2 {
                tile.terrain = Terrain::Field;
            }
        }
        board
    }

    #[test]
    fn test_nine_ports_on_coastline() {
        let mut board = island_board();
        place_ports(&mut board, &mut StdRng::seed_from_u64(3));
        assert_eq!(board.ports.len(), PORT_COUNT);
        for port in &board.ports {
            assert!(port.land_tile.is_some());
            assert!(port.sea_tile.is_some());
        }
        let generic = board
            .ports
            .iter()
            .filter(|p| p.kind == PortKind::Generic)
            .count();
        assert_eq!(generic, 4);
    }

    #[test]
    fn test_ports_do_not_share_nodes_on_classic_coast() {
        let mut board = island_board();
        place_ports(&mut board, &mut StdRng::seed_from_u64(9));
        let mut nodes: Vec<usize> = board.ports.iter().flat_map(|p| p.nodes).collect();
        let before = nodes.len();
        nodes.sort_unstable();
        nodes.dedup();
        assert_eq!(nodes.len(), before);
    }

    #[test]
    fn test_all_sea_board_uses_boundary() {
        let mut board = Board::blank(Geometry::from_axials(&hexagon(2)));
        place_ports(&mut board, &mut StdRng::seed_from_u64(1));
        assert_eq!(board.ports.len(), PORT_COUNT);
        assert!(board
            .ports
            .iter()
            .all(|p| board.geometry.is_boundary_edge(p.edge)));
    }
}
