//! Longest continuous route per player and the award that follows from it.
//!
//! Roads and ships both count. A walk may end on a node holding an
//! opponent's building but never passes through it. The search is an
//! exhaustive DFS from every node without reusing an edge, which is cheap at
//! board sizes of a few hundred edges.

use crate::board::{Board, PlayerId};
use crate::geometry::{EdgeId, NodeId};
use std::collections::HashMap;

/// Routes shorter than this never earn the award
pub const MIN_AWARD_LENGTH: u32 = 5;

/// Length of the longest edge-simple path through the player's routes
pub fn longest_route(board: &Board, player: PlayerId) -> u32 {
    let owned: Vec<EdgeId> = (0..board.edge_count())
        .filter(|&e| board.route(e).map_or(false, |r| r.owner == player))
        .collect();
    if owned.is_empty() {
        return 0;
    }

    let mut adjacency: HashMap<NodeId, Vec<(EdgeId, NodeId)>> = HashMap::new();
    for &edge in &owned {
        let geom = &board.geometry.edges[edge];
        adjacency.entry(geom.a).or_default().push((edge, geom.b));
        adjacency.entry(geom.b).or_default().push((edge, geom.a));
    }

    let blocked = |node: NodeId| board.building(node).map_or(false, |b| b.owner != player);

    let mut used: HashMap<EdgeId, bool> = owned.iter().map(|&e| (e, false)).collect();
    let mut best = 0;
    for &start in adjacency.keys() {
        best = best.max(walk(start, true, &adjacency, &blocked, &mut used));
    }
    best
}

fn walk(
    node: NodeId,
    is_start: bool,
    adjacency: &HashMap<NodeId, Vec<(EdgeId, NodeId)>>,
    blocked: &dyn Fn(NodeId) -> bool,
    used: &mut HashMap<EdgeId, bool>,
) -> u32 {
    if !is_start && blocked(node) {
        return 0;
    }
    let mut best = 0;
    for &(edge, next) in adjacency.get(&node).map(Vec::as_slice).unwrap_or_default() {
        if used.get(&edge).copied().unwrap_or(true) {
            continue;
        }
        used.insert(edge, true);
        best = best.max(1 + walk(next, false, adjacency, blocked, used));
        used.insert(edge, false);
    }
    best
}

/// Who holds the award given every player's length. A unique leader at or
/// over the threshold takes it; on a tie the current holder keeps it if they
/// are among the leaders, otherwise nobody holds it.
pub fn award_holder(lengths: &[(PlayerId, u32)], holder: Option<PlayerId>) -> Option<PlayerId> {
    let best = lengths.iter().map(|&(_, len)| len).max().unwrap_or(0);
    if best < MIN_AWARD_LENGTH {
        return None;
    }
    let leaders: Vec<PlayerId> = lengths
        .iter()
        .filter(|&&(_, len)| len == best)
        .map(|&(p, _)| p)
        .collect();
    match leaders.as_slice() {
        [only] => Some(*only),
        _ => holder.filter(|h| leaders.contains(h)),
    }
}
