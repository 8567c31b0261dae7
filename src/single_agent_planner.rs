//! The low-level single-agent planner (§6's "Single-agent planner",
//! component C10 of SPEC_FULL.md). Out of scope per spec.md §1 in the sense
//! that its internal search strategy isn't specified — but the Repair Loop
//! needs something real to call, so this is a time-expanded A* over
//! `(cell, time)` states, grounded in the teacher's
//! `solver/algorithm/astar.rs` generalized from `(row, col)` positions to
//! flat cell indices and from a fixed-size vertex constraint set to a
//! constraint table that also understands edge and permanent bans.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use crate::agent::{Agent, Path};
use crate::map::Map;
use crate::path_table::PathTable;

/// Hard constraints for a single agent's replan, used by the black-box
/// replanners (GCBS/PBS) to carve out space for higher-priority or
/// previously-branched agents. Plain PP never populates one of these beyond
/// the default empty table (spec.md §4.4).
#[derive(Debug, Clone, Default)]
pub struct ConstraintTable {
    vertex: HashSet<(usize, usize)>,
    edge: HashSet<(usize, usize, usize)>,
    /// `cell -> earliest time from which it's permanently off-limits`,
    /// used for target reasoning (an agent's goal becomes unusable by
    /// anyone else from its arrival time onward).
    permanent: HashMap<usize, usize>,
}

impl ConstraintTable {
    pub fn new() -> Self {
        ConstraintTable::default()
    }

    pub fn ban_vertex(&mut self, cell: usize, time: usize) {
        self.vertex.insert((cell, time));
    }

    /// Bans moving from `from` to `to` arriving at time `time` (a swap with
    /// whoever is making the opposite move).
    pub fn ban_edge(&mut self, from: usize, to: usize, time: usize) {
        self.edge.insert((from, to, time));
    }

    pub fn ban_permanently_from(&mut self, cell: usize, time: usize) {
        let entry = self.permanent.entry(cell).or_insert(time);
        *entry = (*entry).min(time);
    }

    fn is_vertex_violated(&self, cell: usize, time: usize) -> bool {
        if self.vertex.contains(&(cell, time)) {
            return true;
        }
        matches!(self.permanent.get(&cell), Some(&from) if time >= from)
    }

    fn is_edge_violated(&self, from: usize, to: usize, time: usize) -> bool {
        self.edge.contains(&(from, to, time))
    }

    /// The latest timestep referenced by any constraint; a path may only
    /// stop for good once it's past this, matching spec.md's requirement
    /// that "last step is the agent's goal" permanently (the teacher's
    /// `a_star_search` calls this `max_time`).
    fn max_time(&self) -> usize {
        let v = self.vertex.iter().map(|&(_, t)| t).max().unwrap_or(0);
        let e = self.edge.iter().map(|&(_, _, t)| t).max().unwrap_or(0);
        v.max(e)
    }
}

#[derive(Clone, Eq, PartialEq)]
struct SearchNode {
    cell: usize,
    time: usize,
    g_cost: usize,
    /// Count of other agents already occupying cells visited along this
    /// node's path-so-far — a soft tie-breaker only, never a hard block,
    /// matching spec.md §4.4: the path table is consulted so conflicts can
    /// be minimized, but it never prevents the search from finding *some*
    /// path to the goal.
    soft_conflicts: usize,
    f_cost: usize,
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse every key so the smallest
        // (f_cost, soft_conflicts) pops first.
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.soft_conflicts.cmp(&self.soft_conflicts))
            .then_with(|| other.g_cost.cmp(&self.g_cost))
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Finds a path for `agent` from its current position (`agent.start`) to
/// its goal, respecting `constraints` as hard bans and using `path_table`
/// only as a soft tie-breaking cost. Always returns a path (the search
/// space is the full reachable grid over time; if `constraints` make the
/// goal temporarily unreachable the search simply waits it out, since
/// "wait" is always a legal neighbor).
pub fn find_optimal_path(agent: &Agent, constraints: &ConstraintTable, path_table: &PathTable, map: &Map) -> Path {
    let max_time = constraints.max_time();

    let mut open = BinaryHeap::new();
    let mut best_g: HashMap<(usize, usize), usize> = HashMap::new();
    let mut trace: HashMap<(usize, usize), (usize, usize)> = HashMap::new();

    let start = agent.start;
    best_g.insert((start, 0), 0);
    open.push(SearchNode {
        cell: start,
        time: 0,
        g_cost: 0,
        soft_conflicts: path_table.occupants(start, 0).len(),
        f_cost: agent.heuristic[start],
    });

    while let Some(current) = open.pop() {
        if current.cell == agent.goal && current.time > max_time {
            return reconstruct(&trace, (current.cell, current.time));
        }
        if current.g_cost > *best_g.get(&(current.cell, current.time)).unwrap_or(&usize::MAX) {
            continue;
        }

        let next_time = current.time + 1;
        // "Wait" is always a candidate move alongside real neighbors.
        let mut moves: Vec<usize> = map.get_neighbors(current.cell).to_vec();
        moves.push(current.cell);

        for next_cell in moves {
            if constraints.is_vertex_violated(next_cell, next_time) {
                continue;
            }
            if constraints.is_edge_violated(current.cell, next_cell, next_time) {
                continue;
            }

            let tentative_g = current.g_cost + 1;
            let key = (next_cell, next_time);
            if tentative_g < *best_g.get(&key).unwrap_or(&usize::MAX) {
                best_g.insert(key, tentative_g);
                trace.insert(key, (current.cell, current.time));
                let soft_conflicts = current.soft_conflicts + path_table.occupants(next_cell, next_time).len();
                open.push(SearchNode {
                    cell: next_cell,
                    time: next_time,
                    g_cost: tentative_g,
                    soft_conflicts,
                    f_cost: tentative_g + agent.heuristic[next_cell],
                });
            }
        }
    }

    // Unreachable in practice on a connected map with goal reachable from
    // start, since waiting is always legal; a genuinely disconnected map is
    // a caller error (fatal per spec.md §7, not something to silently patch
    // here).
    unreachable!("no path found for agent {} despite wait always being legal", agent.id)
}

/// A shortest path that never waits, ignoring the path table entirely
/// (spec.md §4.4's "no_wait" probe variant). Also collects, per spec.md
/// §4.5.2 step 3, every agent id whose goal (per `goal_table`) lies on the
/// returned route.
pub fn find_no_wait_path(agent: &Agent, goal_table: &[Option<usize>], map: &Map) -> (Path, BTreeSet<usize>) {
    let mut open = BinaryHeap::new();
    let mut best_g: HashMap<usize, usize> = HashMap::new();
    let mut trace: HashMap<usize, usize> = HashMap::new();

    best_g.insert(agent.start, 0);
    open.push(SearchNode {
        cell: agent.start,
        time: 0,
        g_cost: 0,
        soft_conflicts: 0,
        f_cost: agent.heuristic[agent.start],
    });

    while let Some(current) = open.pop() {
        if current.cell == agent.goal {
            let path = reconstruct_no_wait(&trace, current.cell, agent.start);
            let targets = path
                .iter()
                .filter_map(|&cell| goal_table.get(cell).copied().flatten())
                .filter(|&id| id != agent.id)
                .collect();
            return (path, targets);
        }
        if current.g_cost > *best_g.get(&current.cell).unwrap_or(&usize::MAX) {
            continue;
        }
        for &next_cell in map.get_neighbors(current.cell) {
            let tentative_g = current.g_cost + 1;
            if tentative_g < *best_g.get(&next_cell).unwrap_or(&usize::MAX) {
                best_g.insert(next_cell, tentative_g);
                trace.insert(next_cell, current.cell);
                open.push(SearchNode {
                    cell: next_cell,
                    time: tentative_g,
                    g_cost: tentative_g,
                    soft_conflicts: 0,
                    f_cost: tentative_g + agent.heuristic[next_cell],
                });
            }
        }
    }

    unreachable!("no no-wait path found for agent {}", agent.id)
}

fn reconstruct(trace: &HashMap<(usize, usize), (usize, usize)>, mut current: (usize, usize)) -> Path {
    let mut path = vec![current.0];
    while let Some(&prev) = trace.get(&current) {
        path.push(prev.0);
        current = prev;
    }
    path.reverse();
    path
}

fn reconstruct_no_wait(trace: &HashMap<usize, usize>, mut current: usize, start: usize) -> Path {
    let mut path = vec![current];
    while current != start {
        current = trace[&current];
        path.push(current);
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_map(h: usize, w: usize) -> Map {
        Map::from_grid(h, w, vec![true; h * w])
    }

    fn agent_on(map: &Map, start: usize, goal: usize) -> Agent {
        Agent::new(0, start, goal, map.heuristic_from_goal(goal))
    }

    #[test]
    fn finds_shortest_path_on_open_map() {
        let map = open_map(3, 3);
        let agent = agent_on(&map, map.index(0, 0), map.index(2, 2));
        let pt = PathTable::new(map.map_size());
        let constraints = ConstraintTable::new();
        let path = find_optimal_path(&agent, &constraints, &pt, &map);
        assert_eq!(path.len(), 5); // 4 moves, cost 4
        assert_eq!(*path.first().unwrap(), agent.start);
        assert_eq!(*path.last().unwrap(), agent.goal);
    }

    #[test]
    fn respects_vertex_constraint() {
        let map = open_map(1, 5);
        let agent = agent_on(&map, map.index(0, 0), map.index(0, 4));
        let pt = PathTable::new(map.map_size());
        let mut constraints = ConstraintTable::new();
        // Ban being at cell (0,1) at time 1 — forces a wait.
        constraints.ban_vertex(map.index(0, 1), 1);
        let path = find_optimal_path(&agent, &constraints, &pt, &map);
        assert!(path.len() > 5);
        for t in 1..path.len() {
            assert!(map.valid_move(path[t - 1], path[t]));
        }
    }

    #[test]
    fn no_wait_path_never_stays_put() {
        let map = open_map(1, 5);
        let agent = agent_on(&map, map.index(0, 0), map.index(0, 4));
        let goal_table = vec![None; map.map_size()];
        let (path, targets) = find_no_wait_path(&agent, &goal_table, &map);
        assert_eq!(path.len(), 5);
        for t in 1..path.len() {
            assert_ne!(path[t - 1], path[t]);
        }
        assert!(targets.is_empty());
    }

    #[test]
    fn no_wait_path_collects_crossed_targets() {
        let map = open_map(1, 5);
        let agent = agent_on(&map, map.index(0, 0), map.index(0, 4));
        let mut goal_table = vec![None; map.map_size()];
        goal_table[map.index(0, 2)] = Some(7);
        let (_, targets) = find_no_wait_path(&agent, &goal_table, &map);
        assert!(targets.contains(&7));
    }
}
