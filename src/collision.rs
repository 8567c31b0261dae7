use std::collections::BTreeSet;

use crate::agent::{Agent, Path};
use crate::path_table::PathTable;

/// An unordered colliding pair, always stored with the smaller id first so
/// `(a, b)` and `(b, a)` collapse to one entry (spec.md §4.2).
pub type CollidingPair = (usize, usize);

fn pair(a: usize, b: usize) -> CollidingPair {
    (a.min(b), a.max(b))
}

/// Enumerates every agent that collides with `agent_id`'s candidate `path`,
/// given a path table that must NOT currently contain `agent_id`. Checks
/// all three conflict types from spec.md §4.2: vertex, edge (swap), and
/// target (traversing a cell another agent has already stopped at, or vice
/// versa).
pub fn colliding_pairs_for(agent_id: usize, path: &Path, path_table: &PathTable, agents: &[Agent]) -> BTreeSet<CollidingPair> {
    let mut pairs = BTreeSet::new();
    if path.len() < 2 {
        return pairs;
    }

    for t in 1..path.len() {
        let from = path[t - 1];
        let to = path[t];

        // Vertex conflict: anyone else at `to` at time `t`.
        for &other in path_table.occupants(to, t) {
            pairs.insert(pair(agent_id, other));
        }

        // Edge conflict: a swap between `from` and `to` across this step.
        if from != to {
            for &a1 in path_table.occupants(to, t - 1) {
                for &a2 in path_table.occupants(from, t) {
                    if a1 == a2 {
                        pairs.insert(pair(agent_id, a1));
                    }
                }
            }
        }

        // Target-of-other conflict: `to` is some other agent's goal, and
        // that agent arrived there at or before `t`.
        if let Some(goal_time) = path_table.goal_time(to) {
            if goal_time < t {
                for &other in path_table.occupants(to, goal_time) {
                    if agents[other].path.last() == Some(&to) {
                        pairs.insert(pair(agent_id, other));
                        break;
                    }
                }
            }
        }
    }

    // This agent's own target traversed by others after it has stopped.
    let goal = *path.last().unwrap();
    let path_len = path.len();
    for t in path_len..=path_table.makespan {
        for &other in path_table.occupants(goal, t) {
            pairs.insert(pair(agent_id, other));
        }
    }

    pairs
}
