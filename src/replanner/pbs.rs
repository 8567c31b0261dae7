//! Priority-Based Search: agents are given a total order; each plans against
//! every higher-priority agent's path as a hard constraint. A conflict
//! between two neighborhood agents triggers a priority swap and a replan,
//! bounded by `2 * neighborhood_size` swap attempts — the
//! `pbs.solve(T, neighbor.agents.size() * 2, ...)` budget from
//! `examples/original_source/src/InitLNS.cpp::runPBS`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::agent::{Agent, Path};
use crate::collision::colliding_pairs_for;
use crate::map::Map;
use crate::path_table::PathTable;
use crate::single_agent_planner::{find_optimal_path, ConstraintTable};

use super::{ban_path, ReplanOutcome, Replanner};

pub struct Pbs;

fn position_at(path: &Path, t: usize) -> usize {
    if t < path.len() {
        path[t]
    } else {
        *path.last().expect("path is non-empty")
    }
}

/// First conflicting pair in `order`, searching in priority order so the
/// reported pair is always `(earlier, later)` — the one PBS swaps.
fn first_conflict_in_order(order: &[usize], paths: &HashMap<usize, Path>) -> Option<(usize, usize)> {
    for i in 0..order.len() {
        for j in (i + 1)..order.len() {
            let (a, b) = (order[i], order[j]);
            let (pa, pb) = (&paths[&a], &paths[&b]);
            let makespan = pa.len().max(pb.len()) - 1;
            for t in 0..=makespan {
                let (ca, cb) = (position_at(pa, t), position_at(pb, t));
                if ca == cb {
                    return Some((a, b));
                }
                if t >= 1 {
                    let (ca_prev, cb_prev) = (position_at(pa, t - 1), position_at(pb, t - 1));
                    if ca_prev == cb && cb_prev == ca && ca_prev != ca {
                        return Some((a, b));
                    }
                }
            }
        }
    }
    None
}

/// Replans every agent in `order`, each against the already-fixed paths of
/// everyone earlier in the order plus every frozen external agent.
fn plan_in_priority_order(order: &[usize], agents: &[Agent], path_table: &PathTable, map: &Map) -> HashMap<usize, Path> {
    let mut fixed = ConstraintTable::new();
    for agent in agents {
        if !order.contains(&agent.id) && !agent.path.is_empty() {
            ban_path(&mut fixed, &agent.path);
        }
    }

    let mut paths = HashMap::new();
    let mut constraints = fixed;
    for &id in order {
        let path = find_optimal_path(&agents[id], &constraints, path_table, map);
        ban_path(&mut constraints, &path);
        paths.insert(id, path);
    }
    paths
}

impl Replanner for Pbs {
    fn solve(&self, neighborhood: &[usize], agents: &[Agent], path_table: &PathTable, map: &Map, time_budget: Duration) -> Option<ReplanOutcome> {
        if neighborhood.is_empty() {
            return None;
        }
        let deadline = Instant::now() + time_budget;
        let max_attempts = 2 * neighborhood.len();

        let mut order: Vec<usize> = neighborhood.to_vec();
        let mut paths = plan_in_priority_order(&order, agents, path_table, map);
        let mut attempts = 0;

        while attempts < max_attempts && Instant::now() < deadline {
            match first_conflict_in_order(&order, &paths) {
                None => break,
                Some((earlier, later)) => {
                    let later_pos = order.iter().position(|&id| id == later).expect("later came from order");
                    let earlier_pos = order.iter().position(|&id| id == earlier).expect("earlier came from order");
                    order.remove(later_pos);
                    order.insert(earlier_pos, later);
                    paths = plan_in_priority_order(&order, agents, path_table, map);
                    attempts += 1;
                }
            }
        }

        let mut colliding_pairs = std::collections::BTreeSet::new();
        let mut sum_of_costs = 0;
        for &id in neighborhood {
            let path = &paths[&id];
            sum_of_costs += path.len() - 1;
            colliding_pairs.extend(colliding_pairs_for(id, path, path_table, agents));
        }
        if let Some((a, b)) = first_conflict_in_order(&order, &paths) {
            colliding_pairs.insert((a.min(b), a.max(b)));
        }

        Some(ReplanOutcome {
            paths: neighborhood.iter().map(|id| paths[id].clone()).collect(),
            sum_of_costs,
            colliding_pairs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_map(h: usize, w: usize) -> Map {
        Map::from_grid(h, w, vec![true; h * w])
    }

    #[test]
    fn resolves_a_head_on_conflict_via_priority_swap() {
        let map = open_map(2, 5);
        let mut agents = vec![
            Agent::new(0, map.index(0, 0), map.index(0, 4), map.heuristic_from_goal(map.index(0, 4))),
            Agent::new(1, map.index(0, 4), map.index(0, 0), map.heuristic_from_goal(map.index(0, 0))),
        ];
        agents[0].path = Vec::new();
        agents[1].path = Vec::new();
        let path_table = PathTable::new(map.map_size());

        let pbs = Pbs;
        let outcome = pbs.solve(&[0, 1], &agents, &path_table, &map, Duration::from_millis(200)).unwrap();
        assert!(outcome.colliding_pairs.is_empty());
    }
}
