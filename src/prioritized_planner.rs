//! Prioritized Planner (C4, spec.md §4.4): sequentially replan a
//! neighborhood's agents, in random order, against the frozen path table of
//! everyone else. Grounded in
//! `examples/original_source/src/InitLNS.cpp::runPP`.

use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::rngs::StdRng;

use crate::agent::Agent;
use crate::collision::colliding_pairs_for;
use crate::map::Map;
use crate::neighbor::Neighbor;
use crate::path_table::PathTable;
use crate::single_agent_planner::{find_optimal_path, ConstraintTable};

/// Runs PP for `neighbor.agents` against `path_table`, mutating `agents`'
/// paths and `path_table` in place. Returns whether the replan is accepted
/// (spec.md §4.4 step 3): on rejection, everything is rolled back to
/// exactly its pre-call state and `num_of_failures` is incremented.
///
/// `neighbor.old_colliding_pairs` being empty signals "first run" (the
/// Initial Solver, spec.md §4.7) — that path always commits whatever it
/// produces, conflicts and all.
pub fn run_pp(
    agents: &mut [Agent],
    neighbor: &mut Neighbor,
    path_table: &mut PathTable,
    map: &Map,
    rng: &mut StdRng,
    budget: Duration,
    num_of_failures: &mut usize,
) -> bool {
    let mut shuffled = neighbor.agents.clone();
    shuffled.shuffle(rng);

    neighbor.sum_of_costs = 0;
    neighbor.colliding_pairs.clear();

    let deadline = Instant::now() + budget;
    let empty_constraints = ConstraintTable::new();
    let mut inserted = Vec::with_capacity(shuffled.len());
    // Set whenever a `break` fires below, i.e. the shuffled iterator did not
    // run to completion — matches the reference's `p != shuffled_agents.end()`
    // check (original_source/src/InitLNS.cpp:374-375), which is NOT the same
    // as "one agent short of `shuffled.len()` processed": the early-abort
    // break still counts the agent whose new path pushed the colliding-pair
    // count over the old one, so `processed == shuffled.len()` can be true
    // even though the loop broke early.
    let mut incomplete = false;

    for &id in &shuffled {
        if Instant::now() >= deadline {
            incomplete = true;
            break;
        }

        let new_path = find_optimal_path(&agents[id], &empty_constraints, path_table, map);
        let collisions = colliding_pairs_for(id, &new_path, path_table, agents);
        neighbor.colliding_pairs.extend(collisions);
        neighbor.sum_of_costs += new_path.len() - 1;

        let is_first_run = neighbor.old_colliding_pairs.is_empty();
        if !is_first_run && neighbor.colliding_pairs.len() > neighbor.old_colliding_pairs.len() {
            incomplete = true;
            break; // early abort: can't possibly improve any more
        }

        path_table.insert(id, &new_path);
        agents[id].path = new_path;
        inserted.push(id);
    }

    let is_first_run = neighbor.old_colliding_pairs.is_empty();

    if is_first_run {
        // The Initial Solver always keeps whatever PP produced, conflicts
        // and all (spec.md §4.7) — there is no prior committed state to
        // roll back to, so we never touch the path table here.
        return !incomplete && neighbor.colliding_pairs.is_empty();
    }

    let accept = !incomplete && neighbor.colliding_pairs.len() <= neighbor.old_colliding_pairs.len();
    if accept {
        return true;
    }

    if incomplete {
        *num_of_failures += 1;
    }

    for &id in &inserted {
        path_table.delete(id, &agents[id].path.clone());
    }

    if !neighbor.old_paths.is_empty() {
        for (i, &id) in neighbor.agents.iter().enumerate() {
            agents[id].path = neighbor.old_paths[i].clone();
            path_table.insert(id, &agents[id].path.clone());
        }
        neighbor.sum_of_costs = neighbor.old_sum_of_costs;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn open_map(h: usize, w: usize) -> Map {
        Map::from_grid(h, w, vec![true; h * w])
    }

    fn make_agents(map: &Map, pairs: &[(usize, usize)]) -> Vec<Agent> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, &(s, g))| Agent::new(i, s, g, map.heuristic_from_goal(g)))
            .collect()
    }

    #[test]
    fn first_run_accepts_whatever_it_produces() {
        let map = open_map(1, 5);
        let mut agents = make_agents(&map, &[(map.index(0, 0), map.index(0, 4))]);
        let mut pt = PathTable::new(map.map_size());
        let mut neighbor = Neighbor {
            agents: vec![0],
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut failures = 0;
        let accepted = run_pp(
            &mut agents,
            &mut neighbor,
            &mut pt,
            &map,
            &mut rng,
            Duration::from_millis(100),
            &mut failures,
        );
        assert!(accepted);
        assert_eq!(agents[0].path.len(), 5);
    }

    #[test]
    fn rejection_restores_old_paths_and_counts_a_failure() {
        let map = open_map(1, 3);
        let mut agents = make_agents(&map, &[(map.index(0, 0), map.index(0, 2))]);
        agents[0].path = vec![map.index(0, 0), map.index(0, 1), map.index(0, 2)];
        let mut pt = PathTable::new(map.map_size());
        pt.insert(0, &agents[0].path.clone());

        let mut neighbor = Neighbor {
            agents: vec![0],
            old_paths: vec![agents[0].path.clone()],
            old_sum_of_costs: 2,
            // Pretend this agent already collides with someone so the
            // "first run" branch doesn't apply, and force rejection by
            // giving it zero time budget (processed < all).
            old_colliding_pairs: std::collections::BTreeSet::from([(0, 1)]),
            ..Default::default()
        };
        pt.delete(0, &agents[0].path.clone());

        let mut rng = StdRng::seed_from_u64(1);
        let mut failures = 0;
        let accepted = run_pp(
            &mut agents,
            &mut neighbor,
            &mut pt,
            &map,
            &mut rng,
            Duration::from_secs(0),
            &mut failures,
        );
        assert!(!accepted);
        assert_eq!(failures, 1);
        assert_eq!(agents[0].path, vec![map.index(0, 0), map.index(0, 1), map.index(0, 2)]);
    }
}
