//! Neighborhood Generators (C5, spec.md §4.5): two policies for picking the
//! agent subset a Repair Loop iteration destroys and replans. Grounded in
//! `examples/original_source/src/InitLNS.cpp::generateNeighborByCollisionGraph`,
//! `::generateNeighborByTarget`, and `::randomWalk`.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::agent::Agent;
use crate::collision_graph::CollisionGraph;
use crate::map::Map;
use crate::path_table::PathTable;
use crate::single_agent_planner::find_no_wait_path;

/// Cap on consecutive failed growth attempts in the collision-based
/// generator, both when seeding beyond a small component via `random_walk`
/// and when walking within an oversized component. spec.md §9 flags the
/// reference's lack of such a cap as a likely non-termination bug; this is
/// the bounded-retry-then-return-partial resolution SPEC_FULL.md adopts.
const GROWTH_FAILURE_CAP: usize = 10;

/// Builds a neighborhood from a random colliding pair's connected component
/// (spec.md §4.5.1). Returns an empty vector if no agent currently collides.
pub fn generate_by_collision_graph(
    graph: &CollisionGraph,
    agents: &[Agent],
    path_table: &PathTable,
    map: &Map,
    neighbor_size: usize,
    rng: &mut StdRng,
) -> Vec<usize> {
    let vertices = graph.vertices_with_edges();
    if vertices.is_empty() {
        return Vec::new();
    }

    let seed = *vertices.choose(rng).expect("vertices is non-empty");
    let component = graph.connected_component(seed);
    let members: Vec<usize> = component.keys().copied().collect();

    let mut neighbors_set: BTreeSet<usize> = BTreeSet::new();

    if members.len() <= neighbor_size {
        neighbors_set.extend(members.iter().copied());

        let mut failures = 0;
        while neighbors_set.len() < neighbor_size && failures < GROWTH_FAILURE_CAP {
            let pool: Vec<usize> = neighbors_set.iter().copied().collect();
            let &probe = pool.choose(rng).expect("pool is non-empty");
            match random_walk(probe, agents, path_table, map, rng) {
                Some(found) if neighbors_set.insert(found) => failures = 0,
                _ => failures += 1,
            }
        }
    } else {
        let mut current = *members.choose(rng).expect("members is non-empty");
        neighbors_set.insert(current);

        let mut failures = 0;
        while neighbors_set.len() < neighbor_size && failures < GROWTH_FAILURE_CAP {
            let within_component: Vec<usize> = graph
                .neighbors(current)
                .iter()
                .copied()
                .filter(|n| component.contains_key(n))
                .collect();
            if within_component.is_empty() {
                failures += 1;
                continue;
            }
            current = *within_component.choose(rng).expect("within_component is non-empty");
            if neighbors_set.insert(current) {
                failures = 0;
            } else {
                failures += 1;
            }
        }
    }

    neighbors_set.into_iter().collect()
}

/// `random_walk` (spec.md §4.5.3): biased exploration from a currently-solo
/// cell on `agent_id`'s own path outward, looking for a cell some other
/// agent occupies.
fn random_walk(agent_id: usize, agents: &[Agent], path_table: &PathTable, map: &Map, rng: &mut StdRng) -> Option<usize> {
    let path = &agents[agent_id].path;
    if path.is_empty() {
        return None;
    }

    let mut t = rng.gen_range(0..path.len());
    let mut loc = path[t];

    while t <= path_table.makespan {
        let occupants = path_table.occupants(loc, t);
        let solo_or_empty = occupants.is_empty() || occupants == [agent_id];
        if !solo_or_empty {
            return occupants.choose(rng).copied();
        }

        let mut choices: Vec<usize> = map.get_neighbors(loc).to_vec();
        choices.push(loc);
        loc = *choices.choose(rng).expect("choices always contains loc itself");
        t += 1;
    }

    None
}

/// Builds a neighborhood around the agent with the highest collision-graph
/// degree (spec.md §4.5.2): agents crossing its start cell (`A_start`) and
/// agents whose goal lies on its no-wait route (`A_target`).
pub fn generate_by_target(
    graph: &CollisionGraph,
    agents: &[Agent],
    path_table: &PathTable,
    map: &Map,
    goal_table: &[Option<usize>],
    neighbor_size: usize,
    rng: &mut StdRng,
) -> Vec<usize> {
    let a = max_degree_agent(graph, agents.len());

    let mut a_start: Vec<(usize, usize)> = Vec::new();
    for t in 0..=path_table.makespan {
        for &other in path_table.occupants(agents[a].start, t) {
            if other != a {
                a_start.push((t, other));
            }
        }
    }

    let (_no_wait_path, a_target_set) = find_no_wait_path(&agents[a], goal_table, map);
    let a_target: Vec<usize> = a_target_set.into_iter().collect();

    let mut neighbors_set: BTreeSet<usize> = BTreeSet::new();
    neighbors_set.insert(a);

    if a_start.len() + a_target.len() >= neighbor_size.saturating_sub(1) {
        if a_start.is_empty() {
            let mut shuffled = a_target.clone();
            shuffled.shuffle(rng);
            for &id in shuffled.iter().take(neighbor_size.saturating_sub(1)) {
                neighbors_set.insert(id);
            }
        } else if a_target.len() >= neighbor_size {
            let mut shuffled = a_target.clone();
            shuffled.shuffle(rng);
            for &id in shuffled.iter().take(neighbor_size.saturating_sub(2)) {
                neighbors_set.insert(id);
            }
            let earliest = a_start.iter().min_by_key(|&&(t, _)| t).expect("a_start is non-empty").1;
            neighbors_set.insert(earliest);
        } else {
            for &id in &a_target {
                neighbors_set.insert(id);
            }
            let mut by_time = a_start.clone();
            by_time.sort_by_key(|&(t, _)| t);
            for &(_, id) in &by_time {
                if neighbors_set.len() >= neighbor_size {
                    break;
                }
                neighbors_set.insert(id);
            }
        }
    } else {
        // Pool too small on its own: take everything, then expand outward
        // through the goals each current member's own path crosses.
        for &id in &a_target {
            neighbors_set.insert(id);
        }
        for &(_, id) in &a_start {
            neighbors_set.insert(id);
        }

        let mut tabu: BTreeSet<usize> = BTreeSet::new();
        while neighbors_set.len() < neighbor_size {
            let candidates: Vec<usize> = neighbors_set.iter().copied().filter(|m| !tabu.contains(m)).collect();
            let Some(&member) = candidates.choose(rng) else {
                break; // tabu has caught up with the whole set: no progress possible
            };
            tabu.insert(member);

            let reachable: Vec<usize> = agents[member]
                .path
                .iter()
                .filter_map(|&cell| goal_table.get(cell).copied().flatten())
                .filter(|&other| other != member && !neighbors_set.contains(&other))
                .collect();
            if let Some(&pick) = reachable.choose(rng) {
                neighbors_set.insert(pick);
            }
        }
    }

    neighbors_set.into_iter().collect()
}

/// First agent (lowest id) achieving the maximum collision-graph degree.
fn max_degree_agent(graph: &CollisionGraph, num_agents: usize) -> usize {
    let mut best = 0;
    let mut best_degree = 0;
    for id in 0..num_agents {
        let degree = graph.degree(id);
        if degree > best_degree {
            best_degree = degree;
            best = id;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn open_map(h: usize, w: usize) -> Map {
        Map::from_grid(h, w, vec![true; h * w])
    }

    fn agent_with_path(id: usize, map: &Map, start: usize, goal: usize, path: Vec<usize>) -> Agent {
        let mut a = Agent::new(id, start, goal, map.heuristic_from_goal(goal));
        a.path = path;
        a
    }

    #[test]
    fn collision_based_returns_empty_when_graph_has_no_edges() {
        let map = open_map(3, 3);
        let agents = vec![agent_with_path(0, &map, 0, 8, vec![0, 1, 2])];
        let pt = PathTable::new(map.map_size());
        let graph = CollisionGraph::new(1);
        let mut rng = StdRng::seed_from_u64(1);
        let result = generate_by_collision_graph(&graph, &agents, &pt, &map, 4, &mut rng);
        assert!(result.is_empty());
    }

    #[test]
    fn collision_based_includes_the_whole_small_component() {
        let map = open_map(1, 3);
        let agents = vec![
            agent_with_path(0, &map, 0, 2, vec![0, 1, 2]),
            agent_with_path(1, &map, 2, 0, vec![2, 1, 0]),
        ];
        let mut pt = PathTable::new(map.map_size());
        pt.insert(0, &agents[0].path);
        pt.insert(1, &agents[1].path);

        let mut graph = CollisionGraph::new(2);
        graph.add_edge(0, 1);

        let mut rng = StdRng::seed_from_u64(3);
        let result = generate_by_collision_graph(&graph, &agents, &pt, &map, 4, &mut rng);
        assert!(result.contains(&0));
        assert!(result.contains(&1));
    }

    #[test]
    fn target_based_always_includes_the_max_degree_agent() {
        let map = open_map(1, 5);
        let agents = vec![
            agent_with_path(0, &map, 0, 4, vec![0, 1, 2, 3, 4]),
            agent_with_path(1, &map, 4, 0, vec![4, 3, 2, 1, 0]),
        ];
        let mut pt = PathTable::new(map.map_size());
        pt.insert(0, &agents[0].path);
        pt.insert(1, &agents[1].path);

        let mut graph = CollisionGraph::new(2);
        graph.add_edge(0, 1);

        let mut goal_table = vec![None; map.map_size()];
        goal_table[agents[0].goal] = Some(0);
        goal_table[agents[1].goal] = Some(1);

        let mut rng = StdRng::seed_from_u64(5);
        let result = generate_by_target(&graph, &agents, &pt, &map, &goal_table, 2, &mut rng);
        assert!(result.contains(&0) || result.contains(&1));
        assert!(result.len() <= 2);
    }

    #[test]
    fn max_degree_agent_breaks_ties_toward_lowest_id() {
        let mut graph = CollisionGraph::new(3);
        graph.add_edge(0, 1);
        graph.add_edge(1, 2);
        // agents 0 and 2 both have degree 1; agent 1 has degree 2 and wins outright.
        assert_eq!(max_degree_agent(&graph, 3), 1);

        let mut tied = CollisionGraph::new(2);
        tied.add_edge(0, 1);
        assert_eq!(max_degree_agent(&tied, 2), 0);
    }
}
