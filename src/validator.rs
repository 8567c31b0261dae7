//! Independent post-hoc legality check (C9, spec.md §4.9). Runs after the
//! Repair Loop terminates and never trusts the Collision Graph: it
//! recomputes everything from the agents' committed paths alone. Grounded in
//! `examples/original_source/src/InitLNS.cpp::validateSolution`.

use std::collections::BTreeSet;

use crate::agent::Agent;
use crate::map::Map;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyPath { agent: usize },
    WrongStart { agent: usize, expected: usize, actual: usize },
    WrongGoal { agent: usize, expected: usize, actual: usize },
    InvalidMove { agent: usize, time: usize, from: usize, to: usize },
    VertexConflict { a: usize, b: usize, time: usize, cell: usize },
    EdgeConflict { a: usize, b: usize, time: usize },
    TargetConflict { mover: usize, stopped: usize, cell: usize, time: usize },
    InconsistentSumOfCosts { reported: usize, computed: usize },
}

/// Checks every agent's path in isolation: non-empty, correctly anchored at
/// start/goal, and every consecutive step a legal map move.
pub fn validate_individual_paths(agents: &[Agent], map: &Map) -> Result<(), ValidationError> {
    for agent in agents {
        if agent.path.is_empty() {
            return Err(ValidationError::EmptyPath { agent: agent.id });
        }
        if agent.path[0] != agent.start {
            return Err(ValidationError::WrongStart {
                agent: agent.id,
                expected: agent.start,
                actual: agent.path[0],
            });
        }
        let last = *agent.path.last().unwrap();
        if last != agent.goal {
            return Err(ValidationError::WrongGoal {
                agent: agent.id,
                expected: agent.goal,
                actual: last,
            });
        }
        for t in 1..agent.path.len() {
            let (from, to) = (agent.path[t - 1], agent.path[t]);
            if !map.valid_move(from, to) {
                return Err(ValidationError::InvalidMove { agent: agent.id, time: t, from, to });
            }
        }
    }
    Ok(())
}

/// Checks every unordered pair of agents for vertex, edge, and target
/// conflicts across their full joint timeline, extending each agent's
/// occupancy indefinitely at its goal once its path ends.
pub fn validate_pairwise(agents: &[Agent]) -> Result<(), ValidationError> {
    for i in 0..agents.len() {
        for j in (i + 1)..agents.len() {
            check_pair(&agents[i], &agents[j])?;
        }
    }
    Ok(())
}

fn position_at(agent: &Agent, t: usize) -> usize {
    if t < agent.path.len() {
        agent.path[t]
    } else {
        *agent.path.last().expect("validate_individual_paths runs first")
    }
}

fn check_pair(a: &Agent, b: &Agent) -> Result<(), ValidationError> {
    let makespan = a.path.len().max(b.path.len()) - 1;

    for t in 0..=makespan {
        let (pa, pb) = (position_at(a, t), position_at(b, t));
        if pa == pb {
            let (stopped, mover, cell) = if t >= a.path.len() {
                (a.id, b.id, pa)
            } else if t >= b.path.len() {
                (b.id, a.id, pa)
            } else {
                return Err(ValidationError::VertexConflict { a: a.id, b: b.id, time: t, cell: pa });
            };
            return Err(ValidationError::TargetConflict { mover, stopped, cell, time: t });
        }

        if t >= 1 {
            let (pa_prev, pb_prev) = (position_at(a, t - 1), position_at(b, t - 1));
            if pa_prev == pb && pb_prev == pa && pa_prev != pa {
                return Err(ValidationError::EdgeConflict { a: a.id, b: b.id, time: t });
            }
        }
    }
    Ok(())
}

/// Runs both path checks plus the P2 invariant (`sum_of_costs = Σ(len−1)`)
/// against `reported_sum_of_costs` — the reference's `validateSolution` ends
/// with exactly this check (`original_source/src/InitLNS.cpp:787`,
/// `if (sum_of_costs != sum) exit(-1)`), a fatal internal-inconsistency
/// condition per spec.md §7.
pub fn validate(agents: &[Agent], map: &Map, reported_sum_of_costs: usize) -> Result<(), ValidationError> {
    validate_individual_paths(agents, map)?;
    validate_pairwise(agents)?;

    let computed: usize = agents.iter().map(Agent::cost).sum();
    if reported_sum_of_costs != computed {
        return Err(ValidationError::InconsistentSumOfCosts {
            reported: reported_sum_of_costs,
            computed,
        });
    }
    Ok(())
}

/// Every colliding pair implied by a full pairwise scan, regardless of
/// whether validation as a whole would pass — used to cross-check the
/// Collision Graph (L3) rather than to gate acceptance.
pub fn colliding_pairs(agents: &[Agent]) -> BTreeSet<(usize, usize)> {
    let mut pairs = BTreeSet::new();
    for i in 0..agents.len() {
        for j in (i + 1)..agents.len() {
            if check_pair(&agents[i], &agents[j]).is_err() {
                pairs.insert((agents[i].id.min(agents[j].id), agents[i].id.max(agents[j].id)));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_map(h: usize, w: usize) -> Map {
        Map::from_grid(h, w, vec![true; h * w])
    }

    fn agent(id: usize, path: Vec<usize>) -> Agent {
        let mut a = Agent::new(id, path[0], *path.last().unwrap(), vec![]);
        a.path = path;
        a
    }

    #[test]
    fn accepts_a_valid_disjoint_pair() {
        let agents = vec![agent(0, vec![0, 1, 2]), agent(1, vec![10, 11, 12])];
        let map = open_map(5, 5);
        let sum_of_costs = agents.iter().map(Agent::cost).sum();
        assert!(validate(&agents, &map, sum_of_costs).is_ok());
    }

    #[test]
    fn rejects_a_mismatched_sum_of_costs() {
        let agents = vec![agent(0, vec![0, 1, 2]), agent(1, vec![10, 11, 12])];
        let map = open_map(5, 5);
        assert_eq!(
            validate(&agents, &map, 999),
            Err(ValidationError::InconsistentSumOfCosts { reported: 999, computed: 4 })
        );
    }

    #[test]
    fn rejects_path_not_starting_at_start() {
        let mut a = agent(0, vec![0, 1, 2]);
        a.start = 5;
        let map = open_map(5, 5);
        assert!(validate_individual_paths(&[a], &map).is_err());
    }

    #[test]
    fn rejects_an_illegal_jump() {
        let map = open_map(1, 5);
        let a = agent(0, vec![0, 4]); // not map-adjacent
        assert!(validate_individual_paths(&[a], &map).is_err());
    }

    #[test]
    fn detects_vertex_conflict_between_two_agents() {
        let agents = vec![agent(0, vec![0, 1, 2]), agent(1, vec![9, 1, 8])];
        let map = open_map(5, 5);
        assert!(validate_pairwise(&agents).is_err());
        assert_eq!(colliding_pairs(&agents), BTreeSet::from([(0, 1)]));
    }

    #[test]
    fn detects_target_conflict_after_shorter_path_stops() {
        let agents = vec![agent(0, vec![0, 1]), agent(1, vec![2, 3, 1])];
        let map = open_map(5, 5);
        assert!(validate_pairwise(&agents).is_err());
    }
}
