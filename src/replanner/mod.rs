//! Black-box replanners (C11, SPEC_FULL.md §4.11): `GCBS` and `PBS`, the two
//! strategies the Repair Loop can substitute for plain Prioritized Planning
//! when `replan_algo_name` names one of them. spec.md keeps their internals
//! unspecified ("treated as black-box subsolvers"); this crate still ships
//! one working implementation of each so the loop is runnable end to end.

pub mod gcbs;
pub mod pbs;

use std::collections::BTreeSet;
use std::time::Duration;

use crate::agent::Path;
use crate::collision::CollidingPair;

/// What a replanner hands back to the Repair Loop: the candidate paths for
/// exactly the neighborhood agents it was asked to replan (positionally
/// aligned with the `neighborhood` slice it was given), plus the bookkeeping
/// the Repair Loop needs for the accept/reject test (spec.md §4.8 step 4).
pub struct ReplanOutcome {
    pub paths: Vec<Path>,
    pub sum_of_costs: usize,
    pub colliding_pairs: BTreeSet<CollidingPair>,
}

/// Common shape both black-box strategies expose to the Repair Loop.
/// `path_table` on entry holds every agent's path EXCEPT the neighborhood's
/// (already deleted per spec.md §4.8 step 3) — that's the frozen background
/// a replanner's candidate paths are checked against.
pub trait Replanner {
    fn solve(
        &self,
        neighborhood: &[usize],
        agents: &[crate::agent::Agent],
        path_table: &crate::path_table::PathTable,
        map: &crate::map::Map,
        time_budget: Duration,
    ) -> Option<ReplanOutcome>;
}

use crate::single_agent_planner::ConstraintTable;

/// Bakes `path` in as a hard ban for anyone else: occupying any of its
/// cells at the matching timestep, swapping across any of its edges, or
/// entering its final cell from the moment it arrives onward (the usual
/// target-conflict reasoning, now enforced as a hard constraint rather than
/// left to soft path-table costs).
pub fn ban_path(constraints: &mut ConstraintTable, path: &Path) {
    for (t, &cell) in path.iter().enumerate() {
        constraints.ban_vertex(cell, t);
        if t >= 1 {
            let (from, to) = (path[t - 1], cell);
            if from != to {
                constraints.ban_edge(to, from, t);
            }
        }
    }
    let goal = *path.last().expect("path is non-empty");
    constraints.ban_permanently_from(goal, path.len() - 1);
}
