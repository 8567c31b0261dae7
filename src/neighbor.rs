use std::collections::BTreeSet;

use crate::agent::Path;
use crate::collision::CollidingPair;

/// Transient per-iteration working state (spec.md §3 "Neighbor"). One
/// instance is built per Repair Loop iteration and overwritten by the next;
/// nothing here survives across iterations except by being read into the
/// solver's running totals before the next `Neighbor` replaces it.
#[derive(Debug, Clone, Default)]
pub struct Neighbor {
    pub agents: Vec<usize>,
    /// Pre-removal paths, positionally aligned with `agents`. Only
    /// populated when rollback needs them verbatim: PP replans, or any
    /// single-agent neighborhood (spec.md §4.8 step 3).
    pub old_paths: Vec<Path>,
    pub old_sum_of_costs: usize,
    pub old_colliding_pairs: BTreeSet<CollidingPair>,
    pub sum_of_costs: usize,
    pub colliding_pairs: BTreeSet<CollidingPair>,
}

impl Neighbor {
    pub fn new() -> Self {
        Neighbor::default()
    }
}
