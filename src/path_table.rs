use crate::agent::{Cell, Path};

/// Time-indexed occupancy of the grid, plus the two derived fields spec.md
/// §3 groups with it: `goals` (earliest arrival time of any agent whose
/// goal is that cell) and `makespan` (longest path currently inserted).
///
/// `table[cell]` is a lazily-growing per-cell vector of occupant lists — the
/// vector only grows as far as the latest insertion touches that cell, so a
/// map with `cells * makespan` theoretical states costs far less in
/// practice (spec.md §9 "sparse time axis").
#[derive(Debug, Clone)]
pub struct PathTable {
    table: Vec<Vec<Vec<usize>>>,
    /// `goals[cell]` = minimum path length - 1 (i.e. arrival time) over all
    /// inserted agents whose goal is `cell`. `None` if no inserted agent
    /// has that goal, or (when left stale on delete, which is legal per
    /// spec.md §4.1) a time that no longer corresponds to a present agent.
    goals: Vec<Option<usize>>,
    pub makespan: usize,
}

impl PathTable {
    pub fn new(map_size: usize) -> Self {
        PathTable {
            table: vec![Vec::new(); map_size],
            goals: vec![None; map_size],
            makespan: 0,
        }
    }

    /// Agents currently occupying `cell` at `time`; empty if none, or if
    /// `time` is beyond what's ever been inserted there.
    pub fn occupants(&self, cell: usize, time: usize) -> &[usize] {
        self.table[cell].get(time).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn goal_time(&self, cell: usize) -> Option<usize> {
        self.goals[cell]
    }

    pub fn insert(&mut self, agent_id: usize, path: &Path) {
        assert!(!path.is_empty(), "cannot insert an empty path");
        for (t, &cell) in path.iter().enumerate() {
            let column = &mut self.table[cell];
            if column.len() <= t {
                column.resize(t + 1, Vec::new());
            }
            column[t].push(agent_id);
        }

        let arrival = path.len() - 1;
        let goal = *path.last().unwrap();
        self.goals[goal] = Some(self.goals[goal].map_or(arrival, |existing| existing.min(arrival)));
        self.makespan = self.makespan.max(arrival);
    }

    /// Removes `agent_id` using its known current path. The `goals` entry
    /// for `path`'s destination is left as-is: spec.md §4.1 permits a stale
    /// (too-small) `goals` value after deletion, since the Collision
    /// Detector tolerates referencing an agent that's no longer inserted at
    /// that slot (see `crate::collision`). `makespan` is similarly not
    /// recomputed — it only ever needs to be an upper bound.
    pub fn delete(&mut self, agent_id: usize, path: &Path) {
        for (t, &cell) in path.iter().enumerate() {
            let column = &mut self.table[cell];
            if let Some(slot) = column.get_mut(t) {
                if let Some(pos) = slot.iter().position(|&a| a == agent_id) {
                    slot.swap_remove(pos);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_occupants_reflects_path() {
        let mut pt = PathTable::new(10);
        let path = vec![0, 1, 2];
        pt.insert(7, &path);
        assert_eq!(pt.occupants(0, 0), &[7]);
        assert_eq!(pt.occupants(1, 1), &[7]);
        assert_eq!(pt.occupants(2, 2), &[7]);
        assert!(pt.occupants(2, 5).is_empty());
        assert_eq!(pt.goal_time(2), Some(2));
        assert_eq!(pt.makespan, 2);
    }

    #[test]
    fn round_trip_insert_delete_is_bit_equal() {
        let mut pt = PathTable::new(10);
        let before = pt.clone();
        let path = vec![3, 4, 5, 5];
        pt.insert(1, &path);
        pt.delete(1, &path);
        // table contents are empty again at every touched cell/time, even
        // though outer Vec capacity may have grown — compare observable
        // state, not allocation internals.
        for cell in 0..10 {
            for t in 0..=pt.makespan.max(before.makespan) {
                assert_eq!(pt.occupants(cell, t), before.occupants(cell, t));
            }
        }
    }

    #[test]
    fn goal_time_takes_the_minimum_arrival() {
        let mut pt = PathTable::new(5);
        pt.insert(0, &vec![0, 1, 2]);
        pt.insert(1, &vec![3, 2]);
        assert_eq!(pt.goal_time(2), Some(1));
    }

    #[test]
    fn multiple_occupants_can_share_a_cell_time() {
        let mut pt = PathTable::new(5);
        pt.insert(0, &vec![0, 1]);
        pt.insert(1, &vec![2, 1]);
        let mut occ = pt.occupants(1, 1).to_vec();
        occ.sort();
        assert_eq!(occ, vec![0, 1]);
    }
}
