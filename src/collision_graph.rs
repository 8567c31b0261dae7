use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::collision::CollidingPair;

/// Undirected adjacency-set graph over agent ids: `neighbors(a)` holds every
/// agent currently colliding with `a`. Kept symmetric by construction —
/// `add_edge`/`remove_edge` always touch both sides.
#[derive(Debug, Clone)]
pub struct CollisionGraph {
    adjacency: Vec<BTreeSet<usize>>,
}

impl CollisionGraph {
    pub fn new(num_agents: usize) -> Self {
        CollisionGraph {
            adjacency: vec![BTreeSet::new(); num_agents],
        }
    }

    pub fn neighbors(&self, agent: usize) -> &BTreeSet<usize> {
        &self.adjacency[agent]
    }

    pub fn degree(&self, agent: usize) -> usize {
        self.adjacency[agent].len()
    }

    pub fn num_colliding_pairs(&self) -> usize {
        self.adjacency.iter().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn add_edge(&mut self, a: usize, b: usize) {
        self.adjacency[a].insert(b);
        self.adjacency[b].insert(a);
    }

    pub fn remove_edge(&mut self, a: usize, b: usize) {
        self.adjacency[a].remove(&b);
        self.adjacency[b].remove(&a);
    }

    pub fn apply_diff(&mut self, removed: &BTreeSet<CollidingPair>, added: &BTreeSet<CollidingPair>) {
        for &(a, b) in removed {
            self.remove_edge(a, b);
        }
        for &(a, b) in added {
            self.add_edge(a, b);
        }
    }

    /// Agent ids with at least one collision, in ascending order.
    pub fn vertices_with_edges(&self) -> Vec<usize> {
        (0..self.adjacency.len())
            .filter(|&a| !self.adjacency[a].is_empty())
            .collect()
    }

    /// BFS from `seed`, returning the induced adjacency map of the
    /// connected component containing it. Precondition: `degree(seed) >= 1`
    /// (spec.md §4.3) — panics otherwise, since an isolated seed is a
    /// caller bug (the generator only ever seeds from `vertices_with_edges`).
    pub fn connected_component(&self, seed: usize) -> HashMap<usize, BTreeSet<usize>> {
        assert!(
            self.degree(seed) >= 1,
            "connected_component requires a seed with degree >= 1"
        );
        let mut component = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(seed);
        component.insert(seed, self.adjacency[seed].clone());

        while let Some(v) = queue.pop_front() {
            for &u in &self.adjacency[v] {
                if let std::collections::hash_map::Entry::Vacant(e) = component.entry(u) {
                    e.insert(self.adjacency[u].clone());
                    queue.push_back(u);
                }
            }
        }

        component
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_colliding_pairs_matches_half_degree_sum() {
        let mut g = CollisionGraph::new(4);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        assert_eq!(g.num_colliding_pairs(), 2);
        assert_eq!(g.degree(1), 2);
    }

    #[test]
    fn graph_stays_symmetric() {
        let mut g = CollisionGraph::new(3);
        g.add_edge(0, 2);
        assert!(g.neighbors(0).contains(&2));
        assert!(g.neighbors(2).contains(&0));
        g.remove_edge(0, 2);
        assert!(g.neighbors(0).is_empty());
        assert!(g.neighbors(2).is_empty());
    }

    #[test]
    fn connected_component_follows_bfs_reachability() {
        let mut g = CollisionGraph::new(6);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        g.add_edge(3, 4); // separate component
        let comp = g.connected_component(0);
        assert_eq!(comp.len(), 3);
        assert!(comp.contains_key(&0) && comp.contains_key(&1) && comp.contains_key(&2));
        assert!(!comp.contains_key(&3));
    }

    #[test]
    fn apply_diff_removes_old_edges_and_adds_new_ones() {
        let mut g = CollisionGraph::new(4);
        g.add_edge(0, 1);
        let removed = BTreeSet::from([(0, 1)]);
        let added = BTreeSet::from([(2, 3)]);
        g.apply_diff(&removed, &added);
        assert!(g.neighbors(0).is_empty());
        assert!(g.neighbors(2).contains(&3));
    }

    #[test]
    #[should_panic]
    fn connected_component_panics_on_isolated_seed() {
        let g = CollisionGraph::new(2);
        g.connected_component(0);
    }
}
