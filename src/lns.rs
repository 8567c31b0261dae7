//! The Initial Solver (C7) and Repair Loop (C8), tying every other component
//! together. Grounded in `examples/original_source/src/InitLNS.cpp`'s
//! `InitLNS` class: `getInitialSolution()` and `run()`.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::agent::Agent;
use crate::alns::{AlnsSelector, DestroyHeuristic};
use crate::collision_graph::CollisionGraph;
use crate::config::Config;
use crate::map::Map;
use crate::neighbor::Neighbor;
use crate::neighborhood::{generate_by_collision_graph, generate_by_target};
use crate::path_table::PathTable;
use crate::prioritized_planner::run_pp;
use crate::replanner::gcbs::Gcbs;
use crate::replanner::pbs::Pbs;
use crate::replanner::Replanner;
use crate::stat::IterationStat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixedDestroy {
    Target,
    Collision,
}

enum Destroy {
    Adaptive(AlnsSelector),
    Fixed(FixedDestroy),
}

pub struct Lns {
    pub agents: Vec<Agent>,
    map: Map,
    path_table: PathTable,
    collision_graph: CollisionGraph,
    goal_table: Vec<Option<usize>>,
    rng: StdRng,
    destroy: Destroy,
    neighbor_size: usize,
    replan_algo_name: String,
    time_limit: Duration,
    replan_time_limit: Duration,
    num_of_failures: usize,
    pub initial_sum_of_costs: usize,
    pub sum_of_costs: usize,
    pub num_of_colliding_pairs: usize,
    pub iteration_stats: Vec<IterationStat>,
    pub initial_solution_runtime: Duration,
}

impl Lns {
    pub fn new(agents: Vec<Agent>, map: Map, config: &Config) -> Result<Self> {
        if config.init_algo_name != "PP" {
            bail!("unknown init_algo_name: {}", config.init_algo_name);
        }
        if !matches!(config.replan_algo_name.as_str(), "PP" | "GCBS" | "PBS") {
            bail!("unknown replan_algo_name: {}", config.replan_algo_name);
        }

        let destroy = match config.init_destroy_name.as_str() {
            "Adaptive" => Destroy::Adaptive(AlnsSelector::new(config.reaction_factor, config.decay_factor)),
            "Target" => Destroy::Fixed(FixedDestroy::Target),
            "Collision" => Destroy::Fixed(FixedDestroy::Collision),
            other => bail!("unknown init_destroy_name: {other}"),
        };

        let mut goal_table = vec![None; map.map_size()];
        for agent in &agents {
            goal_table[agent.goal] = Some(agent.id);
        }

        let num_agents = agents.len();
        Ok(Lns {
            agents,
            path_table: PathTable::new(map.map_size()),
            collision_graph: CollisionGraph::new(num_agents),
            goal_table,
            rng: StdRng::seed_from_u64(config.seed),
            destroy,
            neighbor_size: config.neighbor_size,
            replan_algo_name: config.replan_algo_name.clone(),
            time_limit: Duration::from_secs_f64(config.time_limit_secs),
            replan_time_limit: Duration::from_secs_f64(config.replan_time_limit_secs),
            num_of_failures: 0,
            initial_sum_of_costs: 0,
            sum_of_costs: 0,
            num_of_colliding_pairs: 0,
            iteration_stats: Vec::new(),
            initial_solution_runtime: Duration::ZERO,
            map,
        })
    }

    /// C7: seed every agent through PP once; whatever it produces (even with
    /// mutual conflicts) becomes the starting solution, per spec.md §4.7.
    pub fn get_initial_solution(&mut self, start: Instant) {
        let mut neighbor = Neighbor {
            agents: (0..self.agents.len()).collect(),
            ..Neighbor::default()
        };

        let budget = self.time_limit.saturating_sub(start.elapsed());
        run_pp(
            &mut self.agents,
            &mut neighbor,
            &mut self.path_table,
            &self.map,
            &mut self.rng,
            budget,
            &mut self.num_of_failures,
        );

        self.initial_sum_of_costs = neighbor.sum_of_costs;
        self.sum_of_costs = neighbor.sum_of_costs;
        self.num_of_colliding_pairs = neighbor.colliding_pairs.len();
        for &(a, b) in &neighbor.colliding_pairs {
            self.collision_graph.add_edge(a, b);
        }
        self.initial_solution_runtime = start.elapsed();

        self.iteration_stats.push(IterationStat {
            num_of_agents: self.agents.len(),
            sum_of_costs: self.sum_of_costs,
            num_of_colliding_pairs: self.num_of_colliding_pairs,
            runtime_secs: self.initial_solution_runtime.as_secs_f64(),
            algorithm: "PP".to_string(),
        });

        info!(
            sum_of_costs = self.sum_of_costs,
            num_of_colliding_pairs = self.num_of_colliding_pairs,
            "initial solution built"
        );
    }

    /// C8: repair iterations until the time budget is spent or every
    /// collision is gone.
    pub fn run(&mut self, start: Instant) {
        while start.elapsed() < self.time_limit && self.num_of_colliding_pairs > 0 {
            self.run_iteration(start);
        }
    }

    fn run_iteration(&mut self, start: Instant) {
        let (selected_index, heuristic) = self.select_destroy_heuristic();

        let neighborhood = match heuristic {
            DestroyHeuristic::CollisionBased => {
                generate_by_collision_graph(&self.collision_graph, &self.agents, &self.path_table, &self.map, self.neighbor_size, &mut self.rng)
            }
            DestroyHeuristic::TargetBased => generate_by_target(
                &self.collision_graph,
                &self.agents,
                &self.path_table,
                &self.map,
                &self.goal_table,
                self.neighbor_size,
                &mut self.rng,
            ),
        };

        if neighborhood.is_empty() {
            return;
        }

        let use_pp = self.replan_algo_name == "PP" || neighborhood.len() == 1;

        let mut neighbor = Neighbor {
            agents: neighborhood.clone(),
            ..Neighbor::default()
        };
        neighbor.old_paths = neighborhood.iter().map(|&id| self.agents[id].path.clone()).collect();
        neighbor.old_sum_of_costs = neighbor.old_paths.iter().map(|p| p.len() - 1).sum();
        neighbor.old_colliding_pairs = neighborhood
            .iter()
            .flat_map(|&a| self.collision_graph.neighbors(a).iter().map(move |&b| (a.min(b), a.max(b))))
            .collect::<BTreeSet<_>>();

        for &id in &neighborhood {
            self.path_table.delete(id, &self.agents[id].path.clone());
        }

        let old_colliding_pairs = neighbor.old_colliding_pairs.clone();
        let old_sum_of_costs = neighbor.old_sum_of_costs;

        let remaining = self.time_limit.saturating_sub(start.elapsed());
        let budget = remaining.min(self.replan_time_limit);

        let accepted = if use_pp {
            run_pp(&mut self.agents, &mut neighbor, &mut self.path_table, &self.map, &mut self.rng, budget, &mut self.num_of_failures)
        } else {
            self.run_black_box(&neighborhood, &mut neighbor, budget)
        };

        if matches!(self.destroy, Destroy::Adaptive(_)) {
            if let Destroy::Adaptive(alns) = &mut self.destroy {
                alns.update(selected_index, old_colliding_pairs.len(), neighbor.colliding_pairs.len(), neighborhood.len());
            }
        }

        if accepted {
            self.collision_graph.apply_diff(&old_colliding_pairs, &neighbor.colliding_pairs);
            let removed = old_colliding_pairs.len() as isize - neighbor.colliding_pairs.len() as isize;
            self.num_of_colliding_pairs = (self.num_of_colliding_pairs as isize - removed) as usize;
            self.sum_of_costs = self.sum_of_costs + neighbor.sum_of_costs - old_sum_of_costs;
        }

        debug!(accepted, neighborhood_size = neighborhood.len(), "repair iteration");

        self.iteration_stats.push(IterationStat {
            num_of_agents: self.agents.len(),
            sum_of_costs: self.sum_of_costs,
            num_of_colliding_pairs: self.num_of_colliding_pairs,
            runtime_secs: start.elapsed().as_secs_f64(),
            algorithm: self.replan_algo_name.clone(),
        });
    }

    /// Non-PP replanners never mutate the path table or agent paths on their
    /// own; we commit them here exactly like PP's accepted branch, and roll
    /// back by reinserting `old_paths` on rejection.
    fn run_black_box(&mut self, neighborhood: &[usize], neighbor: &mut Neighbor, budget: Duration) -> bool {
        let outcome = match self.replan_algo_name.as_str() {
            "GCBS" => Gcbs.solve(neighborhood, &self.agents, &self.path_table, &self.map, budget),
            "PBS" => Pbs.solve(neighborhood, &self.agents, &self.path_table, &self.map, budget),
            other => unreachable!("unknown replan_algo_name reached run_black_box: {other}"),
        };

        let Some(outcome) = outcome else {
            for (i, &id) in neighborhood.iter().enumerate() {
                self.agents[id].path = neighbor.old_paths[i].clone();
                self.path_table.insert(id, &self.agents[id].path.clone());
            }
            return false;
        };

        neighbor.sum_of_costs = outcome.sum_of_costs;
        neighbor.colliding_pairs = outcome.colliding_pairs.clone();

        // GCBS uses strict `<`; PP/PBS accept ties too (spec.md §4.8).
        let accept = if self.replan_algo_name == "GCBS" {
            outcome.colliding_pairs.len() < neighbor.old_colliding_pairs.len()
        } else {
            outcome.colliding_pairs.len() <= neighbor.old_colliding_pairs.len()
        };

        if accept {
            for (&id, path) in neighborhood.iter().zip(outcome.paths.iter()) {
                self.agents[id].path = path.clone();
                self.path_table.insert(id, path);
            }
            true
        } else {
            self.num_of_failures += 1;
            for (i, &id) in neighborhood.iter().enumerate() {
                self.agents[id].path = neighbor.old_paths[i].clone();
                self.path_table.insert(id, &self.agents[id].path.clone());
            }
            neighbor.sum_of_costs = neighbor.old_sum_of_costs;
            false
        }
    }

    fn select_destroy_heuristic(&mut self) -> (usize, DestroyHeuristic) {
        match &self.destroy {
            Destroy::Adaptive(alns) => alns.select(&mut self.rng),
            Destroy::Fixed(FixedDestroy::Target) => (0, DestroyHeuristic::TargetBased),
            Destroy::Fixed(FixedDestroy::Collision) => (1, DestroyHeuristic::CollisionBased),
        }
    }

    pub fn num_of_failures(&self) -> usize {
        self.num_of_failures
    }

    pub fn map(&self) -> &Map {
        &self.map
    }
}
