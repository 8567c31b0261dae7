//! Loads a MovingAI `.scen` file and draws agent start/goal pairs from it,
//! either by "bucket" (the `.scen` file's per-difficulty grouping) or
//! uniformly at random across all routes. Adapted from the teacher's
//! `scenario.rs`, generalized from `(x, y)` tuple routes to flat `Cell`
//! agents carrying a precomputed heuristic.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use anyhow::{Context, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::Agent;
use crate::map::Map;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Route {
    pub start_row: usize,
    pub start_col: usize,
    pub goal_row: usize,
    pub goal_col: usize,
}

type Bucket = Vec<Route>;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub map: String,
    pub map_width: usize,
    pub map_height: usize,
    pub buckets: HashMap<usize, Bucket>,
}

impl Scenario {
    pub fn load_from_scen(path: &str) -> io::Result<Scenario> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let _version = lines.next().unwrap_or_else(|| Ok(String::new()))?;

        let mut scenario = Scenario {
            map: String::new(),
            map_width: 0,
            map_height: 0,
            buckets: HashMap::new(),
        };

        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            let bucket_index: usize = parts[0].parse().unwrap();

            // MovingAI .scen columns: bucket map width height start_x start_y goal_x goal_y optimal_length
            let route = Route {
                start_col: parts[4].parse().unwrap(),
                start_row: parts[5].parse().unwrap(),
                goal_col: parts[6].parse().unwrap(),
                goal_row: parts[7].parse().unwrap(),
            };

            if scenario.map.is_empty() {
                scenario.map = parts[1].to_string();
                scenario.map_width = parts[2].parse().unwrap();
                scenario.map_height = parts[3].parse().unwrap();
            }

            scenario.buckets.entry(bucket_index).or_default().push(route);
        }

        Ok(scenario)
    }

    /// Draws `num_agents` agents uniformly at random across every bucket,
    /// without repeating a route, and builds each agent's heuristic table
    /// against `map`.
    pub fn generate_agents_randomly<R: Rng + ?Sized>(&self, map: &Map, num_agents: usize, rng: &mut R) -> Result<Vec<Agent>> {
        let mut available: Vec<Route> = self.buckets.values().flatten().cloned().collect();
        available.sort();
        available.shuffle(rng);

        if available.len() < num_agents {
            anyhow::bail!(
                "scenario has only {} routes, cannot draw {} agents",
                available.len(),
                num_agents
            );
        }

        let mut agents = Vec::with_capacity(num_agents);
        for id in 0..num_agents {
            let route = available.pop().expect("checked length above");
            let start = map.index(route.start_row, route.start_col);
            let goal = map.index(route.goal_row, route.goal_col);
            let heuristic = map.heuristic_from_goal(goal);
            agents.push(Agent::new(id, start, goal, heuristic));
        }

        info!(num_agents, "drew agents from scenario");
        Ok(agents)
    }

    /// Draws one agent per requested bucket index (deterministic reproduction
    /// of a specific difficulty mix), without repeating a route within a
    /// bucket.
    pub fn generate_agents_by_buckets<R: Rng + ?Sized>(&self, map: &Map, bucket_indices: &[usize], rng: &mut R) -> Result<Vec<Agent>> {
        let mut used: HashMap<usize, HashSet<usize>> = HashMap::new();
        let mut agents = Vec::with_capacity(bucket_indices.len());

        for (id, &bucket_index) in bucket_indices.iter().enumerate() {
            let bucket = self
                .buckets
                .get(&bucket_index)
                .with_context(|| format!("bucket {bucket_index} not found in scenario"))?;

            let available: Vec<usize> = (0..bucket.len())
                .filter(|idx| used.get(&bucket_index).is_none_or(|seen| !seen.contains(idx)))
                .collect();
            let &route_index = available
                .choose(rng)
                .with_context(|| format!("no available routes left in bucket {bucket_index}"))?;

            let route = &bucket[route_index];
            let start = map.index(route.start_row, route.start_col);
            let goal = map.index(route.goal_row, route.goal_col);
            let heuristic = map.heuristic_from_goal(goal);
            agents.push(Agent::new(id, start, goal, heuristic));

            used.entry(bucket_index).or_default().insert(route_index);
        }

        Ok(agents)
    }

    pub fn load_agents_from_yaml(path: &str, map: &Map) -> Result<Vec<Agent>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let routes: Vec<Route> = serde_yaml::from_reader(reader)?;
        Ok(routes
            .into_iter()
            .enumerate()
            .map(|(id, route)| {
                let start = map.index(route.start_row, route.start_col);
                let goal = map.index(route.goal_row, route.goal_col);
                let heuristic = map.heuristic_from_goal(goal);
                Agent::new(id, start, goal, heuristic)
            })
            .collect())
    }

    pub fn write_routes_to_yaml(path: &str, routes: &[Route]) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = io::BufWriter::new(file);
        let yaml_data = serde_yaml::to_string(routes)?;
        writer.write_all(yaml_data.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write as _;

    fn write_scen(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_buckets_and_map_dimensions() {
        let file = write_scen(
            "version 1\n\
             0\tmaze.map\t32\t32\t9\t25\t8\t28\t19.0\n\
             1\tmaze.map\t32\t32\t8\t19\t10\t17\t7.0\n",
        );
        let scen = Scenario::load_from_scen(file.path().to_str().unwrap()).unwrap();
        assert_eq!(scen.map, "maze.map");
        assert_eq!(scen.map_width, 32);
        assert_eq!(scen.buckets.len(), 2);
    }

    #[test]
    fn generate_agents_randomly_is_deterministic_for_a_fixed_seed() {
        let file = write_scen(
            "version 1\n\
             0\tm\t5\t5\t0\t0\t4\t4\t8.0\n\
             0\tm\t5\t5\t1\t0\t3\t4\t7.0\n",
        );
        let scen = Scenario::load_from_scen(file.path().to_str().unwrap()).unwrap();
        let map = Map::from_grid(5, 5, vec![true; 25]);

        let mut rng1 = StdRng::seed_from_u64(0);
        let mut rng2 = StdRng::seed_from_u64(0);
        let a = scen.generate_agents_randomly(&map, 2, &mut rng1).unwrap();
        let b = scen.generate_agents_randomly(&map, 2, &mut rng2).unwrap();
        assert_eq!(a.iter().map(|x| (x.start, x.goal)).collect::<Vec<_>>(), b.iter().map(|x| (x.start, x.goal)).collect::<Vec<_>>());
    }
}
