//! Command-line surface, mirroring the teacher's `Cli`/`Config` split:
//! `Cli` is the raw `clap` derive struct, `Config` is the validated,
//! solver-facing view built from it (`config.rs` in
//! `examples/HarukiMoriarty-RUST-CBS`).

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "mapf-lns",
    about = "Large Neighborhood Search feasibility solver for Multi-Agent Path Finding.",
    version
)]
pub struct Cli {
    #[arg(long, help = "Path to the MovingAI .map file")]
    pub map_path: String,

    #[arg(long, help = "Path to the MovingAI .scen file")]
    pub scen_path: String,

    #[arg(long, help = "Number of agents to draw from the scenario", default_value_t = 50)]
    pub num_agents: usize,

    #[arg(long, help = "Seed for the random number generator", default_value_t = 0)]
    pub seed: u64,

    #[arg(long, help = "Initial solver (only \"PP\" is recognized)", default_value = "PP")]
    pub init_algo_name: String,

    #[arg(long, help = "Inner replanner: PP, GCBS, or PBS", default_value = "PP")]
    pub replan_algo_name: String,

    #[arg(long, help = "Destroy heuristic: Adaptive, Target, or Collision", default_value = "Adaptive")]
    pub init_destroy_name: String,

    #[arg(long, help = "Target size of each destroyed neighborhood", default_value_t = 8)]
    pub neighbor_size: usize,

    #[arg(long, help = "Total wall-clock budget in seconds", default_value_t = 60.0)]
    pub time_limit_secs: f64,

    #[arg(long, help = "Per-iteration replanner budget in seconds", default_value_t = 1.0)]
    pub replan_time_limit_secs: f64,

    #[arg(long, help = "ALNS reaction factor in (0, 1)", default_value_t = 0.1)]
    pub reaction_factor: f64,

    #[arg(long, help = "ALNS decay factor in (0, 1)", default_value_t = 0.01)]
    pub decay_factor: f64,

    #[arg(long, help = "Verbosity 0-3", default_value_t = 1)]
    pub screen: u8,

    #[arg(long, help = "Directory for iteration_stats.csv / run_results.csv / paths.txt")]
    pub output_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub map_path: String,
    pub scen_path: String,
    pub num_agents: usize,
    pub seed: u64,
    pub init_algo_name: String,
    pub replan_algo_name: String,
    pub init_destroy_name: String,
    pub neighbor_size: usize,
    pub time_limit_secs: f64,
    pub replan_time_limit_secs: f64,
    pub reaction_factor: f64,
    pub decay_factor: f64,
    pub screen: u8,
    pub output_path: Option<String>,
}

impl Config {
    pub fn new(cli: &Cli) -> Self {
        Config {
            map_path: cli.map_path.clone(),
            scen_path: cli.scen_path.clone(),
            num_agents: cli.num_agents,
            seed: cli.seed,
            init_algo_name: cli.init_algo_name.clone(),
            replan_algo_name: cli.replan_algo_name.clone(),
            init_destroy_name: cli.init_destroy_name.clone(),
            neighbor_size: cli.neighbor_size,
            time_limit_secs: cli.time_limit_secs,
            replan_time_limit_secs: cli.replan_time_limit_secs,
            reaction_factor: cli.reaction_factor,
            decay_factor: cli.decay_factor,
            screen: cli.screen,
            output_path: cli.output_path.clone(),
        }
    }

    /// Rejects unknown algorithm names up front (spec.md §7: these are fatal
    /// "unknown X name" conditions, so we catch them at config time rather
    /// than at first dispatch).
    pub fn validate(&self) -> Result<()> {
        if self.init_algo_name != "PP" {
            bail!("unknown init_algo_name: {}", self.init_algo_name);
        }
        if !matches!(self.replan_algo_name.as_str(), "PP" | "GCBS" | "PBS") {
            bail!("unknown replan_algo_name: {}", self.replan_algo_name);
        }
        if !matches!(self.init_destroy_name.as_str(), "Adaptive" | "Target" | "Collision") {
            bail!("unknown init_destroy_name: {}", self.init_destroy_name);
        }
        if self.neighbor_size < 2 {
            bail!("neighbor_size must be at least 2, got {}", self.neighbor_size);
        }
        if !(0.0..1.0).contains(&self.reaction_factor) {
            bail!("reaction_factor must be in (0, 1), got {}", self.reaction_factor);
        }
        if !(0.0..1.0).contains(&self.decay_factor) {
            bail!("decay_factor must be in (0, 1), got {}", self.decay_factor);
        }
        if self.screen > 3 {
            bail!("screen must be 0-3, got {}", self.screen);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            map_path: "m.map".into(),
            scen_path: "m.scen".into(),
            num_agents: 10,
            seed: 0,
            init_algo_name: "PP".into(),
            replan_algo_name: "PP".into(),
            init_destroy_name: "Adaptive".into(),
            neighbor_size: 8,
            time_limit_secs: 60.0,
            replan_time_limit_secs: 1.0,
            reaction_factor: 0.1,
            decay_factor: 0.01,
            screen: 1,
            output_path: None,
        }
    }

    #[test]
    fn default_shaped_config_validates() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn rejects_unknown_replan_algo_name() {
        let mut c = base();
        c.replan_algo_name = "ACBS".into();
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_decay_factor() {
        let mut c = base();
        c.decay_factor = 1.5;
        assert!(c.validate().is_err());
    }
}
