use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mapf_lns::config::{Cli, Config};
use mapf_lns::lns::Lns;
use mapf_lns::map::Map;
use mapf_lns::scenario::Scenario;
use mapf_lns::{stat, validator};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::new(&cli);
    config.validate()?;

    init_logging(config.screen);

    let map = Map::from_file(&config.map_path).with_context(|| format!("loading map {}", config.map_path))?;
    let scenario = Scenario::load_from_scen(&config.scen_path).with_context(|| format!("loading scenario {}", config.scen_path))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let agents = scenario
        .generate_agents_randomly(&map, config.num_agents, &mut rng)
        .context("drawing agents from scenario")?;

    let mut lns = Lns::new(agents, map, &config)?;

    let start = Instant::now();
    lns.get_initial_solution(start);
    lns.run(start);

    if let Err(err) = validator::validate(&lns.agents, lns.map(), lns.sum_of_costs) {
        anyhow::bail!("solution failed validation: {err:?}");
    }

    info!(
        sum_of_costs = lns.sum_of_costs,
        num_of_colliding_pairs = lns.num_of_colliding_pairs,
        iterations = lns.iteration_stats.len(),
        num_of_failures = lns.num_of_failures(),
        "run finished"
    );

    if let Some(output_path) = &config.output_path {
        stat::write_iteration_stats(output_path, &lns.iteration_stats)?;
        stat::write_paths(output_path, &lns.agents, lns.map())?;

        let instance_name = format!("{}-{}", config.map_path, config.num_agents);
        let result = stat::RunResult {
            runtime_secs: start.elapsed().as_secs_f64(),
            solution_cost: lns.sum_of_costs,
            initial_solution_cost: lns.initial_sum_of_costs,
            iterations: lns.iteration_stats.len(),
            avg_group_size: average_group_size(&lns),
            initial_solution_runtime_secs: lns.initial_solution_runtime.as_secs_f64(),
            area_under_curve: area_under_curve(&lns),
            solver_name: config.replan_algo_name.clone(),
            instance_name,
        };
        stat::append_run_result(output_path, &result)?;
    }

    Ok(())
}

fn average_group_size(lns: &Lns) -> f64 {
    if lns.iteration_stats.is_empty() {
        return 0.0;
    }
    lns.agents.len() as f64 / lns.iteration_stats.len().max(1) as f64
}

/// Trapezoidal integral of colliding-pair count over runtime, lower is
/// better convergence speed (SPEC_FULL.md §6).
fn area_under_curve(lns: &Lns) -> f64 {
    let stats = &lns.iteration_stats;
    let mut area = 0.0;
    for window in stats.windows(2) {
        let (a, b) = (&window[0], &window[1]);
        let dt = b.runtime_secs - a.runtime_secs;
        area += dt * (a.num_of_colliding_pairs + b.num_of_colliding_pairs) as f64 / 2.0;
    }
    area
}

fn init_logging(screen: u8) {
    let level = match screen {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
