//! Batch Experiment Runner
//!
//! Executes multiple simulation runs based on TOML configuration files.
//! Supports parameter sweeps and Monte Carlo analysis.
//!
//! Usage:
//!   cargo run --release --bin run_experiment -- experiments/baseline.toml

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use sticker_album::market::Market;
use sticker_album::output::RunOutput;
use sticker_album::{ModelConfig, SimulationError};

/// Top-level experiment configuration
#[derive(Debug, Clone, Deserialize)]
struct ExperimentConfig {
    experiment: ExperimentMetadata,
    model: ModelConfig,
    output: OutputSettings,
    sweep: Option<SweepConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExperimentMetadata {
    name: String,
    description: String,
    num_runs: usize,
    base_seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct OutputSettings {
    save_round_timeseries: bool,
    save_collector_snapshots: bool,
    save_summary_stats: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct SweepConfig {
    parameter: String,
    values: Vec<u64>,
}

/// Aggregate statistics across multiple runs
#[derive(Debug, Clone, Serialize)]
struct AggregateMetrics {
    num_runs: usize,
    successful_runs: usize,
    aborted_runs: usize,
    rounds_to_completion: MeanStd,
    total_money_spent: MeanStd,
    mean_money_spent: MeanStd,
}

#[derive(Debug, Clone, Serialize)]
struct MeanStd {
    mean: f64,
    std: f64,
    min: f64,
    max: f64,
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <experiment_config.toml>", args[0]);
        eprintln!("Example: {} experiments/baseline.toml", args[0]);
        std::process::exit(1);
    }

    let config_path = &args[1];
    println!("=== Sticker Album Experiment Runner ===\n");
    println!("Loading experiment config: {}\n", config_path);

    let config_str = fs::read_to_string(config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let exp_config: ExperimentConfig = toml::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing TOML config: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = exp_config.model.validate() {
        eprintln!("Invalid model configuration: {}", e);
        std::process::exit(1);
    }

    println!("Experiment: {}", exp_config.experiment.name);
    println!("Description: {}", exp_config.experiment.description);
    println!("Runs: {}\n", exp_config.experiment.num_runs);

    let output_base = PathBuf::from("results").join(&exp_config.experiment.name);
    fs::create_dir_all(&output_base).unwrap_or_else(|e| {
        eprintln!("Error creating output directory: {}", e);
        std::process::exit(1);
    });

    if let Some(sweep) = &exp_config.sweep {
        run_parameter_sweep(&exp_config, sweep, &output_base);
    } else {
        run_simple_experiment(&exp_config, &output_base);
    }
}

/// Run simple Monte Carlo experiment (no parameter sweep)
fn run_simple_experiment(exp_config: &ExperimentConfig, output_dir: &Path) {
    let start_time = Instant::now();
    let total_runs = exp_config.experiment.num_runs;

    println!("Running {} Monte Carlo simulations...\n", total_runs);

    let outputs: Vec<Result<RunOutput, SimulationError>> = (0..total_runs)
        .into_par_iter()
        .map(|run_idx| {
            let seed = exp_config.experiment.base_seed + run_idx as u64;
            let result = run_simulation(&exp_config.model, seed);

            match &result {
                Ok(output) => {
                    let run_dir = output_dir.join(format!("run_{}", seed));
                    save_run_output(output, &run_dir, &exp_config.output);
                    println!(
                        "Run seed={} done: {} rounds, {} spent",
                        seed, output.summary.n_rounds, output.summary.total_money_spent
                    );
                }
                Err(e) => println!("Run seed={} aborted: {}", seed, e),
            }

            result
        })
        .collect();

    finish_experiment(&outputs, output_dir, start_time, total_runs);
}

/// Run parameter sweep experiment
fn run_parameter_sweep(exp_config: &ExperimentConfig, sweep: &SweepConfig, output_dir: &Path) {
    let start_time = Instant::now();
    let total_runs = sweep.values.len() * exp_config.experiment.num_runs;

    println!("Parameter sweep: {} ∈ {:?}", sweep.parameter, sweep.values);
    println!(
        "Total simulations: {} parameter values × {} runs = {}\n",
        sweep.values.len(),
        exp_config.experiment.num_runs,
        total_runs
    );

    let mut sweep_aggregates: HashMap<String, AggregateMetrics> = HashMap::new();

    for (param_idx, &param_value) in sweep.values.iter().enumerate() {
        println!(
            "--- {}={} ({}/{}) ---",
            sweep.parameter,
            param_value,
            param_idx + 1,
            sweep.values.len()
        );

        let param_key = format!("{}_{}", sweep.parameter, param_value);
        let param_dir = output_dir.join(&param_key);

        let outputs: Vec<Result<RunOutput, SimulationError>> = (0..exp_config.experiment.num_runs)
            .into_par_iter()
            .map(|run_idx| {
                let seed = exp_config.experiment.base_seed
                    + (param_idx * exp_config.experiment.num_runs + run_idx) as u64;

                let mut model = exp_config.model.clone();
                apply_parameter_value(&mut model, &sweep.parameter, param_value);

                let result = run_simulation(&model, seed);
                if let Ok(output) = &result {
                    let run_dir = param_dir.join(format!("run_{}", seed));
                    save_run_output(output, &run_dir, &exp_config.output);
                }
                result
            })
            .collect();

        let aggregate = compute_aggregate_metrics(&outputs);
        fs::create_dir_all(&param_dir).unwrap();
        let aggregate_json = serde_json::to_string_pretty(&aggregate).unwrap();
        fs::write(param_dir.join("aggregate_summary.json"), aggregate_json).unwrap();

        println!(
            "  → rounds to completion: {:.1} ± {:.1}, money spent: {:.1} ± {:.1}\n",
            aggregate.rounds_to_completion.mean,
            aggregate.rounds_to_completion.std,
            aggregate.total_money_spent.mean,
            aggregate.total_money_spent.std
        );

        sweep_aggregates.insert(param_key, aggregate);
    }

    let sweep_json = serde_json::to_string_pretty(&sweep_aggregates).unwrap();
    fs::write(output_dir.join("sweep_summary.json"), sweep_json).unwrap();

    let total_elapsed = start_time.elapsed();
    println!(
        "✓ Parameter sweep complete in {:.1}s ({:.2}s per run)",
        total_elapsed.as_secs_f64(),
        total_elapsed.as_secs_f64() / total_runs as f64
    );
    println!("Results saved to: {}", output_dir.display());
}

/// Aggregate, save, and report on a batch of runs
fn finish_experiment(
    outputs: &[Result<RunOutput, SimulationError>],
    output_dir: &Path,
    start_time: Instant,
    total_runs: usize,
) {
    println!("\n=== Aggregating Results ===\n");
    let aggregate = compute_aggregate_metrics(outputs);

    let aggregate_json = serde_json::to_string_pretty(&aggregate).unwrap();
    fs::write(output_dir.join("aggregate_summary.json"), aggregate_json).unwrap();

    print_aggregate_summary(&aggregate);

    let total_elapsed = start_time.elapsed();
    println!(
        "\n✓ Experiment complete in {:.1}s ({:.2}s per run)",
        total_elapsed.as_secs_f64(),
        total_elapsed.as_secs_f64() / total_runs as f64
    );
    println!("Results saved to: {}", output_dir.display());
}

/// Run a single simulation without progress logging
fn run_simulation(config: &ModelConfig, seed: u64) -> Result<RunOutput, SimulationError> {
    // Config is validated up front in main, so construction cannot fail here
    let mut market = Market::new(config.clone(), seed).expect("validated config");
    let summary = market.run(usize::MAX)?;
    Ok(RunOutput::from_run(&market, &summary, seed))
}

/// Apply swept parameter value to the model config
fn apply_parameter_value(config: &mut ModelConfig, param_name: &str, value: u64) {
    let value = value as usize;
    match param_name {
        "stickers_per_pack" => config.stickers_per_pack = value,
        "n_strangers" => config.n_strangers = value,
        "starting_endowment" => config.starting_endowment = value,
        "stranger_endowment" => config.stranger_endowment = value,
        _ => panic!("Unknown sweep parameter: {}", param_name),
    }
}

/// Save run output based on settings
fn save_run_output(output: &RunOutput, run_dir: &Path, settings: &OutputSettings) {
    if !settings.save_round_timeseries
        && !settings.save_collector_snapshots
        && !settings.save_summary_stats
    {
        return;
    }

    fs::create_dir_all(run_dir).unwrap();

    if settings.save_round_timeseries {
        output
            .write_rounds_csv(run_dir.join("round_timeseries.csv"))
            .unwrap();
    }

    if settings.save_collector_snapshots {
        output
            .write_collectors_csv(run_dir.join("collector_snapshots.csv"))
            .unwrap();
    }

    if settings.save_summary_stats {
        output.write_summary_json(run_dir.join("summary.json")).unwrap();
    }
}

/// Compute aggregate metrics across successful runs
fn compute_aggregate_metrics(outputs: &[Result<RunOutput, SimulationError>]) -> AggregateMetrics {
    let successes: Vec<&RunOutput> = outputs.iter().filter_map(|o| o.as_ref().ok()).collect();

    let rounds: Vec<f64> = successes.iter().map(|o| o.summary.n_rounds as f64).collect();
    let totals: Vec<f64> = successes
        .iter()
        .map(|o| o.summary.total_money_spent as f64)
        .collect();
    let means: Vec<f64> = successes.iter().map(|o| o.summary.mean_money_spent).collect();

    AggregateMetrics {
        num_runs: outputs.len(),
        successful_runs: successes.len(),
        aborted_runs: outputs.len() - successes.len(),
        rounds_to_completion: compute_mean_std(&rounds),
        total_money_spent: compute_mean_std(&totals),
        mean_money_spent: compute_mean_std(&means),
    }
}

fn compute_mean_std(values: &[f64]) -> MeanStd {
    if values.is_empty() {
        return MeanStd {
            mean: 0.0,
            std: 0.0,
            min: 0.0,
            max: 0.0,
        };
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    MeanStd {
        mean,
        std: variance.sqrt(),
        min,
        max,
    }
}

fn print_aggregate_summary(agg: &AggregateMetrics) {
    println!("Aggregate Results ({} runs):", agg.num_runs);
    println!(
        "  Successful: {} (aborted: {})",
        agg.successful_runs, agg.aborted_runs
    );
    println!(
        "  Rounds to completion: {:.1} ± {:.1} [{:.0}, {:.0}]",
        agg.rounds_to_completion.mean,
        agg.rounds_to_completion.std,
        agg.rounds_to_completion.min,
        agg.rounds_to_completion.max
    );
    println!(
        "  Total money spent: {:.1} ± {:.1} [{:.0}, {:.0}]",
        agg.total_money_spent.mean,
        agg.total_money_spent.std,
        agg.total_money_spent.min,
        agg.total_money_spent.max
    );
    println!(
        "  Mean money spent per collector: {:.1} ± {:.1}",
        agg.mean_money_spent.mean, agg.mean_money_spent.std
    );
}
