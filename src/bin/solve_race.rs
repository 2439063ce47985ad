//! Safety race equilibrium solver binary.
//!
//! Usage:
//!   cargo run --release --bin solve_race -- [OPTIONS]
//!
//! Options:
//!   --agents <N>         Number of agents (default: 2)
//!   --config <FILE>      Solver configuration JSON file (optional)
//!   --params <FILE>      Model parameter JSON file (optional)
//!   --seed <N>           Random seed (optional)
//!   --retries <N>        Random restarts after a failed attempt
//!   --sweep <PARAM>      Sweep one parameter (a, alpha, b, beta, theta, d, r)
//!   --step <X[,X..]>     Sweep increment, one value or one per agent (default: 0.01)
//!   --steps <K>          Number of sweep steps (default: 10)
//!   --threads <N>        Number of threads (default: auto)
//!   --output <FILE>      Write results as JSON

use std::env;
use std::fs;
use std::process;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use race_equilibrium::equilibrium::{solve, SolverConfig, SolverResult};
use race_equilibrium::models::{Param, RaceParams, RaceScalars, Scenario};

fn main() {
    setup_log();

    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let mut agents: usize = 2;
    let mut config_file: Option<String> = None;
    let mut params_file: Option<String> = None;
    let mut seed: Option<u64> = None;
    let mut retries: Option<usize> = None;
    let mut sweep: Option<Param> = None;
    let mut step: Vec<f64> = vec![0.01];
    let mut steps: usize = 10;
    let mut threads: usize = 0;
    let mut output_file: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--agents" | "-n" => {
                i += 1;
                agents = parse_value(&args, i, "--agents");
            }
            "--config" | "-c" => {
                i += 1;
                config_file = Some(value(&args, i, "--config").to_string());
            }
            "--params" | "-p" => {
                i += 1;
                params_file = Some(value(&args, i, "--params").to_string());
            }
            "--seed" | "-s" => {
                i += 1;
                seed = Some(parse_value(&args, i, "--seed"));
            }
            "--retries" | "-r" => {
                i += 1;
                retries = Some(parse_value(&args, i, "--retries"));
            }
            "--sweep" => {
                i += 1;
                sweep = Some(parse_value(&args, i, "--sweep"));
            }
            "--step" => {
                i += 1;
                step = value(&args, i, "--step")
                    .split(',')
                    .map(|s| {
                        s.trim()
                            .parse::<f64>()
                            .unwrap_or_else(|_| fail(&format!("Invalid value for --step: {}", s)))
                    })
                    .collect();
            }
            "--steps" => {
                i += 1;
                steps = parse_value(&args, i, "--steps");
            }
            "--threads" | "-t" => {
                i += 1;
                threads = parse_value(&args, i, "--threads");
            }
            "--output" | "-o" => {
                i += 1;
                output_file = Some(value(&args, i, "--output").to_string());
            }
            "--help" | "-h" => {
                print_help();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                process::exit(2);
            }
        }
        i += 1;
    }

    println!("=================================================");
    println!("  Safety Race Equilibrium Solver");
    println!("=================================================");
    println!();

    // Load or create configuration
    let mut config = match &config_file {
        Some(path) => {
            println!("Loading solver configuration from: {}", path);
            SolverConfig::from_json_file(path)
                .unwrap_or_else(|e| fail(&format!("Error loading config: {}", e)))
        }
        None => SolverConfig::default(),
    };
    if let Some(s) = seed {
        config = config.with_seed(s);
    }
    if let Some(r) = retries {
        config = config.with_retries(r);
    }

    let params = match &params_file {
        Some(path) => {
            println!("Loading model parameters from: {}", path);
            load_params(path)
        }
        None => RaceParams::broadcast(agents, &RaceScalars::default()),
    };

    if threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            tracing::warn!("Could not set thread count: {}", e);
        }
    }

    println!("Agents: {}", params.num_agents());
    println!(
        "Tolerance: {:e}, max rounds: {}, retries: {}",
        config.tol, config.max_iters, config.retries
    );
    match config.seed {
        Some(s) => println!("Seed: {}", s),
        None => println!("Seed: random"),
    }
    println!();

    let start = Instant::now();
    let output = match sweep {
        Some(param) => run_sweep(params, param, &step, steps, &config),
        None => run_single(params, config),
    };
    let elapsed = start.elapsed().as_secs_f64();

    println!();
    println!("Total time: {:.2}s", elapsed);

    if let Some(path) = output_file {
        let json = serde_json::to_string_pretty(&output)
            .unwrap_or_else(|e| fail(&format!("Error serializing results: {}", e)));
        match fs::write(&path, json) {
            Ok(_) => println!("Results saved to: {}", path),
            Err(e) => eprintln!("Error saving results: {}", e),
        }
    }
}

fn run_single(params: RaceParams, config: SolverConfig) -> RunOutput {
    let model = params
        .to_model()
        .unwrap_or_else(|e| fail(&format!("Invalid model parameters: {}", e)));
    let result = solve(model, config).unwrap_or_else(|e| fail(&format!("Solver error: {}", e)));

    print_result(&result);

    RunOutput {
        varying: None,
        steps: vec![StepOutput {
            values: None,
            result,
        }],
    }
}

fn run_sweep(
    params: RaceParams,
    param: Param,
    step: &[f64],
    steps: usize,
    config: &SolverConfig,
) -> RunOutput {
    let scenario = Scenario::sweep(params, param, step, steps)
        .unwrap_or_else(|e| fail(&format!("Invalid sweep: {}", e)));

    println!("Sweeping '{}' over {} steps", param, scenario.len());

    let pb = ProgressBar::new(scenario.len() as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} steps ({eta})",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }

    let results = scenario
        .solve_all_with(config, |_, _| pb.inc(1))
        .unwrap_or_else(|e| fail(&format!("Sweep failed: {}", e)));
    pb.finish_and_clear();

    let values = scenario.values();
    for (k, result) in results.iter().enumerate() {
        println!();
        println!("--- Step {}: {} = {} ---", k, param, format_vec(values[k]));
        print_result(result);
    }

    let converged = results.iter().filter(|r| r.success).count();
    println!();
    println!("Converged: {}/{}", converged, results.len());

    RunOutput {
        varying: Some(param),
        steps: values
            .iter()
            .zip(results)
            .map(|(v, result)| StepOutput {
                values: Some(v.to_vec()),
                result,
            })
            .collect(),
    }
}

fn print_result(result: &SolverResult) {
    if result.success {
        println!(
            "Equilibrium found in {} rounds (attempt {})",
            result.stats.rounds, result.stats.attempts
        );
    } else {
        println!(
            "No equilibrium after {} attempts; showing last profile",
            result.stats.attempts
        );
    }

    println!(
        "{:>6} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "agent", "Xs", "Xp", "s", "p", "payoff"
    );
    for i in 0..result.profile.num_agents() {
        println!(
            "{:>6} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>12.6}",
            i,
            result.profile.xs[i],
            result.profile.xp[i],
            result.outcome.safety[i],
            result.outcome.performance[i],
            result.outcome.payoffs[i]
        );
    }
    println!("Total safety: {:.6}", result.outcome.total_safety);
    if result.stats.inner_failures > 0 {
        println!(
            "Inner searches without convergence: {}/{}",
            result.stats.inner_failures, result.stats.inner_calls
        );
    }
}

fn load_params(path: &str) -> RaceParams {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| fail(&format!("Error reading {}: {}", path, e)));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| fail(&format!("Error parsing {}: {}", path, e)))
}

fn format_vec(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{:.4}", v)).collect();
    format!("[{}]", parts.join(", "))
}

fn setup_log() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i) {
        Some(v) => v.as_str(),
        None => fail(&format!("Missing value for {}", flag)),
    }
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T
where
    T::Err: std::fmt::Display,
{
    let raw = value(args, i, flag);
    raw.parse()
        .unwrap_or_else(|e| fail(&format!("Invalid value for {}: {} ({})", flag, raw, e)))
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

#[derive(Debug, Serialize)]
struct RunOutput {
    varying: Option<Param>,
    steps: Vec<StepOutput>,
}

#[derive(Debug, Serialize)]
struct StepOutput {
    /// Swept parameter values at this step.
    values: Option<Vec<f64>>,
    result: SolverResult,
}

fn print_help() {
    println!("Safety Race Equilibrium Solver");
    println!();
    println!("Usage: solve_race [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -n, --agents <N>         Number of agents (default: 2)");
    println!("  -c, --config <FILE>      Solver configuration JSON file");
    println!("  -p, --params <FILE>      Model parameter JSON file (overrides --agents)");
    println!("  -s, --seed <N>           Random seed");
    println!("  -r, --retries <N>        Random restarts after a failed attempt");
    println!("  --sweep <PARAM>          Sweep a parameter: a, alpha, b, beta, theta, d, r");
    println!("  --step <X[,X..]>         Sweep increment (default: 0.01)");
    println!("  --steps <K>              Number of sweep steps (default: 10)");
    println!("  -t, --threads <N>        Number of threads (default: auto)");
    println!("  -o, --output <FILE>      Write results as JSON");
    println!("  -h, --help               Show this help");
    println!();
    println!("Logging follows RUST_LOG (default: info).");
    println!();
    println!("Examples:");
    println!("  # Two-agent equilibrium, reproducible");
    println!("  solve_race --seed 42");
    println!();
    println!("  # How investment responds to the price of capital");
    println!("  solve_race --agents 3 --sweep r --step 0.01 --steps 10 --output sweep.json");
}
