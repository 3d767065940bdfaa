use clap::{Parser, Subcommand};
use nori_putrate::Evaluator;
use putrate_eval::{EvalConfig, RunReport};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "putrate-eval")]
#[command(about = "Predict and validate LSM put throughput against calibrated device envelopes")]
#[command(version)]
struct Cli {
    /// Log verbosity (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every experiment in the file and emit a JSON report
    Run {
        /// Evaluation file (YAML)
        #[arg(short, long, env = "PUTRATE_CONFIG", default_value = "putrate.yaml")]
        config: PathBuf,

        /// Report destination (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate an evaluation file without running it
    Check {
        /// Evaluation file (YAML)
        #[arg(short, long, env = "PUTRATE_CONFIG", default_value = "putrate.yaml")]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run { config, output } => cmd_run(config, output),
        Commands::Check { config } => cmd_check(config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load(path: &Path) -> Result<EvalConfig, Box<dyn std::error::Error>> {
    tracing::info!("Loading evaluation file from: {}", path.display());
    let config = EvalConfig::load_from_file(path)?;
    tracing::info!(
        "Loaded {} calibration points, {} experiments",
        config.calibration.len(),
        config.experiments.len()
    );
    Ok(config)
}

fn cmd_run(path: PathBuf, output: Option<PathBuf>) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = load(&path)?;
    let experiments = config.experiments;
    let evaluator = Evaluator::new(config.calibration, config.model)?;

    let results = evaluator.evaluate_batch(&experiments);
    let report = RunReport::from_results(experiments.iter().map(|e| e.name.as_str()), results);

    for entry in &report.experiments {
        match (&entry.outcome, &entry.error) {
            (Some(outcome), _) => tracing::info!(
                "{}: predicted {:.3} ({} phase)",
                entry.name,
                outcome.prediction.predicted_throughput,
                outcome.prediction.phase
            ),
            (None, Some(e)) => tracing::error!("{}: {}", entry.name, e),
            (None, None) => {}
        }
    }

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)?;
            tracing::info!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    tracing::info!(
        "{} experiments: {} succeeded, {} failed",
        report.summary.total,
        report.summary.succeeded,
        report.summary.failed
    );

    if report.summary.failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn cmd_check(path: PathBuf) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = load(&path)?;
    let [ratios, depths, concurrency, blocks] = config.calibration.dimensions();
    let experiments = config.experiments.len();
    Evaluator::new(config.calibration, config.model)?;
    println!(
        "{}: ok (grid {}x{}x{}x{}, {} experiments)",
        path.display(),
        ratios,
        depths,
        concurrency,
        blocks,
        experiments
    );
    Ok(ExitCode::SUCCESS)
}
