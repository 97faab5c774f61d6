use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};

use downplan::config::Config;
use downplan::report;
use downplan::solver::{greedy, improve, upper_bound};
use downplan::verify::verify_schedule;
use downplan::visibility::load_constellation;

#[derive(Parser)]
#[command(name = "downplan")]
#[command(about = "Offline downlink/imaging scheduler for satellite constellations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a schedule and write the reports
    Run {
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
        /// Refinement batches; 0 skips refinement
        #[arg(long, default_value_t = 0)]
        refine: usize,
    },
    /// Re-check an emitted schedule against the visibility inputs
    Verify {
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, refine } => run(&config, refine),
        Commands::Verify { config } => check(&config),
    }
}

fn run(config_path: &Path, refine_batches: usize) -> ExitCode {
    let started = Instant::now();
    let config = match Config::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error reading {}: {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let constellation = match load_constellation(&config) {
        Ok(constellation) => constellation,
        Err(e) => {
            eprintln!("Error loading visibility inputs: {}", e);
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "loaded {} satellites, {} stations",
        constellation.satellites(),
        constellation.stations()
    );

    let ceiling = upper_bound::estimate(&constellation);
    let mut result = greedy::schedule(&constellation, &config.solver, None);
    log::info!("schedule computed in {} ms", started.elapsed().as_millis());

    if refine_batches > 0 {
        result = improve::refine(&constellation, &config.solver, result, refine_batches);
    }

    println!("Theoretical maximum: {} bytes", fmt_milli(ceiling));
    println!("Achieved maximum: {} bytes", fmt_milli(result.total_data_milli));

    if let Err(e) = report::write_schedule(&config.schedule_path, &constellation, &result) {
        eprintln!("Error writing schedule: {}", e);
        return ExitCode::FAILURE;
    }
    log::info!("total execution time: {} ms", started.elapsed().as_millis());
    ExitCode::SUCCESS
}

fn check(config_path: &Path) -> ExitCode {
    let config = match Config::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error reading {}: {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let constellation = match load_constellation(&config) {
        Ok(constellation) => constellation,
        Err(e) => {
            eprintln!("Error loading visibility inputs: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match verify_schedule(&config.schedule_path, &constellation) {
        Ok(total) => {
            println!("Total transmitted data: {} bytes", fmt_milli(total));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Schedule verification failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Milli-bytes as `bytes.mmm`.
fn fmt_milli(volume: i64) -> String {
    format!("{}.{:03}", volume / 1000, volume % 1000)
}
