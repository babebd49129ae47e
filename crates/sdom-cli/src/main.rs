use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sdom_cli::{run_case, CaseOptions};
use sdom_opt::{SolveStatus, SolverSettings};

#[derive(Parser)]
#[command(name = "sdom", version, about = "Storage deployment optimization model")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, solve and export a case directory
    Solve {
        /// Directory holding the case's input tables
        case_dir: PathBuf,
        /// Hours to model (series files may carry more)
        #[arg(long, default_value_t = 8760)]
        horizon: usize,
        /// Run the two-stage resilience workflow
        #[arg(long)]
        resilience: bool,
        /// Case name stamped into output files
        #[arg(long, default_value = "case")]
        model_name: String,
        /// Where to write the output tables
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
        /// JSON file with solver settings
        #[arg(long)]
        solver_settings: Option<PathBuf>,
        /// Solver wall-clock limit in seconds
        #[arg(long)]
        time_limit: Option<f64>,
        /// Mirror the solver log to the console
        #[arg(long)]
        verbose: bool,
    },
    /// Load and validate a case directory without solving
    Validate {
        case_dir: PathBuf,
        #[arg(long, default_value_t = 8760)]
        horizon: usize,
        #[arg(long)]
        resilience: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_settings(
    path: Option<&PathBuf>,
    time_limit: Option<f64>,
    verbose: bool,
) -> anyhow::Result<SolverSettings> {
    let mut settings = match path {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => SolverSettings::default(),
    };
    if time_limit.is_some() {
        settings.time_limit_secs = time_limit;
    }
    settings.verbose |= verbose;
    Ok(settings)
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            case_dir,
            horizon,
            resilience,
            model_name,
            output_dir,
            solver_settings,
            time_limit,
            verbose,
        } => {
            let settings = load_settings(solver_settings.as_ref(), time_limit, verbose)?;
            let options = CaseOptions {
                horizon,
                resilience,
                name: model_name,
            };
            let outcome = run_case(&case_dir, &options, &settings, &output_dir)?;
            if let Some(design) = &outcome.design_report {
                println!(
                    "design stage: {} ({} ms)",
                    design.status, design.solve_time_ms
                );
            }
            println!(
                "solve: {} ({} ms, {} variables / {} binaries / {} constraints)",
                outcome.report.status,
                outcome.report.solve_time_ms,
                outcome.report.statistics.variables,
                outcome.report.statistics.binaries,
                outcome.report.statistics.constraints,
            );
            match outcome.report.status {
                SolveStatus::Optimal => {
                    if let Some(objective) = outcome.report.objective {
                        println!("total annual cost: ${objective:.2}");
                    }
                    println!("outputs written to {}", output_dir.display());
                    Ok(())
                }
                status => bail!("solve finished without an optimum: {status}"),
            }
        }
        Commands::Validate {
            case_dir,
            horizon,
            resilience,
        } => {
            let bundle = sdom_io::load_case(&case_dir, horizon, resilience)?;
            info!("case is valid");
            println!(
                "{} hours | {} PV plants | {} wind plants | {} storage technologies | {} balancing units",
                bundle.horizon,
                bundle.pv_plants.len(),
                bundle.wind_plants.len(),
                bundle.storage.len(),
                bundle.balancing.len(),
            );
            println!(
                "hydro: {:?} | imports: {:?} | exports: {:?}",
                bundle.formulations.hydro, bundle.formulations.imports, bundle.formulations.exports,
            );
            Ok(())
        }
    }
}
