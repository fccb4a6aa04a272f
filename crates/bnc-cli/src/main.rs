//! `bn-crosscheck`: compare the networks inferred by the symbolic tool and
//! the solver, for one model or a whole directory of models.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bnc_compare::batch::DEFAULT_TIMEOUT;
use bnc_compare::inspect::DEFAULT_VARIANT_LIMIT;
use bnc_compare::solver::DEFAULT_SOLVER;
use bnc_compare::{
    ArchiveSummary, BatchConfig, DirectorySource, Orchestrator, ProcessRunner, SolverConfig,
    SymbolicArchive, Triplet, compare_triplet,
};

#[derive(Parser, Debug)]
#[command(name = "bn-crosscheck")]
#[command(version, about = "Check that two Boolean network inference tools agree", long_about = None)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare both tools on one model
    Compare {
        /// Results archive of the symbolic tool
        archive: PathBuf,
        /// Partially specified model given to the solver
        model: PathBuf,
        /// Observation table (CSV)
        data: PathBuf,

        /// Forbid fixed points beyond the observed ones
        #[arg(long)]
        universal_fps: bool,

        #[command(flatten)]
        solver: SolverArgs,

        /// Solver deadline in seconds
        #[arg(long)]
        solver_timeout: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare every archive/model/data triplet of a directory
    Batch {
        dir: PathBuf,

        /// Forbid fixed points beyond the observed ones
        #[arg(long)]
        universal_fps: bool,

        /// Per-model deadline in seconds, 0 for none
        #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
        timeout: u64,

        #[command(flatten)]
        solver: SolverArgs,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the update functions admitted by a results archive
    Inspect {
        archive: PathBuf,

        /// Maximum variants listed per variable
        #[arg(long, default_value_t = DEFAULT_VARIANT_LIMIT)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug)]
struct SolverArgs {
    /// Solver helper program
    #[arg(long = "solver", env = "BN_CROSSCHECK_SOLVER", default_value = DEFAULT_SOLVER)]
    program: String,

    /// Extra argument passed to the solver before the model path
    #[arg(long = "solver-arg", allow_hyphen_values = true)]
    args: Vec<String>,
}

impl SolverArgs {
    fn config(self, universal_fixed_points: bool, timeout: Option<Duration>) -> SolverConfig {
        SolverConfig {
            program: self.program,
            args: self.args,
            timeout,
            universal_fixed_points,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Compare {
            archive,
            model,
            data,
            universal_fps,
            solver,
            solver_timeout,
            json,
        } => {
            let solver = solver.config(universal_fps, solver_timeout.map(Duration::from_secs));
            let triplet = Triplet::new(archive, model, data);
            let report = compare_triplet(&triplet, &solver)
                .with_context(|| format!("comparison of {} failed", triplet.name))?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                report.print_summary();
            }
        }
        Command::Batch {
            dir,
            universal_fps,
            timeout,
            solver,
            json,
        } => {
            let config = BatchConfig {
                universal_fixed_points: universal_fps,
                timeout: (timeout > 0).then(|| Duration::from_secs(timeout)),
            };
            let exe = std::env::current_exe().context("cannot locate own executable")?;
            let runner = ProcessRunner::new(exe, solver.config(universal_fps, None));
            let summary = Orchestrator::new(runner, config)
                .run(&DirectorySource::new(&dir))
                .with_context(|| format!("batch over {} failed", dir.display()))?;
            info!("Batch finished: {} triplets", summary.entries.len());
            if json {
                println!("{}", summary.to_json()?);
            } else {
                summary.print_summary();
            }
        }
        Command::Inspect {
            archive,
            limit,
            json,
        } => {
            let opened = SymbolicArchive::open(&archive)
                .with_context(|| format!("cannot read {}", archive.display()))?;
            let summary = ArchiveSummary::build(&opened, limit)?;
            if json {
                println!("{}", summary.to_json()?);
            } else {
                summary.print_summary();
            }
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
