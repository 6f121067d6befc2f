//! nufold CLI

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use nf_store::Store;
use nf_unfold::Method;

/// Exit codes shared with driver scripts; keep stable.
mod exit_codes {
    pub const BAD_ARGUMENTS: u8 = 1;
    pub const DATA_STORE: u8 = 2;
    pub const SIM_STORE: u8 = 3;
    pub const EXTRACTION: u8 = 4;
    pub const OUTPUT: u8 = 5;
}

#[derive(Parser)]
#[command(name = "nufold")]
#[command(about = "Differential cross-section extraction from multi-universe histograms")]
#[command(version = nf_core::VERSION)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a differential cross section for every signal prefix
    Extract {
        /// Measured (data) store
        data: PathBuf,

        /// Simulation store
        sim: PathBuf,

        /// d'Agostini iteration count; negative selects direct inversion
        #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
        iterations: i64,

        /// Output store path. Never overwritten if it already exists.
        #[arg(short, long, default_value = "crossSections.json")]
        output: PathBuf,

        /// Threads (0 = auto). Use 1 for deterministic parity.
        #[arg(long, default_value = "1")]
        threads: usize,
    },

    /// Merge per-run-period stores: histograms sum lock-step, exposures add
    Merge {
        /// Stores to merge, first one defines the key set
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output store path. Never overwritten if it already exists.
        #[arg(short, long, default_value = "merged.json")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => exit_codes::BAD_ARGUMENTS,
            };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Extract { data, sim, iterations, output, threads } => {
            cmd_extract(&data, &sim, iterations, &output, threads)
        }
        Commands::Merge { inputs, output } => cmd_merge(&inputs, &output),
    }
}

fn cmd_extract(
    data: &Path,
    sim: &Path,
    iterations: i64,
    output: &Path,
    threads: usize,
) -> ExitCode {
    if threads > 0 {
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }

    // Refuse up front rather than discovering after a full extraction that
    // the artifact cannot be written.
    if output.exists() {
        eprintln!(
            "output artifact {} already exists; refusing to overwrite it",
            output.display()
        );
        return ExitCode::from(exit_codes::OUTPUT);
    }

    let data_store = match Store::open(data) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(exit_codes::DATA_STORE);
        }
    };
    let sim_store = match Store::open(sim) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(exit_codes::SIM_STORE);
        }
    };

    let method = Method::from_iterations(iterations);
    let summary = nf_extract::run_extraction(&data_store, &sim_store, method);
    if summary.outputs.is_empty() && summary.failures.is_empty() {
        tracing::warn!(store = %data.display(), "no signal prefixes found");
    }

    // Completed prefixes are persisted even when some failed: prefixes are
    // independent units of work.
    let out = nf_extract::output_store(&summary, &data_store);
    if let Err(err) = out.write_new(output) {
        eprintln!("{err}");
        return ExitCode::from(exit_codes::OUTPUT);
    }
    tracing::info!(
        prefixes = summary.outputs.len(),
        output = %output.display(),
        "wrote cross sections"
    );

    if !summary.failures.is_empty() {
        for (prefix, error) in &summary.failures {
            eprintln!("extraction failed for {prefix}: {error}");
        }
        return ExitCode::from(exit_codes::EXTRACTION);
    }
    ExitCode::SUCCESS
}

fn cmd_merge(inputs: &[PathBuf], output: &Path) -> ExitCode {
    if output.exists() {
        eprintln!(
            "output artifact {} already exists; refusing to overwrite it",
            output.display()
        );
        return ExitCode::from(exit_codes::OUTPUT);
    }

    let mut stores = Vec::with_capacity(inputs.len());
    for path in inputs {
        match Store::open(path) {
            Ok(store) => stores.push(store),
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::from(exit_codes::DATA_STORE);
            }
        }
    }

    let mut stores = stores.into_iter();
    let first = match stores.next() {
        Some(store) => store,
        None => return ExitCode::from(exit_codes::BAD_ARGUMENTS),
    };
    let rest: Vec<Store> = stores.collect();

    let merged = match nf_store::merge_stores(first, &rest) {
        Ok(merged) => merged,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(exit_codes::EXTRACTION);
        }
    };
    if let Err(err) = merged.write_new(output) {
        eprintln!("{err}");
        return ExitCode::from(exit_codes::OUTPUT);
    }
    tracing::info!(inputs = inputs.len(), output = %output.display(), "merged stores");
    ExitCode::SUCCESS
}
