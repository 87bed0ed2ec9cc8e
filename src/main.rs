use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::{Parser, Subcommand};
use serde::Serialize;

use astro_cuts::config::CutsConfig;
use astro_cuts::cuts::{run_cascade, run_chunked, CopyStats};
use astro_cuts::selection::{compile, query_string};
use astro_cuts::store::Store;
use astro_cuts::CutError;

/// Apply selection cuts to columnar event data without loading it into memory
#[derive(Parser, Debug)]
#[command(name = "astro-cuts")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbose log output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Overwrite an existing output store without asking
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Filter one table, chunk by chunk
    Apply {
        /// Path to the config yaml file
        config: PathBuf,
        /// Input store directory
        input: PathBuf,
        /// Output store directory
        output: PathBuf,
        /// Table key, overrides `key` of the config
        #[arg(short, long)]
        key: Option<String>,
        /// Number of rows processed at once, overrides `chunksize` of the config
        #[arg(short = 'N', long)]
        chunksize: Option<usize>,
        /// Do not log per-chunk progress
        #[arg(long)]
        no_progress: bool,
        /// Print the row counts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Filter the parameter tables and propagate the surviving events to all
    /// other tables
    Cascade {
        /// Path to the config yaml file
        config: PathBuf,
        /// Input store directory
        input: PathBuf,
        /// Output store directory
        output: PathBuf,
        /// Number of rows processed at once, overrides `chunksize` of the config
        #[arg(short = 'N', long)]
        chunksize: Option<usize>,
        /// Print the row counts as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the tables of a store
    Inspect {
        /// Store directory
        store: PathBuf,
        /// Print the first rows of this table
        #[arg(short, long)]
        table: Option<String>,
        /// Number of rows to print
        #[arg(short = 'n', long, default_value_t = 10)]
        rows: usize,
    },
}

#[derive(Serialize)]
struct Summary {
    rows_before: u64,
    rows_after: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Apply {
            config,
            input,
            output,
            key,
            chunksize,
            no_progress,
            json,
        } => {
            let config = load_config(&config)?;
            let key = key.unwrap_or_else(|| config.table_key().to_string());
            let options = config.copy_options(chunksize, !no_progress);

            let stats = run_chunked(&input, &output, &config.selection, &key, &options, cli.yes)
                .map_err(overwrite_hint)
                .with_context(|| format!("applying cuts to `{key}` of {}", input.display()))?;
            report(stats, json)
        }
        Command::Cascade {
            config,
            input,
            output,
            chunksize,
            json,
        } => {
            let config = load_config(&config)?;
            let options = config.cascade_options(chunksize, false);

            let stats = run_cascade(&input, &output, &config.selection, &options, cli.yes)
                .map_err(overwrite_hint)
                .with_context(|| format!("applying cuts to {}", input.display()))?;
            report(stats, json)
        }
        Command::Inspect { store, table, rows } => inspect(&store, table.as_deref(), rows),
    }
}

/// Read the config and compile its selection, so configuration errors
/// surface before any output is touched.
fn load_config(path: &Path) -> Result<CutsConfig> {
    let config = CutsConfig::from_path(path)
        .with_context(|| format!("loading config {}", path.display()))?;
    let criteria = compile(&config.selection).context("compiling selection")?;
    if criteria.is_empty() {
        log::warn!("Selection is empty, all rows will be kept");
    } else {
        log::info!("Selection: {}", query_string(&criteria));
    }
    Ok(config)
}

fn overwrite_hint(err: CutError) -> anyhow::Error {
    if matches!(err, CutError::OutputNotEmpty(_)) {
        anyhow::Error::new(err).context("pass --yes to overwrite the output store")
    } else {
        err.into()
    }
}

fn report(stats: CopyStats, json: bool) -> Result<()> {
    if json {
        let summary = Summary {
            rows_before: stats.rows_before,
            rows_after: stats.rows_after,
        };
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        let fraction = if stats.rows_before > 0 {
            100.0 * stats.rows_after as f64 / stats.rows_before as f64
        } else {
            0.0
        };
        println!(
            "Selected {} of {} rows ({fraction:.2} %)",
            stats.rows_after, stats.rows_before
        );
    }
    Ok(())
}

fn inspect(path: &Path, table: Option<&str>, rows: usize) -> Result<()> {
    let store = Store::open(path).with_context(|| format!("opening {}", path.display()))?;

    let Some(key) = table else {
        for info in store.tables()? {
            let columns: Vec<String> = info
                .schema
                .fields()
                .iter()
                .map(|f| format!("{}: {}", f.name(), f.data_type()))
                .collect();
            println!("{} ({} rows)\n    {}", info.key, info.rows, columns.join("\n    "));
        }
        return Ok(());
    };

    let mut batches = Vec::new();
    let mut remaining = rows;
    for batch in store.chunk_reader(key, rows.max(1))? {
        if remaining == 0 {
            break;
        }
        let batch = batch.context("reading table")?;
        let take = remaining.min(batch.num_rows());
        batches.push(batch.slice(0, take));
        remaining -= take;
    }
    println!("{}", pretty_format_batches(&batches)?);
    Ok(())
}
