//! CLI entry point for the solar availability tool.
//!
//! Provides subcommands for computing daily availability over plant data
//! folders and for listing the plants a data folder holds.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use solar_availability::analyzers::classify::{
    DEFAULT_IRRADIANCE_THRESHOLD, DEFAULT_POWER_THRESHOLD,
};
use solar_availability::analyzers::{EngineConfig, Formula, Level};
use solar_availability::batch::run_batch;
use solar_availability::fetch::{
    DirectorySource, FetchQuery, MeasurementSource, Selection, display_name,
};
use solar_availability::output::{
    default_output_name, log_preview, print_json, write_daily, write_trace_csv,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_LOG_FILE: &str = "logs/solar_availability.log";
const DEFAULT_LOG_FILE_NAME: &str = "solar_availability.log";

#[derive(Parser)]
#[command(name = "solar_availability")]
#[command(
    about = "Daily availability of solar plants from power and irradiance data",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute daily availability and write it as CSV or an xlsx workbook
    Calculate(CalculateArgs),
    /// List the plants found in the data directory
    ListPlants {
        /// Root folder holding plant=<Name> directories
        #[arg(long, env = "AVAILABILITY_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,
    },
}

#[derive(Args)]
struct CalculateArgs {
    /// Hierarchy level: plant, inverter, mppt or string
    #[arg(short, long)]
    level: Level,

    /// Formula A (interval count) or B (irradiance weighted)
    #[arg(short, long, default_value = "A")]
    formula: Formula,

    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// "all" or a comma-separated list of plant names
    #[arg(short, long, default_value = "all")]
    plant_name: Selection,

    /// "all" or a comma-separated list of inverter serial numbers
    #[arg(long, default_value = "all")]
    inverter_sn: Selection,

    /// "all" or a comma-separated list of MPPT ids
    #[arg(long, default_value = "all")]
    mppt_id: Selection,

    /// "all" or a comma-separated list of string ids
    #[arg(long, default_value = "all")]
    string_id: Selection,

    /// Irradiance above which an interval counts as potential production
    #[arg(long, default_value_t = DEFAULT_IRRADIANCE_THRESHOLD)]
    irradiance_threshold: f64,

    /// Power above which an interval counts as actual production
    #[arg(long, default_value_t = DEFAULT_POWER_THRESHOLD)]
    power_threshold: f64,

    /// Daily table file; `.xlsx` writes a colored workbook, anything else CSV
    /// (default derived from plant, level and formula)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the per-record trace to this CSV file
    #[arg(long, value_name = "FILE")]
    debug_trace: Option<PathBuf>,

    /// Gzip compress the debug trace
    #[arg(long, default_value_t = false)]
    gzip: bool,

    /// Also log the daily table as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Root folder holding plant=<Name> directories
    #[arg(long, env = "AVAILABILITY_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Maximum number of plants processed at once
    #[arg(short, long, default_value_t = 4)]
    concurrency: usize,
}

/// Installs the colored stderr layer (`RUST_LOG`, default info) and the JSON
/// daily-rolling file layer (`RUST_LOG_JSON`, default debug) at `LOG_FILE_PATH`.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let log_path = Path::new(&log_file_path);
    let log_dir = log_path.parent().unwrap_or(Path::new("logs"));
    let log_file_name = log_path
        .file_name()
        .unwrap_or(OsStr::new(DEFAULT_LOG_FILE_NAME));

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, log_file_name));

    let console = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_file = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(console)
        .with(json_file)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file
    let _log_guard = init_tracing()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Calculate(args) => calculate(args).await?,
        Commands::ListPlants { data_dir } => {
            let source = DirectorySource::new(data_dir);
            let plants = source.list_plants().await?;

            for plant in &plants {
                info!(plant_id = %plant, name = %display_name(plant), "Plant");
            }
            info!(total = plants.len(), data_dir = %source.root().display(), "Plant list summary");
        }
    }

    Ok(())
}

/// Resolves the plants to process, runs every plant and writes the outputs.
#[tracing::instrument(skip_all, fields(level = %args.level, formula = %args.formula))]
async fn calculate(args: CalculateArgs) -> Result<()> {
    let config = EngineConfig::new(
        args.level,
        args.formula,
        args.irradiance_threshold,
        args.power_threshold,
    )?;

    if let (Some(start), Some(end)) = (args.start_date, args.end_date) {
        if start > end {
            bail!("start date {start} is after end date {end}");
        }
    }

    let source = DirectorySource::new(&args.data_dir);
    let plants = match &args.plant_name {
        Selection::All => source.list_plants().await?,
        Selection::Only(names) => names.iter().map(|n| n.replace(' ', "_")).collect(),
    };
    if plants.is_empty() {
        bail!("no plants found under {}", args.data_dir.display());
    }
    info!(plants = plants.len(), data_dir = %args.data_dir.display(), "Plants selected");

    let query = FetchQuery {
        level: args.level,
        start_date: args.start_date,
        end_date: args.end_date,
        inverters: args.inverter_sn,
        mppts: args.mppt_id,
        strings: args.string_id,
    };

    let source: Arc<dyn MeasurementSource> = Arc::new(source);
    let outcome = run_batch(source, &plants, &query, config, args.concurrency).await;

    for skipped in &outcome.skipped {
        warn!(plant = %display_name(&skipped.plant), reason = %skipped.reason, "Plant skipped");
    }

    if !outcome.has_output() {
        let summary = outcome
            .skipped
            .iter()
            .map(|s| format!("{}: {}", display_name(&s.plant), s.reason))
            .collect::<Vec<_>>()
            .join("; ");
        bail!("no availability data produced ({summary})");
    }

    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(default_output_name(&args.plant_name, args.level, args.formula))
    });
    write_daily(&output, &outcome.report)?;

    if let Some(trace_path) = &args.debug_trace {
        write_trace_csv(trace_path, &outcome.report.trace, args.gzip)?;
    }

    log_preview(&outcome.report);
    if args.json {
        print_json(&outcome.report)?;
    }
    info!(
        processed = outcome.processed.len(),
        skipped = outcome.skipped.len(),
        output = %output.display(),
        "Availability calculation complete"
    );
    Ok(())
}
