//! commstep: assign logical steps to communication traces
//!
//! `analyze` links a JSON trace, runs the step and metric passes and writes
//! the annotated trace as JSON lines or Perfetto. `validate` only reports
//! structural problems.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use commstep::output::{dot, emit_trace, AttributeSchema, JsonLinesWriter, PerfettoWriter};
use commstep::stride::build_stride_dag;
use commstep::{analyze, build_trace, validate_trace, AnalysisConfig, Trace, TraceFile};

#[derive(Parser)]
#[command(name = "commstep")]
#[command(about = "Assign logical steps to communication traces")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign steps, compute metrics and write the annotated trace
    Analyze {
        /// Input trace (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Also write the stride DAG as a Graphviz file
        #[arg(long)]
        dot: Option<PathBuf>,

        /// Analysis configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Merge runs of non-blocking sends into one step
        #[arg(long)]
        coalesce_isends: bool,

        /// Skip aggregate values of differential metrics
        #[arg(long)]
        no_aggregates: bool,

        /// Regex selecting which metrics are exported
        #[arg(long)]
        metrics: Option<String>,
    },
    /// Check a trace for structural problems
    Validate {
        /// Input trace (JSON)
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// JSON lines, one leave record per line
    Json,
    /// Perfetto protobuf trace
    Perfetto,
}

fn load_trace(input: &Path) -> Result<Trace> {
    let file = TraceFile::from_path(input)?;
    build_trace(&file).with_context(|| format!("Failed to link {}", input.display()))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

#[allow(clippy::too_many_arguments)]
fn run_analyze(
    input: PathBuf,
    output: PathBuf,
    format: OutputFormat,
    dot_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    coalesce_isends: bool,
    no_aggregates: bool,
    metrics: Option<String>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => AnalysisConfig::from_path(&path)?,
        None => AnalysisConfig::default(),
    };
    config.coalesce_isends |= coalesce_isends;
    if no_aggregates {
        config.aggregates = false;
    }
    if let Some(metrics) = metrics {
        config.export_metrics = metrics;
    }
    let filter = config.metric_filter()?;

    let mut trace = load_trace(&input)?;
    let summary = analyze(&mut trace, &config)?;

    let schema = AttributeSchema::from_trace(&trace, &filter)?;
    let written = match format {
        OutputFormat::Json => {
            let mut writer = JsonLinesWriter::new(create(&output)?, &schema)?;
            emit_trace(&trace, &schema, &mut writer)?
        }
        OutputFormat::Perfetto => {
            let mut writer = PerfettoWriter::new(&schema);
            let written = emit_trace(&trace, &schema, &mut writer)?;
            let mut out = create(&output)?;
            writer.write_to(&mut out)?;
            out.flush()?;
            written
        }
    };
    info!(records = written, output = %output.display(), "wrote trace");

    if let Some(dot_path) = dot_path {
        let mut out = create(&dot_path)?;
        dot::export_dot(&mut trace, &mut out)?;
        out.flush()?;
        info!(path = %dot_path.display(), "wrote stride graph");
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_validate(input: PathBuf) -> Result<()> {
    let mut trace = load_trace(&input)?;
    build_stride_dag(&mut trace);
    let result = validate_trace(&trace);

    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    for error in &result.errors {
        eprintln!("error: {error}");
    }

    if result.is_valid() {
        println!(
            "{}: valid ({} events, {} warnings)",
            input.display(),
            trace.len(),
            result.warnings.len()
        );
        Ok(())
    } else {
        eprintln!(
            "{}: {} errors, {} warnings",
            input.display(),
            result.errors.len(),
            result.warnings.len()
        );
        process::exit(1);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("invalid log filter")?;
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze {
            input,
            output,
            format,
            dot,
            config,
            coalesce_isends,
            no_aggregates,
            metrics,
        } => run_analyze(
            input,
            output,
            format,
            dot,
            config,
            coalesce_isends,
            no_aggregates,
            metrics,
        ),
        Commands::Validate { input } => run_validate(input),
    }
}
