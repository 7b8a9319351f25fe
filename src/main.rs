use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use csv::{ReaderBuilder, WriterBuilder};
use gridclean::{OnCellError, Plan, Step, Table};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "gridclean", version, about = "Clean tabular CSV data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clean a CSV file and write the result next to it
    Clean(CleanArgs),
}

#[derive(clap::Args)]
struct CleanArgs {
    /// Input CSV file (first record is the header)
    input: PathBuf,

    /// Output path (default: cleaned_<input> in the input's directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Trim surrounding whitespace from every cell
    #[arg(long)]
    trim: bool,

    /// Fill empty cells, e.g. `age:0`
    #[arg(long = "null-replace", value_name = "COLUMN:VALUE")]
    null_replace: Vec<String>,

    /// Reformat dates, e.g. `created_at:2006-01-02` or `created_at:%d.%m.%Y`
    #[arg(long = "date-format", value_name = "COLUMN:LAYOUT")]
    date_format: Vec<String>,

    /// Change case, e.g. `name:upper`
    #[arg(long, value_name = "COLUMN:upper|lower")]
    case: Vec<String>,

    /// Regex replace, e.g. `phone:[^0-9]+:`
    #[arg(long, value_name = "COLUMN:PATTERN:REPLACEMENT")]
    regex: Vec<String>,

    /// Split a column, e.g. `full_name: :first_name,last_name`
    #[arg(long, value_name = "COLUMN:SEPARATOR:NAMES")]
    split: Vec<String>,

    /// Rename a column, e.g. `old:new`
    #[arg(long, value_name = "OLD:NEW")]
    rename: Vec<String>,

    /// Drop rows outside a numeric range, e.g. `age:18:65`
    #[arg(long, value_name = "COLUMN:MIN:MAX")]
    outlier: Vec<String>,

    /// YAML or JSON plan; flag steps run after the plan's own steps
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Run cell operations through the worker pool
    #[arg(long)]
    parallel: bool,

    /// Worker count for parallel mode (default: number of CPUs)
    #[arg(long)]
    workers: Option<usize>,

    /// What to do with a cell that fails to convert
    #[arg(long, value_enum)]
    on_cell_error: Option<CellPolicy>,

    /// Field delimiter for input and output
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CellPolicy {
    Abort,
    Keep,
    Blank,
}

impl From<CellPolicy> for OnCellError {
    fn from(policy: CellPolicy) -> Self {
        match policy {
            CellPolicy::Abort => OnCellError::Abort,
            CellPolicy::Keep => OnCellError::KeepOriginal,
            CellPolicy::Blank => OnCellError::MarkInvalid,
        }
    }
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    match Cli::parse().command {
        Command::Clean(args) => clean(args),
    }
}

fn clean(args: CleanArgs) -> Result<()> {
    let delimiter = delimiter_byte(args.delimiter)?;
    let plan = build_plan(&args)?;

    let table = read_table(&args.input, delimiter)?;
    let (rows, cols) = table.shape();
    info!(input = %args.input.display(), rows, cols, "loaded");

    let table = plan
        .apply(table)
        .with_context(|| format!("cleaning {}", args.input.display()))?;

    let output = match &args.output {
        Some(path) => path.clone(),
        None => default_output(&args.input)?,
    };
    write_table(&table, &output, delimiter)?;

    let (rows, cols) = table.shape();
    info!(output = %output.display(), rows, cols, "cleaning complete");
    Ok(())
}

fn build_plan(args: &CleanArgs) -> Result<Plan> {
    let mut plan = match &args.plan {
        Some(path) => Plan::load(path).with_context(|| format!("loading plan {}", path.display()))?,
        None => Plan::default(),
    };

    if args.trim {
        plan.steps.push(Step::Trim);
    }
    let flagged = [
        ("null-replace", &args.null_replace),
        ("date-format", &args.date_format),
        ("case", &args.case),
        ("regex", &args.regex),
        ("split", &args.split),
        ("rename", &args.rename),
        ("outlier", &args.outlier),
    ];
    for (flag, specs) in flagged {
        for spec in specs {
            plan.steps.push(Step::parse_flag(flag, spec)?);
        }
    }

    if args.parallel {
        plan.parallel = true;
    }
    if let Some(workers) = args.workers {
        plan.options = plan.options.with_max_workers(workers);
    }
    if let Some(policy) = args.on_cell_error {
        plan.on_cell_error = Some(policy.into());
    }

    if plan.steps.is_empty() {
        bail!("nothing to do: pass at least one cleaning flag or --plan");
    }
    debug!(steps = plan.steps.len(), parallel = plan.parallel, "plan built");
    Ok(plan)
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character, got {delimiter:?}");
    }
    Ok(delimiter as u8)
}

fn default_output(input: &Path) -> Result<PathBuf> {
    let name = input
        .file_name()
        .with_context(|| format!("{} has no file name", input.display()))?;
    Ok(input.with_file_name(format!("cleaned_{}", name.to_string_lossy())))
}

fn read_table(path: &Path, delimiter: u8) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers: Vec<String> = rdr
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.context("reading CSV record")?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table::new(headers, rows)?)
}

fn write_table(table: &Table, path: &Path, delimiter: u8) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(table.headers())?;
    for row in table.rows() {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
