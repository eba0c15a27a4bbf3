//! STATAU CLI

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use sa_core::ModelSpec;
use sa_inference::{AnalysisOutput, run_f_test, run_hausman};
use sa_report::{CustomRow, FooterStat, RenderedTable, TableOptions};

mod input;

#[derive(Parser)]
#[command(name = "statau")]
#[command(about = "STATAU - econometric estimation and academic tables")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one analysis and print its table(s)
    Run {
        /// Dataset (columns JSON)
        #[arg(short, long)]
        data: PathBuf,

        /// Model spec (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Print JSON to stdout instead of tables.
        #[arg(long)]
        json: bool,

        /// Also write the result (pretty JSON) to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show t-statistics instead of standard errors.
        #[arg(long)]
        tstat: bool,

        /// Footer statistics (nobs, r2, adj_r2, f_stat, pseudo_r2, aic, bic, ll).
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,
    },

    /// Fit several regression specs and merge them into one table
    Table {
        /// Dataset (columns JSON)
        #[arg(short, long)]
        data: PathBuf,

        /// Model specs, one column each, in order
        #[arg(short, long, required = true, num_args = 1..)]
        spec: Vec<PathBuf>,

        /// Table title.
        #[arg(long, default_value = "Regression Results")]
        title: String,

        /// Show t-statistics instead of standard errors.
        #[arg(long)]
        tstat: bool,

        /// Footer statistics (nobs, r2, adj_r2, f_stat, pseudo_r2, aic, bic, ll).
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,

        /// Indicator row `LABEL=cell1,cell2,...`; empty cells render `No`.
        #[arg(long = "row")]
        rows: Vec<String>,

        /// Print JSON to stdout instead of the table.
        #[arg(long)]
        json: bool,

        /// Also write the table (pretty JSON) to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// F-test of fixed effects against pooled OLS
    FTest {
        /// Dataset (columns JSON)
        #[arg(short, long)]
        data: PathBuf,

        /// Model spec with panel identifiers (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Print JSON to stdout instead of tables.
        #[arg(long)]
        json: bool,

        /// Also write the result (pretty JSON) to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Hausman test of fixed against random effects
    Hausman {
        /// Dataset (columns JSON)
        #[arg(short, long)]
        data: PathBuf,

        /// Model spec with panel identifiers (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Scale V_fe and use the pooled OLS covariance in place of V_re.
        #[arg(long)]
        sigmamore: bool,

        /// Print JSON to stdout instead of tables.
        #[arg(long)]
        json: bool,

        /// Also write the result (pretty JSON) to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Run { data, spec, json, output, tstat, stats } => {
            let opts = table_options(tstat, &stats, &[], None)?;
            cmd_run(&data, &spec, json, output.as_deref(), &opts)
        }
        Commands::Table { data, spec, title, tstat, stats, rows, json, output } => {
            let opts = table_options(tstat, &stats, &rows, Some(title))?;
            cmd_table(&data, &spec, json, output.as_deref(), &opts)
        }
        Commands::FTest { data, spec, json, output } => {
            cmd_compare(&data, &spec, None, json, output.as_deref())
        }
        Commands::Hausman { data, spec, sigmamore, json, output } => {
            cmd_compare(&data, &spec, Some(sigmamore), json, output.as_deref())
        }
        Commands::Version => {
            println!("statau {}", sa_core::VERSION);
            Ok(())
        }
    }
}

fn table_options(
    tstat: bool,
    stats: &[String],
    rows: &[String],
    title: Option<String>,
) -> Result<TableOptions> {
    let mut opts = TableOptions { show_tstat: tstat, ..Default::default() };
    if let Some(title) = title {
        opts.title = title;
    }
    if !stats.is_empty() {
        opts.stats = stats.iter().map(|s| s.trim().parse::<FooterStat>()).collect::<Result<_, _>>()?;
    }
    opts.custom_rows = rows.iter().map(|r| parse_custom_row(r)).collect::<Result<_>>()?;
    Ok(opts)
}

fn parse_custom_row(raw: &str) -> Result<CustomRow> {
    let Some((label, cells)) = raw.split_once('=') else {
        bail!("--row expects LABEL=cell1,cell2,...; got '{raw}'");
    };
    let values = cells
        .split(',')
        .map(|c| {
            let c = c.trim();
            (!c.is_empty()).then(|| c.to_string())
        })
        .collect();
    Ok(CustomRow { label: label.trim().to_string(), values })
}

fn load(data: &Path, spec: &Path) -> Result<(sa_core::Dataset, ModelSpec)> {
    let ds = input::read_dataset(data)?;
    let spec = input::read_model_spec(spec)?;
    tracing::info!(rows = ds.n_rows(), columns = ds.names().len(), method = %spec.method, "loaded inputs");
    Ok((ds, spec))
}

fn cmd_run(data: &Path, spec: &Path, json: bool, output: Option<&Path>, opts: &TableOptions) -> Result<()> {
    let (ds, spec) = load(data, spec)?;
    let out = sa_inference::run(&ds, &spec)?;
    if let AnalysisOutput::CardinalityWarning(w) = &out {
        tracing::warn!(limit = w.limit, variables = w.variables.len(), "frequency table paused");
    }
    let value = serde_json::to_value(&out)?;
    let tables = sa_report::render(&out, opts)?;
    emit(value, &tables, json, output)
}

fn cmd_table(
    data: &Path,
    specs: &[PathBuf],
    json: bool,
    output: Option<&Path>,
    opts: &TableOptions,
) -> Result<()> {
    let ds = input::read_dataset(data)?;
    let mut results = Vec::with_capacity(specs.len());
    for path in specs {
        let spec = input::read_model_spec(path)?;
        if !spec.method.is_regression() {
            bail!("{}: {} is not a regression method", path.display(), spec.method);
        }
        match sa_inference::run(&ds, &spec)? {
            AnalysisOutput::Estimation(r) => results.push(r),
            other => bail!("{}: unexpected output {:?}", path.display(), other),
        }
    }
    tracing::info!(models = results.len(), "merging estimation results");
    let table = sa_report::merge_estimations(&results, opts)?;
    let value = serde_json::to_value(&table)?;
    emit(value, std::slice::from_ref(&table), json, output)
}

/// `sigmamore: None` runs the F-test, `Some(_)` the Hausman test.
fn cmd_compare(
    data: &Path,
    spec: &Path,
    sigmamore: Option<bool>,
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    let (ds, mut spec) = load(data, spec)?;
    let result = match sigmamore {
        None => run_f_test(&ds, &spec)?,
        Some(flag) => {
            spec.sigmamore |= flag;
            run_hausman(&ds, &spec)?
        }
    };
    tracing::info!(test = %result.test_name, statistic = result.statistic, p_value = result.p_value, "comparison test");
    let value = serde_json::to_value(&result)?;
    let tables = sa_report::comparison_tables(&result, spec.decimals);
    emit(value, &tables, json, output)
}

fn emit(value: serde_json::Value, tables: &[RenderedTable], json: bool, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        write_json(Some(path), &value)?;
    }
    if json {
        write_json(None, &value)
    } else {
        for (i, t) in tables.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print!("{t}");
        }
        Ok(())
    }
}

fn write_json(output: Option<&Path>, value: &serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}
