use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use yoy_report::analysis::AnalysisRun;
use yoy_report::narrative;
use yoy_report::{ReportConfig, SortKey, YearScope};

#[derive(Parser)]
#[command(name = "yoy-report")]
#[command(about = "Year-over-year comparison of business development exports")]
struct Args {
    /// JSON config file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Inputs {
    /// CSV export for the first year
    #[arg(long)]
    y1: PathBuf,

    /// CSV export for the second year
    #[arg(long)]
    y2: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Full report: overview, every dimension, concentration, top clients
    Report {
        #[command(flatten)]
        inputs: Inputs,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Growth classification for one grouping column
    Dimension {
        #[command(flatten)]
        inputs: Inputs,

        /// Column to group by
        #[arg(short, long)]
        field: String,

        #[arg(long, value_enum, default_value = "growth")]
        sort: SortArg,
    },
    /// Top groups of one column by amount
    Top {
        #[command(flatten)]
        inputs: Inputs,

        #[arg(short, long)]
        field: String,

        /// Number of groups (default: top_n from config)
        #[arg(short, long)]
        n: Option<usize>,

        #[arg(long, value_enum, default_value = "all")]
        scope: ScopeArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Growth,
    Total,
    Label,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Growth => SortKey::AbsGrowthDesc,
            SortArg::Total => SortKey::CombinedTotalDesc,
            SortArg::Label => SortKey::LabelAsc,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Y1,
    Y2,
    All,
}

impl From<ScopeArg> for YearScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Y1 => YearScope::Year1,
            ScopeArg::Y2 => YearScope::Year2,
            ScopeArg::All => YearScope::Combined,
        }
    }
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::Report { inputs, json } => {
            let run = open_run(config, &inputs)?;
            let report = run.full_report()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", narrative::render_full(&report));
            }
        }
        Commands::Dimension { inputs, field, sort } => {
            let run = open_run(config, &inputs)?;
            let mut report = run.dimension_report(&field)?;
            report.records = run.growth_records(&field, sort.into())?;
            println!("{}", narrative::render_dimension(&report));
        }
        Commands::Top { inputs, field, n, scope } => {
            let n = n.unwrap_or(config.top_n);
            let run = open_run(config, &inputs)?;
            for (rank, (label, amount)) in run.top_groups(&field, scope.into(), n)?.iter().enumerate() {
                println!("{:>3}. {:<30} {:>12.1}", rank + 1, label, amount);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ReportConfig> {
    let config = match path {
        Some(p) => {
            info!("Loading config from {:?}", p);
            ReportConfig::load(p).with_context(|| format!("Failed to load config {}", p.display()))?
        }
        None => ReportConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn open_run(config: ReportConfig, inputs: &Inputs) -> Result<AnalysisRun> {
    let bytes_y1 = std::fs::read(&inputs.y1)
        .with_context(|| format!("Failed to read {}", inputs.y1.display()))?;
    let bytes_y2 = std::fs::read(&inputs.y2)
        .with_context(|| format!("Failed to read {}", inputs.y2.display()))?;
    let run = AnalysisRun::from_bytes(config, &bytes_y1, &bytes_y2)?;
    Ok(run)
}
