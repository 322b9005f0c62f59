use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trident_bench_core::baseline::DEFAULT_TOLERANCE;
use trident_bench_core::extract::LogProfile;
use trident_bench_core::orchestrator::TestSelection;
use trident_bench_core::report::TableFormat;
use trident_bench_core::telemetry::{EventRule, DEFAULT_INTERVAL_SECS, DEFAULT_SAMPLE};

#[derive(Parser)]
#[command(
    name = "trident-bench",
    version,
    about = "Launch Trident experiments, extract their logs and plot loading telemetry"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one experiment (1-10) or all of them
    Launch(LaunchArgs),
    /// Summarise the query logs of a results directory
    Extract(ExtractArgs),
    /// Print the comparison tables of experiments 1, 2 and 4
    Report(ReportArgs),
    /// Join several summaries on query name
    Join(JoinArgs),
    /// Compare two summaries on average warm runtime
    Compare(CompareArgs),
    /// Chart CPU, memory and I/O of a monitor log
    Plot(PlotArgs),
    /// Write a sample configuration
    Init(InitArgs),
    Version,
}

#[derive(clap::Args, Clone)]
pub struct LaunchArgs {
    /// YAML configuration file
    pub config: PathBuf,

    /// Experiment number, or `all`
    #[arg(default_value = "all")]
    pub tests: TestSelection,

    /// Print the commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Kill any external command running longer than this
    #[arg(long, env = "TRIDENT_BENCH_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

#[derive(clap::Args, Clone)]
pub struct ExtractArgs {
    /// Directory with `logs_<query>` files
    pub dir: PathBuf,

    /// engine | baseline | legacy
    #[arg(long, default_value = "engine")]
    pub profile: LogProfile,

    /// tsv | json
    #[arg(long, default_value = "tsv")]
    pub format: String,

    /// Write to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(clap::Args, Clone)]
pub struct ReportArgs {
    /// Output root of the launcher (contains test1, test2, test4)
    pub dir: PathBuf,

    /// 1 | 2 | 4 | all
    #[arg(default_value = "all")]
    pub tests: String,

    /// tab | csv | markdown | latex | fixed
    #[arg(long, default_value = "tab")]
    pub format: TableFormat,
}

#[derive(clap::Args, Clone)]
pub struct JoinArgs {
    /// Summary files written by `extract`
    #[arg(required = true)]
    pub summaries: Vec<PathBuf>,

    #[arg(long, default_value = "tab")]
    pub format: TableFormat,
}

#[derive(clap::Args, Clone)]
pub struct CompareArgs {
    pub baseline: PathBuf,
    pub candidate: PathBuf,

    /// Relative slowdown tolerated before a query counts as a regression
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// text | json | tab | csv | markdown | latex | fixed
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Clone)]
pub struct PlotArgs {
    /// Resource monitor log
    pub log: PathBuf,

    /// Prefix of the generated `-usage.svg` and `-io.svg` files
    #[arg(long, default_value = "output")]
    pub out: PathBuf,

    /// Fraction of samples drawn (1 keeps all)
    #[arg(long, default_value_t = DEFAULT_SAMPLE)]
    pub sample: f64,

    /// Seconds between two STATS lines
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval_secs: u64,

    /// Phase marker as `substring=Label`; replaces the built-in list
    #[arg(long = "event")]
    pub events: Vec<EventRule>,
}

#[derive(clap::Args, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "bench.yaml")]
    pub config: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}
