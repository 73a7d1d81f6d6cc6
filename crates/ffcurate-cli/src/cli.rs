use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "ffcurate - coverage-driven parameter selection and QM-vs-MM benchmarking for molecular-mechanics force fields.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Label every record with the parameters and patterns that apply to it.
    Label(LabelArgs),
    /// Select the parameters covered by enough records in a training set.
    Select(SelectArgs),
    /// Score candidate force-field conformers against reference conformers.
    Benchmark(BenchmarkArgs),
    /// Compare one parameter's geometry between reference and candidate conformers.
    Compare(CompareArgs),
}

/// Options shared by every subcommand that reads a configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of items per output batch, overriding the config file.
    #[arg(short = 'b', long, value_name = "INT")]
    pub batch_size: Option<usize>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S curation.min-coverage=10
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Labeling options shared by `label` and `select`.
#[derive(Args, Debug, Clone, Default)]
pub struct LabelingArgs {
    /// Path to the record set (JSON).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub records: PathBuf,

    /// Path to the precomputed labeling table (JSON).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub labels: PathBuf,

    /// Restrict labeling to these categories (e.g. Bonds, ProperTorsions).
    /// Can be used multiple times.
    #[arg(long = "category", value_name = "NAME")]
    pub categories: Vec<String>,

    /// File listing torsion ids that are kept even when fully inside a ring.
    #[arg(long, value_name = "PATH")]
    pub ring_torsions: Option<PathBuf>,

    /// Skip the auxiliary ring and sulfur pattern catalogue.
    #[arg(long)]
    pub no_auxiliary: bool,
}

/// Arguments for the `label` subcommand.
#[derive(Args, Debug, Clone)]
pub struct LabelArgs {
    #[command(flatten)]
    pub labeling: LabelingArgs,

    /// Output directory for the batch files. Existing batches are resumed.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the `select` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SelectArgs {
    #[command(flatten)]
    pub labeling: LabelingArgs,

    /// Path to the force-field parameter definitions (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub definitions: PathBuf,

    /// Minimum number of records a parameter must cover to be selected.
    #[arg(short, long, value_name = "INT", allow_negative_numbers = true)]
    pub min_coverage: Option<i64>,

    /// Keep at most this many sample records per parameter.
    #[arg(long, value_name = "INT")]
    pub sample_limit: Option<usize>,

    /// Output path for the selected patterns (JSON).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the `benchmark` subcommand.
#[derive(Args, Debug, Clone)]
pub struct BenchmarkArgs {
    /// Path to the conformer set (JSON).
    #[arg(short = 'i', long, required = true, value_name = "PATH")]
    pub conformers: PathBuf,

    /// Optional labeling table; when given, entries carry their molecule's tags.
    #[arg(short, long, value_name = "PATH")]
    pub labels: Option<PathBuf>,

    /// Name of the candidate force field to score.
    /// Required when the conformer set holds more than one.
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,

    /// All-atom RMSD (Angstroms) above which pairs leave the filtered scores.
    #[arg(long, value_name = "FLOAT")]
    pub rmsd_threshold: Option<f64>,

    /// Output directory for the batch files. Existing batches are resumed.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the `compare` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// Path to the conformer set (JSON).
    #[arg(short = 'i', long, required = true, value_name = "PATH")]
    pub conformers: PathBuf,

    /// Path to the precomputed labeling table (JSON).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub labels: PathBuf,

    /// Path to the force-field parameter definitions (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub definitions: PathBuf,

    /// Parameter id to compare (e.g. b12, t17, or an auxiliary id such as r4).
    #[arg(short, long, required = true, value_name = "ID")]
    pub parameter_id: String,

    /// Name of the candidate force field.
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,

    /// Output directory for the batch files. Existing batches are resumed.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}
