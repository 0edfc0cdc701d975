use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "DynoMSM CLI - Markov-model analysis of dynophore trajectories from molecular dynamics simulations.",
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
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discretize a dynophore trajectory and fit a Markov model over the states.
    Fit(FitArgs),
    /// Print a summary of a dynophore trajectory file without fitting anything.
    Inspect(InspectArgs),
}

/// The model kinds selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelArg {
    /// Discrete Markov chain estimated from transition counts.
    MarkovChain,
    /// Gaussian-observation hidden Markov model refined with Baum-Welch.
    HiddenMarkov,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountModeArg {
    /// Count overlapping transition pairs, advancing one frame at a time.
    Sliding,
    /// Count independent pairs, advancing one lag time at a time.
    Strided,
}

/// Arguments for the `fit` subcommand.
#[derive(Args, Debug)]
pub struct FitArgs {
    /// Path to the input time-series file (.json or .csv).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory for the output artifacts (state sequence, matrices, summary).
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Discretization overrides ---
    /// Override the number of discrete states (k-means cluster count).
    #[arg(short = 'n', long, value_name = "INT")]
    pub num_states: Option<usize>,

    /// Project onto this many principal components before clustering.
    #[arg(long, value_name = "INT")]
    pub projection_dims: Option<usize>,

    /// Override the RNG seed for the k-means++ initialization.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    // --- Estimation overrides ---
    /// Override the model kind fitted over the discretized states.
    #[arg(short, long, value_enum, value_name = "KIND")]
    pub model: Option<ModelArg>,

    /// Override the lag time (in frames) for transition counting.
    #[arg(short, long, value_name = "INT")]
    pub lag_time: Option<usize>,

    /// Override the transition counting mode.
    #[arg(long, value_enum, value_name = "MODE")]
    pub count_mode: Option<CountModeArg>,

    /// Drop the detailed-balance constraint from the maximum-likelihood fit.
    #[arg(long)]
    pub non_reversible: bool,

    /// Keep the original state labels instead of sorting by metastability.
    #[arg(long)]
    pub no_sort: bool,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the input time-series file (.json or .csv).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,
}
