//! HumorBench CLI: segment annotated transcripts, perturb jokes, render
//! prompts and score model transcripts.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// HumorBench: robustness toolkit for humor-understanding benchmarks
#[derive(Parser, Debug)]
#[command(name = "humorbench", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Group a line-annotated transcript TSV into one row per joke
    Segment {
        /// Line-level TSV with Video #, Joke, Task 1 Label and Task 2 Label
        #[arg(short, long)]
        input: PathBuf,
        /// Joke-level TSV to write
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write perturbed copies of a joke dataset
    Perturb {
        /// Joke-level TSV with Joke, Task1 Label and Task2 Label
        #[arg(short, long)]
        input: PathBuf,
        /// Directory receiving one TSV per perturbation plus metadata.json
        #[arg(short, long)]
        out_dir: PathBuf,
        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        /// Synonym language (eng, spa)
        #[arg(long)]
        lang: Option<String>,
        /// Skip the cultural reference shift
        #[arg(long)]
        no_cultural: bool,
        /// JSON lexical database for synonym substitution
        #[arg(long)]
        lexicon: Option<PathBuf>,
        /// Task 2 role whose lines are perturbed
        #[arg(long)]
        target_role: Option<String>,
    },
    /// Render evaluation prompts for every joke
    Prompts {
        /// Joke TSV, original or perturbed
        #[arg(short, long)]
        input: PathBuf,
        /// Directory for the prompt files
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Column holding the joke text (auto-detected when omitted)
        #[arg(long)]
        joke_column: Option<String>,
        /// Task to render; repeat for both (default: both)
        #[arg(long = "task", value_parser = clap::value_parser!(u8).range(1..=2))]
        tasks: Vec<u8>,
    },
    /// Score model transcripts with pass@k
    Eval {
        /// Evaluation source as NAME,DATASET_TSV,COMPLETIONS_DIR; repeat to
        /// score several datasets as one question set
        #[arg(short, long = "source", required = true)]
        sources: Vec<String>,
        /// Models to evaluate (default: eval.models from config)
        #[arg(short, long = "model", value_delimiter = ',')]
        models: Vec<String>,
        /// Joke column of the datasets when not `Joke`
        #[arg(long)]
        joke_column: Option<String>,
        /// Prefix of the results CSVs
        #[arg(long, default_value = "results")]
        out_prefix: PathBuf,
        /// Directory for confusion matrices
        #[arg(long, default_value = "confusion_matrices")]
        confusion_dir: PathBuf,
        /// Values of k to report
        #[arg(short, long = "k", value_delimiter = ',')]
        ks: Vec<usize>,
        /// Maximum number of runs per model
        #[arg(long)]
        max_runs: Option<usize>,
        /// Exact vocabulary and alias matches only
        #[arg(long)]
        strict: bool,
        /// One observation per unit for F1 and AUC
        #[arg(long)]
        per_unit: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file in the workspace
    Init,
    /// Show the current configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr (always active)
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("org", "humorbench", "humorbench")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "humorbench.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    // Resolve workspace
    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    // Handle subcommand
    commands::handle_command(cli.command, &workspace)
}
