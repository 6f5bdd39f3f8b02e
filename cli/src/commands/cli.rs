use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Jsonl,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "crew", version, about = "Supervised equity research crew")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to load instead of ~/.crew/config.toml or ./config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full crew for one ticker and print the investment memo.
    Analyze(AnalyzeArgs),
    /// List the analyst roles, their dependencies and review criteria.
    Roles(RolesArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Stock ticker, e.g. TSLA. Case and surrounding whitespace are ignored.
    pub ticker: String,

    /// Use offline canned services instead of the chat completions API.
    #[arg(long)]
    pub mock: bool,

    /// Event output format. Overrides `[output].format`.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Revision cycles allowed after the first attempt.
    #[arg(long)]
    pub max_revisions: Option<u32>,

    /// Cap on concurrently running independent analysts.
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Write the JSON report to this path.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Directory with per-role source material (`<dir>/<TICKER>/<role>.md`).
    #[arg(long)]
    pub context_dir: Option<PathBuf>,

    /// Fixed run identifier.
    #[arg(long)]
    pub run_id: Option<String>,

    /// Disable progress bars.
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RolesArgs {
    /// Print the role table as JSON.
    #[arg(long)]
    pub json: bool,
}
