//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use paperscout_core::SearchMode;

#[derive(Parser)]
#[command(name = "paperscout")]
#[command(
    author,
    version,
    about = "Retrieval-augmented search over the ACL Anthology paper corpus"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the paper corpus (free text or a paper ID)
    Search(SearchArgs),

    /// Look up a single paper by ID
    Paper(PaperArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output
    Cli,
    /// JSON output
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Semantic,
    FilterOnly,
    Hybrid,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Semantic => SearchMode::Semantic,
            ModeArg::FilterOnly => SearchMode::FilterOnly,
            ModeArg::Hybrid => SearchMode::Hybrid,
        }
    }
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search query or paper ID (e.g. "2023.acl-long.412" or "W99-0512")
    pub query: Vec<String>,

    /// Number of results
    #[arg(short = 'n', long = "top-k", default_value = "5")]
    pub top_k: usize,

    /// Search mode
    #[arg(long, value_enum, default_value = "hybrid")]
    pub mode: ModeArg,

    /// Stream the synthesized answer as it is generated
    #[arg(long)]
    pub stream: bool,

    /// Disable automatic filter extraction from the query
    #[arg(long)]
    pub no_parse_filters: bool,

    /// Exact publication year
    #[arg(long)]
    pub year: Option<i32>,

    /// Earliest publication year (inclusive)
    #[arg(long, conflicts_with = "year")]
    pub from_year: Option<i32>,

    /// Latest publication year (inclusive)
    #[arg(long, conflicts_with = "year")]
    pub to_year: Option<i32>,

    /// Author name fragment (repeatable)
    #[arg(long = "author")]
    pub authors: Vec<String>,

    /// Required title keyword (repeatable)
    #[arg(long = "keyword")]
    pub title_keywords: Vec<String>,

    /// Language code
    #[arg(long)]
    pub language: Option<String>,

    /// Exact bibkey
    #[arg(long)]
    pub bibkey: Option<String>,

    /// Only papers that won an award
    #[arg(long)]
    pub awarded: bool,

    /// Specific award name (repeatable)
    #[arg(long = "award")]
    pub awards: Vec<String>,
}

#[derive(Args)]
pub struct PaperArgs {
    /// Paper ID in current or legacy format
    pub paper_id: String,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the active configuration
    Show,
    /// Write a default configuration file
    Init,
    /// Print the configuration file path
    Path,
}
