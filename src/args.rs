use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "wordshot",
    about = "Extract words from screenshots and analyze their frequency",
    version,
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract recognized words from screenshots
    Words(WordsArgs),

    /// Compute word-frequency statistics and persist them as JSON
    Frequency(FrequencyArgs),

    /// Run the health-check HTTP server
    Serve(ServeArgs),

    /// Ping a running health-check server
    Healthcheck(HealthcheckArgs),
}

#[derive(Args, Debug)]
pub struct WordsArgs {
    /// Screenshot file or directory of screenshots
    #[arg(short, long)]
    pub file: PathBuf,

    /// Write recognized words to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// OCR language
    #[arg(short, long, default_value = "eng")]
    pub language: String,

    /// Number of worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,
}

#[derive(Args, Debug)]
pub struct FrequencyArgs {
    /// Text file, screenshot file or directory of screenshots to analyze
    #[arg(short, long)]
    pub file: PathBuf,

    /// Directory to write the `<id>.json` result into
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// Label prepended to the analysis identifier
    #[arg(short, long)]
    pub label: Option<String>,

    /// Number of most frequent words to display
    #[arg(short, long)]
    pub top: Option<usize>,

    /// OCR language, used when the input is a screenshot source
    #[arg(long, default_value = "eng")]
    pub language: String,

    /// Number of worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to the API config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct HealthcheckArgs {
    /// Path to the API config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    pub timeout: u64,
}
