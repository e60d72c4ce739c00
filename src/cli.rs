use clap::Parser;
use std::path::PathBuf;

use ytsum::output::ExportFormat;

#[derive(Parser)]
#[command(
    name = "ytsum",
    about = "Summarize YouTube videos from their transcripts",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// YouTube video URL (prompts interactively if omitted)
    pub url: Option<String>,

    /// Export the summary after a single-URL run (repeatable): txt, md
    #[arg(short, long, value_enum)]
    pub export: Vec<ExportFormat>,

    /// Directory for exported summaries
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Timeout in seconds for each transcript or Gemini request
    #[arg(long)]
    pub timeout: Option<u64>,

    /// List the Gemini models visible to the API key and exit
    #[arg(long)]
    pub list_models: bool,

    /// Show configuration and diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,
}
