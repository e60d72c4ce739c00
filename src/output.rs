use std::path::{Path, PathBuf};

use eyre::Result;
use log::info;
use serde::{Deserialize, Serialize};

const MARKDOWN_TITLE: &str = "YouTube Summary";

/// Encodings a summary can be exported as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Txt,
    Md,
}

impl ExportFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Txt => "youtube_summary.txt",
            ExportFormat::Md => "youtube_summary.md",
        }
    }

    pub fn render(self, summary: &str) -> String {
        match self {
            ExportFormat::Txt => summary.to_string(),
            ExportFormat::Md => format!("# {MARKDOWN_TITLE}\n\n{summary}"),
        }
    }

    /// Parse an answer to the download prompt
    pub fn parse_choice(answer: &str) -> Option<Vec<ExportFormat>> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "txt" | "t" => Some(vec![ExportFormat::Txt]),
            "md" | "m" => Some(vec![ExportFormat::Md]),
            "both" | "b" => Some(vec![ExportFormat::Txt, ExportFormat::Md]),
            "" | "none" | "n" | "skip" => Some(vec![]),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Txt => write!(f, "txt"),
            ExportFormat::Md => write!(f, "md"),
        }
    }
}

/// Write the summary into `dir` in the given format, returning the file path
pub fn export(dir: &Path, format: ExportFormat, summary: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format.file_name());
    std::fs::write(&path, format.render(summary))?;
    info!("Exported {format} summary to {}", path.display());
    Ok(path)
}
