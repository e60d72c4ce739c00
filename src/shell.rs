use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::output::ExportFormat;
use crate::summarize::{self, GenerationService, SummaryError};
use crate::transcript::{self, TranscriptError, TranscriptService};

const QUIT_WORDS: &[&str] = &["quit", "exit", "q"];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunError {
    #[error("no URL provided")]
    EmptyUrl,

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Summary(#[from] SummaryError),
}

impl RunError {
    /// Short notice shown to the user
    pub fn notice(&self) -> String {
        match self {
            RunError::EmptyUrl => "Please enter a YouTube URL".to_string(),
            RunError::Transcript(e) => match e {
                TranscriptError::InvalidUrl(_) => "Invalid YouTube URL format".to_string(),
                TranscriptError::NoTranscriptsAvailable(_) => "No transcripts available for this video".to_string(),
                TranscriptError::TranscriptsDisabled(_) => "Transcripts are disabled for this video".to_string(),
                TranscriptError::NoTranscriptFound { .. } => "No transcripts found for this video".to_string(),
                TranscriptError::Service(msg) => format!("Error: {msg}"),
            },
            RunError::Summary(e) => format!(
                "Generation failed: {e}\nFailed to generate summary. Please try a different video or check your API key permissions."
            ),
        }
    }
}

/// Runs URL → transcript → summary → export, one request at a time
pub struct Shell<'a, T: ?Sized, G: ?Sized> {
    transcripts: &'a T,
    generator: &'a G,
    model_candidates: Vec<String>,
    output_dir: PathBuf,
    export: Vec<ExportFormat>,
    spinners: bool,
}

impl<'a, T, G> Shell<'a, T, G>
where
    T: TranscriptService + ?Sized,
    G: GenerationService + ?Sized,
{
    pub fn new(transcripts: &'a T, generator: &'a G, model_candidates: Vec<String>) -> Self {
        Self {
            transcripts,
            generator,
            model_candidates,
            output_dir: PathBuf::from("."),
            export: Vec::new(),
            spinners: false,
        }
    }

    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Formats written automatically after a single-URL run
    pub fn export(mut self, formats: Vec<ExportFormat>) -> Self {
        self.export = formats;
        self
    }

    pub fn spinners(mut self, enabled: bool) -> Self {
        self.spinners = enabled;
        self
    }

    /// Fetch the transcript and summarize it
    pub async fn summarize_url(&self, url: &str) -> Result<String, RunError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(RunError::EmptyUrl);
        }

        let pb = self.spinner("Extracting transcript...");
        let result = transcript::retrieve(self.transcripts, url).await;
        pb.finish_and_clear();
        let text = result?;

        let pb = self.spinner("Generating summary (this may take a minute)...");
        let result = summarize::summarize(self.generator, self.model_candidates.as_slice(), &text).await;
        pb.finish_and_clear();
        Ok(result?)
    }

    /// Process one URL, printing the summary or a notice. Returns the summary on success.
    pub async fn process<W: Write>(&self, url: &str, out: &mut W) -> Result<Option<String>> {
        match self.summarize_url(url).await {
            Ok(summary) => {
                info!("Summary generated for {}", url.trim());
                writeln!(out, "Summary generated successfully!")?;
                writeln!(out, "---")?;
                writeln!(out, "Summary\n")?;
                writeln!(out, "{summary}")?;
                writeln!(out, "---")?;
                Ok(Some(summary))
            }
            Err(e) => {
                warn!("Request for {:?} failed: {e}", url.trim());
                writeln!(out, "{}", e.notice())?;
                Ok(None)
            }
        }
    }

    /// Single-URL mode: summarize and write the configured exports
    pub async fn run_once<W: Write>(&self, url: &str, out: &mut W) -> Result<Option<String>> {
        let Some(summary) = self.process(url, out).await? else {
            return Ok(None);
        };
        self.write_exports(&self.export, &summary, out)?;
        Ok(Some(summary))
    }

    /// Prompt for URLs until EOF or a quit word, offering downloads after each summary
    pub async fn run_interactive<R: BufRead, W: Write>(&self, mut input: R, out: &mut W) -> Result<()> {
        loop {
            write!(out, "Enter YouTube URL: ")?;
            out.flush()?;

            let Some(line) = read_line(&mut input)? else {
                break;
            };
            if QUIT_WORDS.contains(&line.as_str()) {
                break;
            }

            let Some(summary) = self.process(&line, out).await? else {
                continue;
            };

            let formats = loop {
                write!(out, "Download as [txt/md/both/none]: ")?;
                out.flush()?;
                let Some(answer) = read_line(&mut input)? else {
                    return Ok(());
                };
                match ExportFormat::parse_choice(&answer) {
                    Some(formats) => break formats,
                    None => writeln!(out, "Please answer txt, md, both or none")?,
                }
            };
            self.write_exports(&formats, &summary, out)?;
        }
        Ok(())
    }

    fn write_exports<W: Write>(&self, formats: &[ExportFormat], summary: &str, out: &mut W) -> Result<()> {
        for &format in formats {
            match crate::output::export(&self.output_dir, format, summary) {
                Ok(path) => writeln!(out, "Saved {}", path.display())?,
                Err(e) => {
                    warn!("Export of {format} to {} failed: {e}", self.output_dir.display());
                    writeln!(out, "Could not save {}: {e}", format.file_name())?;
                }
            }
        }
        Ok(())
    }

    fn spinner(&self, msg: &str) -> ProgressBar {
        if !self.spinners {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
