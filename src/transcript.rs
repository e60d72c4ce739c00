use async_trait::async_trait;
use log::{debug, info, warn};

use crate::{Segment, Track, extract_video_id};

/// Preferred transcript language, tried before the default track
pub const PREFERRED_LANGUAGES: &[&str] = &["en"];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranscriptError {
    #[error("invalid YouTube URL format: {0}")]
    InvalidUrl(String),

    #[error("no transcripts available for video {0}")]
    NoTranscriptsAvailable(String),

    #[error("transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("no transcript found for video {video_id} (requested languages: {})", .languages.join(", "))]
    NoTranscriptFound { video_id: String, languages: Vec<String> },

    #[error("transcript service error: {0}")]
    Service(String),
}

impl From<reqwest::Error> for TranscriptError {
    fn from(e: reqwest::Error) -> Self {
        TranscriptError::Service(e.to_string())
    }
}

/// A source of video transcripts
#[async_trait]
pub trait TranscriptService: Send + Sync {
    /// List the caption tracks available for a video
    async fn list_transcripts(&self, video_id: &str) -> Result<Vec<Track>, TranscriptError>;

    /// Fetch a transcript, restricted to `languages` when given, otherwise the default track
    async fn fetch_transcript(&self, video_id: &str, languages: Option<&[&str]>)
    -> Result<Vec<Segment>, TranscriptError>;
}

/// Resolve a URL to its transcript text.
///
/// The English transcript is tried first; if that fails for any reason the
/// default track is fetched once. Segment texts are joined with single spaces.
pub async fn retrieve<S: TranscriptService + ?Sized>(service: &S, url: &str) -> Result<String, TranscriptError> {
    let video_id = extract_video_id(url).ok_or_else(|| TranscriptError::InvalidUrl(url.trim().to_string()))?;
    debug!("Extracted video ID {video_id} from {url}");

    let tracks = service.list_transcripts(&video_id).await?;
    if tracks.is_empty() {
        return Err(TranscriptError::NoTranscriptsAvailable(video_id));
    }
    debug!("{} transcript track(s) listed for {video_id}", tracks.len());

    let segments = match service.fetch_transcript(&video_id, Some(PREFERRED_LANGUAGES)).await {
        Ok(segments) => segments,
        Err(e) => {
            warn!("Preferred transcript unavailable for {video_id}: {e}; falling back to default track");
            service.fetch_transcript(&video_id, None).await?
        }
    };

    info!("Fetched {} transcript segments for {video_id}", segments.len());
    let text = join_segments(&segments);
    if text.trim().is_empty() {
        return Err(TranscriptError::Service(format!("transcript for video {video_id} is empty")));
    }
    Ok(text)
}

/// Join segment texts in order, separated by single spaces
pub fn join_segments(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ")
}
