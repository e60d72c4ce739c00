pub mod config;
pub mod gemini;
pub mod output;
pub mod shell;
pub mod summarize;
pub mod transcript;
pub mod youtube;

use url::Url;

/// A single captioned segment
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// A caption track listed for a video
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub language_code: String,
    pub language: String,
    pub is_generated: bool,
    pub base_url: String,
}

/// Extract the video ID from a YouTube URL.
///
/// Recognizes `youtu.be/ID`, `youtube.com/watch?v=ID`, `youtube.com/embed/ID`
/// and `youtube.com/v/ID`. Anything else, including unparsable input, yields `None`.
pub fn extract_video_id(input: &str) -> Option<String> {
    let url = Url::parse(input.trim()).ok()?;
    let path = url.path();

    let id = match url.host_str()? {
        "youtu.be" => path.trim_start_matches('/').split('/').next()?.to_string(),
        "www.youtube.com" | "youtube.com" => {
            if path == "/watch" {
                url.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned())?
            } else if let Some(rest) = path.strip_prefix("/embed/").or_else(|| path.strip_prefix("/v/")) {
                rest.split('/').next()?.to_string()
            } else {
                return None;
            }
        }
        _ => return None,
    };

    if id.is_empty() { None } else { Some(id) }
}
