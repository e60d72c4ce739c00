use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::transcript::{TranscriptError, TranscriptService};
use crate::{Segment, Track};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    name: Option<TrackName>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackName {
    #[serde(rename = "simpleText")]
    simple_text: Option<String>,
    runs: Option<Vec<TextRun>>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

/// Caption client backed by YouTube's InnerTube player API
pub struct InnerTube {
    client: reqwest::Client,
}

impl InnerTube {
    pub fn new(timeout: Duration) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn player_response(&self, video_id: &str) -> Result<InnerTubePlayerResponse, TranscriptError> {
        // Step 1: Fetch the watch page to get the InnerTube API key
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        debug!("Fetching watch page: {watch_url}");

        let page_html = self
            .client
            .get(&watch_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        // Step 2: Call InnerTube player endpoint
        let player_url = format!("https://www.youtube.com/youtubei/v1/player?key={api_key}&prettyPrint=false");

        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": "20.10.38"
                }
            },
            "videoId": video_id
        });

        let resp: InnerTubePlayerResponse = self
            .client
            .post(&player_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp)
    }
}

#[async_trait]
impl TranscriptService for InnerTube {
    async fn list_transcripts(&self, video_id: &str) -> Result<Vec<Track>, TranscriptError> {
        let resp = self.player_response(video_id).await?;
        let tracks = parse_tracks(video_id, resp)?;
        debug!(
            "Caption tracks for {video_id}: {:?}",
            tracks.iter().map(|t| t.language_code.as_str()).collect::<Vec<_>>()
        );
        Ok(tracks)
    }

    async fn fetch_transcript(
        &self,
        video_id: &str,
        languages: Option<&[&str]>,
    ) -> Result<Vec<Segment>, TranscriptError> {
        let tracks = self.list_transcripts(video_id).await?;

        let track = select_track(&tracks, languages).ok_or_else(|| TranscriptError::NoTranscriptFound {
            video_id: video_id.to_string(),
            languages: languages
                .unwrap_or_default()
                .iter()
                .map(|l| l.to_string())
                .collect(),
        })?;
        debug!(
            "Using caption track: {} (lang={} generated={})",
            track.language, track.language_code, track.is_generated
        );

        // Step 3: Fetch the caption XML
        let caption_xml = self
            .client
            .get(&track.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_caption_xml(&caption_xml)
    }
}

fn extract_api_key(html: &str) -> Result<String, TranscriptError> {
    let patterns = [r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#, r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#];

    for pattern in patterns {
        let re = Regex::new(pattern).map_err(|e| TranscriptError::Service(e.to_string()))?;
        if let Some(caps) = re.captures(html) {
            return Ok(caps[1].to_string());
        }
    }

    if html.contains("g-recaptcha") {
        return Err(TranscriptError::Service(
            "YouTube is blocking requests from this IP (captcha challenge)".to_string(),
        ));
    }

    Err(TranscriptError::Service(
        "could not extract InnerTube API key from watch page".to_string(),
    ))
}

fn parse_tracks(video_id: &str, resp: InnerTubePlayerResponse) -> Result<Vec<Track>, TranscriptError> {
    if let Some(status) = resp.playability_status {
        let state = status.status.unwrap_or_default();
        if !state.is_empty() && state != "OK" {
            let reason = status.reason.unwrap_or_else(|| state.clone());
            return Err(TranscriptError::Service(format!("video {video_id} is unplayable: {reason}")));
        }
    }

    let renderer = resp
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .ok_or_else(|| TranscriptError::TranscriptsDisabled(video_id.to_string()))?;

    let tracks = renderer
        .caption_tracks
        .unwrap_or_default()
        .into_iter()
        .map(|t| {
            let language = t
                .name
                .and_then(|n| n.simple_text.or_else(|| n.runs.and_then(|r| r.into_iter().next()).map(|r| r.text)))
                .unwrap_or_else(|| t.language_code.clone());
            Track {
                base_url: t.base_url.replace("&fmt=srv3", ""),
                is_generated: t.kind.as_deref() == Some("asr"),
                language_code: t.language_code,
                language,
            }
        })
        .collect();

    Ok(tracks)
}

/// Pick a caption track.
///
/// With languages, the first requested code wins, manual tracks before
/// auto-generated ones. Without, the first manual track, else the first track.
fn select_track<'a>(tracks: &'a [Track], languages: Option<&[&str]>) -> Option<&'a Track> {
    match languages {
        Some(codes) => codes.iter().find_map(|code| {
            tracks
                .iter()
                .find(|t| t.language_code == *code && !t.is_generated)
                .or_else(|| tracks.iter().find(|t| t.language_code == *code))
        }),
        None => tracks.iter().find(|t| !t.is_generated).or_else(|| tracks.first()),
    }
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>, TranscriptError> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current_start: Option<f64> = None;
    let mut current_dur: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"start" => {
                            start = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        b"dur" => {
                            dur = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        _ => {}
                    }
                }
                current_start = start;
                current_dur = Some(dur.unwrap_or(0.0));
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(start), Some(duration)) = (current_start.take(), current_dur.take()) {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let text = html_escape::decode_html_entities(&raw_text).trim().to_string();
                    if !text.is_empty() {
                        segments.push(Segment { text, start, duration });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(TranscriptError::Service(format!("error parsing caption XML: {e}"))),
            _ => {}
        }
    }

    Ok(segments)
}
