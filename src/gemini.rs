use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use eyre::{Result, bail};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::summarize::{GenerateRequest, GenerationConfig, GenerationService, Model, SafetySetting};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody<'a> {
    contents: Vec<Content<'a>>,
    safety_settings: &'a [SafetySetting],
    generation_config: &'a GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

/// Client for the Gemini `generativelanguage` REST API
pub struct Gemini {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl Gemini {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(api_key, timeout, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: Option<String>, timeout: Duration, base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) => Ok(key),
            None => bail!("{API_KEY_ENV} is not set"),
        }
    }

    /// List every model visible to the configured credentials
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let api_key = self.api_key()?;
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let mut req = self
                .client
                .get(format!("{}/v1beta/models", self.base_url))
                .header("x-goog-api-key", api_key);
            if let Some(ref token) = page_token {
                req = req.query(&[("pageToken", token)]);
            }

            let resp = req.send().await?;
            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                bail!("Gemini API returned {status}: {body}");
            }

            let page: ModelList = resp.json().await?;
            names.extend(page.models.into_iter().map(|m| m.name));
            page_token = next_page_token(&mut seen_tokens, page.next_page_token);
            if page_token.is_none() {
                break;
            }
        }

        Ok(names)
    }
}

#[async_trait]
impl GenerationService for Gemini {
    fn check_credentials(&self) -> Result<()> {
        self.api_key().map(|_| ())
    }

    async fn model(&self, name: &str) -> Result<Model> {
        let api_key = self.api_key()?;
        let name = qualified_model_name(name);
        debug!("Checking model {name}");

        let resp = self
            .client
            .get(format!("{}/v1beta/{name}", self.base_url))
            .header("x-goog-api-key", api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("model {name} rejected ({status}): {body}");
        }

        Ok(Model { name })
    }

    async fn generate(&self, model: &Model, request: &GenerateRequest) -> Result<String> {
        let api_key = self.api_key()?;
        debug!("Generating content via Gemini API with model {}", model.name);

        let body = GenerateContentBody {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &request.prompt }],
            }],
            safety_settings: &request.safety_settings,
            generation_config: &request.generation_config,
        };

        let resp = self
            .client
            .post(format!("{}/v1beta/{}:generateContent", self.base_url, model.name))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Gemini API returned {status}: {body}");
        }

        let json: GenerateContentResponse = resp.json().await?;
        extract_text(json)
    }
}

/// The next page to request, or `None` when paging is done or the token repeats
fn next_page_token(seen: &mut HashSet<String>, token: Option<String>) -> Option<String> {
    let token = token.filter(|t| !t.is_empty())?;
    if !seen.insert(token.clone()) {
        warn!("Model listing returned page token {token:?} twice; stopping");
        return None;
    }
    Some(token)
}

/// Model resource names are `models/<id>`; bare ids get the prefix
fn qualified_model_name(name: &str) -> String {
    if name.starts_with("models/") || name.starts_with("tunedModels/") {
        name.to_string()
    } else {
        format!("models/{name}")
    }
}

fn extract_text(resp: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        bail!("prompt was blocked by safety filters ({reason})");
    }

    let Some(candidate) = resp.candidates.into_iter().next() else {
        bail!("response contained no candidates");
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        bail!("response contained no text (finish reason: {reason})");
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_next_page_token_stops_on_repeat() {
        let mut seen = HashSet::new();
        assert_eq!(next_page_token(&mut seen, Some("p2".to_string())), Some("p2".to_string()));
        assert_eq!(next_page_token(&mut seen, Some("p3".to_string())), Some("p3".to_string()));
        assert_eq!(next_page_token(&mut seen, Some("p2".to_string())), None);
    }

    #[test]
    fn test_next_page_token_end() {
        let mut seen = HashSet::new();
        assert_eq!(next_page_token(&mut seen, None), None);
        assert_eq!(next_page_token(&mut seen, Some(String::new())), None);
    }

    #[test]
    fn test_qualified_model_name() {
        assert_eq!(qualified_model_name("gemini-pro"), "models/gemini-pro");
        assert_eq!(qualified_model_name("models/gemini-pro"), "models/gemini-pro");
        assert_eq!(qualified_model_name("tunedModels/mine"), "tunedModels/mine");
    }

    #[test]
    fn test_extract_text() {
        let resp = response(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "## Summary\n"}, {"text": "Points."}]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(extract_text(resp).unwrap(), "## Summary\nPoints.");
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let resp = response(serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        let err = extract_text(resp).unwrap_err();
        assert_eq!(err.to_string(), "prompt was blocked by safety filters (SAFETY)");
    }

    #[test]
    fn test_extract_text_no_candidates() {
        let resp = response(serde_json::json!({}));
        assert!(extract_text(resp).is_err());
    }

    #[test]
    fn test_extract_text_safety_finish() {
        let resp = response(serde_json::json!({"candidates": [{"finishReason": "SAFETY"}]}));
        let err = extract_text(resp).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_request_body_json() {
        let request = GenerateRequest::summary("A B");
        let body = GenerateContentBody {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &request.prompt }],
            }],
            safety_settings: &request.safety_settings,
            generation_config: &request.generation_config,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], request.prompt.as_str());
        assert_eq!(json["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let gemini = Gemini::new(None, Duration::from_secs(1)).unwrap();
        let err = gemini.model("gemini-pro").await.unwrap_err();
        assert_eq!(err.to_string(), "GOOGLE_API_KEY is not set");
        assert!(gemini.list_models().await.is_err());
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let gemini = Gemini::new(Some("  ".to_string()), Duration::from_secs(1)).unwrap();
        assert!(gemini.api_key().is_err());
        assert_eq!(
            gemini.check_credentials().unwrap_err().to_string(),
            "GOOGLE_API_KEY is not set"
        );

        let keyed = Gemini::new(Some("key".to_string()), Duration::from_secs(1)).unwrap();
        assert!(keyed.check_credentials().is_ok());
    }
}
