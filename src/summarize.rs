use async_trait::async_trait;
use eyre::Result;
use log::{debug, info, warn};
use serde::Serialize;

/// Model names tried in order until the service accepts one
pub const DEFAULT_MODEL_CANDIDATES: &[&str] = &["gemini-1.5-pro-latest", "gemini-pro", "models/gemini-pro"];

const PROMPT_TEMPLATE: &str = "
Please analyze the following YouTube video transcript and provide a concise summary with:
1. Main topic and purpose (1-2 sentences)
2. 3-5 key points (as bullet points)
3. Any important facts, figures, or statistics mentioned
4. Overall conclusions or takeaways

Guidelines:
- Keep summary under 250 words
- Use neutral, academic tone
- Focus on factual content only
- Format with clear section headings

Transcript:
{transcript}
";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SummaryError {
    #[error("could not load any model. Last error: {last_error}")]
    ModelUnavailable { last_error: String },

    #[error("{0}")]
    GenerationFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockThreshold {
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: BlockThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 2048,
        }
    }
}

/// A model the generation service accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub name: String,
}

/// One generation call: prompt plus the safety and sampling settings
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub safety_settings: Vec<SafetySetting>,
    pub generation_config: GenerationConfig,
}

impl GenerateRequest {
    /// Request for summarizing `transcript` with the fixed summary settings
    pub fn summary(transcript: &str) -> Self {
        Self {
            prompt: render_prompt(transcript),
            safety_settings: default_safety_settings(),
            generation_config: GenerationConfig::default(),
        }
    }
}

/// A hosted text-generation backend
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Fails when the service cannot be called at all, e.g. no credential
    fn check_credentials(&self) -> Result<()> {
        Ok(())
    }

    /// Resolve a model by name; errors if the service rejects it
    async fn model(&self, name: &str) -> Result<Model>;

    async fn generate(&self, model: &Model, request: &GenerateRequest) -> Result<String>;
}

pub fn default_safety_settings() -> Vec<SafetySetting> {
    [
        HarmCategory::Harassment,
        HarmCategory::HateSpeech,
        HarmCategory::SexuallyExplicit,
        HarmCategory::DangerousContent,
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: BlockThreshold::BlockOnlyHigh,
    })
    .collect()
}

/// Substitute the whole transcript into the prompt template
pub fn render_prompt(transcript: &str) -> String {
    PROMPT_TEMPLATE.replace("{transcript}", transcript)
}

/// Return the first candidate model the service accepts
pub async fn select_model<G, S>(service: &G, candidates: &[S]) -> Result<Model, SummaryError>
where
    G: GenerationService + ?Sized,
    S: AsRef<str>,
{
    let mut last_error = "no model candidates configured".to_string();

    for name in candidates {
        let name = name.as_ref();
        match service.model(name).await {
            Ok(model) => {
                debug!("Using model {}", model.name);
                return Ok(model);
            }
            Err(e) => {
                warn!("Model {name} rejected: {e}");
                last_error = e.to_string();
            }
        }
    }

    Err(SummaryError::ModelUnavailable { last_error })
}

/// Summarize a transcript with the first available candidate model
pub async fn summarize<G, S>(service: &G, candidates: &[S], transcript: &str) -> Result<String, SummaryError>
where
    G: GenerationService + ?Sized,
    S: AsRef<str>,
{
    service
        .check_credentials()
        .map_err(|e| SummaryError::GenerationFailed(e.to_string()))?;

    let model = select_model(service, candidates).await?;
    let request = GenerateRequest::summary(transcript);
    debug!("Prompt is {} chars", request.prompt.len());

    let text = service
        .generate(&model, &request)
        .await
        .map_err(|e| SummaryError::GenerationFailed(e.to_string()))?;

    info!("Generated {} chars of summary with {}", text.len(), model.name);
    Ok(text)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use eyre::bail;

    use super::*;

    /// Accepts only the listed model names and echoes the prompt back
    pub(crate) struct EchoGenerator {
        pub accepted: Vec<String>,
        pub fail_generation: bool,
        pub missing_key: bool,
        pub tried: Mutex<Vec<String>>,
        pub requests: Mutex<Vec<(Model, GenerateRequest)>>,
    }

    impl EchoGenerator {
        pub(crate) fn accepting(names: &[&str]) -> Self {
            Self {
                accepted: names.iter().map(|s| s.to_string()).collect(),
                fail_generation: false,
                missing_key: false,
                tried: Mutex::new(Vec::new()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerationService for EchoGenerator {
        fn check_credentials(&self) -> Result<()> {
            if self.missing_key {
                bail!("GOOGLE_API_KEY is not set");
            }
            Ok(())
        }

        async fn model(&self, name: &str) -> Result<Model> {
            self.tried.lock().unwrap().push(name.to_string());
            if self.accepted.iter().any(|a| a == name) {
                Ok(Model { name: name.to_string() })
            } else {
                bail!("404 model {name} not found")
            }
        }

        async fn generate(&self, model: &Model, request: &GenerateRequest) -> Result<String> {
            self.requests.lock().unwrap().push((model.clone(), request.clone()));
            if self.fail_generation {
                bail!("quota exceeded");
            }
            Ok(request.prompt.clone())
        }
    }

    #[test]
    fn test_render_prompt() {
        let prompt = render_prompt("A B");
        assert!(prompt.ends_with("Transcript:\nA B\n"));
        assert!(prompt.contains("Keep summary under 250 words"));
        assert!(!prompt.contains("{transcript}"));
    }

    #[test]
    fn test_render_prompt_keeps_full_transcript() {
        let long = "word ".repeat(50_000);
        assert!(render_prompt(&long).contains(&long));
    }

    #[test]
    fn test_default_safety_settings() {
        let settings = default_safety_settings();
        assert_eq!(settings.len(), 4);
        assert!(settings.iter().all(|s| s.threshold == BlockThreshold::BlockOnlyHigh));
    }

    #[test]
    fn test_generation_config_json() {
        let json = serde_json::to_value(GenerationConfig::default()).unwrap();
        assert_eq!(json["topK"], 40);
        assert_eq!(json["maxOutputTokens"], 2048);
        assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert!((json["topP"].as_f64().unwrap() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_safety_setting_json() {
        let json = serde_json::to_value(default_safety_settings()).unwrap();
        assert_eq!(json[0]["category"], "HARM_CATEGORY_HARASSMENT");
        assert_eq!(json[3]["category"], "HARM_CATEGORY_DANGEROUS_CONTENT");
        assert_eq!(json[1]["threshold"], "BLOCK_ONLY_HIGH");
    }

    #[tokio::test]
    async fn test_select_model_first_accepted() {
        let service = EchoGenerator::accepting(&["gemini-pro"]);
        let model = select_model(&service, DEFAULT_MODEL_CANDIDATES).await.unwrap();
        assert_eq!(model.name, "gemini-pro");
        assert_eq!(*service.tried.lock().unwrap(), vec!["gemini-1.5-pro-latest", "gemini-pro"]);
    }

    #[tokio::test]
    async fn test_select_model_all_rejected() {
        let service = EchoGenerator::accepting(&[]);
        let err = select_model(&service, DEFAULT_MODEL_CANDIDATES).await.unwrap_err();
        assert_eq!(
            err,
            SummaryError::ModelUnavailable {
                last_error: "404 model models/gemini-pro not found".to_string()
            }
        );
        assert_eq!(service.tried.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_select_model_no_candidates() {
        let service = EchoGenerator::accepting(&["gemini-pro"]);
        let err = select_model::<_, String>(&service, &[]).await.unwrap_err();
        assert!(matches!(err, SummaryError::ModelUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_summarize_uses_fixed_config() {
        let service = EchoGenerator::accepting(&["gemini-1.5-pro-latest"]);
        let text = summarize(&service, DEFAULT_MODEL_CANDIDATES, "A B").await.unwrap();
        assert_eq!(text, render_prompt("A B"));

        let requests = service.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (model, request) = &requests[0];
        assert_eq!(model.name, "gemini-1.5-pro-latest");
        assert_eq!(request.generation_config, GenerationConfig::default());
        assert_eq!(request.safety_settings, default_safety_settings());
    }

    #[tokio::test]
    async fn test_summarize_model_unavailable_skips_generation() {
        let service = EchoGenerator::accepting(&[]);
        let err = summarize(&service, DEFAULT_MODEL_CANDIDATES, "A B").await.unwrap_err();
        assert!(matches!(err, SummaryError::ModelUnavailable { .. }));
        assert!(service.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summarize_missing_credentials() {
        let mut service = EchoGenerator::accepting(&["gemini-pro"]);
        service.missing_key = true;
        let err = summarize(&service, DEFAULT_MODEL_CANDIDATES, "A B").await.unwrap_err();
        assert_eq!(err, SummaryError::GenerationFailed("GOOGLE_API_KEY is not set".to_string()));
        assert!(service.tried.lock().unwrap().is_empty());
        assert!(service.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summarize_generation_failed() {
        let mut service = EchoGenerator::accepting(&["gemini-pro"]);
        service.fail_generation = true;
        let err = summarize(&service, DEFAULT_MODEL_CANDIDATES, "A B").await.unwrap_err();
        assert_eq!(err, SummaryError::GenerationFailed("quota exceeded".to_string()));
    }
}
