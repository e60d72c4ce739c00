use std::path::PathBuf;
use std::time::Duration;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::gemini::API_KEY_ENV;
use crate::output::ExportFormat;
use crate::summarize::DEFAULT_MODEL_CANDIDATES;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model_candidates: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub export: Option<Vec<ExportFormat>>,
}

impl Config {
    /// Load config from ~/.config/ytsum/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// The environment credential wins over the config file
    pub fn resolve_api_key(&self, env_value: Option<String>) -> Option<String> {
        env_value
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone())
    }

    pub fn api_key_from_env(&self) -> Option<String> {
        self.resolve_api_key(std::env::var(API_KEY_ENV).ok())
    }

    pub fn model_candidates(&self) -> Vec<String> {
        match &self.model_candidates {
            Some(names) if !names.is_empty() => names.clone(),
            _ => DEFAULT_MODEL_CANDIDATES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn timeout(&self, cli_secs: Option<u64>) -> Duration {
        Duration::from_secs(cli_secs.or(self.timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytsum")
        .join("config.toml")
}
