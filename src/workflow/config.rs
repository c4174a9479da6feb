//! Engine configuration
//!
//! Loaded from `engine.yaml`. Every field has a default, so an empty file (or
//! no file at all) gives a working engine:
//!
//! ```yaml
//! workers: 4
//! event_buffer: 1024
//! http_timeout_secs: 30
//! openai_base_url: https://api.openai.com/v1
//!
//! credentials:
//!   openai-main:
//!     apiKey: sk-...
//!   github-token:
//!     token: ghp_...
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::loader::LoadError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of workers pulling from the job queue
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the progress event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Request timeout for HTTP-based handlers
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Base URL for OpenAI-compatible chat models
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Credentials by id, served to handlers through the credential store
    #[serde(default)]
    pub credentials: HashMap<String, Value>,
}

fn default_workers() -> usize {
    4
}

fn default_event_buffer() -> usize {
    1024
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            event_buffer: default_event_buffer(),
            http_timeout_secs: default_http_timeout_secs(),
            openai_base_url: default_openai_base_url(),
            credentials: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|e| LoadError::Yaml {
            file: path.display().to_string(),
            error: e,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
