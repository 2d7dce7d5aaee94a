//! Reasoning provider configuration from TOML (`[provider]` section)
//!
//! ```toml
//! [provider]
//! kind = "chat"                          # "heuristic" (offline) or "chat"
//! endpoint = "https://api.openai.com/v1"
//! model = "gpt-4o-mini"
//! api_key_env = "OPENAI_API_KEY"
//! timeout_secs = 60
//! ```

use fleet_domain::agent::validation::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// Deterministic rules; no network
    #[default]
    Heuristic,
    /// OpenAI-compatible chat completions
    Chat,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Heuristic => write!(f, "heuristic"),
            ProviderKind::Chat => write!(f, "chat"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    pub kind: String,
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            kind: "heuristic".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl FileProviderConfig {
    pub fn parse_kind(&self) -> (ProviderKind, Vec<ConfigIssue>) {
        match self.kind.trim().to_lowercase().as_str() {
            "heuristic" | "offline" => (ProviderKind::Heuristic, vec![]),
            "chat" | "openai" => (ProviderKind::Chat, vec![]),
            _ => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "provider.kind".to_string(),
                        value: self.kind.clone(),
                        valid_values: vec!["heuristic".to_string(), "chat".to_string()],
                    },
                    format!(
                        "provider.kind: unknown value '{}', falling back to 'heuristic'",
                        self.kind
                    ),
                );
                (ProviderKind::Heuristic, vec![issue])
            }
        }
    }

    /// The API key, if the configured variable is set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
