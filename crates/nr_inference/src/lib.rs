use std::fmt;

pub mod detection;
pub mod models;
pub mod prompts;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct InferenceConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

pub mod prelude {
    pub use super::InferenceConfig;
    pub use super::models::{create_agent, LlmAgent, MockAgent};
    pub use nr_core::{ContentAgent, Error, Result};
}

pub use models::{create_agent, LlmAgent, MockAgent};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_config_builds_mock_pipeline() {
        let agent = create_agent(&InferenceConfig::default()).unwrap();
        let detection = agent
            .detect_fake_news("Markets close higher", "Stocks rose modestly on Friday.")
            .await
            .unwrap();
        assert!(detection.score <= 100);
        assert_eq!(agent.name(), "Mock");
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config = InferenceConfig {
            api_key: Some("sk-live-123".to_string()),
            ..InferenceConfig::default()
        };
        assert!(!format!("{:?}", config).contains("sk-live-123"));
    }
}
