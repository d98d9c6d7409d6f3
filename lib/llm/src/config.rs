use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    /// HTTP-level timeout for a single request
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    pub(crate) fn client(&self) -> Result<reqwest::Client, crate::ProviderError> {
        if self.api_key.is_empty() {
            return Err(crate::ProviderError::InvalidConfig(
                "API key cannot be empty".to_string(),
            ));
        }
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| crate::ProviderError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))
    }
}
