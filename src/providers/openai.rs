use secrecy::ExposeSecret;
use serde_json::Value;

use crate::config::{OpenAiConfig, SecretString};
use crate::error::Result;

use super::{Upstream, UpstreamFailure, UpstreamReply};

const CHAT_COMPLETIONS_PATH: &str = "v1/chat/completions";

/// Chat-completion upstream. The request body is forwarded untouched.
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    upstream: Upstream,
    api_key: Option<SecretString>,
}

impl OpenAIProvider {
    pub fn from_config(config: &OpenAiConfig) -> Result<Self> {
        Ok(Self {
            upstream: Upstream::new("openai", &config.base_url, config.timeout())?,
            api_key: config.api_key.clone(),
        })
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn chat_completions(
        &self,
        request: &Value,
    ) -> std::result::Result<UpstreamReply, UpstreamFailure> {
        let Some(api_key) = &self.api_key else {
            tracing::error!("OPENAI_API_KEY is not configured; refusing to call chat provider");
            return Err(UpstreamFailure::Local("chat provider key is not configured".into()));
        };

        let builder = self
            .upstream
            .http()
            .post(self.upstream.endpoint(CHAT_COMPLETIONS_PATH))
            .header("Authorization", format!("Bearer {}", api_key.expose_secret()))
            .header("Content-Type", "application/json")
            .json(request);

        self.upstream.execute(builder).await
    }
}
