use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{RelayError, Result};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_PUBMED_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

// 生成类请求耗时明显更长
pub const DEFAULT_OPENAI_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_PUBMED_TIMEOUT_MS: u64 = 10_000;

pub type SecretString = Secret<String>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub openai: OpenAiConfig,
    pub pubmed: PubmedConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Runtime environment tag reported by `/api/status`.
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins, or a single `*` for any origin.
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "https://masa061580.github.io".to_string(),
            ],
            allow_credentials: false,
        }
    }
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o.trim() == "*")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub timeout_ms: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: None,
            timeout_ms: DEFAULT_OPENAI_TIMEOUT_MS,
        }
    }
}

impl OpenAiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PubmedConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub timeout_ms: u64,
}

impl Default for PubmedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PUBMED_BASE_URL.to_string(),
            api_key: None,
            timeout_ms: DEFAULT_PUBMED_TIMEOUT_MS,
        }
    }
}

impl PubmedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Settings {
    /// Optional TOML file, then process environment, then validation.
    pub fn load() -> Result<Self> {
        let mut settings = match Self::find_config_file() {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut settings: Settings =
            toml::from_str(content).map_err(|e| RelayError::Config(e.to_string()))?;
        settings.normalize();
        Ok(settings)
    }

    /// Environment overrides; empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| RelayError::Config(format!("PORT is not a valid port: {port}")))?;
        }
        if let Some(env) = get("APP_ENV").or_else(|| get("NODE_ENV")) {
            self.server.environment = env;
        }

        if let Some(origins) = get("ALLOWED_ORIGINS") {
            self.cors.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        } else if let Some(frontend) = get("FRONTEND_URL") {
            // FRONTEND_URL 替换本地开发来源，保留其余默认来源
            self.cors
                .allowed_origins
                .retain(|o| o != "http://localhost:3000");
            self.cors.allowed_origins.insert(0, frontend);
        }
        if let Some(flag) = get("CORS_ALLOW_CREDENTIALS") {
            self.cors.allow_credentials = parse_flag(&flag);
        }

        if let Some(key) = get("OPENAI_API_KEY") {
            self.openai.api_key = Some(Secret::new(key));
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.openai.base_url = url;
        }
        if let Some(ms) = get("OPENAI_TIMEOUT_MS") {
            self.openai.timeout_ms = parse_millis("OPENAI_TIMEOUT_MS", &ms)?;
        }

        if let Some(key) = get("PUBMED_API_KEY") {
            self.pubmed.api_key = Some(Secret::new(key));
        }
        if let Some(url) = get("PUBMED_BASE_URL") {
            self.pubmed.base_url = url;
        }
        if let Some(ms) = get("PUBMED_TIMEOUT_MS") {
            self.pubmed.timeout_ms = parse_millis("PUBMED_TIMEOUT_MS", &ms)?;
        }

        self.normalize();
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.cors.allows_any_origin() && self.cors.allow_credentials {
            return Err(RelayError::Config(
                "wildcard origin cannot be combined with allow_credentials".into(),
            ));
        }
        if self.cors.allowed_origins.is_empty() {
            return Err(RelayError::Config("at least one allowed origin is required".into()));
        }
        for (name, url) in [
            ("openai.base_url", &self.openai.base_url),
            ("pubmed.base_url", &self.pubmed.base_url),
        ] {
            let parsed = reqwest::Url::parse(url)
                .map_err(|e| RelayError::Config(format!("{name} is not a valid URL: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(RelayError::Config(format!("{name} must use http or https")));
            }
        }
        if self.openai.timeout_ms == 0 || self.pubmed.timeout_ms == 0 {
            return Err(RelayError::Config("upstream timeouts must be non-zero".into()));
        }
        Ok(())
    }

    fn normalize(&mut self) {
        for origin in &mut self.cors.allowed_origins {
            let trimmed = origin.trim().trim_end_matches('/');
            *origin = trimmed.to_string();
        }
        self.openai.api_key = non_empty(self.openai.api_key.take());
        self.pubmed.api_key = non_empty(self.pubmed.api_key.take());
    }

    fn find_config_file() -> Option<&'static str> {
        let possible_names = ["relay.toml", "config.toml"];
        possible_names
            .into_iter()
            .find(|name| Path::new(name).exists())
    }
}

fn non_empty(key: Option<SecretString>) -> Option<SecretString> {
    key.filter(|k| !k.expose_secret().trim().is_empty())
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw, "1" | "true" | "TRUE" | "yes" | "YES")
}

fn parse_millis(name: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| RelayError::Config(format!("{name} must be an integer number of milliseconds")))
}
