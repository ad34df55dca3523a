use secrecy::ExposeSecret;

use crate::config::{PubmedConfig, SecretString};
use crate::error::Result;

use super::{Upstream, UpstreamFailure, UpstreamReply};

const SEARCH_PATH: &str = "esearch.fcgi";
const SUMMARY_PATH: &str = "esummary.fcgi";
const FETCH_PATH: &str = "efetch.fcgi";

pub const DEFAULT_RETTYPE: &str = "abstract";

/// NCBI E-utilities for the `pubmed` database.
///
/// The API key is optional: E-utilities serves anonymous callers at a lower
/// request rate, so it is appended only when configured.
#[derive(Debug, Clone)]
pub struct PubmedProvider {
    upstream: Upstream,
    api_key: Option<SecretString>,
}

impl PubmedProvider {
    pub fn from_config(config: &PubmedConfig) -> Result<Self> {
        Ok(Self {
            upstream: Upstream::new("pubmed", &config.base_url, config.timeout())?,
            api_key: config.api_key.clone(),
        })
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn search(
        &self,
        term: &str,
        retmax: u32,
    ) -> std::result::Result<UpstreamReply, UpstreamFailure> {
        let retmax = retmax.to_string();
        let params = self.params(&[
            ("db", "pubmed"),
            ("term", term),
            ("retmax", &retmax),
            ("retmode", "json"),
        ]);
        self.get(SEARCH_PATH, &params).await
    }

    /// `ids` is a single PMID or a comma-separated batch.
    pub async fn summary(&self, ids: &str) -> std::result::Result<UpstreamReply, UpstreamFailure> {
        let params = self.params(&[("db", "pubmed"), ("id", ids), ("retmode", "json")]);
        self.get(SUMMARY_PATH, &params).await
    }

    /// Plain-text record for one PMID.
    pub async fn fetch(
        &self,
        pmid: &str,
        rettype: &str,
    ) -> std::result::Result<String, UpstreamFailure> {
        let params = self.params(&[
            ("db", "pubmed"),
            ("id", pmid),
            ("rettype", rettype),
            ("retmode", "text"),
        ]);
        let reply = self.get(FETCH_PATH, &params).await?;
        Ok(String::from_utf8_lossy(&reply.body).into_owned())
    }

    fn params<'a>(&'a self, base: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut params = base.to_vec();
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.expose_secret().as_str()));
        }
        params
    }

    async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> std::result::Result<UpstreamReply, UpstreamFailure> {
        let builder = self
            .upstream
            .http()
            .get(self.upstream.endpoint(path))
            .query(params);
        self.upstream.execute(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn provider(api_key: Option<&str>) -> PubmedProvider {
        let config = PubmedConfig {
            api_key: api_key.map(|k| Secret::new(k.to_string())),
            ..PubmedConfig::default()
        };
        PubmedProvider::from_config(&config).unwrap()
    }

    #[test]
    fn api_key_is_appended_when_configured() {
        let p = provider(Some("ncbi-key"));
        let params = p.params(&[("db", "pubmed"), ("id", "123")]);
        assert_eq!(params.last(), Some(&("api_key", "ncbi-key")));
    }

    #[test]
    fn api_key_is_omitted_when_absent() {
        let p = provider(None);
        let params = p.params(&[("db", "pubmed"), ("id", "123")]);
        assert!(params.iter().all(|(k, _)| *k != "api_key"));
        assert_eq!(params.len(), 2);
    }
}
