use std::net::IpAddr;
use std::time::Duration;

use reqwest::ClientBuilder;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

fn has_proxy_env() -> bool {
    [
        "HTTPS_PROXY",
        "https_proxy",
        "HTTP_PROXY",
        "http_proxy",
        "ALL_PROXY",
        "all_proxy",
    ]
    .iter()
    .any(|k| std::env::var(k).is_ok_and(|v| !v.trim().is_empty()))
}

fn force_no_proxy() -> bool {
    std::env::var("RELAY_NO_PROXY")
        .is_ok_and(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes" | "YES"))
}

fn should_bypass_proxy_impl(url: &str, proxy_env_present: bool, forced: bool) -> bool {
    if !proxy_env_present {
        return false;
    }
    if forced {
        return true;
    }

    let Ok(u) = reqwest::Url::parse(url) else {
        return false;
    };
    // Local upstreams (mock servers, sidecars) never go through a system proxy.
    let Some(host) = u.host_str() else {
        return false;
    };
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_loopback())
}

pub fn should_bypass_proxy_for_url(url: &str) -> bool {
    should_bypass_proxy_impl(url, has_proxy_env(), force_no_proxy())
}

pub fn maybe_disable_proxy(builder: ClientBuilder, url: &str) -> ClientBuilder {
    if should_bypass_proxy_for_url(url) {
        builder.no_proxy()
    } else {
        builder
    }
}

/// Pooled client for one upstream; every call made with it is bounded by `timeout`.
pub fn client_for_url_with_timeout(
    url: &str,
    timeout: Duration,
) -> Result<reqwest::Client, reqwest::Error> {
    let builder = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT);
    maybe_disable_proxy(builder, url).build()
}

#[cfg(test)]
mod tests {
    use super::should_bypass_proxy_impl;

    #[test]
    fn bypass_proxy_for_loopback_when_proxy_env_present() {
        assert!(should_bypass_proxy_impl("http://127.0.0.1:8081/esearch.fcgi", true, false));
        assert!(should_bypass_proxy_impl("http://localhost:9000", true, false));
        assert!(should_bypass_proxy_impl("http://[::1]:9000", true, false));
    }

    #[test]
    fn keep_proxy_for_public_hosts() {
        assert!(!should_bypass_proxy_impl(
            "https://eutils.ncbi.nlm.nih.gov/entrez/eutils",
            true,
            false
        ));
        assert!(!should_bypass_proxy_impl("https://api.openai.com", true, false));
    }

    #[test]
    fn forced_bypass_applies_to_every_host() {
        assert!(should_bypass_proxy_impl("https://api.openai.com", true, true));
    }

    #[test]
    fn do_not_bypass_without_proxy_env() {
        assert!(!should_bypass_proxy_impl("http://127.0.0.1:8081", false, true));
    }
}
