use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use regex::Regex;
use reqwest::Client;
use thiserror::Error;

/// myip.dk answers plain text only to curl-looking clients.
const USER_AGENT: &str = "curl/7.88.1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// No per-octet range check: anything dotted-quad shaped is taken as-is.
// Word boundaries are ASCII-only.
static IPV4_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}(?-u:\b)")
        .expect("static IPv4 pattern is valid")
});

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The echo service could not be reached; the next tick tries again.
    #[error("Error fetching public IP: {0:#}")]
    Transport(anyhow::Error),

    /// The echo service answered but nothing in the body looks like an IPv4
    /// address.
    #[error("Could not extract IP from response")]
    NoAddress,
}

impl ResolveError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ResolveError::NoAddress)
    }
}

/// Something that can tell us what the outside world sees as our address.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Raw response text; extraction happens in [`resolve`].
    async fn fetch(&self) -> Result<String>;
}

pub struct HttpIpSource {
    client: Client,
    url: String,
}

impl HttpIpSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()
            .context("Failed to build HTTP client for IP lookups")?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl IpSource for HttpIpSource {
    async fn fetch(&self) -> Result<String> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.url))?
            .text()
            .await
            .with_context(|| format!("Failed to read response from {}", self.url))?;

        Ok(body)
    }
}

/// First dotted-quad substring of `text`, scanning left to right.
pub fn extract_ipv4(text: &str) -> Option<&str> {
    IPV4_PATTERN.find(text).map(|m| m.as_str())
}

pub async fn resolve(source: &dyn IpSource) -> Result<String, ResolveError> {
    let body = source.fetch().await.map_err(ResolveError::Transport)?;

    match extract_ipv4(&body) {
        Some(ip) => {
            info!("IP: \"{}\"", ip);
            Ok(ip.to_string())
        }
        None => {
            debug!("IP echo response without an address: {:?}", body);
            Err(ResolveError::NoAddress)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use axum::{http::HeaderMap, routing::get, Router};

    struct FixedBody(&'static str);

    #[async_trait]
    impl IpSource for FixedBody {
        async fn fetch(&self) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl IpSource for Unreachable {
        async fn fetch(&self) -> Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    #[test]
    fn extracts_first_address_in_order() {
        let text = "<html>Your IP is 203.0.113.7, proxy 10.0.0.1</html>";
        assert_eq!(extract_ipv4(text), Some("203.0.113.7"));
    }

    #[test]
    fn extraction_is_loose_about_octet_range() {
        assert_eq!(extract_ipv4("ip=999.300.1.1"), Some("999.300.1.1"));
    }

    #[test]
    fn extraction_requires_word_boundaries() {
        assert_eq!(extract_ipv4("1234.5.6.7"), None);
        assert_eq!(extract_ipv4("v1.2.3"), None);
        assert_eq!(extract_ipv4("addr:1.2.3.4\n"), Some("1.2.3.4"));
    }

    #[test]
    fn extraction_next_to_non_ascii_text() {
        assert_eq!(extract_ipv4("地址1.2.3.4"), Some("1.2.3.4"));
        assert_eq!(extract_ipv4("IP:é1.2.3.4"), Some("1.2.3.4"));
        assert_eq!(extract_ipv4("1.2.3.4é"), Some("1.2.3.4"));
    }

    #[test]
    fn extraction_without_address() {
        assert_eq!(extract_ipv4("service unavailable"), None);
        assert_eq!(extract_ipv4(""), None);
    }

    #[tokio::test]
    async fn resolve_returns_first_match() {
        let ip = resolve(&FixedBody("1.2.3.4 then 5.6.7.8")).await.unwrap();
        assert_eq!(ip, "1.2.3.4");
    }

    #[tokio::test]
    async fn resolve_without_address_is_fatal() {
        let err = resolve(&FixedBody("nothing here")).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, ResolveError::NoAddress));
    }

    #[tokio::test]
    async fn resolve_transport_failure_is_recoverable() {
        let err = resolve(&Unreachable).await.unwrap_err();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn http_source_sends_curl_user_agent() {
        let app = Router::new().route(
            "/",
            get(|headers: HeaderMap| async move {
                let agent = headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-")
                    .to_string();
                format!("agent={} ip=198.51.100.23", agent)
            }),
        );
        let base = test_support::serve(app).await;

        let source = HttpIpSource::new(format!("{}/", base)).unwrap();
        let body = source.fetch().await.unwrap();

        assert!(body.contains("agent=curl/7.88.1"));
        assert_eq!(resolve(&source).await.unwrap(), "198.51.100.23");
    }
}
