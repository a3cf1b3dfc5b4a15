use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{DnsProvider, DnsRecord};

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

pub struct CloudflareClient {
    client: Client,
    api_base: String,
    api_token: String,
}

impl CloudflareClient {
    pub fn new(api_base: impl Into<String>, api_token: impl Into<String>) -> Result<Self> {
        // No idle pool: every cycle opens fresh connections.
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .context("Failed to build HTTP client for Cloudflare")?;

        Ok(Self {
            client,
            api_base: api_base.into(),
            api_token: api_token.into(),
        })
    }
}

#[async_trait]
impl DnsProvider for CloudflareClient {
    async fn list_a_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        let url = format!("{}/zones/{}/dns_records?type=A", self.api_base, zone_id);

        let response: CloudflareListResponse = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .send()
            .await
            .context("Failed to send request to Cloudflare")?
            .json()
            .await
            .context("Failed to parse Cloudflare response")?;

        if !response.success {
            anyhow::bail!("Cloudflare API error: {}", describe(&response.errors));
        }

        Ok(response.result.unwrap_or_default())
    }

    async fn update_a_record(&self, zone_id: &str, record: &DnsRecord, ip: &str) -> Result<()> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.api_base, zone_id, record.id
        );

        let body = UpdateRecordRequest {
            record_type: "A",
            name: &record.name,
            content: ip,
            proxied: record.proxied,
        };

        let response: CloudflareResponse = self
            .client
            .put(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send update request to Cloudflare")?
            .json()
            .await
            .context("Failed to parse Cloudflare update response")?;

        if !response.success {
            anyhow::bail!("Cloudflare API error: {}", describe(&response.errors));
        }

        Ok(())
    }
}

fn describe(errors: &[CloudflareError]) -> String {
    if errors.is_empty() {
        return "unknown error".to_string();
    }

    errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

// Cloudflare API types

#[derive(Debug, Serialize)]
struct UpdateRecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxied: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CloudflareResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<CloudflareError>,
}

#[derive(Debug, Deserialize)]
struct CloudflareListResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<CloudflareError>,
    #[serde(default)]
    result: Option<Vec<DnsRecord>>,
}

#[derive(Debug, Deserialize)]
struct CloudflareError {
    code: i64,
    message: String,
}
