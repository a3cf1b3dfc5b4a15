pub mod cloudflare;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// An A record as the provider reports it. Only `content` is ever changed on
/// write-back; `proxied` is sent back exactly as read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    pub name: String,
    #[allow(dead_code)]
    #[serde(rename = "type", default)]
    pub record_type: String,
    pub content: String,
    #[serde(default)]
    pub proxied: Option<bool>,
}

#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// All A records in the zone, single page.
    async fn list_a_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>>;

    /// Points `record` at `ip`, keeping its name and proxy flag.
    async fn update_a_record(&self, zone_id: &str, record: &DnsRecord, ip: &str) -> Result<()>;
}
