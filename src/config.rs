use std::fmt;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;

use crate::provider::cloudflare::CLOUDFLARE_API_BASE;

#[derive(Parser, Clone)]
#[command(name = "cf-dyndns")]
#[command(about = "Keeps Cloudflare A records in sync with the current public IP")]
pub struct Args {
    /// Cloudflare API token (bearer credential)
    #[arg(long, env = "CF_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// JSON array of {"zone_id", "record_name"} objects (multi-zone mode)
    #[arg(long, env = "CF_ZONES")]
    pub zones: Option<String>,

    /// Zone ID (single-zone mode)
    #[arg(long, env = "CF_ZONE_ID")]
    pub zone_id: Option<String>,

    /// Record name or wildcard pattern (single-zone mode)
    #[arg(long, env = "CF_RECORD_NAME")]
    pub record_name: Option<String>,

    /// Polling interval in milliseconds
    #[arg(long, env = "UPDATE_INTERVAL", default_value_t = 3_600_000,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub update_interval: u64,

    /// Port of the liveness listener
    #[arg(long, env = "HEALTH_PORT", default_value_t = 3000)]
    pub health_port: u16,

    /// Service that echoes the caller's public IP
    #[arg(long, env = "IP_ECHO_URL", default_value = "https://myip.dk/")]
    pub ip_url: String,

    /// Cloudflare API v4 base URL
    #[arg(long, env = "CF_API_BASE", default_value = CLOUDFLARE_API_BASE)]
    pub api_base: String,

    /// Default log filter (RUST_LOG takes precedence)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// `CF_ZONES`, unless it is unset or blank (`CF_ZONES=` in a compose file).
    pub fn zones_json(&self) -> Option<&str> {
        self.zones.as_deref().filter(|raw| !raw.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneConfig {
    pub zone_id: String,
    pub record_name: String,
}

#[derive(Clone)]
pub struct Config {
    pub api_token: String,
    pub api_base: String,
    pub ip_url: String,
    pub zones: Vec<ZoneConfig>,
    pub update_interval: Duration,
    pub health_port: u16,
}

// Keeps the token out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("ip_url", &self.ip_url)
            .field("zones", &self.zones)
            .field("update_interval", &self.update_interval)
            .field("health_port", &self.health_port)
            .finish()
    }
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let zones = resolve_zones(args)?;

        if args.api_token.trim().is_empty() {
            bail!("CF_API_TOKEN must not be empty");
        }

        Ok(Config {
            api_token: args.api_token.clone(),
            api_base: args.api_base.trim_end_matches('/').to_string(),
            ip_url: args.ip_url.clone(),
            zones,
            update_interval: Duration::from_millis(args.update_interval),
            health_port: args.health_port,
        })
    }
}

/// Picks multi-zone mode when `CF_ZONES` is set, otherwise falls back to the
/// `CF_ZONE_ID` + `CF_RECORD_NAME` pair.
fn resolve_zones(args: &Args) -> Result<Vec<ZoneConfig>> {
    let zones = if let Some(raw) = args.zones_json() {
        serde_json::from_str::<Vec<ZoneConfig>>(raw).context("Error parsing CF_ZONES")?
    } else {
        match (&args.zone_id, &args.record_name) {
            (Some(zone_id), Some(record_name)) => vec![ZoneConfig {
                zone_id: zone_id.clone(),
                record_name: record_name.clone(),
            }],
            _ => bail!("Configuration required: either CF_ZONES or (CF_ZONE_ID + CF_RECORD_NAME)"),
        }
    };

    if zones.is_empty() {
        bail!("CF_ZONES must list at least one zone");
    }

    for (index, zone) in zones.iter().enumerate() {
        if zone.zone_id.trim().is_empty() || zone.record_name.trim().is_empty() {
            bail!("Zone {} needs a non-empty zone_id and record_name", index + 1);
        }
    }

    Ok(zones)
}
