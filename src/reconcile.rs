use std::sync::Arc;

use log::{error, info, warn};
use tokio::task::JoinHandle;

use crate::config::ZoneConfig;
use crate::ip::{self, IpSource, ResolveError};
use crate::pattern::RecordPattern;
use crate::provider::DnsProvider;

/// A zone's reconcile task. It resolves to the update tasks it dispatched,
/// which are themselves still running.
pub type ZoneTask = JoinHandle<Vec<JoinHandle<()>>>;

/// Brings every A record in `zone` that matches its pattern in line with `ip`.
///
/// Update requests are spawned and their handles returned immediately; the
/// caller is free to drop them. Failures are logged here and go no further.
pub async fn reconcile_zone(
    provider: Arc<dyn DnsProvider>,
    zone: &ZoneConfig,
    ip: &str,
) -> Vec<JoinHandle<()>> {
    let records = match provider.list_a_records(&zone.zone_id).await {
        Ok(records) => records,
        Err(e) => {
            error!("Failed to fetch DNS records for zone {}: {:#}", zone.zone_id, e);
            return Vec::new();
        }
    };

    let pattern = match RecordPattern::compile(&zone.record_name) {
        Ok(pattern) => pattern,
        Err(e) => {
            error!("{:#}", e);
            return Vec::new();
        }
    };

    let matching: Vec<_> = records
        .into_iter()
        .filter(|record| pattern.matches(&record.name))
        .collect();

    if matching.is_empty() {
        warn!("No matching DNS records found for pattern: {}", zone.record_name);
        return Vec::new();
    }

    info!("Found {} matching records", matching.len());

    let mut updates = Vec::new();
    for record in matching {
        if record.content == ip {
            info!("IP unchanged for {}, skipping", record.name);
            continue;
        }

        let provider = provider.clone();
        let zone_id = zone.zone_id.clone();
        let ip = ip.to_string();

        updates.push(tokio::spawn(async move {
            match provider.update_a_record(&zone_id, &record, &ip).await {
                Ok(()) => info!("DNS record {} updated successfully to {}", record.name, ip),
                Err(e) => error!("Failed to update DNS record {}: {:#}", record.name, e),
            }
        }));
    }

    updates
}

/// One reconcile cycle: look up the public IP, then hand every zone its own
/// task. Nothing is awaited past the IP lookup.
///
/// Only [`ResolveError::NoAddress`] comes back as an error; a failed lookup is
/// logged and yields an empty dispatch.
pub async fn run_cycle(
    source: &dyn IpSource,
    provider: Arc<dyn DnsProvider>,
    zones: &[ZoneConfig],
) -> Result<Vec<ZoneTask>, ResolveError> {
    let ip = match ip::resolve(source).await {
        Ok(ip) => ip,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            error!("{}", e);
            return Ok(Vec::new());
        }
    };

    let total = zones.len();
    let mut tasks = Vec::with_capacity(total);

    for (index, zone) in zones.iter().enumerate() {
        info!("Updating zone {}/{}: {}", index + 1, total, zone.zone_id);

        let provider = provider.clone();
        let zone = zone.clone();
        let ip = ip.clone();

        tasks.push(tokio::spawn(async move {
            reconcile_zone(provider, &zone, &ip).await
        }));
    }

    Ok(tasks)
}
