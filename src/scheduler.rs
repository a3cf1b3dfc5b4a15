use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::info;
use tokio::time::{self, MissedTickBehavior};

use crate::config::ZoneConfig;
use crate::ip::IpSource;
use crate::provider::DnsProvider;
use crate::reconcile;

/// Runs a reconcile cycle right away and then once per `period`.
///
/// Zone work from one cycle may still be in flight when the next starts.
/// Returns only when a cycle hits a fatal error.
pub async fn run(
    source: Arc<dyn IpSource>,
    provider: Arc<dyn DnsProvider>,
    zones: Vec<ZoneConfig>,
    period: Duration,
) -> Result<()> {
    info!(
        "Reconciling {} zone(s) every {:?}",
        zones.len(),
        period
    );

    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        reconcile::run_cycle(source.as_ref(), provider.clone(), &zones).await?;
    }
}
