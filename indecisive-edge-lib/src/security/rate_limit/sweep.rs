use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::RateLimiter;
use crate::telemetry::Metrics;

/// Spawn the background task that sweeps expired entries every `interval`.
///
/// The first sweep runs one full interval after spawning. The task exits
/// when `shutdown` is cancelled.
pub fn spawn_sweeper(
    limiter: RateLimiter,
    interval: Duration,
    shutdown: CancellationToken,
    metrics: Option<Arc<Metrics>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs_f64(), "Rate limit sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Rate limit sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = limiter.sweep_at(Instant::now());
                    let remaining = limiter.len();
                    if let Some(ref m) = metrics {
                        m.record_rate_limit_sweep(removed as u64, remaining as u64);
                    }
                    if removed > 0 {
                        debug!(removed, remaining, "Swept expired rate limit entries");
                    }
                }
            }
        }
    })
}
