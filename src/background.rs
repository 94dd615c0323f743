use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::interval;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::api::middleware::monitoring::{error_bucket_key, resident_memory_bytes};
use crate::state::AppState;

const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(60);
const SNAPSHOT_TTL: Duration = Duration::from_secs(300);
const ERROR_RATE_THRESHOLD: i64 = 50;
const MEMORY_THRESHOLD_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub uptime_secs: u64,
    pub rss_bytes: Option<u64>,
    pub errors_this_hour: i64,
    pub captured_at: chrono::DateTime<Utc>,
}

/// Threshold warnings for a snapshot. Empty when the process looks healthy.
pub fn metric_alerts(metrics: &SystemMetrics) -> Vec<String> {
    let mut alerts = Vec::new();
    if metrics.errors_this_hour > ERROR_RATE_THRESHOLD {
        alerts.push(format!("High error rate: {} errors this hour", metrics.errors_this_hour));
    }
    if let Some(rss) = metrics.rss_bytes
        && rss > MEMORY_THRESHOLD_BYTES {
        alerts.push(format!("High memory usage: {} MiB resident", rss / (1024 * 1024)));
    }
    alerts
}

async fn snapshot(state: &AppState, started: Instant) -> SystemMetrics {
    let now = Utc::now();
    let errors_this_hour = state.cache.get::<i64>(&error_bucket_key(now)).await.ok().flatten().unwrap_or(0);
    SystemMetrics {
        uptime_secs: started.elapsed().as_secs(),
        rss_bytes: resident_memory_bytes(),
        errors_this_hour,
        captured_at: now,
    }
}

/// Every minute, stores a `system:metrics` snapshot in the cache and logs
/// threshold breaches. Runs until the task is aborted.
pub async fn start_metrics_worker(state: Arc<AppState>) {
    info!("Starting system metrics worker...");
    let started = Instant::now();
    let mut ticker = interval(SNAPSHOT_INTERVAL);

    loop {
        ticker.tick().await;

        async {
            let metrics = snapshot(&state, started).await;
            if state.cache.set("system:metrics", &metrics, Some(SNAPSHOT_TTL)).await.is_err() {
                debug!("Metrics snapshot not stored");
            }
            for alert in metric_alerts(&metrics) {
                warn!(uptime_secs = metrics.uptime_secs, "{}", alert);
            }
        }
        .instrument(info_span!("metrics_snapshot"))
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(errors: i64, rss: Option<u64>) -> SystemMetrics {
        SystemMetrics { uptime_secs: 10, rss_bytes: rss, errors_this_hour: errors, captured_at: Utc::now() }
    }

    #[test]
    fn test_quiet_process_has_no_alerts() {
        assert!(metric_alerts(&metrics(50, Some(100 * 1024 * 1024))).is_empty());
        assert!(metric_alerts(&metrics(0, None)).is_empty());
    }

    #[test]
    fn test_thresholds_raise_alerts() {
        let alerts = metric_alerts(&metrics(51, Some(600 * 1024 * 1024)));
        assert_eq!(alerts.len(), 2);
        assert!(alerts[0].contains("51 errors"));
        assert!(alerts[1].contains("600 MiB"));
    }
}
