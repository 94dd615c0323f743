use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::state::AppState;

const SLOW_REQUEST: Duration = Duration::from_secs(1);
const PAGE_SIZE: u64 = 4096;
const ERROR_BUCKET_TTL: Duration = Duration::from_secs(2 * 60 * 60);
const UNMATCHED_ENDPOINT: &str = "<unmatched>";

/// Resident set size of this process, read from `/proc/self/statm`.
/// `None` on platforms without procfs.
pub fn resident_memory_bytes() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages * PAGE_SIZE)
}

pub fn error_bucket_key(at: DateTime<Utc>) -> String {
    format!("errors:hourly:{}", at.format("%Y%m%d%H"))
}

pub async fn request_metrics(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let rss_before = resident_memory_bytes();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let endpoint = req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string());

    let response = next.run(req).await;

    let elapsed = started.elapsed();
    let status = response.status();
    let rss_delta = match (rss_before, resident_memory_bytes()) {
        (Some(before), Some(after)) => Some(after as i64 - before as i64),
        _ => None,
    };

    if elapsed > SLOW_REQUEST {
        warn!(%method, endpoint = %endpoint, path = %path, status = status.as_u16(), duration_ms = elapsed.as_millis(), ?rss_delta, "Slow request");
    } else {
        info!(%method, endpoint = %endpoint, path = %path, status = status.as_u16(), duration_ms = elapsed.as_millis(), ?rss_delta, "Request completed");
    }

    // Counter writes are best-effort; CacheService already logs failures.
    let _ = state.cache.increment(&format!("api:calls:{} {}", method, endpoint), 1).await;
    if status.is_server_error() {
        let _ = state.cache.increment_expiring(&error_bucket_key(Utc::now()), ERROR_BUCKET_TTL).await;
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_error_bucket_is_hourly() {
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 9, 59, 0).unwrap();
        assert_eq!(error_bucket_key(at), "errors:hourly:2025030709");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_reads_rss_on_linux() {
        assert!(resident_memory_bytes().unwrap_or(0) > 0);
    }
}
