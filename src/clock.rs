//! Wall-clock helpers for persisted and reported timestamps.
//!
//! State machines use `tokio::time::Instant`; only values that leave the
//! process (job records, stats snapshots) are expressed in epoch millis.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
