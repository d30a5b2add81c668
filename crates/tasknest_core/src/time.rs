//! Clock helpers shared by the store and the import pipeline.
//!
//! All timestamps in the model are Unix epoch milliseconds (`i64`).

use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}

/// Formats an epoch-ms timestamp for the import attribution line.
///
/// Example output: `2026-08-24 14:03`.
pub fn format_attribution_ms(epoch_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(epoch_ms) {
        Some(timestamp) => timestamp.format("%Y-%m-%d %H:%M").to_string(),
        None => "unknown time".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{format_attribution_ms, now_epoch_ms};

    #[test]
    fn now_is_after_2020() {
        assert!(now_epoch_ms() > 1_577_836_800_000);
    }

    #[test]
    fn attribution_format_is_stable() {
        // 2024-01-02 03:04:05 UTC
        assert_eq!(format_attribution_ms(1_704_164_645_000), "2024-01-02 03:04");
    }

    #[test]
    fn attribution_format_survives_out_of_range_values() {
        assert_eq!(format_attribution_ms(i64::MAX), "unknown time");
    }
}
