//! Small per-user preference records merged via last-writer-wins.
//!
//! # Responsibility
//! - Define the experimental-feature toggle and insights-hint state records.
//!
//! # Invariants
//! - `updated_at` is the LWW comparison key for both records; every local
//!   mutation re-stamps it.
//! - `InsightsHintState::interacted_at` is write-once.

use serde::{Deserialize, Serialize};

/// Redisplay cool-down for the insights hint after one dismissal.
const HINT_REDISPLAY_AFTER_MS: i64 = 24 * 60 * 60 * 1000;

/// Sync lifecycle of the experimental-feature toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExperimentalSyncState {
    Off,
    On,
    PendingReconcile,
}

/// Opt-in flag for experimental functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentalFeaturePreference {
    pub is_enabled: bool,
    /// Unix epoch milliseconds, LWW comparison key.
    pub updated_at: i64,
    pub sync_state: ExperimentalSyncState,
}

impl Default for ExperimentalFeaturePreference {
    fn default() -> Self {
        Self {
            is_enabled: false,
            updated_at: 0,
            sync_state: ExperimentalSyncState::Off,
        }
    }
}

/// Display bookkeeping for the one-time insights hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsHintState {
    pub show_count: u32,
    pub dismiss_count: u32,
    pub last_shown_at: Option<i64>,
    pub last_dismissed_at: Option<i64>,
    /// Write-once: set only while currently `None`.
    pub interacted_at: Option<i64>,
    /// Unix epoch milliseconds, LWW comparison key.
    pub updated_at: i64,
}

impl Default for InsightsHintState {
    fn default() -> Self {
        Self {
            show_count: 0,
            dismiss_count: 0,
            last_shown_at: None,
            last_dismissed_at: None,
            interacted_at: None,
            updated_at: 0,
        }
    }
}

impl InsightsHintState {
    /// Decides whether the hint should be surfaced at `now`.
    ///
    /// Never after the user interacted with it; always on first exposure;
    /// once more after a single dismissal, but only past the cool-down.
    pub fn should_show_hint(&self, now: i64) -> bool {
        if self.interacted_at.is_some() {
            return false;
        }
        if self.show_count == 0 {
            return true;
        }
        if self.show_count == 1 && self.dismiss_count >= 1 {
            if let Some(dismissed_at) = self.last_dismissed_at {
                return now - dismissed_at >= HINT_REDISPLAY_AFTER_MS;
            }
        }
        false
    }
}

/// Record carrying an LWW comparison timestamp.
pub trait LwwStamped {
    fn lww_updated_at(&self) -> i64;
}

impl LwwStamped for ExperimentalFeaturePreference {
    fn lww_updated_at(&self) -> i64 {
        self.updated_at
    }
}

impl LwwStamped for InsightsHintState {
    fn lww_updated_at(&self) -> i64 {
        self.updated_at
    }
}
