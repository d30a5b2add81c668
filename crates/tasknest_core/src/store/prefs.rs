//! Preference mutations and last-writer-wins reconciliation.
//!
//! # Responsibility
//! - Mutate the experimental toggle and insights-hint records locally.
//! - Merge a remote copy of either record against the local one.
//!
//! # Invariants
//! - The comparator is pure: same inputs, same outcome, no side effects.
//! - A record that was never persisted locally always yields to a present
//!   remote record regardless of timestamps.
//! - Reconciliation persists the winner before reporting the push decision.

use log::debug;

use crate::model::prefs::{
    ExperimentalFeaturePreference, ExperimentalSyncState, InsightsHintState, LwwStamped,
};
use crate::time::now_epoch_ms;

use super::{Store, StoreResult};

/// Result of one last-writer-wins comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LwwOutcome<T> {
    /// The record that won.
    pub value: T,
    /// Whether the caller should push `value` to the remote side.
    pub should_push: bool,
}

/// Merges a local record against an optional remote copy.
///
/// Remote absent: local wins, and is pushed only if it was ever persisted
/// (a pure default is not worth announcing). Remote present against a
/// never-persisted local: remote wins unconditionally. Otherwise the larger
/// `updated_at` wins, local taking ties.
pub fn reconcile_lww<T: LwwStamped + Clone>(
    local: &T,
    local_was_persisted: bool,
    remote: Option<T>,
) -> LwwOutcome<T> {
    match remote {
        None => LwwOutcome {
            value: local.clone(),
            should_push: local_was_persisted,
        },
        Some(remote_value) => {
            if !local_was_persisted || remote_value.lww_updated_at() > local.lww_updated_at() {
                LwwOutcome {
                    value: remote_value,
                    should_push: false,
                }
            } else {
                LwwOutcome {
                    value: local.clone(),
                    should_push: true,
                }
            }
        }
    }
}

impl Store {
    /// Merges a remote experimental-feature record into the store.
    ///
    /// The winner is persisted; the sync state is settled to match the
    /// winning toggle. Returns whether the caller should push the local
    /// record back to the remote side.
    pub fn reconcile_experimental(
        &mut self,
        remote: Option<ExperimentalFeaturePreference>,
    ) -> StoreResult<bool> {
        let outcome = reconcile_lww(&self.experimental, self.experimental_persisted, remote);
        self.experimental = outcome.value;
        self.experimental.sync_state = if self.experimental.is_enabled {
            ExperimentalSyncState::On
        } else {
            ExperimentalSyncState::Off
        };
        self.save_experimental()?;
        debug!(
            "event=prefs_reconcile module=store status=ok record=experimental push={}",
            outcome.should_push
        );
        Ok(outcome.should_push)
    }

    /// Merges a remote insights-hint record into the store.
    pub fn reconcile_insights_hint(
        &mut self,
        remote: Option<InsightsHintState>,
    ) -> StoreResult<bool> {
        let outcome = reconcile_lww(&self.insights_hint, self.insights_hint_persisted, remote);
        self.insights_hint = outcome.value;
        self.save_insights_hint()?;
        debug!(
            "event=prefs_reconcile module=store status=ok record=insights_hint push={}",
            outcome.should_push
        );
        Ok(outcome.should_push)
    }

    /// Toggles the experimental feature locally.
    ///
    /// The record is stamped and marked pending until the next
    /// reconciliation settles it against the remote copy.
    pub fn set_experimental_enabled(&mut self, enabled: bool) -> StoreResult<()> {
        self.experimental.is_enabled = enabled;
        self.experimental.sync_state = ExperimentalSyncState::PendingReconcile;
        self.experimental.updated_at = now_epoch_ms();
        self.save_experimental()
    }

    /// Records one display of the insights hint.
    pub fn record_hint_shown(&mut self) -> StoreResult<()> {
        let now = now_epoch_ms();
        self.insights_hint.show_count += 1;
        self.insights_hint.last_shown_at = Some(now);
        self.insights_hint.updated_at = now;
        self.save_insights_hint()
    }

    /// Records one dismissal of the insights hint.
    pub fn record_hint_dismissed(&mut self) -> StoreResult<()> {
        let now = now_epoch_ms();
        self.insights_hint.dismiss_count += 1;
        self.insights_hint.last_dismissed_at = Some(now);
        self.insights_hint.updated_at = now;
        self.save_insights_hint()
    }

    /// Records the user's first interaction with the hint's subject.
    /// Write-once: later calls re-stamp nothing.
    pub fn record_hint_interaction(&mut self) -> StoreResult<()> {
        if self.insights_hint.interacted_at.is_some() {
            return Ok(());
        }
        let now = now_epoch_ms();
        self.insights_hint.interacted_at = Some(now);
        self.insights_hint.updated_at = now;
        self.save_insights_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::reconcile_lww;
    use crate::model::prefs::ExperimentalFeaturePreference;

    fn pref(enabled: bool, updated_at: i64) -> ExperimentalFeaturePreference {
        ExperimentalFeaturePreference {
            is_enabled: enabled,
            updated_at,
            ..ExperimentalFeaturePreference::default()
        }
    }

    #[test]
    fn absent_remote_keeps_local_and_pushes_only_if_persisted() {
        let local = pref(true, 100);

        let outcome = reconcile_lww(&local, true, None);
        assert_eq!(outcome.value, local);
        assert!(outcome.should_push);

        let outcome = reconcile_lww(&local, false, None);
        assert_eq!(outcome.value, local);
        assert!(!outcome.should_push);
    }

    #[test]
    fn remote_wins_over_never_persisted_local() {
        let local = pref(true, 9_999);
        let remote = pref(false, 1);

        let outcome = reconcile_lww(&local, false, Some(remote));
        assert_eq!(outcome.value, remote);
        assert!(!outcome.should_push);
    }

    #[test]
    fn newer_timestamp_wins_and_ties_keep_local() {
        let local = pref(true, 100);

        let newer_remote = pref(false, 200);
        let outcome = reconcile_lww(&local, true, Some(newer_remote));
        assert_eq!(outcome.value, newer_remote);
        assert!(!outcome.should_push);

        let tied_remote = pref(false, 100);
        let outcome = reconcile_lww(&local, true, Some(tied_remote));
        assert_eq!(outcome.value, local);
        assert!(outcome.should_push);
    }

    #[test]
    fn comparator_is_idempotent() {
        let local = pref(true, 100);
        let remote = Some(pref(false, 50));

        let first = reconcile_lww(&local, true, remote);
        let second = reconcile_lww(&local, true, remote);
        assert_eq!(first, second);
    }
}
