//! Optimistic balance tracking.
//!
//! The displayed balance is a cache: a confirmed snapshot from the
//! authority plus a local adjustment for rounds the authority has not
//! reflected back yet. A confirmed snapshot always wins on reconcile: the
//! optimistic layer is dropped wholesale, never merged.

use parcade_types::api::BalanceSnapshot;
use parcade_types::Parc;
use std::sync::{Arc, Mutex};

/// Confirmed-plus-pending balance state.
#[derive(Debug, Default)]
pub struct BalanceTracker {
    /// Last authoritative snapshot, if any was ever fetched.
    confirmed: Option<BalanceSnapshot>,
    /// Net local PARC adjustment (debits negative, credits positive) made
    /// since `confirmed` was taken.
    pending: i64,
}

impl BalanceTracker {
    /// The balance to show: confirmed adjusted by the optimistic delta,
    /// clamped at zero. `None` until a first snapshot arrives.
    pub fn displayed(&self) -> Option<BalanceSnapshot> {
        self.confirmed.map(|snapshot| {
            let parc = (snapshot.parc as i64).saturating_add(self.pending).max(0) as Parc;
            BalanceSnapshot {
                parc,
                jpy: snapshot.jpy,
            }
        })
    }

    /// Whether the displayed balance covers `stake`. With no snapshot yet
    /// there is nothing to check locally; the authority decides.
    pub fn covers(&self, stake: Parc) -> bool {
        match self.displayed() {
            Some(snapshot) => snapshot.parc >= stake,
            None => true,
        }
    }

    /// Optimistically subtract a stake at round start.
    pub fn note_debit(&mut self, stake: Parc) {
        self.pending = self.pending.saturating_sub(stake as i64);
    }

    /// Undo an optimistic debit after the authority rejected it.
    pub fn rollback_debit(&mut self, stake: Parc) {
        self.pending = self.pending.saturating_add(stake as i64);
    }

    /// Optimistically add a payout at settle time.
    pub fn note_credit(&mut self, amount: Parc) {
        self.pending = self.pending.saturating_add(amount as i64);
    }

    /// Install an authoritative snapshot. The optimistic layer resets: the
    /// authority has already folded any applied debits and credits into
    /// what it returned.
    pub fn confirm(&mut self, snapshot: BalanceSnapshot) {
        self.confirmed = Some(snapshot);
        self.pending = 0;
    }

    /// Install an authoritative PARC-only figure (e.g. the balance echoed
    /// by a debit response). The JPY side keeps its last known value.
    pub fn confirm_parc(&mut self, parc: Parc) {
        let jpy = self.confirmed.map(|s| s.jpy).unwrap_or_default();
        self.confirm(BalanceSnapshot { parc, jpy });
    }
}

/// Cheaply cloneable handle to a [`BalanceTracker`] shared between a
/// session controller and its background poller.
#[derive(Clone, Debug, Default)]
pub struct SharedBalance(Arc<Mutex<BalanceTracker>>);

impl SharedBalance {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut BalanceTracker) -> T) -> T {
        // Display state carries no invariants worth dying for: on poison,
        // keep serving the inner value (last-write-wins).
        let mut guard = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub fn displayed(&self) -> Option<BalanceSnapshot> {
        self.with(|tracker| tracker.displayed())
    }

    pub fn covers(&self, stake: Parc) -> bool {
        self.with(|tracker| tracker.covers(stake))
    }

    pub fn note_debit(&self, stake: Parc) {
        self.with(|tracker| tracker.note_debit(stake));
    }

    pub fn rollback_debit(&self, stake: Parc) {
        self.with(|tracker| tracker.rollback_debit(stake));
    }

    pub fn note_credit(&self, amount: Parc) {
        self.with(|tracker| tracker.note_credit(amount));
    }

    pub fn confirm(&self, snapshot: BalanceSnapshot) {
        self.with(|tracker| tracker.confirm(snapshot));
    }

    pub fn confirm_parc(&self, parc: Parc) {
        self.with(|tracker| tracker.confirm_parc(parc));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(parc: Parc, jpy: u64) -> BalanceSnapshot {
        BalanceSnapshot { parc, jpy }
    }

    #[test]
    fn test_unknown_until_first_snapshot() {
        let mut tracker = BalanceTracker::default();
        assert_eq!(tracker.displayed(), None);
        // Optimistic moves before any snapshot change nothing visible.
        tracker.note_debit(10);
        assert_eq!(tracker.displayed(), None);
        assert!(tracker.covers(1_000_000));
    }

    #[test]
    fn test_optimistic_layering() {
        let mut tracker = BalanceTracker::default();
        tracker.confirm(snapshot(100, 5));

        tracker.note_debit(10);
        assert_eq!(tracker.displayed(), Some(snapshot(90, 5)));
        assert!(tracker.covers(90));
        assert!(!tracker.covers(91));

        tracker.note_credit(25);
        assert_eq!(tracker.displayed(), Some(snapshot(115, 5)));
    }

    #[test]
    fn test_rollback_restores_pre_round_view() {
        let mut tracker = BalanceTracker::default();
        tracker.confirm(snapshot(100, 0));
        tracker.note_debit(40);
        tracker.rollback_debit(40);
        assert_eq!(tracker.displayed(), Some(snapshot(100, 0)));
    }

    #[test]
    fn test_confirmed_wins_over_optimistic() {
        let mut tracker = BalanceTracker::default();
        tracker.confirm(snapshot(100, 0));
        tracker.note_debit(10);
        tracker.note_credit(50);

        // The authority's view supersedes local drift entirely.
        tracker.confirm(snapshot(73, 1));
        assert_eq!(tracker.displayed(), Some(snapshot(73, 1)));
    }

    #[test]
    fn test_displayed_clamps_at_zero() {
        let mut tracker = BalanceTracker::default();
        tracker.confirm(snapshot(5, 0));
        tracker.note_debit(10);
        assert_eq!(tracker.displayed(), Some(snapshot(0, 0)));
    }

    #[test]
    fn test_confirm_parc_keeps_jpy() {
        let mut tracker = BalanceTracker::default();
        tracker.confirm(snapshot(100, 7));
        tracker.note_debit(10);
        tracker.confirm_parc(90);
        assert_eq!(tracker.displayed(), Some(snapshot(90, 7)));
    }

    #[test]
    fn test_shared_handle_views_same_state() {
        let shared = SharedBalance::new();
        let clone = shared.clone();
        shared.confirm(snapshot(100, 0));
        clone.note_debit(30);
        assert_eq!(shared.displayed(), Some(snapshot(70, 0)));
    }
}
