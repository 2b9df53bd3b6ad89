//! Per-game round sequencing against the balance authority.
//!
//! A [`SessionController`] runs exactly one bet-then-report round trip per
//! play: debit first, resolve the outcome locally, report it, then schedule
//! a confirmed balance refresh. Slot and roulette resolve in a single call;
//! blackjack hands back a [`BlackjackRound`] that must be settled when the
//! hand finishes.
//!
//! Two gates protect the authority from duplicate debits: only one round
//! may be in flight per controller, and round starts inside the cooldown
//! window of the previous start are rejected outright (dropped, not
//! queued).

use crate::authority::BalanceAuthority;
use crate::balance::SharedBalance;
use crate::{Error, Result};
use parcade_engine::rng::Randomness;
use parcade_engine::{blackjack, roulette, slot};
use parcade_types::api::ResultReport;
use parcade_types::{GameKind, Parc, RoundOutcome};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// How rounds are settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Every round is debited from and reported to the authority.
    Live,
    /// No authority calls at all; outcomes are cosmetic.
    Demo,
}

/// Session tuning knobs.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Minimum gap between round starts.
    pub cooldown: Duration,
    /// Delay before the post-round confirmed balance refresh.
    pub refresh_delay: Duration,
    /// Degrade to demo mode when the authority is unreachable (transport
    /// failures and failed health probes). Rejections such as insufficient
    /// balance never trigger this.
    pub demo_on_transport_failure: bool,
    /// Completed rounds retained for display.
    pub history_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(2),
            refresh_delay: Duration::from_secs(1),
            demo_on_transport_failure: true,
            history_limit: 32,
        }
    }
}

/// A completed round, as kept in the session history.
#[derive(Clone, Debug)]
pub struct RoundRecord {
    pub game: GameKind,
    pub stake: Parc,
    pub outcome: RoundOutcome,
    /// Amount credited back (0 on a loss).
    pub payout: Parc,
    pub mode: Mode,
    pub at: SystemTime,
}

/// A debited, unresolved round. Consumed exactly once by settlement, which
/// is what makes the one-report-per-round property structural.
#[derive(Debug)]
struct PendingRound {
    game: GameKind,
    stake: Parc,
    mode: Mode,
}

/// An in-progress blackjack hand tied to its debited stake. Obtain one via
/// [`SessionController::begin_blackjack`] and hand it back to
/// [`SessionController::settle_blackjack`] once it is over; settling an
/// unfinished hand forfeits the stake.
#[derive(Debug)]
pub struct BlackjackRound {
    inner: blackjack::Round,
    pending: PendingRound,
}

impl BlackjackRound {
    pub fn phase(&self) -> blackjack::Phase {
        self.inner.phase()
    }

    pub fn player(&self) -> &[parcade_types::cards::Card] {
        self.inner.player()
    }

    pub fn dealer(&self) -> &[parcade_types::cards::Card] {
        self.inner.dealer()
    }

    pub fn dealer_upcard(&self) -> Option<parcade_types::cards::Card> {
        self.inner.dealer_upcard()
    }

    pub fn result(&self) -> Option<blackjack::RoundResult> {
        self.inner.result()
    }

    pub fn stake(&self) -> Parc {
        self.pending.stake
    }

    pub fn is_over(&self) -> bool {
        self.inner.phase() == blackjack::Phase::GameOver
    }

    pub fn hit(&mut self) -> Result<blackjack::Phase> {
        Ok(self.inner.hit()?)
    }

    pub fn stand(&mut self) -> Result<blackjack::Phase> {
        Ok(self.inner.stand()?)
    }
}

/// Sequences rounds for one player across the three games.
pub struct SessionController<A, R> {
    authority: Arc<A>,
    rng: R,
    config: SessionConfig,
    mode: Mode,
    balance: SharedBalance,
    in_flight: bool,
    last_start: Option<Instant>,
    history: VecDeque<RoundRecord>,
}

impl<A, R> SessionController<A, R>
where
    A: BalanceAuthority + 'static,
    R: Randomness,
{
    pub fn new(authority: A, rng: R, config: SessionConfig) -> Self {
        Self {
            authority: Arc::new(authority),
            rng,
            config,
            mode: Mode::Live,
            balance: SharedBalance::new(),
            in_flight: false,
            last_start: None,
            history: VecDeque::new(),
        }
    }

    /// A session that starts in demo mode (e.g. for unauthenticated users).
    pub fn demo(authority: A, rng: R, config: SessionConfig) -> Self {
        let mut session = Self::new(authority, rng, config);
        session.mode = Mode::Demo;
        session
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch modes explicitly (login, logout, user toggle).
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Shared handle for the background poller and UI observers.
    pub fn balance_handle(&self) -> SharedBalance {
        self.balance.clone()
    }

    /// The authority handle, for wiring up a poller.
    pub fn authority(&self) -> Arc<A> {
        Arc::clone(&self.authority)
    }

    pub fn displayed_balance(&self) -> Option<parcade_types::api::BalanceSnapshot> {
        self.balance.displayed()
    }

    /// Completed rounds, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &RoundRecord> {
        self.history.iter()
    }

    /// Probe the authority. A failed probe degrades a live session to demo
    /// mode when fallback is configured.
    pub async fn probe_health(&mut self) -> bool {
        let healthy = self.authority.healthy().await;
        if !healthy && self.mode == Mode::Live && self.config.demo_on_transport_failure {
            warn!("authority health probe failed, degrading session to demo mode");
            self.mode = Mode::Demo;
        }
        healthy
    }

    /// Play one slot round.
    pub async fn play_slot(&mut self, stake: Parc) -> Result<(slot::SpinResult, RoundRecord)> {
        let pending = self.begin(GameKind::Slot, stake).await?;
        let result = slot::spin(&mut self.rng);
        let record = self.settle(pending, result.outcome).await;
        Ok((result, record))
    }

    /// Play one roulette spin with a single active bet.
    pub async fn play_roulette(
        &mut self,
        stake: Parc,
        bet: roulette::Bet,
    ) -> Result<(roulette::Spin, RoundRecord)> {
        bet.validate()?;
        let pending = self.begin(GameKind::Roulette, stake).await?;
        let spin = roulette::spin(&mut self.rng);
        let outcome = roulette::evaluate(bet, spin);
        let record = self.settle(pending, outcome).await;
        Ok((spin, record))
    }

    /// Debit a stake and deal a blackjack hand. The returned round holds
    /// the stake until [`SessionController::settle_blackjack`].
    pub async fn begin_blackjack(&mut self, stake: Parc) -> Result<BlackjackRound> {
        let pending = self.begin(GameKind::Blackjack, stake).await?;
        let mut inner = blackjack::Round::new();
        match inner.deal(&mut self.rng) {
            Ok(_) => Ok(BlackjackRound { inner, pending }),
            Err(err) => {
                // Unreachable with a fresh deck; settle the debited stake as
                // a loss rather than leaving the round dangling.
                self.settle(pending, RoundOutcome::LOSS).await;
                Err(err.into())
            }
        }
    }

    /// Report and record a finished blackjack hand. An unfinished hand is
    /// forfeited: the stake stays debited and the round reports as a loss.
    pub async fn settle_blackjack(&mut self, round: BlackjackRound) -> RoundRecord {
        let outcome = match round.inner.outcome() {
            Some(outcome) => outcome,
            None => {
                warn!("blackjack round settled before completion, forfeiting the stake");
                RoundOutcome::LOSS
            }
        };
        self.settle(round.pending, outcome).await
    }

    /// Gate a round start, then debit. On success the controller is marked
    /// in flight until the matching settle.
    async fn begin(&mut self, game: GameKind, stake: Parc) -> Result<PendingRound> {
        if stake == 0 {
            return Err(Error::ZeroStake);
        }
        if self.in_flight {
            return Err(Error::RoundInFlight);
        }
        if let Some(last) = self.last_start {
            let elapsed = last.elapsed();
            if elapsed < self.config.cooldown {
                let remaining = self.config.cooldown - elapsed;
                debug!(%game, ?remaining, "round start suppressed by cooldown");
                return Err(Error::Throttled {
                    remaining_ms: remaining.as_millis() as u64,
                });
            }
        }
        self.last_start = Some(Instant::now());

        if self.mode == Mode::Demo {
            self.in_flight = true;
            return Ok(PendingRound {
                game,
                stake,
                mode: Mode::Demo,
            });
        }

        if !self.balance.covers(stake) {
            return Err(Error::InsufficientBalance {
                detail: "balance below stake".to_string(),
            });
        }

        // Optimistic debit; rolled back if the authority refuses.
        self.balance.note_debit(stake);
        match self.authority.debit(stake, game).await {
            Ok(accepted) => {
                if let Some(parc) = accepted.current_balance {
                    self.balance.confirm_parc(parc);
                }
                self.in_flight = true;
                Ok(PendingRound {
                    game,
                    stake,
                    mode: Mode::Live,
                })
            }
            Err(err) => {
                self.balance.rollback_debit(stake);
                if err.is_transport() && self.config.demo_on_transport_failure {
                    warn!(%game, %err, "authority unreachable, degrading session to demo mode");
                    self.mode = Mode::Demo;
                }
                Err(err)
            }
        }
    }

    /// Report the outcome, update the optimistic balance, and record the
    /// round. Consumes the pending round: a round is settled exactly once,
    /// and its report goes out at most once even if it fails.
    async fn settle(&mut self, pending: PendingRound, outcome: RoundOutcome) -> RoundRecord {
        let PendingRound { game, stake, mode } = pending;
        let payout = outcome.payout(stake);

        if mode == Mode::Live {
            if payout > 0 {
                self.balance.note_credit(payout);
            }
            let report = ResultReport {
                game,
                won: outcome.won,
                amount: stake,
                multiplier: outcome.multiplier,
                pattern: outcome.pattern,
            };
            match self.authority.report_result(report).await {
                Ok(_) => debug!(%game, won = outcome.won, payout, "round reported"),
                Err(err) => {
                    // The outcome was already shown; the next confirmed
                    // refresh reconciles any balance drift.
                    warn!(%game, %err, "result report failed, deferring to balance refresh");
                }
            }
            self.schedule_refresh();
        }

        self.in_flight = false;
        let record = RoundRecord {
            game,
            stake,
            outcome,
            payout,
            mode,
            at: SystemTime::now(),
        };
        self.history.push_back(record.clone());
        while self.history.len() > self.config.history_limit {
            self.history.pop_front();
        }
        record
    }

    /// One-shot confirmed refresh shortly after a round, independent of
    /// whether its report landed.
    fn schedule_refresh(&self) {
        let authority = Arc::clone(&self.authority);
        let balance = self.balance.clone();
        let delay = self.config.refresh_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match authority.balance().await {
                Ok(snapshot) => balance.confirm(snapshot),
                Err(err) => debug!(%err, "post-round balance refresh failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{Failure, MockAuthority};
    use parcade_engine::SeededRandomness;
    use std::sync::atomic::Ordering;

    fn quick_config() -> SessionConfig {
        SessionConfig {
            cooldown: Duration::ZERO,
            refresh_delay: Duration::from_millis(1),
            ..SessionConfig::default()
        }
    }

    fn controller(
        authority: MockAuthority,
        config: SessionConfig,
    ) -> SessionController<MockAuthority, SeededRandomness> {
        SessionController::new(authority, SeededRandomness::from_seed(99), config)
    }

    #[tokio::test]
    async fn test_slot_round_reports_exactly_once() {
        let mut session = controller(MockAuthority::with_balance(1_000), quick_config());
        let (result, record) = session.play_slot(10).await.unwrap();

        let authority = session.authority();
        assert_eq!(authority.debit_calls.load(Ordering::SeqCst), 1);
        assert_eq!(authority.report_calls.load(Ordering::SeqCst), 1);
        assert_eq!(record.stake, 10);
        assert_eq!(record.outcome, result.outcome);

        let reports = authority.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].game, GameKind::Slot);
        assert_eq!(reports[0].amount, 10);
    }

    #[tokio::test]
    async fn test_debit_rejection_aborts_round() {
        let authority = MockAuthority::with_balance(1_000);
        *authority.debit_failure.lock().unwrap() = Failure::Insufficient;
        let mut session = controller(authority, quick_config());
        session.balance_handle().confirm(parcade_types::api::BalanceSnapshot {
            parc: 1_000,
            jpy: 0,
        });

        let err = session.play_slot(10).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));

        let authority = session.authority();
        assert_eq!(authority.debit_calls.load(Ordering::SeqCst), 1);
        // No outcome was computed, so nothing was reported.
        assert_eq!(authority.report_calls.load(Ordering::SeqCst), 0);
        // Optimistic debit rolled back.
        assert_eq!(session.displayed_balance().unwrap().parc, 1_000);
        // The controller is free for the next round.
        assert!(session.play_slot(10).await.is_err());
        assert_eq!(session.authority().debit_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_local_insufficiency_never_reaches_authority() {
        let mut session = controller(MockAuthority::with_balance(1_000), quick_config());
        session
            .balance_handle()
            .confirm(parcade_types::api::BalanceSnapshot { parc: 5, jpy: 0 });

        let err = session.play_slot(10).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));
        assert_eq!(session.authority().debit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_degrades_to_demo() {
        let authority = MockAuthority::with_balance(1_000);
        *authority.debit_failure.lock().unwrap() = Failure::Transport;
        let mut session = controller(authority, quick_config());

        let err = session.play_slot(10).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(session.mode(), Mode::Demo);

        // Subsequent rounds run cosmetically, without authority calls.
        let (_, record) = session.play_slot(10).await.unwrap();
        assert_eq!(record.mode, Mode::Demo);
        let authority = session.authority();
        assert_eq!(authority.debit_calls.load(Ordering::SeqCst), 1);
        assert_eq!(authority.report_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_without_fallback_stays_live() {
        let authority = MockAuthority::with_balance(1_000);
        *authority.debit_failure.lock().unwrap() = Failure::Transport;
        let config = SessionConfig {
            demo_on_transport_failure: false,
            ..quick_config()
        };
        let mut session = controller(authority, config);

        assert!(session.play_slot(10).await.is_err());
        assert_eq!(session.mode(), Mode::Live);
    }

    #[tokio::test]
    async fn test_report_failure_still_completes_round() {
        let authority = MockAuthority::with_balance(1_000);
        *authority.report_failure.lock().unwrap() = Failure::Transport;
        let mut session = controller(authority, quick_config());

        let (_, record) = session.play_slot(10).await.unwrap();
        assert_eq!(record.stake, 10);

        let authority = session.authority();
        // The report was attempted exactly once and never retried.
        assert_eq!(authority.report_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.history().count(), 1);
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_rapid_rounds() {
        let config = SessionConfig {
            cooldown: Duration::from_millis(500),
            ..quick_config()
        };
        let mut session = controller(MockAuthority::with_balance(1_000), config);

        session.play_slot(10).await.unwrap();
        let err = session.play_slot(10).await.unwrap_err();
        assert!(matches!(err, Error::Throttled { .. }));
        assert_eq!(session.authority().debit_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blackjack_blocks_other_rounds_until_settled() {
        let mut session = controller(MockAuthority::with_balance(1_000), quick_config());
        let mut round = session.begin_blackjack(10).await.unwrap();

        let err = session.play_slot(10).await.unwrap_err();
        assert!(matches!(err, Error::RoundInFlight));

        while !round.is_over() {
            if blackjack::hand_value(round.player()) < 17 {
                round.hit().unwrap();
            } else {
                round.stand().unwrap();
            }
        }
        let record = session.settle_blackjack(round).await;
        assert_eq!(record.game, GameKind::Blackjack);
        assert_eq!(session.authority().report_calls.load(Ordering::SeqCst), 1);

        // Free again.
        assert!(session.play_slot(10).await.is_ok());
    }

    #[tokio::test]
    async fn test_unfinished_blackjack_forfeits() {
        let mut session = controller(MockAuthority::with_balance(1_000), quick_config());
        let round = session.begin_blackjack(10).await.unwrap();
        if round.is_over() {
            // Natural on the deal; nothing to forfeit in this seeding.
            return;
        }
        let record = session.settle_blackjack(round).await;
        assert!(!record.outcome.won);
        assert_eq!(record.payout, 0);
        let reports = session.authority().reports.lock().unwrap().clone();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].won);
    }

    #[tokio::test]
    async fn test_demo_mode_makes_no_authority_calls() {
        let authority = MockAuthority::with_balance(1_000);
        let mut session = SessionController::demo(
            authority,
            SeededRandomness::from_seed(5),
            quick_config(),
        );

        session.play_slot(10).await.unwrap();
        session
            .play_roulette(10, roulette::Bet::Red)
            .await
            .unwrap();

        let authority = session.authority();
        assert_eq!(authority.debit_calls.load(Ordering::SeqCst), 0);
        assert_eq!(authority.report_calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.history().count(), 2);
    }

    #[tokio::test]
    async fn test_zero_stake_rejected() {
        let mut session = controller(MockAuthority::with_balance(1_000), quick_config());
        assert!(matches!(
            session.play_slot(0).await.unwrap_err(),
            Error::ZeroStake
        ));
        assert_eq!(session.authority().debit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_roulette_bet_rejected_before_debit() {
        let mut session = controller(MockAuthority::with_balance(1_000), quick_config());
        let err = session
            .play_roulette(10, roulette::Bet::Straight(40))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBet(_)));
        assert_eq!(session.authority().debit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_health_probe_degrades() {
        let authority = MockAuthority::with_balance(1_000);
        authority.healthy.store(false, Ordering::SeqCst);
        let mut session = controller(authority, quick_config());

        assert!(!session.probe_health().await);
        assert_eq!(session.mode(), Mode::Demo);
    }

    #[tokio::test]
    async fn test_debit_echo_becomes_confirmed_balance() {
        let authority = MockAuthority::with_balance(1_000);
        authority.echo_balance.store(true, Ordering::SeqCst);
        let mut session = controller(authority, quick_config());

        let (result, _) = session.play_slot(10).await.unwrap();
        let displayed = session.displayed_balance().unwrap();
        // Echoed post-debit balance plus the optimistic payout credit.
        assert_eq!(displayed.parc, 990 + result.outcome.payout(10));
    }
}
