//! Local balance authority.
//!
//! Speaks the same REST API as the production backend so the client crate
//! can run full rounds against it in tests, demos, and load experiments.
//! Accounts are keyed by bearer token and materialize on first touch with
//! the configured starting balances. Fault-injection knobs (latency, error
//! rate, per-account rate limiting) exercise the client's degradation
//! paths.

pub mod api;

pub use api::Api;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use parcade_types::api::{BalanceSnapshot, ResultReport};
use parcade_types::Parc;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Simulator tuning knobs.
#[derive(Clone, Copy, Debug)]
pub struct SimulatorConfig {
    /// PARC granted to an account on first touch.
    pub starting_parc: Parc,
    /// JPY granted to an account on first touch.
    pub starting_jpy: u64,
    /// Probability that a bet or result call fails with a 500.
    pub fail_rate: f64,
    /// Added latency per request.
    pub latency: Duration,
    /// Per-account balance fetches allowed per second. `None` is unlimited.
    pub balance_rate_limit: Option<NonZeroU32>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            starting_parc: 1_000,
            starting_jpy: 0,
            fail_rate: 0.0,
            latency: Duration::ZERO,
            balance_rate_limit: None,
        }
    }
}

/// Rejected debit.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DebitError {
    #[error("balance below stake")]
    Insufficient,
}

/// In-memory account store with the backend's balance semantics.
pub struct Simulator {
    config: SimulatorConfig,
    accounts: Mutex<HashMap<String, BalanceSnapshot>>,
    limiter: Option<KeyedLimiter>,
    results: Mutex<Vec<(String, ResultReport)>>,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let limiter = config
            .balance_rate_limit
            .map(|per_second| RateLimiter::keyed(Quota::per_second(per_second)));
        Self {
            config,
            accounts: Mutex::new(HashMap::new()),
            limiter,
            results: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<String, BalanceSnapshot>> {
        match self.accounts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Current balances for `token`, creating the account on first touch.
    pub fn balance_of(&self, token: &str) -> BalanceSnapshot {
        let starting = BalanceSnapshot {
            parc: self.config.starting_parc,
            jpy: self.config.starting_jpy,
        };
        *self
            .accounts()
            .entry(token.to_string())
            .or_insert(starting)
    }

    /// Debit a stake; returns the post-debit PARC balance.
    pub fn debit(&self, token: &str, amount: Parc) -> Result<Parc, DebitError> {
        let starting = BalanceSnapshot {
            parc: self.config.starting_parc,
            jpy: self.config.starting_jpy,
        };
        let mut accounts = self.accounts();
        let snapshot = accounts.entry(token.to_string()).or_insert(starting);
        if snapshot.parc < amount {
            return Err(DebitError::Insufficient);
        }
        snapshot.parc -= amount;
        Ok(snapshot.parc)
    }

    /// Apply a reported round: credit `stake * multiplier` on a win.
    pub fn apply_result(&self, token: &str, report: ResultReport) {
        if report.won {
            let payout = (report.amount as f64 * report.multiplier).round() as Parc;
            let starting = BalanceSnapshot {
                parc: self.config.starting_parc,
                jpy: self.config.starting_jpy,
            };
            let mut accounts = self.accounts();
            let snapshot = accounts.entry(token.to_string()).or_insert(starting);
            snapshot.parc = snapshot.parc.saturating_add(payout);
        }
        info!(
            token,
            game = %report.game,
            won = report.won,
            multiplier = report.multiplier,
            "round reported"
        );
        match self.results.lock() {
            Ok(mut results) => results.push((token.to_string(), report)),
            Err(poisoned) => poisoned.into_inner().push((token.to_string(), report)),
        }
    }

    /// Reported rounds in arrival order, for assertions and inspection.
    pub fn results(&self) -> Vec<(String, ResultReport)> {
        match self.results.lock() {
            Ok(results) => results.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Whether `token` still has balance-fetch quota this second.
    pub fn check_balance_quota(&self, token: &str) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check_key(&token.to_string()).is_ok(),
            None => true,
        }
    }
}
