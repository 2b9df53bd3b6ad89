//! Programmable in-memory authority for session tests.

use crate::authority::BalanceAuthority;
use crate::{Error, Result};
use async_trait::async_trait;
use parcade_types::api::{BalanceSnapshot, BetAccepted, ResultAck, ResultReport};
use parcade_types::{GameKind, Parc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Failure injected into the next calls of an endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    None,
    /// Authority answers with a funds rejection.
    Insufficient,
    /// Transport-level failure (deadline exceeded).
    Transport,
    /// Authority sheds load.
    RateLimited,
}

impl Failure {
    fn into_error(self) -> Option<Error> {
        match self {
            Failure::None => None,
            Failure::Insufficient => Some(Error::InsufficientBalance {
                detail: "mock: funds rejected".to_string(),
            }),
            Failure::Transport => Some(Error::Timeout),
            Failure::RateLimited => Some(Error::RateLimited),
        }
    }
}

/// Counts every call and applies balance changes like the real backend.
pub struct MockAuthority {
    pub snapshot: Mutex<BalanceSnapshot>,
    pub debit_calls: AtomicUsize,
    pub report_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub debit_failure: Mutex<Failure>,
    pub report_failure: Mutex<Failure>,
    pub balance_failure: Mutex<Failure>,
    pub healthy: AtomicBool,
    /// Echo the post-debit balance in debit responses.
    pub echo_balance: AtomicBool,
    pub reports: Mutex<Vec<ResultReport>>,
}

impl MockAuthority {
    pub fn with_balance(parc: Parc) -> Self {
        Self {
            snapshot: Mutex::new(BalanceSnapshot { parc, jpy: 0 }),
            debit_calls: AtomicUsize::new(0),
            report_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
            debit_failure: Mutex::new(Failure::None),
            report_failure: Mutex::new(Failure::None),
            balance_failure: Mutex::new(Failure::None),
            healthy: AtomicBool::new(true),
            echo_balance: AtomicBool::new(false),
            reports: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BalanceAuthority for MockAuthority {
    async fn debit(&self, amount: Parc, _game: GameKind) -> Result<BetAccepted> {
        self.debit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.debit_failure.lock().unwrap().into_error() {
            return Err(err);
        }

        let mut snapshot = self.snapshot.lock().unwrap();
        if snapshot.parc < amount {
            return Err(Error::InsufficientBalance {
                detail: "mock: balance below stake".to_string(),
            });
        }
        snapshot.parc -= amount;

        let current_balance = self
            .echo_balance
            .load(Ordering::SeqCst)
            .then_some(snapshot.parc);
        Ok(BetAccepted { current_balance })
    }

    async fn report_result(&self, report: ResultReport) -> Result<ResultAck> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.report_failure.lock().unwrap().into_error() {
            return Err(err);
        }

        if report.won {
            let payout = (report.amount as f64 * report.multiplier).round() as Parc;
            self.snapshot.lock().unwrap().parc += payout;
        }
        self.reports.lock().unwrap().push(report);
        Ok(ResultAck { ack: true })
    }

    async fn balance(&self) -> Result<BalanceSnapshot> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.balance_failure.lock().unwrap().into_error() {
            return Err(err);
        }
        Ok(*self.snapshot.lock().unwrap())
    }

    async fn healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}
