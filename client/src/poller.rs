//! Background balance reconciliation.
//!
//! A poller fetches the authoritative balance on a fixed interval with a
//! per-tick jitter so a fleet of clients does not thundering-herd the
//! backend. Each fetch is bounded by the authority's own deadline; a fetch
//! that fails or times out is abandoned without side effects and the next
//! tick tries again. Overlap with an in-flight round is fine: confirmed
//! snapshots always win on reconcile.

use crate::authority::BalanceAuthority;
use crate::balance::SharedBalance;
use crate::Error;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Poller tuning knobs.
#[derive(Clone, Copy, Debug)]
pub struct PollerConfig {
    /// Base gap between fetches.
    pub interval: Duration,
    /// Uniform random addition to each gap.
    pub jitter: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            jitter: Duration::from_secs(5),
        }
    }
}

/// Handle to a running poller. Dropping it stops the poller.
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop polling. Any in-flight fetch is abandoned; that is safe because
    /// fetches have no side effects beyond the confirmed snapshot.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start a background poller that reconciles `balance` from `authority`.
/// Fetches once immediately, then on every jittered interval.
pub fn spawn<A>(authority: Arc<A>, balance: SharedBalance, config: PollerConfig) -> PollerHandle
where
    A: BalanceAuthority + 'static,
{
    let task = tokio::spawn(async move {
        refresh(&authority, &balance).await;
        loop {
            let pause = config.interval + Duration::from_millis(jitter_millis(config.jitter));
            tokio::time::sleep(pause).await;
            refresh(&authority, &balance).await;
        }
    });
    PollerHandle { task }
}

async fn refresh<A: BalanceAuthority>(authority: &Arc<A>, balance: &SharedBalance) {
    match authority.balance().await {
        Ok(snapshot) => {
            balance.confirm(snapshot);
            debug!(parc = snapshot.parc, jpy = snapshot.jpy, "balance reconciled");
        }
        // Shed load quietly and try again next tick.
        Err(Error::RateLimited) => debug!("balance refresh rate limited, retrying next tick"),
        Err(err) if err.is_transport() => warn!(%err, "balance refresh abandoned"),
        Err(err) => warn!(%err, "balance refresh failed"),
    }
}

fn jitter_millis(jitter: Duration) -> u64 {
    let max = jitter.as_millis() as u64;
    if max == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{Failure, MockAuthority};
    use parcade_types::api::BalanceSnapshot;
    use std::sync::atomic::Ordering;

    fn fast_config() -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(10),
            jitter: Duration::ZERO,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_reconciles_on_interval() {
        let authority = Arc::new(MockAuthority::with_balance(500));
        let balance = SharedBalance::new();
        let handle = spawn(Arc::clone(&authority), balance.clone(), fast_config());

        tokio::time::sleep(Duration::from_millis(35)).await;
        assert!(authority.balance_calls.load(Ordering::SeqCst) >= 3);
        assert_eq!(
            balance.displayed(),
            Some(BalanceSnapshot { parc: 500, jpy: 0 })
        );
        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_overwrites_optimistic_drift() {
        let authority = Arc::new(MockAuthority::with_balance(500));
        let balance = SharedBalance::new();
        balance.confirm(BalanceSnapshot { parc: 100, jpy: 0 });
        balance.note_debit(40);

        let _handle = spawn(Arc::clone(&authority), balance.clone(), fast_config());
        tokio::time::sleep(Duration::from_millis(15)).await;

        // The authority's 500 replaces both the stale snapshot and the
        // optimistic delta.
        assert_eq!(balance.displayed().unwrap().parc, 500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_tolerates_rate_limiting() {
        let authority = Arc::new(MockAuthority::with_balance(500));
        *authority.balance_failure.lock().unwrap() = Failure::RateLimited;
        let balance = SharedBalance::new();
        let _handle = spawn(Arc::clone(&authority), balance.clone(), fast_config());

        tokio::time::sleep(Duration::from_millis(25)).await;
        // Kept polling, never confirmed anything.
        assert!(authority.balance_calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(balance.displayed(), None);

        // Once the limiter relents the next tick reconciles.
        *authority.balance_failure.lock().unwrap() = Failure::None;
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(balance.displayed().unwrap().parc, 500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_polling() {
        let authority = Arc::new(MockAuthority::with_balance(500));
        let handle = spawn(Arc::clone(&authority), SharedBalance::new(), fast_config());

        tokio::time::sleep(Duration::from_millis(15)).await;
        handle.shutdown();
        let calls = authority.balance_calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(authority.balance_calls.load(Ordering::SeqCst), calls);
    }
}
