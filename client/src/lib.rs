//! Session layer for the parcade casino games.
//!
//! The balance authority (the remote portal backend) is the only source of
//! truth for balances. This crate sequences each round against it:
//!
//! 1. debit the stake ([`authority::BalanceAuthority::debit`]),
//! 2. resolve the outcome locally with `parcade-engine`,
//! 3. report the outcome (never retried; reconciliation catches drift),
//! 4. schedule a confirmed balance refresh.
//!
//! [`session::SessionController`] enforces one round in flight and a
//! cooldown between round starts. [`poller::spawn`] keeps the displayed
//! balance reconciled in the background. Everything degrades to demo mode
//! instead of failing hard when the authority is unreachable.

pub mod authority;
pub mod balance;
pub mod poller;
pub mod session;

#[cfg(test)]
pub(crate) mod mocks;

pub use authority::{BalanceAuthority, HttpAuthority, RetryPolicy};
pub use balance::SharedBalance;
pub use session::{Mode, SessionConfig, SessionController};

use thiserror::Error;

/// Error type for session and authority operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The authority refused the debit for lack of funds. Blocks the round;
    /// never retried.
    #[error("insufficient balance: {detail}")]
    InsufficientBalance { detail: String },
    /// The authority rejected our credentials.
    #[error("authorization rejected ({0})")]
    Unauthorized(reqwest::StatusCode),
    /// The authority is shedding load; callers skip and try again later.
    #[error("rate limited")]
    RateLimited,
    /// The request exceeded its per-call deadline.
    #[error("request timed out")]
    Timeout,
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("unexpected response body")]
    UnexpectedResponse,
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
    /// A round is already in flight on this controller.
    #[error("a round is already in flight")]
    RoundInFlight,
    /// Round started inside the cooldown window of the previous one.
    #[error("throttled: {remaining_ms} ms of cooldown remaining")]
    Throttled { remaining_ms: u64 },
    #[error("stake must be positive")]
    ZeroStake,
    #[error(transparent)]
    InvalidBet(#[from] parcade_engine::roulette::InvalidBet),
    #[error(transparent)]
    Transition(#[from] parcade_engine::blackjack::TransitionError),
}

impl Error {
    /// True for failures of the transport itself (timeouts, connection
    /// errors) as opposed to the authority answering with a rejection.
    /// Transport failures are what demo-mode fallback keys on.
    pub fn is_transport(&self) -> bool {
        match self {
            Error::Timeout => true,
            Error::Reqwest(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            _ => false,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
