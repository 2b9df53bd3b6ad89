//! JSON wire types for the balance-authority REST API.
//!
//! The authority is the single source of truth for balances. This module
//! only describes the request/response bodies; transport concerns (auth
//! headers, timeouts, retries) live in the client crate.
//!
//! Endpoints:
//! - `GET  /healthz`       -> [`Healthz`]
//! - `GET  /users/me`      -> [`BalanceSnapshot`]
//! - `POST /casino/bet`    [`BetRequest`] -> [`BetAccepted`]
//! - `POST /casino/result` [`ResultReport`] -> [`ResultAck`]

use crate::{GameKind, Parc, Pattern};
use serde::{Deserialize, Serialize};

/// Debit request sent when a round starts. Lives only for the duration of
/// the request; never persisted client-side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetRequest {
    pub amount: Parc,
    pub game: GameKind,
}

/// Successful debit acknowledgement. The authority may echo the balance it
/// holds after the debit; when present the client treats it as a confirmed
/// snapshot of the PARC balance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetAccepted {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_balance: Option<Parc>,
}

/// Outcome report sent after a round resolves locally. The authority is
/// trusted to apply the balance change; the client never does its own
/// authoritative accounting.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultReport {
    pub game: GameKind,
    pub won: bool,
    /// The stake that was debited when the round started.
    pub amount: Parc,
    /// Total-return multiplier on the stake (0 for a loss, 1 for a push).
    pub multiplier: f64,
    #[serde(default)]
    pub pattern: Option<Pattern>,
}

/// Acknowledgement of a result report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultAck {
    pub ack: bool,
}

/// Account balances as held by the authority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// PARC balance, the currency casino rounds are staked in.
    #[serde(rename = "balance")]
    pub parc: Parc,
    /// Secondary fiat-pegged balance, displayed but never staked.
    #[serde(rename = "jpy_balance")]
    pub jpy: u64,
}

/// Liveness response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Healthz {
    pub ok: bool,
}

/// Error body returned by the authority on rejected requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
