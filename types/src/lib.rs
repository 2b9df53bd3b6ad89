pub mod api;
pub mod cards;
pub mod casino;

pub use casino::{GameKind, Pattern, RoundOutcome};

/// Amount of PARC, the in-game currency. Balances and stakes are whole units.
pub type Parc = u64;
