//! Game outcome evaluators.
//!
//! This crate contains the game logic for the casino games:
//! - Slot machine (weighted three-reel draw)
//! - European roulette (single bet per spin)
//! - Blackjack (player-vs-dealer round state machine)
//!
//! Everything here is pure computation over an injected [`rng::Randomness`]
//! source. No I/O, no balances: staking and settlement are the session
//! layer's concern, and the authoritative accounting happens on the remote
//! balance authority.

pub mod blackjack;
pub mod rng;
pub mod roulette;
pub mod slot;

pub use rng::{Randomness, SeededRandomness, ThreadRandomness};
