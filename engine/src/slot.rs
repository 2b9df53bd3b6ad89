//! Slot machine outcome evaluator.
//!
//! Three reels are drawn independently from a fixed weighted symbol set,
//! then the paytable is checked in order: triple, pair, lone-Seven bonus.
//! The lone-Seven bonus only pays on a 25% side roll.

use crate::rng::Randomness;
use parcade_types::{Pattern, RoundOutcome};
use std::fmt;

/// Number of reels per spin.
pub const REELS: usize = 3;

/// Paytable multipliers (total return on the stake).
mod payouts {
    pub const JACKPOT_SEVENS: f64 = 50.0;
    pub const JACKPOT_DIAMONDS: f64 = 20.0;
    pub const JACKPOT: f64 = 10.0;
    pub const PAIR_SEVENS: f64 = 5.0;
    pub const PAIR: f64 = 2.0;
    pub const LUCKY7: f64 = 1.5;
}

/// Probability that a lone Seven pays the bonus.
const LUCKY7_CHANCE: f64 = 0.25;

/// Reel symbols, ordered from most to least common.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Symbol {
    Cherry = 0,
    Bell = 1,
    Star = 2,
    Melon = 3,
    Diamond = 4,
    Seven = 5,
}

impl Symbol {
    /// All symbols in weight order.
    pub const ALL: [Symbol; 6] = [
        Symbol::Cherry,
        Symbol::Bell,
        Symbol::Star,
        Symbol::Melon,
        Symbol::Diamond,
        Symbol::Seven,
    ];

    /// Draw weight out of [`TOTAL_WEIGHT`].
    pub fn weight(&self) -> u32 {
        match self {
            Symbol::Cherry => 35,
            Symbol::Bell => 25,
            Symbol::Star => 20,
            Symbol::Melon => 10,
            Symbol::Diamond => 8,
            Symbol::Seven => 2,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Symbol::Cherry => "cherry",
            Symbol::Bell => "bell",
            Symbol::Star => "star",
            Symbol::Melon => "melon",
            Symbol::Diamond => "diamond",
            Symbol::Seven => "seven",
        };
        f.write_str(s)
    }
}

/// Sum of all symbol weights.
pub const TOTAL_WEIGHT: u32 = 100;

/// A resolved spin: the reels that came up plus the settled outcome.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpinResult {
    pub reels: [Symbol; REELS],
    pub outcome: RoundOutcome,
}

/// Draw one symbol from the weighted distribution.
fn draw_symbol(rng: &mut impl Randomness) -> Symbol {
    let mut roll = rng.next_f64() * TOTAL_WEIGHT as f64;
    for symbol in Symbol::ALL {
        roll -= symbol.weight() as f64;
        if roll <= 0.0 {
            return symbol;
        }
    }
    // roll < TOTAL_WEIGHT, so the loop always terminates inside.
    Symbol::Cherry
}

/// Spin the reels and settle the outcome.
pub fn spin(rng: &mut impl Randomness) -> SpinResult {
    let reels = [draw_symbol(rng), draw_symbol(rng), draw_symbol(rng)];
    let outcome = evaluate(reels, rng);
    SpinResult { reels, outcome }
}

/// Settle fixed reels against the paytable.
///
/// Separated from [`spin`] so callers can evaluate a known reel layout; the
/// randomness source is still needed for the lone-Seven side roll.
pub fn evaluate(reels: [Symbol; REELS], rng: &mut impl Randomness) -> RoundOutcome {
    let [a, b, c] = reels;

    if a == b && b == c {
        let multiplier = match a {
            Symbol::Seven => payouts::JACKPOT_SEVENS,
            Symbol::Diamond => payouts::JACKPOT_DIAMONDS,
            _ => payouts::JACKPOT,
        };
        return RoundOutcome::win(multiplier, Some(Pattern::Jackpot));
    }

    let pair = if a == b || a == c {
        Some(a)
    } else if b == c {
        Some(b)
    } else {
        None
    };
    if let Some(symbol) = pair {
        let multiplier = if symbol == Symbol::Seven {
            payouts::PAIR_SEVENS
        } else {
            payouts::PAIR
        };
        return RoundOutcome::win(multiplier, Some(Pattern::Pair));
    }

    if reels.contains(&Symbol::Seven) && rng.chance(LUCKY7_CHANCE) {
        return RoundOutcome::win(payouts::LUCKY7, Some(Pattern::Lucky7));
    }

    RoundOutcome::LOSS
}
