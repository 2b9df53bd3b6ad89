//! European roulette outcome evaluator.
//!
//! The wheel has 37 pockets laid out in the standard (non-sequential)
//! physical order; colors come from that layout, not from parity. A spin
//! picks one pocket uniformly. Exactly one bet is active per spin, and zero
//! wins nothing except a straight bet on zero itself.

use crate::rng::Randomness;
use parcade_types::{Pattern, RoundOutcome};
use thiserror::Error;

/// Straight-number total return.
const STRAIGHT_MULTIPLIER: f64 = 36.0;
/// Even-money total return (red/black, odd/even, low/high).
const EVEN_MONEY_MULTIPLIER: f64 = 2.0;

/// Pocket colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Green,
    Red,
    Black,
}

/// The wheel in physical order, starting at the zero pocket.
pub const WHEEL: [(u8, Color); 37] = [
    (0, Color::Green),
    (32, Color::Red),
    (15, Color::Black),
    (19, Color::Red),
    (4, Color::Black),
    (21, Color::Red),
    (2, Color::Black),
    (25, Color::Red),
    (17, Color::Black),
    (34, Color::Red),
    (6, Color::Black),
    (27, Color::Red),
    (13, Color::Black),
    (36, Color::Red),
    (11, Color::Black),
    (30, Color::Red),
    (8, Color::Black),
    (23, Color::Red),
    (10, Color::Black),
    (5, Color::Red),
    (24, Color::Black),
    (16, Color::Red),
    (33, Color::Black),
    (1, Color::Red),
    (20, Color::Black),
    (14, Color::Red),
    (31, Color::Black),
    (9, Color::Red),
    (22, Color::Black),
    (18, Color::Red),
    (29, Color::Black),
    (7, Color::Red),
    (28, Color::Black),
    (12, Color::Red),
    (35, Color::Black),
    (3, Color::Red),
    (26, Color::Black),
];

/// Color of a pocket per the wheel layout. `number` must be `0..=36`.
pub fn color_of(number: u8) -> Color {
    WHEEL
        .iter()
        .find(|(n, _)| *n == number)
        .map(|(_, color)| *color)
        .expect("number outside 0..=36")
}

/// A single roulette bet. Only one may be active per spin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bet {
    /// A single number, paying 36x total.
    Straight(u8),
    Red,
    Black,
    Odd,
    Even,
    /// 1-18.
    Low,
    /// 19-36.
    High,
}

/// Bet rejected before the wheel is spun.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum InvalidBet {
    #[error("straight bet on {0}: number must be 0-36")]
    NumberOutOfRange(u8),
}

impl Bet {
    /// Validate the bet. Must pass before a spin is paid for.
    pub fn validate(&self) -> Result<(), InvalidBet> {
        match self {
            Bet::Straight(n) if *n > 36 => Err(InvalidBet::NumberOutOfRange(*n)),
            _ => Ok(()),
        }
    }

    /// Total-return multiplier when this bet wins.
    pub fn multiplier(&self) -> f64 {
        match self {
            Bet::Straight(_) => STRAIGHT_MULTIPLIER,
            _ => EVEN_MONEY_MULTIPLIER,
        }
    }

    /// Pattern tag reported when this bet wins.
    pub fn pattern(&self) -> Pattern {
        match self {
            Bet::Straight(_) => Pattern::ExactNumber,
            Bet::Red => Pattern::Red,
            Bet::Black => Pattern::Black,
            Bet::Odd => Pattern::Odd,
            Bet::Even => Pattern::Even,
            Bet::Low => Pattern::Low,
            Bet::High => Pattern::High,
        }
    }
}

/// One drawn pocket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Spin {
    pub number: u8,
    pub color: Color,
}

/// Spin the wheel: one uniform draw over the 37 pockets.
///
/// The outcome is fully determined here; any presentation delay the caller
/// adds must not feed back into it.
pub fn spin(rng: &mut impl Randomness) -> Spin {
    let (number, color) = WHEEL[rng.next_bounded(WHEEL.len())];
    Spin { number, color }
}

/// Settle a validated bet against a drawn pocket.
pub fn evaluate(bet: Bet, spin: Spin) -> RoundOutcome {
    let won = match bet {
        Bet::Straight(n) => n == spin.number,
        // Zero is excluded from every categorical bet.
        _ if spin.number == 0 => false,
        Bet::Red => spin.color == Color::Red,
        Bet::Black => spin.color == Color::Black,
        Bet::Odd => spin.number % 2 == 1,
        Bet::Even => spin.number % 2 == 0,
        Bet::Low => (1..=18).contains(&spin.number),
        Bet::High => (19..=36).contains(&spin.number),
    };

    if won {
        RoundOutcome::win(bet.multiplier(), Some(bet.pattern()))
    } else {
        RoundOutcome::LOSS
    }
}
