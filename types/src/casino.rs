//! Core casino vocabulary shared by the engine, the session layer, and the
//! balance authority protocol.

use crate::Parc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Casino game kinds offered by the portal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum GameKind {
    Slot = 0,
    Roulette = 1,
    Blackjack = 2,
}

impl GameKind {
    /// All game kinds, in display order.
    pub const ALL: [GameKind; 3] = [GameKind::Slot, GameKind::Roulette, GameKind::Blackjack];
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameKind::Slot => write!(f, "slot"),
            GameKind::Roulette => write!(f, "roulette"),
            GameKind::Blackjack => write!(f, "blackjack"),
        }
    }
}

impl TryFrom<u8> for GameKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(GameKind::Slot),
            1 => Ok(GameKind::Roulette),
            2 => Ok(GameKind::Blackjack),
            i => Err(i),
        }
    }
}

/// Tag classifying how a round was won. Reported to the balance authority
/// alongside the multiplier so the backend can log payout provenance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Slot: all three reels matched.
    Jackpot,
    /// Slot: exactly two reels matched.
    Pair,
    /// Slot: a lone Seven triggered the 25% bonus.
    Lucky7,
    /// Roulette: straight-number bet hit.
    ExactNumber,
    Red,
    Black,
    Odd,
    Even,
    Low,
    High,
    /// Blackjack: natural 21 on the opening deal.
    Blackjack,
}

impl Pattern {
    /// Wire representation, identical to the serde encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            Pattern::Jackpot => "jackpot",
            Pattern::Pair => "pair",
            Pattern::Lucky7 => "lucky7",
            Pattern::ExactNumber => "exact_number",
            Pattern::Red => "red",
            Pattern::Black => "black",
            Pattern::Odd => "odd",
            Pattern::Even => "even",
            Pattern::Low => "low",
            Pattern::High => "high",
            Pattern::Blackjack => "blackjack",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settled result of a single round, independent of which game produced it.
///
/// The multiplier is a TOTAL RETURN factor on the stake: the stake was
/// debited when the round started, and a won round credits
/// `stake * multiplier` back. A push is therefore `won` with multiplier 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoundOutcome {
    pub won: bool,
    pub multiplier: f64,
    pub pattern: Option<Pattern>,
}

impl RoundOutcome {
    /// A losing round: nothing credited back.
    pub const LOSS: RoundOutcome = RoundOutcome {
        won: false,
        multiplier: 0.0,
        pattern: None,
    };

    /// A winning round with the given total-return multiplier.
    pub fn win(multiplier: f64, pattern: Option<Pattern>) -> Self {
        Self {
            won: true,
            multiplier,
            pattern,
        }
    }

    /// Amount credited back for this outcome at the given stake.
    pub fn payout(&self, stake: Parc) -> Parc {
        if !self.won {
            return 0;
        }
        // Multipliers are small (at most 50) and stakes are whole PARC, so
        // f64 holds the product exactly for any realistic stake.
        (stake as f64 * self.multiplier).round() as Parc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payout_totals() {
        assert_eq!(RoundOutcome::win(10.0, Some(Pattern::Jackpot)).payout(10), 100);
        assert_eq!(RoundOutcome::win(1.5, Some(Pattern::Lucky7)).payout(10), 15);
        assert_eq!(RoundOutcome::win(2.5, Some(Pattern::Blackjack)).payout(10), 25);
        assert_eq!(RoundOutcome::win(1.0, None).payout(10), 10);
        assert_eq!(RoundOutcome::LOSS.payout(10), 0);
    }

    #[test]
    fn test_game_kind_round_trip() {
        for kind in GameKind::ALL {
            assert_eq!(GameKind::try_from(kind as u8), Ok(kind));
        }
        assert_eq!(GameKind::try_from(3), Err(3));
    }

    #[test]
    fn test_pattern_wire_names() {
        assert_eq!(Pattern::ExactNumber.as_str(), "exact_number");
        assert_eq!(Pattern::Lucky7.as_str(), "lucky7");
        let json = serde_json::to_string(&Pattern::ExactNumber).unwrap();
        assert_eq!(json, "\"exact_number\"");
    }
}
