//! Blackjack round state machine.
//!
//! Phases: `Betting -> Playing -> DealerTurn -> GameOver`. Transitions are
//! methods that reject out-of-phase calls instead of silently ignoring
//! them, so a stale UI event can never corrupt a round.
//!
//! Rules:
//! - Natural 21 on the opening deal ends the round immediately (push if
//!   the dealer also holds 21, otherwise a 2.5x blackjack).
//! - Hitting to exactly 21 auto-stands; above 21 busts.
//! - The dealer draws to 16 and stands on all 17s, soft included.
//!
//! Total-return multipliers: blackjack 2.5, win 2, push 1, loss/bust 0.

use crate::rng::Randomness;
use parcade_types::cards::{Card, Deck, Hand};
use parcade_types::{Pattern, RoundOutcome};
use thiserror::Error;

/// The dealer stands once their hand reaches this value.
const DEALER_STAND: u8 = 17;

/// The target hand value.
const TARGET: u8 = 21;

/// Round phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Betting,
    Playing,
    DealerTurn,
    GameOver,
}

/// Terminal round results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundResult {
    /// Natural 21 on the opening two cards.
    Blackjack,
    Win,
    Push,
    Lose,
    /// Player exceeded 21.
    Bust,
}

impl RoundResult {
    /// Settled outcome for result reporting.
    pub fn outcome(&self) -> RoundOutcome {
        match self {
            RoundResult::Blackjack => RoundOutcome::win(2.5, Some(Pattern::Blackjack)),
            RoundResult::Win => RoundOutcome::win(2.0, None),
            RoundResult::Push => RoundOutcome::win(1.0, None),
            RoundResult::Lose | RoundResult::Bust => RoundOutcome::LOSS,
        }
    }
}

/// Rejected transition.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("{action} is not allowed in the {phase:?} phase")]
    WrongPhase {
        action: &'static str,
        phase: Phase,
    },
    #[error("deck exhausted")]
    DeckExhausted,
}

/// Best value of a hand: aces count 11, demoted to 1 one at a time while
/// the total exceeds 21. This yields the standard soft/hard semantics.
pub fn hand_value(cards: &[Card]) -> u8 {
    let mut value: u16 = 0;
    let mut aces: u8 = 0;

    for card in cards {
        if card.rank.is_ace() {
            aces += 1;
            value += 11;
        } else {
            value += card.rank.face_value() as u16;
        }
    }

    while value > TARGET as u16 && aces > 0 {
        value -= 10;
        aces -= 1;
    }

    value.min(u8::MAX as u16) as u8
}

/// True if the hand is a natural: 21 from exactly two cards.
pub fn is_natural(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_value(cards) == TARGET
}

/// A single blackjack round. Created in `Betting`; the deck is shuffled and
/// dealt on [`Round::deal`], and every later card comes off the same deck.
#[derive(Clone, Debug)]
pub struct Round {
    deck: Deck,
    player: Hand,
    dealer: Hand,
    phase: Phase,
    result: Option<RoundResult>,
}

impl Round {
    pub fn new() -> Self {
        Self {
            deck: Deck::standard(),
            player: Hand::new(),
            dealer: Hand::new(),
            phase: Phase::Betting,
            result: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn player(&self) -> &[Card] {
        self.player.cards()
    }

    pub fn dealer(&self) -> &[Card] {
        self.dealer.cards()
    }

    /// The dealer's face-up card, once dealt.
    pub fn dealer_upcard(&self) -> Option<Card> {
        self.dealer.cards().first().copied()
    }

    /// Terminal result, set once the phase reaches `GameOver`.
    pub fn result(&self) -> Option<RoundResult> {
        self.result
    }

    /// Settled outcome, available once the round is over.
    pub fn outcome(&self) -> Option<RoundOutcome> {
        self.result.map(|result| result.outcome())
    }

    fn draw(&mut self) -> Result<Card, TransitionError> {
        self.deck.deal().ok_or(TransitionError::DeckExhausted)
    }

    /// Shuffle and deal two cards each. Ends the round on a player natural.
    pub fn deal(&mut self, rng: &mut impl Randomness) -> Result<Phase, TransitionError> {
        if self.phase != Phase::Betting {
            return Err(TransitionError::WrongPhase {
                action: "deal",
                phase: self.phase,
            });
        }

        rng.shuffle(self.deck.cards_mut());
        for _ in 0..2 {
            let card = self.draw()?;
            self.player.push(card);
            let card = self.draw()?;
            self.dealer.push(card);
        }

        if hand_value(self.player.cards()) == TARGET {
            self.result = Some(if hand_value(self.dealer.cards()) == TARGET {
                RoundResult::Push
            } else {
                RoundResult::Blackjack
            });
            self.phase = Phase::GameOver;
        } else {
            self.phase = Phase::Playing;
        }
        Ok(self.phase)
    }

    /// Take one card. Busts above 21; auto-stands on exactly 21.
    pub fn hit(&mut self) -> Result<Phase, TransitionError> {
        if self.phase != Phase::Playing {
            return Err(TransitionError::WrongPhase {
                action: "hit",
                phase: self.phase,
            });
        }

        let card = self.draw()?;
        self.player.push(card);

        let value = hand_value(self.player.cards());
        if value > TARGET {
            self.result = Some(RoundResult::Bust);
            self.phase = Phase::GameOver;
        } else if value == TARGET {
            self.dealer_play();
        }
        Ok(self.phase)
    }

    /// Stop taking cards and let the dealer resolve.
    pub fn stand(&mut self) -> Result<Phase, TransitionError> {
        if self.phase != Phase::Playing {
            return Err(TransitionError::WrongPhase {
                action: "stand",
                phase: self.phase,
            });
        }
        self.dealer_play();
        Ok(self.phase)
    }

    /// Dealer draws to 16, stands on 17+, then hands are compared.
    fn dealer_play(&mut self) {
        self.phase = Phase::DealerTurn;

        while hand_value(self.dealer.cards()) < DEALER_STAND {
            match self.deck.deal() {
                Some(card) => self.dealer.push(card),
                None => break,
            }
        }

        let dealer = hand_value(self.dealer.cards());
        let player = hand_value(self.player.cards());
        self.result = Some(if dealer > TARGET {
            RoundResult::Win
        } else if player > dealer {
            RoundResult::Win
        } else if dealer > player {
            RoundResult::Lose
        } else {
            RoundResult::Push
        });
        self.phase = Phase::GameOver;
    }
}

impl Default for Round {
    fn default() -> Self {
        Self::new()
    }
}
