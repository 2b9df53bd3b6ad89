//! Playing-card value types.
//!
//! A [`Card`] is an immutable rank/suit pair. A [`Deck`] is built in
//! canonical order (spades A..K, hearts, diamonds, clubs) and dealt from the
//! end; shuffling is the caller's concern since it needs a randomness
//! source. A [`Hand`] only ever grows by appending dealt cards.

use std::fmt;

/// Card ranks. `Ace` is encoded low; games decide how to value it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Rank {
    Ace = 0,
    Two = 1,
    Three = 2,
    Four = 3,
    Five = 4,
    Six = 5,
    Seven = 6,
    Eight = 7,
    Nine = 8,
    Ten = 9,
    Jack = 10,
    Queen = 11,
    King = 12,
}

impl Rank {
    /// All ranks in deck order.
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Face value of number cards (Ace 1, Ten 10); court cards are 10.
    pub fn face_value(&self) -> u8 {
        match self {
            Rank::Jack | Rank::Queen | Rank::King => 10,
            rank => *rank as u8 + 1,
        }
    }

    pub fn is_ace(&self) -> bool {
        matches!(self, Rank::Ace)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        };
        f.write_str(s)
    }
}

/// Card suits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Suit {
    Spades = 0,
    Hearts = 1,
    Diamonds = 2,
    Clubs = 3,
}

impl Suit {
    /// All suits in deck order.
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Suit::Spades => "♠",
            Suit::Hearts => "♥",
            Suit::Diamonds => "♦",
            Suit::Clubs => "♣",
        };
        f.write_str(s)
    }
}

/// An immutable rank/suit pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

/// An ordered sequence of cards dealt from the end.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Number of cards in a full deck.
    pub const SIZE: usize = 52;

    /// A full 52-card deck in canonical (unshuffled) order.
    pub fn standard() -> Self {
        let mut cards = Vec::with_capacity(Self::SIZE);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card::new(rank, suit));
            }
        }
        Self { cards }
    }

    /// A deck over an explicit card sequence, e.g. a stacked partial deck.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Deal the top card (the end of the sequence).
    pub fn deal(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Mutable view for shuffling.
    pub fn cards_mut(&mut self) -> &mut [Card] {
        &mut self.cards
    }
}

/// Cards held by the player or dealer. Grows only by appending.
#[derive(Clone, Debug, Default)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, card) in self.cards.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{card}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_standard_deck_unique() {
        let mut deck = Deck::standard();
        assert_eq!(deck.len(), 52);

        let mut seen = HashSet::new();
        while let Some(card) = deck.deal() {
            assert!(seen.insert((card.rank, card.suit)), "duplicate {card}");
        }
        assert_eq!(seen.len(), 52);
    }

    #[test]
    fn test_face_values() {
        assert_eq!(Rank::Ace.face_value(), 1);
        assert_eq!(Rank::Ten.face_value(), 10);
        assert_eq!(Rank::Jack.face_value(), 10);
        assert_eq!(Rank::Queen.face_value(), 10);
        assert_eq!(Rank::King.face_value(), 10);
        assert_eq!(Rank::Seven.face_value(), 7);
    }

    #[test]
    fn test_deal_consumes_from_end() {
        let mut deck = Deck::standard();
        let top = deck.deal().unwrap();
        // Canonical order ends with the king of clubs.
        assert_eq!(top, Card::new(Rank::King, Suit::Clubs));
        assert_eq!(deck.len(), 51);
    }
}
