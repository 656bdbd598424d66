use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Card suit. The discriminant order is only used for deck construction;
/// suits never break ties in hand comparison.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Suit {
    Spade,
    Heart,
    Diamond,
    Club,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spade, Suit::Heart, Suit::Diamond, Suit::Club];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Spade => 'S',
            Self::Heart => 'H',
            Self::Diamond => 'D',
            Self::Club => 'C',
        };
        write!(f, "{repr}")
    }
}

/// Card rank, two through ace. Aces are always high here; the wheel
/// straight is handled by the evaluator.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
    Ten = 10,
    Jack = 11,
    Queen = 12,
    King = 13,
    Ace = 14,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
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
        Rank::Ace,
    ];

    pub const fn value(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Ten => 'T',
            Self::Jack => 'J',
            Self::Queen => 'Q',
            Self::King => 'K',
            Self::Ace => 'A',
            other => (b'0' + other.value()) as char,
        };
        write!(f, "{repr}")
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum CardParseError {
    #[error("card string must be exactly 2 characters: {0:?}")]
    BadLength(String),
    #[error("invalid rank character: {0:?}")]
    BadRank(char),
    #[error("invalid suit character: {0:?}")]
    BadSuit(char),
}

/// A single playing card. Value type, compared by rank then suit so cards
/// can live in ordered collections; game logic only ever compares ranks.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl FromStr for Card {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(rank_ch), Some(suit_ch), None) = (chars.next(), chars.next(), chars.next())
        else {
            return Err(CardParseError::BadLength(s.to_string()));
        };

        let rank = match rank_ch {
            '2' => Rank::Two,
            '3' => Rank::Three,
            '4' => Rank::Four,
            '5' => Rank::Five,
            '6' => Rank::Six,
            '7' => Rank::Seven,
            '8' => Rank::Eight,
            '9' => Rank::Nine,
            'T' => Rank::Ten,
            'J' => Rank::Jack,
            'Q' => Rank::Queen,
            'K' => Rank::King,
            'A' => Rank::Ace,
            other => return Err(CardParseError::BadRank(other)),
        };

        let suit = match suit_ch {
            'S' => Suit::Spade,
            'H' => Suit::Heart,
            'D' => Suit::Diamond,
            'C' => Suit::Club,
            other => return Err(CardParseError::BadSuit(other)),
        };

        Ok(Card::new(rank, suit))
    }
}
