//! Card definitions and the two-character card codes.
//!
//! A card's identity is its `(suit, rank)` pair, packed into an id in
//! `0..52`. The facing travels with the card value but is not part of its
//! identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Rank value: 1 (ace) through 13 (king).
pub type Rank = u8;

pub const ACE: Rank = 1;
pub const KING: Rank = 13;

/// Number of cards in a standard deck.
pub const DECK_SIZE: usize = 52;

/// Number of ranks per suit.
pub const SUIT_SIZE: usize = 13;

const RANK_CHARS: &[u8; 13] = b"A23456789TJQK";
const SUIT_CHARS: &[u8; 4] = b"hdcs";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

impl Suit {
    /// Suits in foundation order: foundation `i` is built from `Suit::ALL[i]`.
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn color(self) -> Color {
        match self {
            Suit::Hearts | Suit::Diamonds => Color::Red,
            Suit::Clubs | Suit::Spades => Color::Black,
        }
    }

    fn from_char(c: u8) -> Option<Suit> {
        SUIT_CHARS
            .iter()
            .position(|&s| s == c.to_ascii_lowercase())
            .map(|i| Suit::ALL[i])
    }

    const fn to_char(self) -> char {
        SUIT_CHARS[self as usize] as char
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
    pub face_up: bool,
}

impl Card {
    pub const fn new(suit: Suit, rank: Rank, face_up: bool) -> Self {
        Self {
            suit,
            rank,
            face_up,
        }
    }

    /// Identity in `0..52`, independent of facing.
    #[inline]
    pub const fn id(&self) -> u8 {
        (self.suit as u8) * SUIT_SIZE as u8 + (self.rank - 1)
    }

    #[inline]
    pub const fn color(&self) -> Color {
        self.suit.color()
    }

    /// Same card with the given facing.
    #[inline]
    pub const fn with_face(self, face_up: bool) -> Self {
        Self { face_up, ..self }
    }

    /// Parses a card code such as `Ah`, `Td`, `10c` or `KS`.
    ///
    /// The result is face down; callers that carry facing in the code
    /// (see `codec`) set it themselves.
    pub fn parse(code: &str) -> Result<Card> {
        let bytes = code.trim().as_bytes();
        let (rank_part, suit_char) = match bytes {
            [b'1', b'0', s] => (b'T', *s),
            [r, s] => (r.to_ascii_uppercase(), *s),
            _ => return Err(Error::CardCode(code.to_string())),
        };

        let rank = RANK_CHARS
            .iter()
            .position(|&r| r == rank_part)
            .ok_or_else(|| Error::CardCode(code.to_string()))?;
        let suit = Suit::from_char(suit_char).ok_or_else(|| Error::CardCode(code.to_string()))?;

        Ok(Card::new(suit, rank as Rank + 1, false))
    }

    /// Two-character code, e.g. `Ah`.
    pub fn code(&self) -> String {
        let mut out = String::with_capacity(2);
        out.push(RANK_CHARS[(self.rank - 1) as usize] as char);
        out.push(self.suit.to_char());
        out
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// The ordered 52-card deck, face down, hearts first and ace to king within
/// each suit (so `deck[i].id() == i`).
pub fn full_deck() -> Vec<Card> {
    Suit::ALL
        .iter()
        .flat_map(|&suit| (ACE..=KING).map(move |rank| Card::new(suit, rank, false)))
        .collect()
}
