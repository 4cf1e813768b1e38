//! Compact, copy-pasteable state codes.
//!
//! A code is the base64 of thirteen `|`-separated sections: stock, waste,
//! the four foundations, then the seven tableau columns. Each section is a
//! run of two-character card codes bottom to top; an uppercase suit letter
//! marks a face-up card.

use base64::prelude::*;

use crate::cards::Card;
use crate::error::{Error, Result};
use crate::state::{GameState, NUM_COLUMNS, NUM_FOUNDATIONS};

const SECTION_COUNT: usize = 2 + NUM_FOUNDATIONS + NUM_COLUMNS;

fn encode_pile(pile: &[Card]) -> String {
    pile.iter()
        .map(|card| {
            let code = card.code();
            if card.face_up {
                code.to_ascii_uppercase()
            } else {
                code
            }
        })
        .collect()
}

fn decode_pile(section: usize, text: &str) -> Result<Vec<Card>> {
    if text.len() % 2 != 0 {
        return Err(Error::OddSection {
            section,
            len: text.len(),
        });
    }

    text.as_bytes()
        .chunks(2)
        .map(|pair| {
            let code = std::str::from_utf8(pair).map_err(|_| Error::Utf8)?;
            let face_up = pair[1].is_ascii_uppercase();
            Ok(Card::parse(code)?.with_face(face_up))
        })
        .collect()
}

/// Encodes the card layout of `state`. Bookkeeping fields are not kept.
pub fn encode_state(state: &GameState) -> String {
    let sections: Vec<String> = std::iter::once(&state.stock)
        .chain(std::iter::once(&state.waste))
        .chain(state.foundations.iter())
        .chain(state.tableau.iter())
        .map(|pile| encode_pile(pile))
        .collect();

    BASE64_STANDARD.encode(sections.join("|"))
}

/// Decodes and validates a state code.
pub fn decode_state(code: &str) -> Result<GameState> {
    let bytes = BASE64_STANDARD.decode(code.trim())?;
    let text = String::from_utf8(bytes).map_err(|_| Error::Utf8)?;

    let sections: Vec<&str> = text.split('|').collect();
    if sections.len() != SECTION_COUNT {
        return Err(Error::SectionCount(sections.len()));
    }

    let mut piles = sections
        .iter()
        .enumerate()
        .map(|(i, text)| decode_pile(i, text))
        .collect::<Result<Vec<_>>>()?
        .into_iter();

    let mut state = GameState {
        stock: piles.next().unwrap_or_default(),
        waste: piles.next().unwrap_or_default(),
        ..GameState::default()
    };
    for pile in state.foundations.iter_mut() {
        *pile = piles.next().unwrap_or_default();
    }
    for column in state.tableau.iter_mut() {
        *column = piles.next().unwrap_or_default();
    }

    state.validate()?;
    Ok(state)
}
