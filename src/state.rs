//! Game state snapshot and dealing.
//!
//! A `GameState` is built once per deal and afterwards only replaced by the
//! pure transforms in `moves` and `safety`. The top of every pile is the
//! last element of its vector.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::cards::{full_deck, Card, Suit, ACE, DECK_SIZE, KING};
use crate::error::{Error, Result};
use crate::rules::{first_face_up_index, is_valid_run};

/// Number of tableau columns.
pub const NUM_COLUMNS: usize = 7;

/// Number of foundation piles.
pub const NUM_FOUNDATIONS: usize = 4;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Face-down draw pile.
    pub stock: Vec<Card>,
    /// Face-up discard; only the top is playable.
    pub waste: Vec<Card>,
    /// One pile per suit in `Suit::ALL` order, ace at the bottom.
    pub foundations: [Vec<Card>; NUM_FOUNDATIONS],
    /// Playing columns; only the face-up suffix can move.
    pub tableau: [Vec<Card>; NUM_COLUMNS],
    pub move_count: u32,
    /// Milliseconds since the epoch when the player started, if they have.
    pub start_time: Option<u64>,
    pub game_won: bool,
}

impl GameState {
    /// Deals a new game from a seeded shuffle.
    ///
    /// Column `c` receives `c + 1` cards with only the last one face up; the
    /// remaining 24 cards form the stock.
    pub fn deal(seed: u64) -> Self {
        let mut deck = full_deck();
        let mut rng = Pcg64::seed_from_u64(seed);
        deck.shuffle(&mut rng);

        let mut cards = deck.into_iter();
        let mut state = GameState::default();
        for col in 0..NUM_COLUMNS {
            for row in 0..=col {
                if let Some(card) = cards.next() {
                    state.tableau[col].push(card.with_face(row == col));
                }
            }
        }
        state.stock = cards.map(|c| c.with_face(false)).collect();
        state
    }

    /// All 52 cards on the foundations.
    pub fn new_won() -> Self {
        let mut state = GameState::default();
        for suit in Suit::ALL {
            state.foundations[suit.index()] =
                (ACE..=KING).map(|rank| Card::new(suit, rank, true)).collect();
        }
        state
    }

    #[inline]
    pub fn waste_top(&self) -> Option<&Card> {
        self.waste.last()
    }

    #[inline]
    pub fn tableau_top(&self, column: usize) -> Option<&Card> {
        self.tableau.get(column).and_then(|col| col.last())
    }

    /// Number of cards on foundation piles.
    pub fn foundation_count(&self) -> usize {
        self.foundations.iter().map(Vec::len).sum()
    }

    /// Every card in the state, zone by zone.
    pub fn all_cards(&self) -> impl Iterator<Item = &Card> {
        self.stock
            .iter()
            .chain(self.waste.iter())
            .chain(self.foundations.iter().flatten())
            .chain(self.tableau.iter().flatten())
    }

    /// Checks the structural invariants of a Klondike position.
    ///
    /// The 52 cards must be partitioned across the zones with no duplicates,
    /// foundations must be single-suit ascending piles from the ace, the stock
    /// must be face down, waste and foundations face up, and each tableau
    /// column's face-up suffix must be a valid run with no face-down card
    /// above it.
    pub fn validate(&self) -> Result<()> {
        let mut seen = [false; DECK_SIZE];
        for card in self.all_cards() {
            let slot = &mut seen[card.id() as usize];
            if *slot {
                return Err(Error::DuplicateCard(card.with_face(false)));
            }
            *slot = true;
        }
        let missing = seen.iter().filter(|present| !**present).count();
        if missing > 0 {
            return Err(Error::MissingCards(missing));
        }

        if self.stock.iter().any(|c| c.face_up) {
            return Err(Error::Facing { zone: "stock" });
        }
        if self.waste.iter().any(|c| !c.face_up) {
            return Err(Error::Facing { zone: "waste" });
        }

        for (index, pile) in self.foundations.iter().enumerate() {
            let ordered = pile.iter().enumerate().all(|(i, card)| {
                card.suit == Suit::ALL[index] && card.rank as usize == i + 1 && card.face_up
            });
            if !ordered {
                return Err(Error::FoundationOrder { index });
            }
        }

        for (column, cards) in self.tableau.iter().enumerate() {
            let run_start = first_face_up_index(cards).unwrap_or(cards.len());
            if !is_valid_run(&cards[run_start..]) {
                return Err(Error::BrokenRun { column });
            }
            if !cards.is_empty() && run_start == cards.len() {
                return Err(Error::Facing { zone: "tableau" });
            }
        }

        Ok(())
    }
}

/// Renders a state as text.
///
/// Face-down cards show as `##`, empty piles as `--`.
pub fn format_state(state: &GameState) -> String {
    let mut output = String::new();

    let waste_top = state
        .waste_top()
        .map(Card::code)
        .unwrap_or_else(|| "--".to_string());
    output.push_str(&format!(
        "stock: {}  waste: {} ({})\n",
        state.stock.len(),
        waste_top,
        state.waste.len()
    ));

    output.push_str("foundations:");
    for pile in &state.foundations {
        output.push(' ');
        match pile.last() {
            Some(card) => output.push_str(&card.code()),
            None => output.push_str("--"),
        }
    }
    output.push('\n');

    for (col, cards) in state.tableau.iter().enumerate() {
        output.push_str(&format!("t{col}:"));
        if cards.is_empty() {
            output.push_str(" --");
        }
        for card in cards {
            output.push(' ');
            if card.face_up {
                output.push_str(&card.code());
            } else {
                output.push_str("##");
            }
        }
        output.push('\n');
    }

    output
}
