//! Safe foundation moves and the auto-play fixed point.
//!
//! A foundation move is safe when no card left in play could ever need the
//! moved card as a landing spot. Committing safe moves right away shrinks
//! the search without losing any winning line.

use crate::cards::{Card, Color, ACE};
use crate::moves::{generate_all_moves, is_definitely_winnable, try_apply_move, SolverMove};
use crate::rules::{can_place_on_foundation, check_win, foundation_index_for_suit};
use crate::state::GameState;

/// Whether moving `card` to its foundation can never hurt.
///
/// Aces always qualify. Any other card qualifies once both foundations of
/// the opposite color hold at least `rank - 1` cards: every opposite-color
/// card that could be built on it is already home.
pub fn is_safe_foundation_move(card: &Card, state: &GameState) -> bool {
    if card.rank == ACE {
        return true;
    }

    let opposite = match card.color() {
        Color::Red => [2, 3],
        Color::Black => [0, 1],
    };
    let min_opposite = opposite
        .iter()
        .map(|&i| state.foundations[i].len())
        .min()
        .unwrap_or(0);

    min_opposite >= (card.rank - 1) as usize
}

/// First safe foundation move: the waste top, then tableau tops left to right.
fn next_safe_move(state: &GameState) -> Option<SolverMove> {
    let playable = |card: &Card| {
        let foundation = foundation_index_for_suit(card.suit);
        (can_place_on_foundation(card, &state.foundations[foundation], foundation)
            && is_safe_foundation_move(card, state))
        .then_some(foundation)
    };

    if let Some(foundation) = state.waste_top().and_then(playable) {
        return Some(SolverMove::WasteToFoundation { foundation });
    }

    state.tableau.iter().enumerate().find_map(|(column, cards)| {
        let card = cards.last().filter(|c| c.face_up)?;
        playable(card).map(|foundation| SolverMove::TableauToFoundation { column, foundation })
    })
}

/// Applies safe foundation moves until none remain and returns the result.
pub fn auto_play_safe_moves(state: &GameState) -> GameState {
    let mut current = state.clone();
    while let Some(mv) = next_safe_move(&current) {
        match try_apply_move(&current, &mv) {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

/// Plays out a definitely-winnable position by sending cards home.
///
/// Returns the won state, or `None` if the position is not definitely
/// winnable or gets stuck (which would mean the winnability check is wrong).
pub fn finish(state: &GameState) -> Option<GameState> {
    if !is_definitely_winnable(state) {
        return None;
    }

    let mut current = state.clone();
    while !check_win(&current.foundations) {
        let mv = generate_all_moves(&current)
            .into_iter()
            .find(|mv| matches!(mv, SolverMove::TableauToFoundation { .. }))?;
        current = try_apply_move(&current, &mv)?;
    }
    Some(current)
}
