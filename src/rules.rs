//! Klondike placement rules.
//!
//! Pure predicates over cards and piles. Foundations build up by suit from
//! the ace; the tableau builds down in alternating colors with only kings
//! allowed on an empty column.

use crate::cards::{Card, Suit, ACE, KING, SUIT_SIZE};

/// Foundation pile that accepts cards of `suit`.
#[inline]
pub const fn foundation_index_for_suit(suit: Suit) -> usize {
    suit.index()
}

/// Whether `card` can go on foundation `foundation_index` holding `pile`.
pub fn can_place_on_foundation(card: &Card, pile: &[Card], foundation_index: usize) -> bool {
    if Suit::ALL.get(foundation_index) != Some(&card.suit) {
        return false;
    }

    match pile.last() {
        None => card.rank == ACE,
        Some(top) => card.rank == top.rank + 1,
    }
}

/// Whether the run `cards` can be placed on `column`.
///
/// The caller guarantees `cards` is a face-up run; only its first card is
/// checked against the column.
pub fn can_place_on_tableau(cards: &[Card], column: &[Card]) -> bool {
    let Some(bottom) = cards.first() else {
        return false;
    };

    match column.last() {
        None => bottom.rank == KING,
        Some(top) => top.face_up && top.color() != bottom.color() && bottom.rank + 1 == top.rank,
    }
}

/// Whether `cards` form a face-up, strictly descending, alternating-color run.
pub fn is_valid_run(cards: &[Card]) -> bool {
    cards.iter().all(|c| c.face_up)
        && cards
            .windows(2)
            .all(|pair| pair[0].color() != pair[1].color() && pair[1].rank + 1 == pair[0].rank)
}

/// Whether every foundation is complete.
pub fn check_win(foundations: &[Vec<Card>; 4]) -> bool {
    foundations.iter().all(|pile| pile.len() == SUIT_SIZE)
}

/// Index of the first face-up card in a column, if any.
#[inline]
pub fn first_face_up_index(column: &[Card]) -> Option<usize> {
    column.iter().position(|c| c.face_up)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn up(code: &str) -> Card {
        Card::parse(code).unwrap().with_face(true)
    }

    fn down(code: &str) -> Card {
        Card::parse(code).unwrap()
    }

    #[test]
    fn test_foundation_needs_matching_suit() {
        assert!(can_place_on_foundation(&up("Ah"), &[], 0));
        assert!(!can_place_on_foundation(&up("Ah"), &[], 1));
        assert!(!can_place_on_foundation(&up("Ah"), &[], 7));
    }

    #[test]
    fn test_foundation_builds_up_by_one() {
        let pile = [up("Ac"), up("2c")];
        assert!(can_place_on_foundation(&up("3c"), &pile, 2));
        assert!(!can_place_on_foundation(&up("4c"), &pile, 2));
        assert!(!can_place_on_foundation(&up("2c"), &[], 2));
    }

    #[test]
    fn test_tableau_empty_column_takes_only_kings() {
        assert!(can_place_on_tableau(&[up("Ks"), up("Qh")], &[]));
        assert!(!can_place_on_tableau(&[up("Qh")], &[]));
        assert!(!can_place_on_tableau(&[], &[]));
    }

    #[test]
    fn test_tableau_alternates_color_and_descends() {
        let column = [down("3d"), up("9s")];
        assert!(can_place_on_tableau(&[up("8h")], &column));
        assert!(can_place_on_tableau(&[up("8d"), up("7c")], &column));
        assert!(!can_place_on_tableau(&[up("8c")], &column));
        assert!(!can_place_on_tableau(&[up("7h")], &column));
    }

    #[test]
    fn test_tableau_rejects_face_down_top() {
        assert!(!can_place_on_tableau(&[up("8h")], &[down("9s")]));
    }

    #[test]
    fn test_valid_run() {
        assert!(is_valid_run(&[up("Ks"), up("Qh"), up("Jc")]));
        assert!(!is_valid_run(&[up("Ks"), up("Qs")]));
        assert!(!is_valid_run(&[up("Ks"), up("Jh")]));
        assert!(!is_valid_run(&[up("Ks"), down("Qh")]));
        assert!(is_valid_run(&[]));
    }

    #[test]
    fn test_check_win() {
        let complete: [Vec<Card>; 4] = Suit::ALL.map(|suit| {
            (ACE..=KING).map(|rank| Card::new(suit, rank, true)).collect()
        });
        assert!(check_win(&complete));

        let mut almost = complete.clone();
        almost[3].pop();
        assert!(!check_win(&almost));
    }
}
