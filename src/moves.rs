//! Move generation and application.
//!
//! Moves are generated in five priority tiers (foundation, revealing
//! tableau, waste to tableau, other tableau, stock). The order only steers
//! the search, but it is fixed so results are reproducible. Interchangeable
//! empty columns are collapsed to the first one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cards::{Card, KING};
use crate::rules::{
    can_place_on_foundation, can_place_on_tableau, first_face_up_index,
    foundation_index_for_suit, is_valid_run,
};
use crate::state::{GameState, NUM_COLUMNS};

/// A single move, with enough position data to replay it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SolverMove {
    StockToWaste,
    RecycleWaste,
    WasteToFoundation {
        foundation: usize,
    },
    WasteToTableau {
        column: usize,
    },
    TableauToFoundation {
        column: usize,
        foundation: usize,
    },
    TableauToTableau {
        from: usize,
        /// Index in `from` of the first moved card.
        card_index: usize,
        to: usize,
        count: usize,
    },
}

impl fmt::Display for SolverMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SolverMove::StockToWaste => write!(f, "draw"),
            SolverMove::RecycleWaste => write!(f, "recycle"),
            SolverMove::WasteToFoundation { foundation } => write!(f, "waste -> f{foundation}"),
            SolverMove::WasteToTableau { column } => write!(f, "waste -> t{column}"),
            SolverMove::TableauToFoundation { column, foundation } => {
                write!(f, "t{column} -> f{foundation}")
            }
            SolverMove::TableauToTableau {
                from,
                card_index,
                to,
                count,
            } => write!(f, "t{from}:{card_index} -> t{to} ({count})"),
        }
    }
}

/// Whether `mv` moves the same cards straight back along `last`.
pub fn is_reversal(mv: &SolverMove, last: Option<&SolverMove>) -> bool {
    match (mv, last) {
        (
            SolverMove::TableauToTableau {
                from, to, count, ..
            },
            Some(SolverMove::TableauToTableau {
                from: last_from,
                to: last_to,
                count: last_count,
                ..
            }),
        ) => from == last_to && to == last_from && count == last_count,
        _ => false,
    }
}

/// Generates every legal move from `state` in priority order.
pub fn generate_all_moves(state: &GameState) -> Vec<SolverMove> {
    let mut foundation_moves = Vec::new();
    // (move, face-down cards still hidden in the source column)
    let mut revealing_moves: Vec<(SolverMove, usize)> = Vec::new();
    // (move, destination is empty)
    let mut waste_moves: Vec<(SolverMove, bool)> = Vec::new();
    let mut other_tableau_moves = Vec::new();

    // all empty columns are equivalent destinations for a king
    let first_empty = state.tableau.iter().position(Vec::is_empty);
    let king_target_allowed = |run: &[Card], to: usize| {
        !state.tableau[to].is_empty() || run[0].rank != KING || Some(to) == first_empty
    };

    // tier 1: foundation moves
    if let Some(card) = state.waste_top() {
        let foundation = foundation_index_for_suit(card.suit);
        if can_place_on_foundation(card, &state.foundations[foundation], foundation) {
            foundation_moves.push(SolverMove::WasteToFoundation { foundation });
        }
    }
    for (column, cards) in state.tableau.iter().enumerate() {
        let Some(card) = cards.last().filter(|c| c.face_up) else {
            continue;
        };
        let foundation = foundation_index_for_suit(card.suit);
        if can_place_on_foundation(card, &state.foundations[foundation], foundation) {
            foundation_moves.push(SolverMove::TableauToFoundation { column, foundation });
        }
    }

    // tiers 2 and 4: tableau to tableau
    for (from, cards) in state.tableau.iter().enumerate() {
        let Some(run_start) = first_face_up_index(cards) else {
            continue;
        };

        for card_index in run_start..cards.len() {
            let run = &cards[card_index..];
            let reveals = card_index == run_start && run_start > 0;

            for to in 0..NUM_COLUMNS {
                if to == from {
                    continue;
                }
                // moving a whole column into an empty one changes nothing
                if card_index == 0 && state.tableau[to].is_empty() {
                    continue;
                }
                if !king_target_allowed(run, to) || !can_place_on_tableau(run, &state.tableau[to]) {
                    continue;
                }

                let mv = SolverMove::TableauToTableau {
                    from,
                    card_index,
                    to,
                    count: run.len(),
                };
                if reveals {
                    revealing_moves.push((mv, run_start));
                } else {
                    other_tableau_moves.push(mv);
                }
            }
        }
    }

    // tier 3: waste to tableau
    if let Some(card) = state.waste_top() {
        let run = std::slice::from_ref(card);
        for column in 0..NUM_COLUMNS {
            if king_target_allowed(run, column)
                && can_place_on_tableau(run, &state.tableau[column])
            {
                waste_moves.push((
                    SolverMove::WasteToTableau { column },
                    state.tableau[column].is_empty(),
                ));
            }
        }
    }

    // deeper reveals first, then keep empty columns for kings; both sorts are stable
    revealing_moves.sort_by(|a, b| b.1.cmp(&a.1));
    waste_moves.sort_by_key(|&(_, to_empty)| to_empty);

    let mut moves = foundation_moves;
    moves.extend(revealing_moves.into_iter().map(|(mv, _)| mv));
    moves.extend(waste_moves.into_iter().map(|(mv, _)| mv));
    moves.extend(other_tableau_moves);

    // tier 5: stock
    if !state.stock.is_empty() {
        moves.push(SolverMove::StockToWaste);
    } else if !state.waste.is_empty() {
        moves.push(SolverMove::RecycleWaste);
    }

    moves
}

/// Flips the new top of a column face up after cards were taken from it.
#[inline]
fn reveal_top(column: &mut [Card]) {
    if let Some(top) = column.last_mut() {
        top.face_up = true;
    }
}

/// Applies `mv` to `state`, or returns `None` if it does not apply.
pub fn try_apply_move(state: &GameState, mv: &SolverMove) -> Option<GameState> {
    match *mv {
        SolverMove::StockToWaste => {
            let mut next = state.clone();
            let card = next.stock.pop()?;
            next.waste.push(card.with_face(true));
            Some(next)
        }

        SolverMove::RecycleWaste => {
            if !state.stock.is_empty() || state.waste.is_empty() {
                return None;
            }
            let mut next = state.clone();
            next.stock = next.waste.drain(..).rev().map(|c| c.with_face(false)).collect();
            Some(next)
        }

        SolverMove::WasteToFoundation { foundation } => {
            let card = state.waste_top()?;
            let pile = state.foundations.get(foundation)?;
            if !can_place_on_foundation(card, pile, foundation) {
                return None;
            }
            let mut next = state.clone();
            let card = next.waste.pop()?;
            next.foundations[foundation].push(card.with_face(true));
            Some(next)
        }

        SolverMove::WasteToTableau { column } => {
            let card = state.waste_top()?;
            let target = state.tableau.get(column)?;
            if !can_place_on_tableau(std::slice::from_ref(card), target) {
                return None;
            }
            let mut next = state.clone();
            let card = next.waste.pop()?;
            next.tableau[column].push(card.with_face(true));
            Some(next)
        }

        SolverMove::TableauToFoundation { column, foundation } => {
            let card = state.tableau_top(column)?;
            let pile = state.foundations.get(foundation)?;
            if !card.face_up || !can_place_on_foundation(card, pile, foundation) {
                return None;
            }
            let mut next = state.clone();
            let card = next.tableau[column].pop()?;
            reveal_top(&mut next.tableau[column]);
            next.foundations[foundation].push(card);
            Some(next)
        }

        SolverMove::TableauToTableau {
            from,
            card_index,
            to,
            count,
        } => {
            if from == to || from >= NUM_COLUMNS || to >= NUM_COLUMNS {
                return None;
            }
            let source = &state.tableau[from];
            if count == 0 || card_index.checked_add(count) != Some(source.len()) {
                return None;
            }
            let run = &source[card_index..];
            if !is_valid_run(run) || !can_place_on_tableau(run, &state.tableau[to]) {
                return None;
            }
            let mut next = state.clone();
            let moved = next.tableau[from].split_off(card_index);
            reveal_top(&mut next.tableau[from]);
            next.tableau[to].extend(moved);
            Some(next)
        }
    }
}

/// Applies `mv` to `state`; a move that does not apply leaves the state as is.
pub fn apply_move(state: &GameState, mv: &SolverMove) -> GameState {
    try_apply_move(state, mv).unwrap_or_else(|| state.clone())
}

/// No stock, no waste and nothing to play.
pub fn is_definitely_stuck(state: &GameState) -> bool {
    state.stock.is_empty() && state.waste.is_empty() && generate_all_moves(state).is_empty()
}

/// No stock, no waste and every tableau card face up.
///
/// Each column is then a single run whose smallest card is on top, so the
/// lowest remaining card can always go to its foundation.
pub fn is_definitely_winnable(state: &GameState) -> bool {
    state.stock.is_empty()
        && state.waste.is_empty()
        && state.tableau.iter().flatten().all(|c| c.face_up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Card;

    fn up(code: &str) -> Card {
        Card::parse(code).unwrap().with_face(true)
    }

    fn down(code: &str) -> Card {
        Card::parse(code).unwrap()
    }

    fn listing(moves: &[SolverMove]) -> String {
        moves
            .iter()
            .map(|mv| mv.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_king_run_to_empty_column_is_symmetry_reduced() {
        let mut state = GameState::default();
        state.tableau[0] = vec![down("2h"), up("9c")];
        state.tableau[1] = vec![down("3h"), up("8c")];
        state.tableau[2] = vec![down("4d"), down("5d"), up("Kc"), up("Qh"), up("Js")];
        state.tableau[3] = vec![down("6h"), up("7s")];
        // columns 4, 5 and 6 are empty

        let moves = generate_all_moves(&state);
        let king_moves: Vec<_> = moves
            .iter()
            .filter(|mv| matches!(mv, SolverMove::TableauToTableau { from: 2, card_index: 2, .. }))
            .collect();
        assert_eq!(
            king_moves,
            vec![&SolverMove::TableauToTableau {
                from: 2,
                card_index: 2,
                to: 4,
                count: 3
            }]
        );

        let next = try_apply_move(&state, king_moves[0]).unwrap();
        assert_eq!(next.tableau[2], vec![down("4d"), up("5d")]);
        assert_eq!(next.tableau[4], vec![up("Kc"), up("Qh"), up("Js")]);
    }

    #[test]
    fn test_priority_order() {
        let mut state = GameState::default();
        state.stock = vec![down("Ks")];
        state.waste = vec![up("9d"), up("6h")];
        state.foundations[2] = vec![up("Ac")];
        state.tableau[0] = vec![up("2c")];
        state.tableau[1] = vec![down("Jh"), down("Qd"), up("6d")];
        state.tableau[2] = vec![down("3s"), up("8s"), up("7h")];
        state.tableau[3] = vec![up("7c")];
        state.tableau[4] = vec![down("Tc"), up("5c")];
        state.tableau[6] = vec![up("8d")];

        insta::assert_snapshot!(listing(&generate_all_moves(&state)), @r"
        t0 -> f2
        t1:2 -> t3 (1)
        t4:1 -> t1 (1)
        waste -> t3
        t3:0 -> t6 (1)
        draw
        ");
    }

    #[test]
    fn test_deeper_reveals_come_first() {
        let mut state = GameState::default();
        state.tableau[0] = vec![down("2h"), up("9c")];
        state.tableau[1] = vec![down("3h"), down("4h"), down("5h"), up("8h")];
        state.tableau[2] = vec![up("9s")];
        state.tableau[3] = vec![down("6s"), down("7s"), up("8d")];

        let moves = generate_all_moves(&state);
        let reveals: Vec<usize> = moves
            .iter()
            .filter_map(|mv| match mv {
                SolverMove::TableauToTableau { from, .. } => Some(*from),
                _ => None,
            })
            .collect();
        // 8h hides three cards, 8d two
        assert_eq!(reveals, vec![1, 1, 3, 3]);
    }

    #[test]
    fn test_waste_prefers_non_empty_destination() {
        let mut state = GameState::default();
        state.waste = vec![up("Kd")];
        state.tableau[3] = vec![down("2s"), up("5c")];

        let moves = generate_all_moves(&state);
        assert_eq!(moves[0], SolverMove::WasteToTableau { column: 0 });
        let waste_moves = moves
            .iter()
            .filter(|mv| matches!(mv, SolverMove::WasteToTableau { .. }))
            .count();
        assert_eq!(waste_moves, 1);

        let mut state = GameState::default();
        state.waste = vec![up("Qd")];
        state.tableau[0] = vec![up("Kc")];
        state.tableau[1] = vec![up("Ks")];
        let moves = generate_all_moves(&state);
        assert_eq!(
            &moves[..2],
            &[
                SolverMove::WasteToTableau { column: 0 },
                SolverMove::WasteToTableau { column: 1 }
            ]
        );
    }

    #[test]
    fn test_whole_king_column_never_moves_to_empty_column() {
        let mut state = GameState::default();
        state.tableau[0] = vec![up("Kh"), up("Qs")];
        assert!(generate_all_moves(&state).is_empty());
    }

    #[test]
    fn test_partial_run_from_covered_column_is_generated() {
        let mut state = GameState::default();
        state.tableau[0] = vec![down("2h"), up("9c"), up("8h")];
        state.tableau[1] = vec![up("9s")];

        let moves = generate_all_moves(&state);
        assert!(moves.contains(&SolverMove::TableauToTableau {
            from: 0,
            card_index: 2,
            to: 1,
            count: 1
        }));
    }

    #[test]
    fn test_stock_draw_then_recycle() {
        let mut state = GameState::default();
        state.stock = vec![down("3h"), down("4h")];

        assert_eq!(generate_all_moves(&state).last(), Some(&SolverMove::StockToWaste));
        let state = apply_move(&state, &SolverMove::StockToWaste);
        let state = apply_move(&state, &SolverMove::StockToWaste);
        assert_eq!(state.waste, vec![up("4h"), up("3h")]);
        assert!(state.stock.is_empty());

        let moves = generate_all_moves(&state);
        assert_eq!(moves.last(), Some(&SolverMove::RecycleWaste));
        assert!(!moves.contains(&SolverMove::StockToWaste));

        let state = apply_move(&state, &SolverMove::RecycleWaste);
        assert_eq!(state.stock, vec![down("3h"), down("4h")]);
        assert!(state.waste.is_empty());
    }

    #[test]
    fn test_tableau_pop_reveals_new_top() {
        let mut state = GameState::default();
        state.tableau[0] = vec![down("5s"), up("Ah")];
        let mv = SolverMove::TableauToFoundation {
            column: 0,
            foundation: 0,
        };
        let next = apply_move(&state, &mv);
        assert_eq!(next.tableau[0], vec![up("5s")]);
        assert_eq!(next.foundations[0], vec![up("Ah")]);
    }

    #[test]
    fn test_invalid_move_has_no_effect() {
        let state = GameState::deal(3);
        let invalid = [
            SolverMove::RecycleWaste,
            SolverMove::WasteToFoundation { foundation: 0 },
            SolverMove::WasteToTableau { column: 0 },
            SolverMove::TableauToFoundation {
                column: 9,
                foundation: 0,
            },
            SolverMove::TableauToTableau {
                from: 0,
                card_index: 0,
                to: 0,
                count: 1,
            },
            SolverMove::TableauToTableau {
                from: 6,
                card_index: 0,
                to: 1,
                count: 7,
            },
        ];
        for mv in &invalid {
            assert!(try_apply_move(&state, mv).is_none(), "{mv} should not apply");
            assert_eq!(apply_move(&state, mv), state);
        }
    }

    #[test]
    fn test_reversal_needs_same_columns_and_count() {
        let last = SolverMove::TableauToTableau {
            from: 1,
            card_index: 3,
            to: 4,
            count: 2,
        };
        let back = SolverMove::TableauToTableau {
            from: 4,
            card_index: 5,
            to: 1,
            count: 2,
        };
        let partial = SolverMove::TableauToTableau {
            from: 4,
            card_index: 6,
            to: 1,
            count: 1,
        };
        assert!(is_reversal(&back, Some(&last)));
        assert!(!is_reversal(&partial, Some(&last)));
        assert!(!is_reversal(&back, None));
        assert!(!is_reversal(&SolverMove::StockToWaste, Some(&last)));
    }

    #[test]
    fn test_stuck_and_winnable_checks() {
        let mut state = GameState::default();
        state.tableau[0] = vec![down("Ah"), up("5s")];
        state.tableau[1] = vec![up("5c")];
        assert!(is_definitely_stuck(&state));
        assert!(!is_definitely_winnable(&state));

        state.tableau[0][0].face_up = true;
        assert!(is_definitely_winnable(&state));

        state.stock.push(down("2h"));
        assert!(!is_definitely_stuck(&state));
        assert!(!is_definitely_winnable(&state));
    }
}
