//! Klondike Solvability Library
//!
//! Decides whether a Klondike position (draw one, unlimited recycling) can
//! still be won. The pieces, bottom up:
//!
//! - `cards`, `state`, `rules`: cards, positions and placement rules
//! - `moves`: prioritized move generation and move application
//! - `safety`: safe foundation moves and their auto-play fixed point
//! - `hash`: canonical keys, the transposition table and winnable cache
//! - `solver`: bounded depth-first search
//! - `worker`, `analysis`: background solving driven from an event loop
//! - `codec`: compact state codes for passing positions around

pub mod analysis;
pub mod cards;
pub mod codec;
pub mod error;
pub mod hash;
pub mod moves;
pub mod rules;
pub mod safety;
pub mod solver;
pub mod state;
pub mod worker;

pub use analysis::{Analysis, Analyzer, AnalyzerConfig};
pub use cards::{Card, Suit};
pub use codec::{decode_state, encode_state};
pub use error::{Error, Result};
pub use moves::SolverMove;
pub use solver::{solve, CancelToken, SolvabilityStatus, SolverConfig, SolverResult};
pub use state::GameState;
