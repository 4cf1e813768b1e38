//! Error type for the fallible parts of the crate.
//!
//! Search budgets, rejected moves and worker panics are reported in-band
//! (`timed_out`, a no-effect move, a synthetic result), so they never show
//! up here. This covers parsing and validating states coming from outside,
//! and losing the solver thread.

use thiserror::Error;

use crate::cards::Card;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("state code is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("state code is not valid UTF-8")]
    Utf8,

    #[error("expected 13 sections in state code, found {0}")]
    SectionCount(usize),

    #[error("section {section} has odd length {len}")]
    OddSection { section: usize, len: usize },

    #[error("unrecognized card code {0:?}")]
    CardCode(String),

    #[error("card {0} appears more than once")]
    DuplicateCard(Card),

    #[error("{0} cards are missing from the deal")]
    MissingCards(usize),

    #[error("foundation {index} is not an ascending single-suit pile from the ace")]
    FoundationOrder { index: usize },

    #[error("face-up run in tableau column {column} is not a descending alternating sequence")]
    BrokenRun { column: usize },

    #[error("{zone} holds a card with the wrong facing")]
    Facing { zone: &'static str },

    #[error("solver worker thread is not running")]
    WorkerGone,
}

pub type Result<T> = std::result::Result<T, Error>;
