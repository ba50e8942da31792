//! Concept recognition
//!
//! - [`engine`] - Greedy maximal multi-token matching against a [`DictionaryIndex`]
//! - [`pool`] - Bounded sharing of recognizers between connections
//!
//! [`DictionaryIndex`]: crate::index::DictionaryIndex

pub mod engine;
pub mod pool;

pub use engine::MatchEngine;
pub use pool::{Lease, PoolError, PoolStrategy, RecognizerPool};

use crate::index::ConceptId;
use serde::Serialize;
use std::fmt;

/// Anything that can annotate text with dictionary concepts.
///
/// Implementations may keep per-call scratch state, hence `&mut self`; share
/// them between threads through a [`RecognizerPool`].
pub trait Recognizer: Send {
    fn recognize(&mut self, text: &str) -> Vec<AnnotationToken>;
}

/// One occurrence of a concept in the input text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationToken {
    pub concept_id: ConceptId,
    /// Start offset in chars of the original text (inclusive)
    pub start: usize,
    /// End offset in chars of the original text (exclusive)
    pub end: usize,
    /// The original text between `start` and `end`
    pub matched_text: String,
    /// Non-skipped tokens consumed by the match
    pub token_cardinality: usize,
}

impl fmt::Display for AnnotationToken {
    /// Wire format: `<conceptId>\t<start>\t<end>\t<matchedText>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.concept_id, self.start, self.end, self.matched_text
        )
    }
}
