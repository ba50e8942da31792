//! Greedy maximal multi-token matching
//!
//! From every content token the engine intersects the concept sets of the
//! following tokens' stems for as long as the intersection stays non-empty.
//! Stopwords are stepped over without narrowing the set, termination terms end
//! the extension. Only concepts whose full indexed length was consumed are
//! reported, so partial matches of a longer concept never surface.

use crate::index::{ConceptSet, DictionaryIndex};
use crate::recognizer::{AnnotationToken, Recognizer};
use crate::utils::analyzer::TokenRole;
use crate::utils::normalize::{Token, normalize, tokenize_into};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::trace;

/// Tokens whose buffer space an engine keeps between calls
const SCRATCH_KEEP: usize = 4096;

/// Per-call buffers, reused between calls
#[derive(Debug, Default)]
struct Scratch {
    tokens: Vec<Token>,
    roles: Vec<TokenRole>,
    /// Empty for tokens that are not content
    stems: Vec<String>,
}

impl Scratch {
    /// Drop the contents and give back capacity beyond [`SCRATCH_KEEP`]
    fn release(&mut self) {
        self.tokens.clear();
        self.roles.clear();
        self.stems.clear();
        if self.tokens.capacity() > SCRATCH_KEEP {
            self.tokens.shrink_to(SCRATCH_KEEP);
            self.roles.shrink_to(SCRATCH_KEEP);
            self.stems.shrink_to(SCRATCH_KEEP);
        }
    }
}

/// Recognizer over a shared, read-only dictionary index
#[derive(Debug)]
pub struct MatchEngine {
    index: Arc<DictionaryIndex>,
    scratch: Scratch,
}

impl MatchEngine {
    pub fn new(index: Arc<DictionaryIndex>) -> Self {
        Self {
            index,
            scratch: Scratch::default(),
        }
    }

    pub fn index(&self) -> &Arc<DictionaryIndex> {
        &self.index
    }

    fn analyze(&mut self, text: &str) {
        let analyzer = self.index.analyzer();
        let scratch = &mut self.scratch;

        tokenize_into(&normalize(text), &mut scratch.tokens);
        scratch.roles.clear();
        scratch.stems.clear();

        for token in &scratch.tokens {
            let role = analyzer.role(&token.text);
            let stem = match role {
                TokenRole::Content => analyzer.stem(&token.text),
                _ => String::new(),
            };
            scratch.roles.push(role);
            scratch.stems.push(stem);
        }
    }

    /// Extend a match starting at content token `start`.
    ///
    /// Returns the surviving candidates, the index of the last matched token
    /// and the number of tokens consumed, stopwords excluded.
    fn extend<'a>(
        &'a self,
        start: usize,
        initial: &'a ConceptSet,
    ) -> (Cow<'a, ConceptSet>, usize, usize) {
        let Scratch { roles, stems, .. } = &self.scratch;

        let mut candidates = Cow::Borrowed(initial);
        let mut last_matched = start;
        let mut skipped = 0;
        let mut cursor = start + 1;

        while cursor < roles.len() {
            match roles[cursor] {
                TokenRole::Stopword => skipped += 1,
                TokenRole::Termination => break,
                TokenRole::Content => {
                    let Some(next) = self.index.concepts_for_stem(&stems[cursor]) else {
                        break;
                    };
                    let narrowed = candidates.as_ref() & next;
                    if narrowed.is_empty() {
                        break;
                    }
                    candidates = Cow::Owned(narrowed);
                    last_matched = cursor;
                }
            }
            cursor += 1;
        }

        (candidates, last_matched, (cursor - start) - skipped)
    }
}

impl Recognizer for MatchEngine {
    fn recognize(&mut self, text: &str) -> Vec<AnnotationToken> {
        if text.is_empty() {
            return Vec::new();
        }

        self.analyze(text);

        let mut annotations = Vec::new();
        let tokens = &self.scratch.tokens;

        for (start, token) in tokens.iter().enumerate() {
            if self.scratch.roles[start] != TokenRole::Content {
                continue;
            }
            let Some(initial) = self.index.concepts_for_stem(&self.scratch.stems[start]) else {
                continue;
            };

            let (candidates, last_matched, cardinality) = self.extend(start, initial);
            let last = &tokens[last_matched];
            let matched_text = &text[token.span.start..last.span.end];

            for concept_id in candidates.iter() {
                if self.index.concept_length(concept_id) != Some(cardinality) {
                    continue;
                }
                trace!(
                    concept_id,
                    start = token.chars.start,
                    end = last.chars.end,
                    text = matched_text,
                    "matched"
                );
                annotations.push(AnnotationToken {
                    concept_id,
                    start: token.chars.start,
                    end: last.chars.end,
                    matched_text: matched_text.to_string(),
                    token_cardinality: cardinality,
                });
            }
        }

        self.scratch.release();
        annotations
    }
}
