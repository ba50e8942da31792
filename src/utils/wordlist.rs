//! Stopword and termination-term lists
//!
//! Lists are plain text, one term per line. Terms are folded exactly like
//! input text so that `à` in a list matches the folded token `a`.

use crate::utils::normalize::fold_term;
use rustc_hash::FxHashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FRENCH_STOPWORDS: &str = include_str!("../../resources/stopwords.fr.txt");
const FRENCH_TERMINATION_TERMS: &str = include_str!("../../resources/termination_terms.fr.txt");

#[derive(Debug, Error)]
pub enum WordListError {
    #[error("failed to read word list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An immutable set of folded terms
#[derive(Debug, Clone, Default)]
pub struct WordList {
    terms: FxHashSet<String>,
}

impl WordList {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from raw terms. Blank lines and `#` comments are skipped.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .filter_map(|raw| {
                let raw = raw.as_ref().trim();
                if raw.is_empty() || raw.starts_with('#') {
                    return None;
                }
                let folded = fold_term(raw);
                (!folded.is_empty()).then_some(folded)
            })
            .collect();
        Self { terms }
    }

    /// Parse the contents of a word-list file
    pub fn parse(contents: &str) -> Self {
        Self::from_terms(contents.lines())
    }

    /// Read a word-list file
    pub fn load(path: &Path) -> Result<Self, WordListError> {
        let contents = fs::read_to_string(path).map_err(|source| WordListError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&contents))
    }

    /// Built-in French stopwords
    pub fn french_stopwords() -> Self {
        Self::parse(FRENCH_STOPWORDS)
    }

    /// Built-in French termination terms
    pub fn french_termination_terms() -> Self {
        Self::parse(FRENCH_TERMINATION_TERMS)
    }

    /// Whether a folded token is in the list
    #[inline]
    pub fn contains(&self, token: &str) -> bool {
        self.terms.contains(token)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
