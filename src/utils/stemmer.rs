//! Pluggable root-form reduction
//!
//! The recognizer does not care which algorithm produces a stem, only that it
//! is deterministic. Snowball stemmers cover the supported languages; the
//! number of times a stemmer is applied is a separate policy because some
//! algorithms (French in particular) need a second pass to collapse related
//! noun and adjective forms onto one root.

use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reduces one folded token to its root form
pub trait TokenStemmer: Send + Sync {
    /// Returns an empty string when the token cannot be stemmed
    fn stem(&self, token: &str) -> String;
}

/// Stemming language
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum StemLanguage {
    #[default]
    French,
    English,
    Spanish,
    Italian,
    German,
    Portuguese,
    Dutch,
    /// Tokens are matched as folded, without stemming
    #[serde(rename = "none")]
    #[value(name = "none")]
    Disabled,
}

impl StemLanguage {
    fn algorithm(self) -> Option<Algorithm> {
        match self {
            StemLanguage::French => Some(Algorithm::French),
            StemLanguage::English => Some(Algorithm::English),
            StemLanguage::Spanish => Some(Algorithm::Spanish),
            StemLanguage::Italian => Some(Algorithm::Italian),
            StemLanguage::German => Some(Algorithm::German),
            StemLanguage::Portuguese => Some(Algorithm::Portuguese),
            StemLanguage::Dutch => Some(Algorithm::Dutch),
            StemLanguage::Disabled => None,
        }
    }
}

/// Snowball stemmer for one language
pub struct SnowballStemmer {
    inner: Stemmer,
}

impl SnowballStemmer {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            inner: Stemmer::create(algorithm),
        }
    }
}

impl TokenStemmer for SnowballStemmer {
    fn stem(&self, token: &str) -> String {
        if token.is_empty() {
            return String::new();
        }
        self.inner.stem(token).into_owned()
    }
}

/// Leaves tokens unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityStemmer;

impl TokenStemmer for IdentityStemmer {
    fn stem(&self, token: &str) -> String {
        token.to_string()
    }
}

/// A stemmer applied a fixed number of times in sequence
#[derive(Clone)]
pub struct StemPipeline {
    stemmer: Arc<dyn TokenStemmer>,
    passes: usize,
}

impl StemPipeline {
    pub fn new(stemmer: Arc<dyn TokenStemmer>, passes: usize) -> Self {
        Self { stemmer, passes }
    }

    /// Build the pipeline for a configured language
    pub fn for_language(language: StemLanguage, passes: usize) -> Self {
        let stemmer: Arc<dyn TokenStemmer> = match language.algorithm() {
            Some(algorithm) => Arc::new(SnowballStemmer::new(algorithm)),
            None => Arc::new(IdentityStemmer),
        };
        Self::new(stemmer, passes)
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Apply every pass; stops early once a pass yields nothing
    pub fn apply(&self, token: &str) -> String {
        let mut current = token.to_string();
        for _ in 0..self.passes {
            if current.is_empty() {
                break;
            }
            current = self.stemmer.stem(&current);
        }
        current
    }
}

impl std::fmt::Debug for StemPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StemPipeline")
            .field("passes", &self.passes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drops one trailing char per pass
    struct ChopStemmer;

    impl TokenStemmer for ChopStemmer {
        fn stem(&self, token: &str) -> String {
            let mut chars = token.chars();
            chars.next_back();
            chars.as_str().to_string()
        }
    }

    #[test]
    fn test_pass_count_is_policy() {
        let once = StemPipeline::new(Arc::new(ChopStemmer), 1);
        let twice = StemPipeline::new(Arc::new(ChopStemmer), 2);
        assert_eq!(once.apply("abcd"), "abc");
        assert_eq!(twice.apply("abcd"), "ab");
    }

    #[test]
    fn test_empty_result_stops_pipeline() {
        let pipeline = StemPipeline::new(Arc::new(ChopStemmer), 5);
        assert_eq!(pipeline.apply("ab"), "");
        assert_eq!(pipeline.apply(""), "");
    }

    #[test]
    fn test_french_double_stemming_is_deterministic() {
        let pipeline = StemPipeline::for_language(StemLanguage::French, 2);
        assert_eq!(pipeline.apply("thoracique"), pipeline.apply("thoracique"));
        assert!(!pipeline.apply("circulatoire").is_empty());
    }

    #[test]
    fn test_disabled_language_is_identity() {
        let pipeline = StemPipeline::for_language(StemLanguage::Disabled, 2);
        assert_eq!(pipeline.apply("fievre"), "fievre");
    }

    #[test]
    fn test_snowball_empty_token() {
        let stemmer = SnowballStemmer::new(Algorithm::English);
        assert_eq!(stemmer.stem(""), "");
        assert_eq!(stemmer.stem("running"), "run");
    }
}
