//! Text analysis shared by dictionary indexing and matching
//!
//! Both sides must fold, tokenize and stem identically or stems will never
//! meet, so they share one `Analyzer`.

use crate::utils::normalize::{Token, is_indexable, normalize, tokenize};
use crate::utils::stemmer::StemPipeline;
use crate::utils::wordlist::WordList;

/// How a token takes part in matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRole {
    /// Skipped transparently inside a match
    Stopword,
    /// Ends any match in progress
    Termination,
    /// Matched through its stem
    Content,
}

#[derive(Debug, Clone)]
pub struct Analyzer {
    stemming: StemPipeline,
    stopwords: WordList,
    termination_terms: WordList,
}

impl Analyzer {
    pub fn new(stemming: StemPipeline, stopwords: WordList, termination_terms: WordList) -> Self {
        Self {
            stemming,
            stopwords,
            termination_terms,
        }
    }

    /// Fold and split `text`, spans pointing into `text`
    pub fn tokens(&self, text: &str) -> Vec<Token> {
        tokenize(&normalize(text))
    }

    /// Stem a folded token with the configured number of passes
    pub fn stem(&self, token: &str) -> String {
        self.stemming.apply(token)
    }

    pub fn role(&self, token: &str) -> TokenRole {
        if self.stopwords.contains(token) {
            TokenRole::Stopword
        } else if self.termination_terms.contains(token) {
            TokenRole::Termination
        } else {
            TokenRole::Content
        }
    }

    /// Stems of the tokens of a dictionary label that count toward its length.
    ///
    /// Stopwords, non-alphanumeric tokens and tokens the stemmer cannot
    /// reduce are left out.
    pub fn label_stems(&self, label: &str) -> Vec<String> {
        self.tokens(label)
            .into_iter()
            .filter(|token| !self.stopwords.contains(&token.text) && is_indexable(&token.text))
            .map(|token| self.stem(&token.text))
            .filter(|stem| !stem.is_empty())
            .collect()
    }

    pub fn stopwords(&self) -> &WordList {
        &self.stopwords
    }

    pub fn termination_terms(&self) -> &WordList {
        &self.termination_terms
    }

    pub fn stemming(&self) -> &StemPipeline {
        &self.stemming
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::stemmer::StemLanguage;

    fn analyzer() -> Analyzer {
        Analyzer::new(
            StemPipeline::for_language(StemLanguage::Disabled, 2),
            WordList::from_terms(["de", "la"]),
            WordList::from_terms(["mais"]),
        )
    }

    #[test]
    fn test_label_stems_skip_stopwords() {
        let stems = analyzer().label_stems("Insuffisance de la valve mitrale");
        assert_eq!(stems, vec!["insuffisance", "valve", "mitrale"]);
    }

    #[test]
    fn test_termination_terms_are_still_indexed() {
        let stems = analyzer().label_stems("mais grain");
        assert_eq!(stems, vec!["mais", "grain"]);
    }

    #[test]
    fn test_roles() {
        let analyzer = analyzer();
        assert_eq!(analyzer.role("de"), TokenRole::Stopword);
        assert_eq!(analyzer.role("mais"), TokenRole::Termination);
        assert_eq!(analyzer.role("douleur"), TokenRole::Content);
    }
}
