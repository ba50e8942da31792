use crate::index::build::DictionaryIndex;
use serde::Serialize;
use tracing::info;

/// Size figures for a loaded dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub concepts: usize,
    pub stems: usize,
    pub postings: u64,
    /// Concepts whose label has no indexable token; they can never match
    pub empty_concepts: usize,
    pub longest_concept: usize,
}

impl IndexStats {
    pub fn collect(index: &DictionaryIndex) -> Self {
        let mut empty_concepts = 0;
        let mut longest_concept = 0;
        for (_, len) in index.lengths().iter() {
            if len == 0 {
                empty_concepts += 1;
            }
            longest_concept = longest_concept.max(len);
        }

        Self {
            concepts: index.concept_count(),
            stems: index.stems().len(),
            postings: index.stems().posting_count(),
            empty_concepts,
            longest_concept,
        }
    }

    pub fn log(&self) {
        info!(
            concepts = self.concepts,
            stems = self.stems,
            postings = self.postings,
            empty_concepts = self.empty_concepts,
            longest_concept = self.longest_concept,
            "dictionary statistics"
        );
    }
}
