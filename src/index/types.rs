use roaring::RoaringTreemap;
use rustc_hash::FxHashMap;

/// Unique identifier for a concept in the dictionary
pub type ConceptId = u64;

/// Set of concept ids (unique members, iterated in ascending order)
pub type ConceptSet = RoaringTreemap;

/// One parsed dictionary line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub concept_id: ConceptId,
    pub label: String,
    /// Number of indexed content tokens derived from the label
    pub token_count: usize,
}

/// Stem -> concepts whose label contains a token with that stem
#[derive(Debug, Default)]
pub struct StemIndex {
    postings: FxHashMap<String, ConceptSet>,
}

impl StemIndex {
    pub fn insert(&mut self, stem: String, concept_id: ConceptId) {
        self.postings.entry(stem).or_default().insert(concept_id);
    }

    /// Concepts for a stem; `None` when the stem was never indexed
    #[inline]
    pub fn get(&self, stem: &str) -> Option<&ConceptSet> {
        self.postings.get(stem)
    }

    /// Number of distinct stems
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Total number of (stem, concept) pairs
    pub fn posting_count(&self) -> u64 {
        self.postings.values().map(|set| set.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConceptSet)> {
        self.postings.iter().map(|(stem, set)| (stem.as_str(), set))
    }
}

/// Concept -> indexed token count of its label
#[derive(Debug, Default)]
pub struct ConceptLengthIndex {
    lengths: FxHashMap<ConceptId, usize>,
}

impl ConceptLengthIndex {
    /// Record a length, returning the one it replaced
    pub fn insert(&mut self, concept_id: ConceptId, token_count: usize) -> Option<usize> {
        self.lengths.insert(concept_id, token_count)
    }

    #[inline]
    pub fn get(&self, concept_id: ConceptId) -> Option<usize> {
        self.lengths.get(&concept_id).copied()
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConceptId, usize)> + '_ {
        self.lengths.iter().map(|(&id, &len)| (id, len))
    }
}
