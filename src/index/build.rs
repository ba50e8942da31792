//! Dictionary loading and indexing
//!
//! Dictionary format: UTF-8, one concept per line, `<conceptId>\t<label>`.
//! Any malformed line aborts the whole load so a recognizer never runs on a
//! partially indexed dictionary.

use crate::index::types::{ConceptId, ConceptLengthIndex, ConceptSet, DictionaryEntry, StemIndex};
use crate::utils::analyzer::Analyzer;
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("failed to read dictionary {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dictionary {path} is not valid UTF-8: {source}")]
    Utf8 {
        path: PathBuf,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("line {line}: missing tab between concept id and label")]
    MissingLabel { line: usize },

    #[error("line {line}: invalid concept id {value:?}")]
    InvalidConceptId { line: usize, value: String },
}

/// Immutable stem and length indexes built from one dictionary
#[derive(Debug)]
pub struct DictionaryIndex {
    stems: StemIndex,
    lengths: ConceptLengthIndex,
    analyzer: Arc<Analyzer>,
}

/// A parsed line waiting for label analysis
struct RawEntry<'a> {
    concept_id: ConceptId,
    label: &'a str,
}

/// A line after label analysis
struct AnalyzedEntry {
    entry: DictionaryEntry,
    stems: Vec<String>,
}

impl DictionaryIndex {
    /// Index dictionary lines.
    ///
    /// Lines are parsed in order first so the reported error is always the
    /// first malformed line. Label analysis runs in parallel and the results
    /// are merged back in file order. When an id repeats, the stems of every
    /// occurrence stay indexed under it and the length of the last one is
    /// kept.
    pub fn build<'a, I>(lines: I, analyzer: Arc<Analyzer>) -> Result<Self, DictionaryError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let raw = lines
            .into_iter()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| parse_line(i + 1, line))
            .collect::<Result<Vec<_>, _>>()?;

        let analyzed: Vec<AnalyzedEntry> = raw
            .par_iter()
            .map(|raw| {
                let stems = analyzer.label_stems(raw.label);
                AnalyzedEntry {
                    entry: DictionaryEntry {
                        concept_id: raw.concept_id,
                        label: raw.label.to_string(),
                        token_count: stems.len(),
                    },
                    stems,
                }
            })
            .collect();

        let mut stems = StemIndex::default();
        let mut lengths = ConceptLengthIndex::default();

        for AnalyzedEntry { entry, stems: label_stems } in analyzed {
            for stem in label_stems {
                stems.insert(stem, entry.concept_id);
            }
            if let Some(previous) = lengths.insert(entry.concept_id, entry.token_count) {
                warn!(
                    concept_id = entry.concept_id,
                    previous_tokens = previous,
                    tokens = entry.token_count,
                    label = %entry.label,
                    "duplicate concept id, stems are merged and the last length is kept"
                );
            }
        }

        Ok(Self {
            stems,
            lengths,
            analyzer,
        })
    }

    /// Load and index a dictionary file
    pub fn load(path: &Path, analyzer: Arc<Analyzer>) -> Result<Self, DictionaryError> {
        let start = Instant::now();
        info!(path = %path.display(), "loading dictionary");

        let io_error = |source| DictionaryError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(io_error)?;
        let len = file.metadata().map_err(io_error)?.len();

        let index = if len == 0 {
            Self::build(std::iter::empty(), analyzer)?
        } else {
            // SAFETY: the file is opened read-only and only read during this call
            let mmap = unsafe { Mmap::map(&file) }.map_err(io_error)?;
            let text = std::str::from_utf8(&mmap).map_err(|source| DictionaryError::Utf8 {
                path: path.to_path_buf(),
                source,
            })?;
            Self::build(split_lines(text), analyzer)?
        };

        info!(
            concepts = index.concept_count(),
            stems = index.stems.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "dictionary indexed"
        );
        Ok(index)
    }

    /// Concepts sharing `stem`
    #[inline]
    pub fn concepts_for_stem(&self, stem: &str) -> Option<&ConceptSet> {
        if stem.is_empty() {
            return None;
        }
        self.stems.get(stem)
    }

    /// Indexed token count of a concept's label
    #[inline]
    pub fn concept_length(&self, concept_id: ConceptId) -> Option<usize> {
        self.lengths.get(concept_id)
    }

    pub fn concept_count(&self) -> usize {
        self.lengths.len()
    }

    pub fn stems(&self) -> &StemIndex {
        &self.stems
    }

    pub fn lengths(&self) -> &ConceptLengthIndex {
        &self.lengths
    }

    /// The analyzer the dictionary was indexed with; matching must use it too
    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }
}

fn parse_line(line_number: usize, line: &str) -> Result<RawEntry<'_>, DictionaryError> {
    let mut fields = line.split('\t');
    let id_field = fields.next().unwrap_or_default();
    let label = fields
        .next()
        .ok_or(DictionaryError::MissingLabel { line: line_number })?;

    let concept_id = id_field
        .trim()
        .parse::<ConceptId>()
        .map_err(|_| DictionaryError::InvalidConceptId {
            line: line_number,
            value: id_field.to_string(),
        })?;

    Ok(RawEntry { concept_id, label })
}

/// Split on `\n`, dropping a trailing `\r` from each line
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut start = 0;
    let ends = memchr::memchr_iter(b'\n', text.as_bytes())
        .map(Some)
        .chain(std::iter::once(None));

    ends.filter_map(move |end| {
        let line_start = start;
        let line_end = match end {
            Some(end) => {
                start = end + 1;
                end
            }
            None => text.len(),
        };
        if end.is_none() && line_start >= text.len() {
            return None;
        }
        let line = &text[line_start..line_end];
        Some(line.strip_suffix('\r').unwrap_or(line))
    })
}
