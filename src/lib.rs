//! # clinrec - Clinical Concept Recognizer
//!
//! clinrec annotates free clinical text with concepts from a terminology
//! dictionary. Labels and text are folded, tokenized and stemmed the same way,
//! then each position of the text is extended greedily across tokens for as
//! long as some concept still contains every stem seen so far.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - Dictionary loading and the stem/length indexes
//! - [`recognizer`] - Greedy maximal matching and the recognizer pool
//! - [`server`] - TCP line-protocol service and its client
//! - [`config`] - Server configuration (JSON file + CLI overrides)
//! - [`output`] - Client-side result formatting
//! - [`utils`] - Normalization, stemming, word lists
//!
//! ## Quick Start
//!
//! ```no_run
//! use clinrec::index::DictionaryIndex;
//! use clinrec::recognizer::{MatchEngine, Recognizer};
//! use clinrec::utils::{Analyzer, StemLanguage, StemPipeline, WordList};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let analyzer = Analyzer::new(
//!     StemPipeline::for_language(StemLanguage::French, 2),
//!     WordList::french_stopwords(),
//!     WordList::french_termination_terms(),
//! );
//! let index = DictionaryIndex::load(Path::new("dictionary.tsv"), Arc::new(analyzer)).unwrap();
//!
//! let mut engine = MatchEngine::new(Arc::new(index));
//! for token in engine.recognize("Douleur thoracique sans fièvre") {
//!     println!("{token}");
//! }
//! ```
//!
//! ## Matching rules
//!
//! 1. **Stopwords** inside a match are stepped over and not counted
//! 2. **Termination terms** end the match in progress
//! 3. A concept is reported only when the match consumed exactly as many
//!    tokens as its label has, so partial matches never surface

pub mod config;
pub mod index;
pub mod output;
pub mod recognizer;
pub mod server;
pub mod utils;
