//! Text analysis utilities.
//!
//! ## Modules
//!
//! - [`normalize`] - Offset-preserving folding and tokenization
//! - [`stemmer`] - Pluggable stemmers and the stem-pass policy
//! - [`wordlist`] - Stopword and termination-term lists
//! - [`analyzer`] - The folding/stemming/word-list bundle shared by indexing and matching
//! - [`progress`] - Load spinner
//!
//! ## Key Functions
//!
//! ```
//! use clinrec::utils::{normalize, tokenize};
//!
//! let text = "Douleur thoracique, intense";
//! let tokens = tokenize(&normalize(text));
//! assert_eq!(tokens[1].text, "thoracique");
//! assert_eq!(&text[tokens[1].span.clone()], "thoracique");
//! ```

pub mod analyzer;
pub mod normalize;
pub mod progress;
pub mod stemmer;
pub mod wordlist;

pub use analyzer::*;
pub use normalize::*;
pub use stemmer::*;
pub use wordlist::*;
