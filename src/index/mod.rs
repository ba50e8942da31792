pub mod build;
pub mod stats;
pub mod types;

pub use build::{DictionaryError, DictionaryIndex};
pub use stats::IndexStats;
pub use types::*;
