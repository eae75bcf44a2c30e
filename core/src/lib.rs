pub mod index;
pub mod persist;
pub mod search;
pub mod tokenizer;

pub use index::{InvertedIndex, Posting};
pub use search::{rank, rank_query, RelevanceResult, MAX_RESULTS};

pub type DocId = u32;
