//! Chunked map-reduce summarization
//!
//! Long page text is split into overlapping chunks, each chunk is summarized
//! toward an objective, and the partial summaries are folded until one
//! remains.

mod splitter;
mod summarizer;

pub use splitter::{Chunk, DEFAULT_SEPARATORS, Document, RecursiveSplitter};
pub use summarizer::{MapReduceSummarizer, Summarize, summary_prompt};

/// Maximum chunk size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Characters of trailing context carried into the next chunk
pub const DEFAULT_CHUNK_OVERLAP: usize = 500;

/// Page text longer than this many characters is summarized
pub const DEFAULT_SUMMARY_THRESHOLD: usize = 10_000;
