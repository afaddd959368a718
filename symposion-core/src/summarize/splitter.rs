//! Recursive separator text splitter
//!
//! Chunks are exact slices of the input. Consecutive chunks overlap by at most
//! `chunk_overlap` characters, so dropping each chunk's overlap with its
//! predecessor reconstructs the original text.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::Range;

use crate::error::{Result, SymposionError};

/// Default separators, coarsest first
pub const DEFAULT_SEPARATORS: [&str; 2] = ["\n\n", "\n"];

/// Input unit of the summarizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub objective: String,
}

impl Document {
    pub fn new(text: impl Into<String>, objective: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            objective: objective.into(),
        }
    }
}

/// A slice of a document; `text == document[start..end]` (byte offsets)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Chunk {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Splits text on a list of separators, falling back to finer ones for
/// spans that are still too long
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    /// # Errors
    ///
    /// Fails when `chunk_size` is zero or the overlap is not smaller than it.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(SymposionError::Validation(format!(
                "chunk_overlap ({}) must be smaller than a positive chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into overlapping chunks
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let mut pieces = Vec::new();
        self.atomize(text, 0, 0, &mut pieces);
        self.merge(text, &pieces)
    }

    /// Break `text` into pieces no longer than `chunk_size` where a separator
    /// allows it. Separators stay attached to the preceding piece.
    fn atomize(&self, text: &str, base: usize, level: usize, out: &mut Vec<Range<usize>>) {
        if text.is_empty() {
            return;
        }
        if char_len(text) <= self.chunk_size || level >= DEFAULT_SEPARATORS.len() {
            out.push(base..base + text.len());
            return;
        }

        let separator = DEFAULT_SEPARATORS[level];
        let mut from = 0;
        let mut pieces = Vec::new();
        for (idx, _) in text.match_indices(separator) {
            let to = idx + separator.len();
            pieces.push(from..to);
            from = to;
        }
        if from < text.len() {
            pieces.push(from..text.len());
        }

        for piece in pieces {
            let slice = &text[piece.clone()];
            if char_len(slice) <= self.chunk_size {
                out.push(base + piece.start..base + piece.end);
            } else {
                self.atomize(slice, base + piece.start, level + 1, out);
            }
        }
    }

    fn merge(&self, text: &str, pieces: &[Range<usize>]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut window_len = 0usize;
        let mut last_end = 0usize;

        for piece in pieces {
            let piece_len = char_len(&text[piece.clone()]);

            if !window.is_empty() && window_len + piece_len > self.chunk_size {
                emit(text, &window, &mut last_end, &mut chunks);

                // keep a trailing overlap that still leaves room for this piece
                while !window.is_empty()
                    && (window_len > self.chunk_overlap
                        || window_len + piece_len > self.chunk_size)
                {
                    if let Some((_, len)) = window.pop_front() {
                        window_len -= len;
                    }
                }
            }

            window.push_back((piece.clone(), piece_len));
            window_len += piece_len;
        }

        emit(text, &window, &mut last_end, &mut chunks);
        chunks
    }
}

fn emit(
    text: &str,
    window: &VecDeque<(Range<usize>, usize)>,
    last_end: &mut usize,
    chunks: &mut Vec<Chunk>,
) {
    let (Some((first, _)), Some((last, _))) = (window.front(), window.back()) else {
        return;
    };
    // a window made only of carried-over overlap adds nothing new
    if !chunks.is_empty() && last.end <= *last_end {
        return;
    }
    chunks.push(Chunk {
        index: chunks.len(),
        start: first.start,
        end: last.end,
        text: text[first.start..last.end].to_string(),
    });
    *last_end = last.end;
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
