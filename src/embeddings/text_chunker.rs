// Fixed-size overlapping text chunker

use crate::types::{AppError, AppResult};

/// A window of the source document, tagged with its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// Splits text into windows of `chunk_size` characters where consecutive
/// windows share `overlap` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::InvalidRequest(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(AppError::InvalidRequest(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance in characters between the starts of two consecutive windows.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        self.windows(text)
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk { index, text })
            .collect()
    }

    fn windows(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char plus the end of the string, so windows
        // are always cut on UTF-8 boundaries.
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        let char_count = offsets.len() - 1;

        let mut windows = Vec::with_capacity(char_count / self.step() + 1);
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(char_count);
            windows.push(text[offsets[start]..offsets[end]].to_string());
            if end == char_count {
                break;
            }
            start += self.step();
        }
        windows
    }
}

/// Split `text` into overlapping windows. See [`TextChunker`].
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> AppResult<Vec<String>> {
    Ok(TextChunker::new(chunk_size, overlap)?.windows(text))
}
