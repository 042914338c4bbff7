//! Fixed-size sliding-window chunking.
//!
//! Chunks are measured in characters (Unicode scalar values), never bytes, so multi-byte text
//! is never split inside a code point. Each window holds at most `size` characters and the
//! next window starts `size - overlap` characters later. The last window ends at the end of
//! the text and may be shorter.
//!
//! [`SplitMode::Headers`] first cuts markdown into heading sections and windows each section
//! on its own, so no chunk straddles two headings.

use super::{
    sections::split_sections,
    types::{ChunkConfig, ChunkRecord, HeaderPath},
};

/// How a document is cut before the character window is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SplitMode {
    /// One window over the whole text.
    #[default]
    Window,
    /// One window per `#`/`##`/`###` section, tagging chunks with their headings.
    Headers,
}

impl SplitMode {
    /// Mode selected by a structure-aware flag.
    pub fn from_flag(structure_aware: bool) -> Self {
        if structure_aware {
            Self::Headers
        } else {
            Self::Window
        }
    }

    /// Chunk `text` according to this mode.
    pub fn split(self, text: &str, config: &ChunkConfig) -> Vec<ChunkRecord> {
        match self {
            Self::Window => chunk(text, config),
            Self::Headers => chunk_by_headers(text, config),
        }
    }
}

/// Split `text` into overlapping chunks.
///
/// - Empty text yields no chunks.
/// - Text of at most `config.size()` characters yields exactly one chunk.
/// - Dropping the last `config.overlap()` characters of every chunk but the final one and
///   concatenating the rest reproduces `text`.
pub fn chunk(text: &str, config: &ChunkConfig) -> Vec<ChunkRecord> {
    // Byte offset of every character, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = boundaries.len() - 1;
    if len == 0 {
        return Vec::new();
    }

    let size = config.size();
    let stride = config.stride();
    let mut chunks = Vec::with_capacity(expected_chunk_count(len, config));
    let mut start = 0;

    loop {
        let end = (start + size).min(len);
        chunks.push(ChunkRecord {
            index: chunks.len(),
            text: text[boundaries[start]..boundaries[end]].to_string(),
            start_offset: start,
            end_offset: end,
            headers: HeaderPath::default(),
        });
        if start + size >= len {
            break;
        }
        start += stride;
    }

    chunks
}

/// Window each header section separately.
///
/// Offsets stay relative to the whole document and indexes run across sections. Blank
/// sections produce no chunks.
pub fn chunk_by_headers(text: &str, config: &ChunkConfig) -> Vec<ChunkRecord> {
    let mut chunks = Vec::new();
    for section in split_sections(text) {
        for record in chunk(section.text, config) {
            chunks.push(ChunkRecord {
                index: chunks.len(),
                text: record.text,
                start_offset: section.start_offset + record.start_offset,
                end_offset: section.start_offset + record.end_offset,
                headers: section.headers.clone(),
            });
        }
    }
    chunks
}

/// Number of chunks [`chunk`] produces for a text of `len` characters.
pub fn expected_chunk_count(len: usize, config: &ChunkConfig) -> usize {
    if len == 0 {
        0
    } else if len <= config.size() {
        1
    } else {
        (len - config.overlap()).div_ceil(config.stride())
    }
}
