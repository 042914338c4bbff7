//! Core data types and error definitions for the processing pipeline.

use crate::archive::ArchiveError;
use serde::Serialize;
use thiserror::Error;

/// Rejections raised while validating chunk parameters. Always fatal for the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A chunk size of zero can never make progress.
    #[error("chunk_size must be a positive integer")]
    ZeroChunkSize,
    /// Overlap must leave a positive stride between chunks.
    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge {
        /// Requested chunk size.
        size: usize,
        /// Requested overlap.
        overlap: usize,
    },
    /// A request field was present but not a non-negative integer.
    #[error("{field} must be a non-negative integer, got '{value}'")]
    InvalidNumber {
        /// Name of the offending form field.
        field: &'static str,
        /// Raw value supplied by the caller.
        value: String,
    },
}

/// Per-document failures. Recorded in the batch log, never escalated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// File extension is outside the accepted list.
    #[error("unsupported file type '{extension}' (accepted: {accepted})")]
    UnsupportedExtension {
        /// Extension found on the uploaded file (empty when missing).
        extension: String,
        /// Comma separated list of accepted extensions.
        accepted: String,
    },
    /// Content contains NUL bytes and is treated as binary.
    #[error("content appears to be binary")]
    BinaryContent,
    /// Content is not valid UTF-8.
    #[error("content is not valid UTF-8 text: {0}")]
    InvalidEncoding(String),
    /// The worker processing this document stopped before producing a result.
    #[error("document processing aborted: {0}")]
    Aborted(String),
}

/// Batch-fatal failures. Either variant means no `download_token` was issued.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Chunk parameters were rejected before any document was processed.
    #[error("Invalid chunk configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    /// Archive construction failed after chunking.
    #[error("Failed to build archive: {0}")]
    Archive(#[from] ArchiveError),
}

/// Validated chunking parameters shared by every document in a batch.
///
/// The only constructor enforces `overlap < size`, so the chunker never needs to re-check it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    size: usize,
    overlap: usize,
}

impl ChunkConfig {
    /// Validate `size`/`overlap` and build a configuration.
    pub fn new(size: usize, overlap: usize) -> Result<Self, ConfigurationError> {
        if size == 0 {
            return Err(ConfigurationError::ZeroChunkSize);
        }
        if overlap >= size {
            return Err(ConfigurationError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    /// Maximum number of characters per chunk.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Characters repeated between consecutive chunks.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between consecutive chunk starts; always positive.
    pub fn stride(&self) -> usize {
        self.size - self.overlap
    }
}

/// A contiguous slice of a document. Offsets are character positions, end exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkRecord {
    /// Sequence number starting at zero.
    pub index: usize,
    /// Chunk contents.
    pub text: String,
    /// Offset of the first character in the source text.
    pub start_offset: usize,
    /// Offset one past the last character in the source text.
    pub end_offset: usize,
    /// Markdown headers enclosing the chunk; empty unless splitting by headers.
    pub headers: HeaderPath,
}

/// The `#`, `##` and `###` headings in effect at some point of a markdown document.
///
/// Serialized as `{"H1": .., "H2": .., "H3": ..}` with unset levels omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderPath {
    /// Current top-level heading.
    #[serde(rename = "H1", skip_serializing_if = "Option::is_none")]
    pub h1: Option<String>,
    /// Current second-level heading.
    #[serde(rename = "H2", skip_serializing_if = "Option::is_none")]
    pub h2: Option<String>,
    /// Current third-level heading.
    #[serde(rename = "H3", skip_serializing_if = "Option::is_none")]
    pub h3: Option<String>,
}

impl HeaderPath {
    /// True when no heading has been seen.
    pub fn is_empty(&self) -> bool {
        self.h1.is_none() && self.h2.is_none() && self.h3.is_none()
    }

    /// Record a heading at `level` (1 to 3), clearing every deeper level.
    pub(crate) fn enter(&mut self, level: usize, title: &str) {
        let title = Some(title.to_string());
        match level {
            1 => {
                self.h1 = title;
                self.h2 = None;
                self.h3 = None;
            }
            2 => {
                self.h2 = title;
                self.h3 = None;
            }
            _ => self.h3 = title,
        }
    }
}

/// Raw upload handed to the document processor.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Base name of the uploaded file.
    pub filename: String,
    /// Undecoded file contents.
    pub content: Vec<u8>,
}

impl UploadedDocument {
    /// Pair a filename with its raw bytes.
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Status reported for each document in the batch log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Document decoded and chunked.
    Success,
    /// Document rejected; see its error message.
    Failed,
}

/// Result of processing a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Chunks produced in increasing offset order.
    Success {
        /// Chunks of the document text.
        chunks: Vec<ChunkRecord>,
    },
    /// Processing failed; the document contributes nothing to the archive.
    Failed(DocumentError),
}

/// A processed document ready for aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentJob {
    /// Name of the uploaded file.
    pub filename: String,
    /// Success with chunks, or the reason for failure.
    pub outcome: DocumentOutcome,
}

impl DocumentJob {
    /// Build a successful job.
    pub fn succeeded(filename: impl Into<String>, chunks: Vec<ChunkRecord>) -> Self {
        Self {
            filename: filename.into(),
            outcome: DocumentOutcome::Success { chunks },
        }
    }

    /// Build a failed job.
    pub fn failed(filename: impl Into<String>, error: DocumentError) -> Self {
        Self {
            filename: filename.into(),
            outcome: DocumentOutcome::Failed(error),
        }
    }

    /// Coarse status of the job.
    pub fn status(&self) -> DocumentStatus {
        match self.outcome {
            DocumentOutcome::Success { .. } => DocumentStatus::Success,
            DocumentOutcome::Failed(_) => DocumentStatus::Failed,
        }
    }

    /// Chunks of a successful job; empty for failures.
    pub fn chunks(&self) -> &[ChunkRecord] {
        match &self.outcome {
            DocumentOutcome::Success { chunks } => chunks,
            DocumentOutcome::Failed(_) => &[],
        }
    }

    /// Failure description, present iff the job failed.
    pub fn error_message(&self) -> Option<String> {
        match &self.outcome {
            DocumentOutcome::Success { .. } => None,
            DocumentOutcome::Failed(error) => Some(error.to_string()),
        }
    }
}

/// Per-document summary returned to callers, serialized with a `status` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DocumentLog {
    /// `{ "file", "status": "success", "chunks" }`
    Success {
        /// File name as uploaded.
        file: String,
        /// Number of chunks produced.
        chunks: usize,
    },
    /// `{ "file", "status": "failed", "message" }`
    Failed {
        /// File name as uploaded.
        file: String,
        /// Human readable failure reason.
        message: String,
    },
}

impl DocumentLog {
    /// File the entry refers to.
    pub fn file(&self) -> &str {
        match self {
            Self::Success { file, .. } | Self::Failed { file, .. } => file,
        }
    }

    /// Status of the entry.
    pub fn status(&self) -> DocumentStatus {
        match self {
            Self::Success { .. } => DocumentStatus::Success,
            Self::Failed { .. } => DocumentStatus::Failed,
        }
    }
}

impl From<&DocumentJob> for DocumentLog {
    fn from(job: &DocumentJob) -> Self {
        match &job.outcome {
            DocumentOutcome::Success { chunks } => Self::Success {
                file: job.filename.clone(),
                chunks: chunks.len(),
            },
            DocumentOutcome::Failed(error) => Self::Failed {
                file: job.filename.clone(),
                message: error.to_string(),
            },
        }
    }
}

/// Input to [`crate::processing::BatchService::process_batch`].
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Documents in upload order.
    pub documents: Vec<UploadedDocument>,
    /// Requested chunk size, validated once for the batch.
    pub chunk_size: usize,
    /// Requested overlap, validated once for the batch.
    pub chunk_overlap: usize,
}

/// Outcome of a batch that produced an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// Opaque token identifying the archive.
    pub download_token: String,
    /// One entry per uploaded document, in upload order.
    pub logs: Vec<DocumentLog>,
}
