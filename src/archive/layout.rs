//! Naming and serialization of archive entries.

use crate::processing::{
    ChunkConfig, ChunkRecord, DocumentJob, DocumentLog, DocumentStatus, HeaderPath,
    sanitize::file_stem,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

const FALLBACK_FOLDER: &str = "document";

/// JSON body stored for each chunk.
#[derive(Debug, Serialize)]
pub struct ChunkEntry<'a> {
    /// Uploaded file the chunk came from.
    pub source: &'a str,
    /// Zero-based position of the chunk within its document.
    pub chunk_index: usize,
    /// Character offset where the chunk starts.
    pub start_offset: usize,
    /// Character offset one past the chunk end.
    pub end_offset: usize,
    /// Headings enclosing the chunk, `{}` outside header splitting.
    pub metadata: &'a HeaderPath,
    /// SHA-256 of the chunk text, hex encoded.
    pub chunk_hash: String,
    /// Chunk text.
    pub content: &'a str,
}

impl<'a> ChunkEntry<'a> {
    /// Describe `record` as an archive entry for `source`.
    pub fn new(source: &'a str, record: &'a ChunkRecord) -> Self {
        Self {
            source,
            chunk_index: record.index,
            start_offset: record.start_offset,
            end_offset: record.end_offset,
            metadata: &record.headers,
            chunk_hash: compute_chunk_hash(&record.text),
            content: &record.text,
        }
    }
}

/// Per-document line of the manifest: the batch log entry plus its folder, if any.
#[derive(Debug, Serialize)]
pub struct ManifestDocument {
    /// Log entry as returned to the caller.
    #[serde(flatten)]
    pub log: DocumentLog,
    /// Folder holding the document's chunks; absent for failed documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

/// Top-level `manifest.json` describing the batch.
#[derive(Debug, Serialize)]
pub struct ArchiveManifest {
    /// Batch identifier shared with the download token.
    pub batch_id: String,
    /// Creation time, RFC 3339.
    pub created_at: String,
    /// Chunk size applied to every document.
    pub chunk_size: usize,
    /// Overlap applied to every document.
    pub chunk_overlap: usize,
    /// One entry per uploaded document, in upload order.
    pub documents: Vec<ManifestDocument>,
}

impl ArchiveManifest {
    pub(crate) fn new(
        batch_id: Uuid,
        config: ChunkConfig,
        jobs: &[DocumentJob],
        folders: &[Option<String>],
    ) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            created_at: current_timestamp_rfc3339(),
            chunk_size: config.size(),
            chunk_overlap: config.overlap(),
            documents: jobs
                .iter()
                .zip(folders)
                .map(|(job, folder)| ManifestDocument {
                    log: DocumentLog::from(job),
                    folder: folder.clone(),
                })
                .collect(),
        }
    }
}

/// Entry path of a chunk: `<folder>/<folder>_part_NNN.json`, numbered from 1.
pub fn chunk_entry_name(folder: &str, index: usize) -> String {
    format!("{folder}/{folder}_part_{:03}.json", index + 1)
}

/// Assign each successful job a folder named after its file stem, unique within the batch.
///
/// Collisions are compared case-insensitively and resolved with `-2`, `-3`, ... suffixes.
pub(crate) fn plan_folders(jobs: &[DocumentJob]) -> Vec<Option<String>> {
    let mut used = HashSet::new();
    jobs.iter()
        .map(|job| {
            if job.status() != DocumentStatus::Success {
                return None;
            }
            let base = folder_base(&job.filename);
            let mut candidate = base.clone();
            let mut suffix = 2;
            while !used.insert(candidate.to_lowercase()) {
                candidate = format!("{base}-{suffix}");
                suffix += 1;
            }
            Some(candidate)
        })
        .collect()
}

fn folder_base(filename: &str) -> String {
    let stem = file_stem(filename).trim();
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        FALLBACK_FOLDER.to_string()
    } else {
        stem.to_string()
    }
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub(crate) fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
