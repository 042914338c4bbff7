//! Archive packaging for finished batches.
//!
//! A batch produces one zip container holding a folder per successful document and a
//! `manifest.json`. The container is identified by an opaque token of the form
//! `chunks_<batch id>.zip`; the HTTP layer turns it into a download URL and resolves it back
//! through [`ArchiveStore::locate`].

mod layout;
mod zip_store;

pub use layout::{ArchiveManifest, ChunkEntry, ManifestDocument, chunk_entry_name};
pub use zip_store::ZipArchiveStore;

use crate::processing::{ChunkConfig, DocumentJob};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

const TOKEN_PREFIX: &str = "chunks_";
const TOKEN_SUFFIX: &str = ".zip";

/// Errors raised while writing or resolving archives.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Filesystem operation failed.
    #[error("archive I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Zip encoder rejected an entry or failed to finalize.
    #[error("zip encoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// Chunk or manifest serialization failed.
    #[error("failed to serialize archive entry: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Background archive task stopped before completing.
    #[error("archive task failed: {0}")]
    Task(String),
    /// Token does not have the shape issued by this service.
    #[error("invalid archive token '{0}'")]
    InvalidToken(String),
    /// Token is well formed but no archive exists for it.
    #[error("archive '{0}' not found")]
    NotFound(String),
}

/// Storage backend for batch archives.
pub trait ArchiveStore: Send + Sync {
    /// Package the successful jobs of a batch and return the retrieval token.
    fn build(
        &self,
        batch_id: Uuid,
        config: ChunkConfig,
        jobs: &[DocumentJob],
    ) -> Result<String, ArchiveError>;

    /// Resolve a token previously returned by [`ArchiveStore::build`] to a file on disk.
    fn locate(&self, token: &str) -> Result<PathBuf, ArchiveError>;
}

/// Token issued for a batch.
pub fn archive_token(batch_id: Uuid) -> String {
    format!("{TOKEN_PREFIX}{batch_id}{TOKEN_SUFFIX}")
}

/// Validate a token and extract its batch id.
pub fn parse_token(token: &str) -> Result<Uuid, ArchiveError> {
    token
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|rest| rest.strip_suffix(TOKEN_SUFFIX))
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or_else(|| ArchiveError::InvalidToken(token.to_string()))
}
