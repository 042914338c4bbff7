//! Document processing pipeline: chunking, per-document validation, and batch orchestration.

pub mod chunking;
mod document;
pub mod sanitize;
mod sections;
mod service;
pub mod types;

pub use chunking::SplitMode;
pub use document::DocumentProcessor;
pub use service::{BatchApi, BatchService};
pub use types::{
    BatchError, BatchRequest, BatchResult, ChunkConfig, ChunkRecord, ConfigurationError,
    DocumentError, DocumentJob, DocumentLog, DocumentOutcome, DocumentStatus, HeaderPath,
    UploadedDocument,
};
