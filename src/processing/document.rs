//! Per-document processing: validate, decode, clean, and chunk one upload.

use crate::config::Config;

use super::{
    chunking::SplitMode,
    sanitize::{decode_text, file_extension, strip_markdown_fences},
    types::{ChunkConfig, DocumentError, DocumentJob, UploadedDocument},
};

/// Turns uploads into [`DocumentJob`]s. Holds no mutable state, so one instance is shared by
/// every worker in a batch.
#[derive(Debug, Clone, Default)]
pub struct DocumentProcessor {
    allowed_extensions: Vec<String>,
    strip_markdown_fences: bool,
    split_mode: SplitMode,
}

impl DocumentProcessor {
    /// Build a processor accepting `allowed_extensions` (empty accepts any file).
    pub fn new(allowed_extensions: Vec<String>, strip_markdown_fences: bool) -> Self {
        Self {
            allowed_extensions,
            strip_markdown_fences,
            split_mode: SplitMode::Window,
        }
    }

    /// Use `split_mode` instead of the plain character window.
    pub fn with_split_mode(mut self, split_mode: SplitMode) -> Self {
        self.split_mode = split_mode;
        self
    }

    /// Build a processor from the runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.allowed_extensions.clone(),
            config.strip_markdown_fences,
        )
        .with_split_mode(SplitMode::from_flag(config.structure_aware_splitting))
    }

    /// Process one document. Failures are captured in the returned job, never propagated.
    pub fn process(&self, document: UploadedDocument, config: &ChunkConfig) -> DocumentJob {
        let UploadedDocument { filename, content } = document;
        match self.prepare_text(&filename, &content) {
            Ok(text) => {
                let chunks = self.split_mode.split(&text, config);
                tracing::debug!(
                    file = %filename,
                    characters = text.chars().count(),
                    chunks = chunks.len(),
                    split_mode = ?self.split_mode,
                    "Document chunked"
                );
                DocumentJob::succeeded(filename, chunks)
            }
            Err(error) => {
                tracing::warn!(file = %filename, error = %error, "Document rejected");
                DocumentJob::failed(filename, error)
            }
        }
    }

    fn prepare_text(&self, filename: &str, content: &[u8]) -> Result<String, DocumentError> {
        self.check_extension(filename)?;
        let text = decode_text(content)?;
        if self.strip_markdown_fences {
            Ok(strip_markdown_fences(&text))
        } else {
            Ok(text)
        }
    }

    fn check_extension(&self, filename: &str) -> Result<(), DocumentError> {
        if self.allowed_extensions.is_empty() {
            return Ok(());
        }
        let extension = file_extension(filename);
        if self.allowed_extensions.contains(&extension) {
            Ok(())
        } else {
            Err(DocumentError::UnsupportedExtension {
                extension,
                accepted: self.allowed_extensions.join(", "),
            })
        }
    }
}
