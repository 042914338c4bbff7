//! Batch orchestration: validate once, chunk every document in parallel, package the results.

use crate::{
    archive::{ArchiveError, ArchiveStore, ZipArchiveStore},
    config::Config,
    metrics::{BatchMetrics, MetricsSnapshot},
    processing::{
        document::DocumentProcessor,
        types::{
            BatchError, BatchRequest, BatchResult, ChunkConfig, DocumentError, DocumentJob,
            DocumentLog, UploadedDocument,
        },
    },
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::{sync::Semaphore, task::JoinSet};
use uuid::Uuid;

/// Coordinates a batch: configuration check, per-document fan-out, and archive packaging.
///
/// The service owns the document processor, the archive store, and the metrics registry so the
/// HTTP surface and the CLI share one pipeline. Construct it once and share it through an `Arc`.
pub struct BatchService<A = ZipArchiveStore> {
    processor: Arc<DocumentProcessor>,
    archive: Arc<A>,
    max_concurrency: usize,
    metrics: Arc<BatchMetrics>,
}

/// Abstraction over the batch pipeline used by external surfaces.
#[async_trait]
pub trait BatchApi: Send + Sync {
    /// Chunk every document in the request and package the successes.
    async fn process_batch(&self, request: BatchRequest) -> Result<BatchResult, BatchError>;

    /// Resolve a download token to the archive on disk.
    fn archive_path(&self, token: &str) -> Result<PathBuf, ArchiveError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl BatchService<ZipArchiveStore> {
    /// Build the service described by the runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            DocumentProcessor::from_config(config),
            ZipArchiveStore::new(config.output_dir.clone()),
            config.max_concurrency,
        )
    }
}

impl<A> BatchService<A>
where
    A: ArchiveStore + 'static,
{
    /// Assemble a service from its parts. A concurrency of zero is treated as one.
    pub fn new(processor: DocumentProcessor, archive: A, max_concurrency: usize) -> Self {
        Self {
            processor: Arc::new(processor),
            archive: Arc::new(archive),
            max_concurrency: max_concurrency.max(1),
            metrics: Arc::new(BatchMetrics::new()),
        }
    }

    /// Run a batch end to end.
    ///
    /// Fails only when the chunk parameters are invalid (before any work starts) or when the
    /// archive cannot be built. Individual document failures are reported in `logs`.
    pub async fn process_batch(&self, request: BatchRequest) -> Result<BatchResult, BatchError> {
        let BatchRequest {
            documents,
            chunk_size,
            chunk_overlap,
        } = request;

        let config = match ChunkConfig::new(chunk_size, chunk_overlap) {
            Ok(config) => config,
            Err(error) => {
                self.metrics.record_rejected_batch();
                tracing::warn!(chunk_size, chunk_overlap, error = %error, "Batch rejected");
                return Err(error.into());
            }
        };

        let batch_id = Uuid::new_v4();
        tracing::info!(
            batch_id = %batch_id,
            documents = documents.len(),
            chunk_size,
            chunk_overlap,
            "Processing batch"
        );

        let jobs = self.process_documents(documents, config).await;
        let logs: Vec<DocumentLog> = jobs.iter().map(DocumentLog::from).collect();

        let download_token = match self.build_archive(batch_id, config, jobs).await {
            Ok(token) => token,
            Err(error) => {
                self.metrics.record_rejected_batch();
                tracing::error!(batch_id = %batch_id, error = %error, "Archive construction failed");
                return Err(error.into());
            }
        };

        self.metrics.record_batch(&logs);
        let failed = logs
            .iter()
            .filter(|log| matches!(log, DocumentLog::Failed { .. }))
            .count();
        tracing::info!(
            batch_id = %batch_id,
            documents = logs.len(),
            failed,
            token = %download_token,
            "Batch completed"
        );

        Ok(BatchResult {
            download_token,
            logs,
        })
    }

    /// Resolve a download token to the archive on disk.
    pub fn archive_path(&self, token: &str) -> Result<PathBuf, ArchiveError> {
        self.archive.locate(token)
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Process documents on the blocking pool, at most `max_concurrency` at a time.
    ///
    /// Each worker returns its input index and results land in a slot array, so the output
    /// order matches the input regardless of completion order.
    async fn process_documents(
        &self,
        documents: Vec<UploadedDocument>,
        config: ChunkConfig,
    ) -> Vec<DocumentJob> {
        let filenames: Vec<String> = documents.iter().map(|doc| doc.filename.clone()).collect();
        let mut slots: Vec<Option<DocumentJob>> = filenames.iter().map(|_| None).collect();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, document) in documents.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore).acquire_owned().await.ok();
            let processor = Arc::clone(&self.processor);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                (index, processor.process(document, &config))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, job)) => slots[index] = Some(job),
                Err(error) => tracing::error!(error = %error, "Document worker stopped"),
            }
        }

        slots
            .into_iter()
            .zip(filenames)
            .map(|(slot, filename)| {
                slot.unwrap_or_else(|| {
                    DocumentJob::failed(
                        filename,
                        DocumentError::Aborted("worker stopped before finishing".into()),
                    )
                })
            })
            .collect()
    }

    async fn build_archive(
        &self,
        batch_id: Uuid,
        config: ChunkConfig,
        jobs: Vec<DocumentJob>,
    ) -> Result<String, ArchiveError> {
        let archive = Arc::clone(&self.archive);
        tokio::task::spawn_blocking(move || archive.build(batch_id, config, &jobs))
            .await
            .map_err(|error| ArchiveError::Task(error.to_string()))?
    }
}

#[async_trait]
impl<A> BatchApi for BatchService<A>
where
    A: ArchiveStore + 'static,
{
    async fn process_batch(&self, request: BatchRequest) -> Result<BatchResult, BatchError> {
        BatchService::process_batch(self, request).await
    }

    fn archive_path(&self, token: &str) -> Result<PathBuf, ArchiveError> {
        BatchService::archive_path(self, token)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        BatchService::metrics_snapshot(self)
    }
}
