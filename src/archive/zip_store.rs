//! Zip-on-disk archive store.

use super::{
    ArchiveError, ArchiveStore, archive_token,
    layout::{ArchiveManifest, ChunkEntry, chunk_entry_name, plan_folders},
    parse_token,
};
use crate::processing::{ChunkConfig, DocumentJob};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

const MANIFEST_NAME: &str = "manifest.json";
const PARTIAL_SUFFIX: &str = ".partial";

/// Writes batch archives as zip files under a single output directory.
#[derive(Debug, Clone)]
pub struct ZipArchiveStore {
    output_dir: PathBuf,
}

impl ZipArchiveStore {
    /// Store archives under `output_dir`, created on first use.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory receiving finished archives.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_archive(
        file: File,
        batch_id: Uuid,
        config: ChunkConfig,
        jobs: &[DocumentJob],
    ) -> Result<(), ArchiveError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(file);
        let folders = plan_folders(jobs);

        for (job, folder) in jobs.iter().zip(&folders) {
            let Some(folder) = folder else {
                continue;
            };
            writer.add_directory(format!("{folder}/"), options)?;
            for record in job.chunks() {
                let entry = ChunkEntry::new(&job.filename, record);
                writer.start_file(chunk_entry_name(folder, record.index), options)?;
                writer.write_all(&serde_json::to_vec_pretty(&entry)?)?;
            }
        }

        let manifest = ArchiveManifest::new(batch_id, config, jobs, &folders);
        writer.start_file(MANIFEST_NAME, options)?;
        writer.write_all(&serde_json::to_vec_pretty(&manifest)?)?;

        let file = writer.finish()?;
        file.sync_all()?;
        Ok(())
    }
}

impl ArchiveStore for ZipArchiveStore {
    fn build(
        &self,
        batch_id: Uuid,
        config: ChunkConfig,
        jobs: &[DocumentJob],
    ) -> Result<String, ArchiveError> {
        fs::create_dir_all(&self.output_dir)?;
        let token = archive_token(batch_id);
        let target = self.output_dir.join(&token);
        let partial = self.output_dir.join(format!("{token}{PARTIAL_SUFFIX}"));
        let (pending, file) = PendingArchive::create(partial)?;

        Self::write_archive(file, batch_id, config, jobs)?;
        pending.commit(&target)?;

        tracing::debug!(
            batch_id = %batch_id,
            path = %target.display(),
            documents = jobs.len(),
            "Archive written"
        );
        Ok(token)
    }

    fn locate(&self, token: &str) -> Result<PathBuf, ArchiveError> {
        let batch_id = parse_token(token)?;
        let path = self.output_dir.join(archive_token(batch_id));
        if path.is_file() {
            Ok(path)
        } else {
            Err(ArchiveError::NotFound(token.to_string()))
        }
    }
}

/// An archive file under construction. Removed on drop unless committed.
struct PendingArchive {
    path: PathBuf,
    committed: bool,
}

impl PendingArchive {
    fn create(path: PathBuf) -> Result<(Self, File), ArchiveError> {
        let file = File::create(&path)?;
        let pending = Self {
            path,
            committed: false,
        };
        Ok((pending, file))
    }

    fn commit(mut self, target: &Path) -> Result<(), ArchiveError> {
        fs::rename(&self.path, target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PendingArchive {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(error) = fs::remove_file(&self.path) {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %error,
                    "Failed to remove incomplete archive"
                );
            }
        }
    }
}
