//! Offline batch chunking.
//!
//! Collects files from the given paths (directories are walked recursively), runs them through
//! the same batch pipeline as the HTTP server, and prints the resulting log as JSON.
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use chunkflow::{
    archive::{ArchiveStore, ZipArchiveStore},
    config::{default_concurrency, parse_extensions},
    logging,
    processing::{
        BatchRequest, BatchService, DocumentLog, DocumentProcessor, SplitMode, UploadedDocument,
    },
};
use clap::Parser;
use serde_json::json;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "chunkflow-cli",
    about = "Chunk local documents into a zip archive of overlapping chunks"
)]
struct Cli {
    /// Files or directories to process.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Maximum characters per chunk.
    #[arg(long, default_value_t = 4000)]
    chunk_size: usize,
    /// Characters shared by consecutive chunks.
    #[arg(long, default_value_t = 400)]
    chunk_overlap: usize,
    /// Directory receiving the archive.
    #[arg(long, default_value = "temp_outputs")]
    output_dir: PathBuf,
    /// Comma separated extensions picked up when walking directories.
    #[arg(long, default_value = "md,markdown,txt")]
    extensions: String,
    /// Documents processed concurrently (defaults to available parallelism).
    #[arg(long)]
    concurrency: Option<usize>,
    /// Keep code fences wrapping whole documents.
    #[arg(long)]
    keep_fences: bool,
    /// Split on `#`, `##` and `###` headings before windowing.
    #[arg(long)]
    by_headers: bool,
    /// Log file (defaults to logs/chunkflow.log).
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_file.as_deref());

    let extensions = parse_extensions(&cli.extensions);
    let documents = collect_documents(&cli.inputs, &extensions)?;
    if documents.is_empty() {
        bail!("no matching files found");
    }

    let store = ZipArchiveStore::new(&cli.output_dir);
    let service = BatchService::new(
        DocumentProcessor::new(extensions, !cli.keep_fences)
            .with_split_mode(SplitMode::from_flag(cli.by_headers)),
        store.clone(),
        cli.concurrency.unwrap_or_else(default_concurrency),
    );
    let result = service
        .process_batch(BatchRequest {
            documents,
            chunk_size: cli.chunk_size,
            chunk_overlap: cli.chunk_overlap,
        })
        .await?;

    let archive = store.locate(&result.download_token)?;
    let failed = result
        .logs
        .iter()
        .filter(|log| matches!(log, DocumentLog::Failed { .. }))
        .count();
    let report = json!({
        "archive": archive.display().to_string(),
        "logs": result.logs,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if failed > 0 {
        eprintln!("{failed} document(s) failed; see logs above");
    }
    Ok(())
}

/// Read every input file, walking directories for files with an accepted extension.
///
/// Files named explicitly are always included so the processor can report why they fail.
fn collect_documents(inputs: &[PathBuf], extensions: &[String]) -> Result<Vec<UploadedDocument>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("failed to walk {}", input.display()))?
                .into_iter()
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|path| has_extension(path, extensions))
                .collect();
            found.sort();
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }

    paths
        .into_iter()
        .map(|path| {
            let content =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(UploadedDocument::new(filename, content))
        })
        .collect()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.contains(&ext))
}
