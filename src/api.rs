//! HTTP surface for ChunkFlow.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /process` – Multipart upload of one or more `files` plus optional `chunk_size` and
//!   `chunk_overlap` fields. Returns `{ "download_url", "logs" }` where each log entry is
//!   `{ "file", "status": "success", "chunks" }` or `{ "file", "status": "failed", "message" }`.
//! - `GET /download/:token` – Fetch the zip archive produced by a batch.
//! - `GET /metrics` – Observe batch, document, and chunk counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Batch-fatal failures are reported as `{ "error": "..." }` with a non-2xx status.

use crate::archive::ArchiveError;
use crate::config::get_config;
use crate::metrics::MetricsSnapshot;
use crate::processing::{
    BatchApi, BatchError, BatchRequest, ConfigurationError, DocumentLog, UploadedDocument,
    sanitize::sanitize_filename,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Multipart field carrying uploaded documents.
const FILES_FIELD: &str = "files";
const CHUNK_SIZE_FIELD: &str = "chunk_size";
const CHUNK_OVERLAP_FIELD: &str = "chunk_overlap";

/// Build the HTTP router exposing the batch API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: BatchApi + 'static,
{
    let body_limit = get_config().max_upload_bytes;
    Router::new()
        .route("/process", post(process_upload::<S>))
        .route("/download/:token", get(download_archive::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

/// Success response for the `POST /process` endpoint.
#[derive(Serialize)]
struct ProcessResponse {
    /// Relative URL serving the batch archive.
    download_url: String,
    /// Per-document outcomes, in upload order.
    logs: Vec<DocumentLog>,
}

/// Fields collected from a multipart upload.
#[derive(Default)]
struct UploadForm {
    documents: Vec<UploadedDocument>,
    chunk_size: Option<String>,
    chunk_overlap: Option<String>,
}

/// Chunk every uploaded file and package the results.
///
/// Missing `chunk_size`/`chunk_overlap` fields fall back to the configured defaults. Files
/// that fail individually are reported in `logs`; only invalid chunk parameters, an empty
/// upload, or an archive failure reject the request as a whole.
async fn process_upload<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Json<ProcessResponse>, AppError>
where
    S: BatchApi,
{
    let form = read_upload_form(multipart).await?;
    if form.documents.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".into()));
    }

    let config = get_config();
    let chunk_size = parse_chunk_param(
        CHUNK_SIZE_FIELD,
        form.chunk_size.as_deref(),
        config.default_chunk_size,
    )?;
    let chunk_overlap = parse_chunk_param(
        CHUNK_OVERLAP_FIELD,
        form.chunk_overlap.as_deref(),
        config.default_chunk_overlap,
    )?;

    let files = form.documents.len();
    let result = service
        .process_batch(BatchRequest {
            documents: form.documents,
            chunk_size,
            chunk_overlap,
        })
        .await?;
    tracing::info!(
        files,
        token = %result.download_token,
        "Process request completed"
    );

    Ok(Json(ProcessResponse {
        download_url: format!("/download/{}", result.download_token),
        logs: result.logs,
    }))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FILES_FIELD => {
                let raw_name = field.file_name().unwrap_or_default().to_string();
                let content = field.bytes().await?;
                match sanitize_filename(&raw_name) {
                    Some(filename) => {
                        tracing::debug!(file = %filename, bytes = content.len(), "Received file");
                        form.documents
                            .push(UploadedDocument::new(filename, content.to_vec()));
                    }
                    None => tracing::debug!(raw_name = %raw_name, "Ignoring file part without a name"),
                }
            }
            CHUNK_SIZE_FIELD => form.chunk_size = Some(field.text().await?),
            CHUNK_OVERLAP_FIELD => form.chunk_overlap = Some(field.text().await?),
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }
    Ok(form)
}

/// Parse a textual chunk parameter; blank or missing values use `default`.
fn parse_chunk_param(
    field: &'static str,
    raw: Option<&str>,
    default: usize,
) -> Result<usize, ConfigurationError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigurationError::InvalidNumber {
                field,
                value: value.to_string(),
            }),
    }
}

/// Stream a finished batch archive back to the caller.
async fn download_archive<S>(
    State(service): State<Arc<S>>,
    Path(token): Path<String>,
) -> Result<Response, AppError>
where
    S: BatchApi,
{
    let path = service.archive_path(&token)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|error| AppError::Archive(ArchiveError::Io(error)))?;
    tracing::debug!(token = %token, bytes = bytes.len(), "Serving archive");

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{token}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

/// Return batch counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: BatchApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "process",
                method: "POST",
                path: "/process",
                description: "Upload documents as multipart `files` and chunk them with `chunk_size`/`chunk_overlap` characters. Response returns { \"download_url\": string, \"logs\": [...] }.",
                request_example: Some(json!({
                    "files": ["guide.md", "notes.md"],
                    "chunk_size": "4000",
                    "chunk_overlap": "400"
                })),
            },
            CommandDescriptor {
                name: "download",
                method: "GET",
                path: "/download/:token",
                description: "Download the zip archive of a processed batch using the token from `download_url`.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return batch, document, and chunk counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Batch(BatchError),
    Archive(ArchiveError),
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Batch(BatchError::Configuration(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Batch(BatchError::Archive(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Archive(ArchiveError::InvalidToken(_) | ArchiveError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Archive(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Batch(error) => error.to_string(),
            Self::Archive(error) => error.to_string(),
            Self::BadRequest(message) => message.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Request failed");
        } else {
            tracing::warn!(status = %status, error = %message, "Request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<BatchError> for AppError {
    fn from(inner: BatchError) -> Self {
        Self::Batch(inner)
    }
}

impl From<ConfigurationError> for AppError {
    fn from(inner: ConfigurationError) -> Self {
        Self::Batch(BatchError::Configuration(inner))
    }
}

impl From<ArchiveError> for AppError {
    fn from(inner: ArchiveError) -> Self {
        Self::Archive(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::BadRequest(format!("Malformed upload: {}", inner.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands, parse_chunk_param};
    use crate::archive::ArchiveError;
    use crate::config::{CONFIG, Config};
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        BatchApi, BatchError, BatchRequest, BatchResult, ConfigurationError, DocumentLog,
    };
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use std::path::PathBuf;
    use std::sync::{Arc, Once};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "chunkflow-test-boundary";

    #[tokio::test]
    async fn commands_catalog_exposes_process_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let process = commands
            .iter()
            .find(|cmd| cmd.name == "process")
            .expect("process command present");

        assert_eq!(process.method, "POST");
        assert_eq!(process.path, "/process");
        assert!(process.description.to_lowercase().contains("chunk"));
        assert!(commands.len() >= 3);
    }

    #[test]
    fn chunk_params_default_when_blank_and_reject_garbage() {
        assert_eq!(parse_chunk_param("chunk_size", None, 40), Ok(40));
        assert_eq!(parse_chunk_param("chunk_size", Some("  "), 40), Ok(40));
        assert_eq!(parse_chunk_param("chunk_size", Some(" 12 "), 40), Ok(12));
        assert_eq!(
            parse_chunk_param("chunk_overlap", Some("-1"), 4),
            Err(ConfigurationError::InvalidNumber {
                field: "chunk_overlap",
                value: "-1".into()
            })
        );
    }

    #[tokio::test]
    async fn process_route_forwards_files_and_parameters() {
        ensure_test_config();
        let service = Arc::new(StubBatchService::succeeding(vec![
            DocumentLog::Success {
                file: "a.md".into(),
                chunks: 3,
            },
            DocumentLog::Failed {
                file: "b.md".into(),
                message: "content appears to be binary".into(),
            },
        ]));
        let app = create_router(service.clone());

        let body = multipart_body(
            &[("chunk_size", "4"), ("chunk_overlap", "1")],
            &[("a.md", b"abcdefghij"), ("../b.md", b"\x00\x01")],
        );
        let response = app.oneshot(process_request(body)).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(
            json["download_url"],
            "/download/chunks_00000000-0000-0000-0000-000000000000.zip"
        );
        assert_eq!(json["logs"][0]["status"], "success");
        assert_eq!(json["logs"][0]["chunks"], 3);
        assert_eq!(json["logs"][1]["status"], "failed");
        assert_eq!(json["logs"][1]["message"], "content appears to be binary");

        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!((call.chunk_size, call.chunk_overlap), (4, 1));
        let names: Vec<&str> = call.documents.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
        assert_eq!(call.documents[0].content, b"abcdefghij");
    }

    #[tokio::test]
    async fn process_route_applies_configured_defaults() {
        ensure_test_config();
        let service = Arc::new(StubBatchService::succeeding(Vec::new()));
        let app = create_router(service.clone());

        let body = multipart_body(&[], &[("a.md", b"text")]);
        let response = app.oneshot(process_request(body)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let calls = service.recorded_calls().await;
        assert_eq!((calls[0].chunk_size, calls[0].chunk_overlap), (4000, 400));
    }

    #[tokio::test]
    async fn process_route_rejects_upload_without_files() {
        ensure_test_config();
        let service = Arc::new(StubBatchService::succeeding(Vec::new()));
        let app = create_router(service.clone());

        let body = multipart_body(&[("chunk_size", "10")], &[("", b"")]);
        let response = app.oneshot(process_request(body)).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No files uploaded");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn process_route_rejects_non_numeric_parameters() {
        ensure_test_config();
        let service = Arc::new(StubBatchService::succeeding(Vec::new()));
        let app = create_router(service.clone());

        let body = multipart_body(&[("chunk_size", "large")], &[("a.md", b"text")]);
        let response = app.oneshot(process_request(body)).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("chunk_size"));
        assert!(json.get("logs").is_none());
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn batch_fatal_errors_use_error_shape() {
        ensure_test_config();
        let configuration = Arc::new(StubBatchService::failing(|| {
            BatchError::Configuration(ConfigurationError::OverlapTooLarge {
                size: 4,
                overlap: 4,
            })
        }));
        let response = create_router(configuration)
            .oneshot(process_request(multipart_body(&[], &[("a.md", b"x")])))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("chunk_overlap"));

        let archive = Arc::new(StubBatchService::failing(|| {
            BatchError::Archive(ArchiveError::Io(std::io::Error::other("disk full")))
        }));
        let response = create_router(archive)
            .oneshot(process_request(multipart_body(
                &[],
                &[("a.md", b"x"), ("b.md", b"y")],
            )))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("disk full"));
        assert!(json.get("download_url").is_none());
        assert!(json.get("logs").is_none());
    }

    #[tokio::test]
    async fn download_of_unknown_token_is_not_found() {
        ensure_test_config();
        let app = create_router(Arc::new(StubBatchService::succeeding(Vec::new())));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/download/chunks_missing.zip")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn metrics_route_returns_snapshot() {
        ensure_test_config();
        let app = create_router(Arc::new(StubBatchService::succeeding(Vec::new())));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["batches_completed"], 7);
        assert_eq!(json["chunks_produced"], 0);
    }

    fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (filename, content) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: text/markdown\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn process_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/process")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    struct StubBatchService {
        calls: Arc<Mutex<Vec<BatchRequest>>>,
        logs: Vec<DocumentLog>,
        error: Option<fn() -> BatchError>,
    }

    impl StubBatchService {
        fn succeeding(logs: Vec<DocumentLog>) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                logs,
                error: None,
            }
        }

        fn failing(error: fn() -> BatchError) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                logs: Vec::new(),
                error: Some(error),
            }
        }

        async fn recorded_calls(&self) -> Vec<BatchRequest> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl BatchApi for StubBatchService {
        async fn process_batch(&self, request: BatchRequest) -> Result<BatchResult, BatchError> {
            self.calls.lock().await.push(request);
            if let Some(error) = self.error {
                return Err(error());
            }
            Ok(BatchResult {
                download_token: "chunks_00000000-0000-0000-0000-000000000000.zip".into(),
                logs: self.logs.clone(),
            })
        }

        fn archive_path(&self, token: &str) -> Result<PathBuf, ArchiveError> {
            Err(ArchiveError::NotFound(token.to_string()))
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                batches_completed: 7,
                ..MetricsSnapshot::default()
            }
        }
    }

    fn ensure_test_config() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = CONFIG.set(Config {
                output_dir: PathBuf::from("target/test-outputs"),
                default_chunk_size: 4000,
                default_chunk_overlap: 400,
                max_concurrency: 2,
                max_upload_bytes: 8 * 1024 * 1024,
                allowed_extensions: vec!["md".into()],
                strip_markdown_fences: true,
                structure_aware_splitting: false,
                server_port: None,
                log_file: None,
            });
        });
    }
}
