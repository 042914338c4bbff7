#![deny(missing_docs)]

//! Core library for the ChunkFlow document chunking service.

/// HTTP routing and REST handlers.
pub mod api;
/// Zip packaging and retrieval of batch results.
pub mod archive;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Batch counters exposed over HTTP.
pub mod metrics;
/// Chunking, document validation, and batch orchestration.
pub mod processing;
