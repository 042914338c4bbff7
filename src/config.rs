use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_OUTPUT_DIR: &str = "temp_outputs";
const DEFAULT_CHUNK_SIZE: usize = 4000;
const DEFAULT_CHUNK_OVERLAP: usize = 400;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
const DEFAULT_ALLOWED_EXTENSIONS: &str = "md,markdown,txt";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the ChunkFlow server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory that receives finished archives.
    pub output_dir: PathBuf,
    /// Chunk size applied when a request omits `chunk_size`.
    pub default_chunk_size: usize,
    /// Chunk overlap applied when a request omits `chunk_overlap`.
    pub default_chunk_overlap: usize,
    /// Upper bound on documents processed concurrently within one batch.
    pub max_concurrency: usize,
    /// Maximum accepted request body size for uploads.
    pub max_upload_bytes: usize,
    /// Lowercase file extensions accepted for chunking; empty accepts everything.
    pub allowed_extensions: Vec<String>,
    /// Strip LLM-style code fences wrapping a whole document before chunking.
    pub strip_markdown_fences: bool,
    /// Split markdown into header sections before applying the character window.
    pub structure_aware_splitting: bool,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Log file path; `logs/chunkflow.log` when unset.
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let default_chunk_size =
            parse_optional("DEFAULT_CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE);
        let default_chunk_overlap =
            parse_optional("DEFAULT_CHUNK_OVERLAP")?.unwrap_or(DEFAULT_CHUNK_OVERLAP);
        if default_chunk_size == 0 || default_chunk_overlap >= default_chunk_size {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_CHUNK_OVERLAP must be smaller than a positive DEFAULT_CHUNK_SIZE".into(),
            ));
        }

        let max_concurrency = match parse_optional::<usize>("MAX_CONCURRENCY")? {
            Some(0) => return Err(ConfigError::InvalidValue("MAX_CONCURRENCY".into())),
            Some(value) => value,
            None => default_concurrency(),
        };

        Ok(Self {
            output_dir: load_env_optional("CHUNKFLOW_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            default_chunk_size,
            default_chunk_overlap,
            max_concurrency,
            max_upload_bytes: parse_optional("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            allowed_extensions: parse_extensions(
                load_env_optional("ALLOWED_EXTENSIONS")
                    .as_deref()
                    .unwrap_or(DEFAULT_ALLOWED_EXTENSIONS),
            ),
            strip_markdown_fences: parse_flag("STRIP_MARKDOWN_FENCES")?.unwrap_or(true),
            structure_aware_splitting: parse_flag("STRUCTURE_AWARE_SPLITTING")?.unwrap_or(false),
            server_port: parse_optional("SERVER_PORT")?,
            log_file: load_env_optional("CHUNKFLOW_LOG_FILE").map(PathBuf::from),
        })
    }
}

/// Split a comma separated extension list into normalized lowercase entries.
pub fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|value| value.trim().trim_start_matches('.').to_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Concurrency used when `MAX_CONCURRENCY` is unset.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|value| value.get())
        .unwrap_or(4)
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_flag(key: &str) -> Result<Option<bool>, ConfigError> {
    load_env_optional(key)
        .map(|value| parse_bool(key, &value))
        .transpose()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        output_dir = %config.output_dir.display(),
        default_chunk_size = config.default_chunk_size,
        default_chunk_overlap = config.default_chunk_overlap,
        max_concurrency = config.max_concurrency,
        structure_aware_splitting = config.structure_aware_splitting,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
