use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use facereg_core::DEFAULT_THRESHOLD;

const DEFAULT_BIND: &str = "0.0.0.0:5000";
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address the HTTP server listens on (default: 0.0.0.0:5000).
    pub bind: SocketAddr,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Path to the JSON encoding database.
    pub db_path: PathBuf,
    /// Euclidean distance at or below which a face is recognized.
    pub match_threshold: f32,
    /// Upper bound on request body size; base64 images are large.
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from `FACEREG_*` environment variables with defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let bind = std::env::var("FACEREG_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind
            .parse()
            .with_context(|| format!("invalid FACEREG_BIND address: {bind}"))?;

        let model_dir = std::env::var("FACEREG_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| facereg_core::default_model_dir());

        let db_path = std::env::var("FACEREG_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| facereg_core::data_dir().join("face_db.json"));

        Ok(Self {
            bind,
            model_dir,
            db_path,
            match_threshold: env_parse("FACEREG_MATCH_THRESHOLD", DEFAULT_THRESHOLD),
            max_body_bytes: env_parse("FACEREG_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        std::env::set_var("FACEREG_TEST_GARBAGE_F32", "zero point six");
        assert_eq!(env_parse("FACEREG_TEST_GARBAGE_F32", 0.6f32), 0.6);
    }

    #[test]
    fn test_env_parse_reads_value() {
        std::env::set_var("FACEREG_TEST_USIZE", "1024");
        assert_eq!(env_parse("FACEREG_TEST_USIZE", 7usize), 1024);
    }

    #[test]
    fn test_env_parse_missing_uses_default() {
        assert_eq!(env_parse("FACEREG_TEST_DEFINITELY_UNSET", 42u64), 42);
    }
}
