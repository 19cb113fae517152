//! Configuration for band-stack operations.

use std::path::PathBuf;
use std::time::Duration;

use geotiff_io::GeoTiffCompression;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, StackError};
use crate::types::ResamplingMethod;

/// Options recognized by every band-stack operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Worker pool size for batch matching (1 = sequential).
    pub threads: usize,

    /// Threads used inside a single source reprojection.
    pub resample_threads: usize,

    /// Resampling method when a source does not name one.
    pub default_resampling: ResamplingMethod,

    /// Compression for every GeoTIFF written.
    pub compression: GeoTiffCompression,

    /// How long to wait for another writer's lock before giving up.
    pub lock_wait_ms: u64,

    /// Directory for proximity rasters and other scratch output.
    pub scratch_dir: PathBuf,

    /// Nearest features taken per template corner in the proximity fallback.
    pub corner_neighbors: usize,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            resample_threads: 1,
            default_resampling: ResamplingMethod::Bilinear,
            compression: GeoTiffCompression::Deflate,
            lock_wait_ms: 0,
            scratch_dir: std::env::temp_dir(),
            corner_neighbors: 5,
        }
    }
}

impl StackConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults; unparsable values are logged
    /// and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("STACK_THREADS") {
            match val.parse() {
                Ok(n) => config.threads = n,
                Err(_) => warn!(value = %val, "Ignoring invalid STACK_THREADS"),
            }
        }

        if let Ok(val) = std::env::var("STACK_RESAMPLE_THREADS") {
            match val.parse() {
                Ok(n) => config.resample_threads = n,
                Err(_) => warn!(value = %val, "Ignoring invalid STACK_RESAMPLE_THREADS"),
            }
        }

        if let Ok(val) = std::env::var("STACK_RESAMPLING") {
            match val.parse() {
                Ok(method) => config.default_resampling = method,
                Err(e) => warn!(error = %e, "Ignoring invalid STACK_RESAMPLING"),
            }
        }

        if let Ok(val) = std::env::var("STACK_COMPRESSION") {
            match val.parse() {
                Ok(compression) => config.compression = compression,
                Err(e) => warn!(error = %e, "Ignoring invalid STACK_COMPRESSION"),
            }
        }

        if let Ok(val) = std::env::var("STACK_LOCK_WAIT_MS") {
            match val.parse() {
                Ok(ms) => config.lock_wait_ms = ms,
                Err(_) => warn!(value = %val, "Ignoring invalid STACK_LOCK_WAIT_MS"),
            }
        }

        if let Ok(val) = std::env::var("STACK_SCRATCH_DIR") {
            if !val.is_empty() {
                config.scratch_dir = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var("STACK_CORNER_NEIGHBORS") {
            match val.parse() {
                Ok(n) => config.corner_neighbors = n,
                Err(_) => warn!(value = %val, "Ignoring invalid STACK_CORNER_NEIGHBORS"),
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(StackError::InvalidConfig("threads must be > 0".to_string()));
        }

        if self.resample_threads == 0 {
            return Err(StackError::InvalidConfig(
                "resample_threads must be > 0".to_string(),
            ));
        }

        if self.corner_neighbors == 0 {
            return Err(StackError::InvalidConfig(
                "corner_neighbors must be > 0".to_string(),
            ));
        }

        if self.scratch_dir.as_os_str().is_empty() {
            return Err(StackError::InvalidConfig(
                "scratch_dir must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Lock acquisition timeout.
    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StackConfig::default();
        assert_eq!(config.threads, 1);
        assert_eq!(config.resample_threads, 1);
        assert_eq!(config.default_resampling, ResamplingMethod::Bilinear);
        assert_eq!(config.compression, GeoTiffCompression::Deflate);
        assert_eq!(config.lock_wait_ms, 0);
        assert_eq!(config.corner_neighbors, 5);
        assert_eq!(config.scratch_dir, std::env::temp_dir());
    }

    #[test]
    fn test_config_validation() {
        let mut config = StackConfig::default();
        assert!(config.validate().is_ok());

        config.threads = 0;
        assert!(config.validate().is_err());

        config = StackConfig::default();
        config.resample_threads = 0;
        assert!(config.validate().is_err());

        config = StackConfig::default();
        config.corner_neighbors = 0;
        assert!(matches!(config.validate(), Err(StackError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: StackConfig =
            serde_json::from_str(r#"{"threads": 4, "default_resampling": "cubic_spline"}"#).unwrap();
        assert_eq!(config.threads, 4);
        assert_eq!(config.default_resampling, ResamplingMethod::CubicSpline);
        assert_eq!(config.corner_neighbors, 5);
        assert_eq!(config.compression, GeoTiffCompression::Deflate);
    }

    #[test]
    fn test_lock_wait_duration() {
        let config = StackConfig {
            lock_wait_ms: 250,
            ..StackConfig::default()
        };
        assert_eq!(config.lock_wait(), Duration::from_millis(250));
    }
}
