//! Configuration loading for the CLI.
//!
//! A YAML file given with `--config` wins; otherwise options come from
//! `STACK_*` environment variables (a `.env` file is honored).

use std::path::Path;

use anyhow::{Context, Result};
use raster_stack::StackConfig;
use tracing::{debug, info};

/// Load and validate the stack configuration.
pub fn load_config(path: Option<&Path>) -> Result<StackConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config = parse_config(&text)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            info!(path = %path.display(), "Loaded configuration file");
            config
        }
        None => {
            debug!("Loading configuration from environment");
            StackConfig::from_env()
        }
    };

    config.validate()?;
    Ok(config)
}

fn parse_config(text: &str) -> Result<StackConfig> {
    Ok(serde_yaml::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_stack::{GeoTiffCompression, ResamplingMethod};

    #[test]
    fn test_parse_partial_yaml() {
        let config = parse_config(
            "threads: 4\ndefault_resampling: lanczos\ncompression: none\nlock_wait_ms: 500\n",
        )
        .unwrap();
        assert_eq!(config.threads, 4);
        assert_eq!(config.default_resampling, ResamplingMethod::Lanczos);
        assert_eq!(config.compression, GeoTiffCompression::None);
        assert_eq!(config.lock_wait_ms, 500);
        assert_eq!(config.corner_neighbors, 5);
    }

    #[test]
    fn test_invalid_yaml_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.yaml");
        std::fs::write(&path, "threads: 0\n").unwrap();
        assert!(load_config(Some(&path)).is_err());

        std::fs::write(&path, "threads: [1, 2]\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
