//! # Configuration Management Module
//!
//! Host-level configuration for the script processor.
//!
//! ## Parameters:
//! - `engine_path`: Closure Compiler binary or jar (default: resolved automatically)
//! - `additional_params`: extra native flags applied on top of the defaults,
//!   below caller options (default: none)
//! - `override_min_gcc`: register the processor under the `gcc` name so hosts
//!   routing `min:gcc` libraries pick it up (default: false)
//! - `workers`: concurrent engine sessions in batch mode (default: 4)
//! - `output_path`: output directory for batch mode (default: next to the source)
//! - `fallback_to_original`: write the unoptimized source when compilation fails
//! - `json_output`: JSON lines instead of a progress bar
//!
//! ## Example file (`~/.script-optimizer/config.json`):
//! ```json
//! {
//!   "additional_params": ["--warning_level", "QUIET"],
//!   "override_min_gcc": true,
//!   "workers": 8
//! }
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the script processor and its host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Explicit engine location
    pub engine_path: Option<PathBuf>,
    /// Extra native flags (`--flag value`, `--flag=value` or `--flag`)
    pub additional_params: Vec<String>,
    /// Answer to the `gcc` processor name
    pub override_min_gcc: bool,
    /// Number of parallel engine sessions
    pub workers: usize,
    /// Output directory for optimized files (None = next to the source)
    pub output_path: Option<PathBuf>,
    /// Write the original source when optimization fails
    pub fallback_to_original: bool,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine_path: None,
            additional_params: Vec::new(),
            override_min_gcc: false,
            workers: 4,
            output_path: None,
            fallback_to_original: false,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if let Some(param) = self.additional_params.iter().find(|p| p.trim().is_empty()) {
            return Err(anyhow::anyhow!("Additional parameter must not be blank: {:?}", param));
        }

        if let Some(ref engine_path) = self.engine_path {
            if !engine_path.exists() {
                return Err(anyhow::anyhow!("Engine path does not exist: {}", engine_path.display()));
            }
        }

        if let Some(ref output_path) = self.output_path {
            if output_path.exists() && !output_path.is_dir() {
                return Err(anyhow::anyhow!("Output path is not a directory: {}", output_path.display()));
            }
        }

        Ok(())
    }

    /// Default configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".script-optimizer").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid configuration file {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.workers = 0;
        assert!(config.validate().is_err());

        config.workers = 2;
        config.additional_params = vec!["--debug".to_string(), "  ".to_string()];
        assert!(config.validate().is_err());

        config.additional_params.clear();
        config.engine_path = Some(PathBuf::from("/no/such/closure-compiler"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.workers, 4);
        assert!(config.additional_params.is_empty());
        assert!(!config.override_min_gcc);
        assert!(!config.fallback_to_original);
        assert!(config.output_path.is_none());
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let original_config = Config {
            additional_params: vec!["--warning_level".to_string(), "QUIET".to_string()],
            override_min_gcc: true,
            workers: 8,
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.additional_params, vec!["--warning_level", "QUIET"]);
        assert!(loaded_config.override_min_gcc);
        assert_eq!(loaded_config.workers, 8);
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{ "override_min_gcc": true }"#).await.unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert!(config.override_min_gcc);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_missing_file_gives_default() {
        let config = tokio_test::block_on(Config::from_file(Path::new("/no/such/config.json"))).unwrap();
        assert_eq!(config.workers, 4);
    }
}
