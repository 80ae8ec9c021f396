//! Configuration for histogram search.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for a search run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where query images and datasets live
    #[serde(default)]
    pub paths: PathsConfig,

    /// Histogram and ranking parameters
    #[serde(default)]
    pub search: SearchConfig,

    /// Runtime and reporting
    #[serde(default)]
    pub processing: ProcessingConfig,
}

/// Filesystem layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory query image names are resolved against
    #[serde(default = "default_query_root")]
    pub query_root: PathBuf,

    /// Directory dataset names are resolved against
    #[serde(default = "default_dataset_root")]
    pub dataset_root: PathBuf,

    /// File extensions treated as dataset images (case-insensitive)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            query_root: default_query_root(),
            dataset_root: default_dataset_root(),
            extensions: default_extensions(),
        }
    }
}

impl PathsConfig {
    /// Resolve a query image name. Absolute paths are used as-is.
    pub fn query_path(&self, name: &str) -> PathBuf {
        self.query_root.join(name)
    }

    /// Resolve a dataset directory name. Absolute paths are used as-is.
    pub fn dataset_path(&self, name: &str) -> PathBuf {
        self.dataset_root.join(name)
    }
}

/// Histogram and ranking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Zero-filled bins placed ahead of the pixel bins
    #[serde(default = "default_depth")]
    pub depth: usize,

    /// Number of results to keep
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Number of dataset partitions, one worker each
    #[serde(default = "default_partitions")]
    pub partitions: usize,

    /// Capacity of the histogram channel between workers and the selector
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            top_k: default_top_k(),
            partitions: default_partitions(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Number of Tokio worker threads
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// Enable metrics reporting
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Metrics reporting interval in seconds
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,

    /// Optional path to save metrics JSON after run completes
    #[serde(default)]
    pub metrics_output_path: Option<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            enable_metrics: true,
            metrics_interval_secs: default_metrics_interval(),
            metrics_output_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML or JSON file.
    /// Format is auto-detected from file extension (.yaml, .yml, or .json).
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Config = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&contents)?,
            "json" => serde_json::from_str(&contents)?,
            _ => {
                // Try YAML first (it's a superset of JSON)
                serde_yaml::from_str(&contents)?
            }
        };
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate the configuration.
    ///
    /// `partitions == 0` is accepted: the pipeline treats it as "no work".
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.search.top_k == 0 {
            anyhow::bail!("top_k must be > 0");
        }
        if self.search.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be > 0");
        }
        if self.paths.extensions.is_empty() {
            anyhow::bail!("At least one image extension is required");
        }
        if self.processing.worker_threads == Some(0) {
            anyhow::bail!("worker_threads must be > 0 when set");
        }
        if self.processing.enable_metrics && self.processing.metrics_interval_secs == 0 {
            anyhow::bail!("metrics_interval_secs must be > 0");
        }
        Ok(())
    }
}

// Default value functions for serde
fn default_query_root() -> PathBuf { PathBuf::from("res/queryImages") }
fn default_dataset_root() -> PathBuf { PathBuf::from("res") }
fn default_extensions() -> Vec<String> { vec!["jpg".to_string(), "jpeg".to_string()] }
fn default_depth() -> usize { 10 }
fn default_top_k() -> usize { 5 }
fn default_partitions() -> usize { 4 }
fn default_channel_capacity() -> usize { 64 }
fn default_true() -> bool { true }
fn default_metrics_interval() -> u64 { 5 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search.depth, 10);
        assert_eq!(config.search.top_k, 5);
        assert_eq!(config.search.partitions, 4);
        assert_eq!(config.paths.extensions, vec!["jpg", "jpeg"]);
        assert!(config.processing.enable_metrics);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = Config::from_yaml(
            r#"
search:
  partitions: 20
paths:
  dataset_root: "/data"
"#,
        )
        .unwrap();

        assert_eq!(config.search.partitions, 20);
        assert_eq!(config.search.top_k, 5);
        assert_eq!(config.paths.dataset_root, PathBuf::from("/data"));
        assert_eq!(config.paths.query_root, PathBuf::from("res/queryImages"));
    }

    #[test]
    fn test_json_and_yaml_roundtrip() {
        let config = Config::from_json(r#"{"search": {"top_k": 3, "depth": 0}}"#).unwrap();
        assert_eq!(config.search.top_k, 3);
        assert_eq!(config.search.depth, 0);

        let yaml = config.to_yaml().unwrap();
        let back = Config::from_yaml(&yaml).unwrap();
        assert_eq!(back.search.top_k, 3);
        assert_eq!(back.search.depth, 0);
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.json");
        std::fs::write(&path, r#"{"search": {"partitions": 7}}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.search.partitions, 7);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.search.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.channel_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.paths.extensions.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.processing.worker_threads = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_partitions_is_valid() {
        let mut config = Config::default();
        config.search.partitions = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_path_resolution() {
        let paths = PathsConfig {
            query_root: PathBuf::from("/q"),
            dataset_root: PathBuf::from("/d"),
            extensions: default_extensions(),
        };
        assert_eq!(paths.query_path("q00.jpg"), PathBuf::from("/q/q00.jpg"));
        assert_eq!(paths.dataset_path("set1"), PathBuf::from("/d/set1"));
        assert_eq!(paths.dataset_path("/abs/set"), PathBuf::from("/abs/set"));
    }
}
