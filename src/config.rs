//! Configuration types for photo mover

use crate::similarity::SIMILARITY_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default number of copy workers
pub const DEFAULT_WORKERS: usize = 4;

/// Configuration for photo mover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source folder to organize
    pub source_dir: Option<PathBuf>,

    /// Destination library folder
    pub dest_dir: Option<PathBuf>,

    /// Number of copy workers (0 = available parallelism)
    pub workers: usize,

    /// Hamming distance below which two photos count as the same image
    pub similarity_threshold: u32,

    /// Remember the last used source and destination
    pub remember_locations: bool,

    /// Where remembered locations are stored
    pub locations_file: Option<PathBuf>,

    /// Verbose output
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: None,
            dest_dir: None,
            workers: DEFAULT_WORKERS,
            similarity_threshold: SIMILARITY_THRESHOLD,
            remember_locations: true,
            locations_file: None,
            verbose: false,
        }
    }
}

impl Config {
    /// Worker count with `0` resolved to the machine's parallelism
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(DEFAULT_WORKERS)
        }
    }

    /// Check values that cannot be expressed by the types alone
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.similarity_threshold > 64 {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold must be between 0 and 64, got {}",
                self.similarity_threshold
            )));
        }
        if let (Some(source), Some(dest)) = (&self.source_dir, &self.dest_dir)
            && source == dest
        {
            return Err(ConfigError::Invalid(format!(
                "source and destination are the same folder: {}",
                source.display()
            )));
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Photo Mover Configuration File
# This file uses TOML format (https://toml.io)

# Folder to copy from. Hidden entries (names starting with "." or "$")
# are ignored.
source_dir = "D:/DCIM"

# Library folder to copy into:
#   photos -> <dest_dir>/YYYY/MM/
#   movies -> <dest_dir>/Movies/
#   others -> <dest_dir>/Other/
dest_dir = "E:/Library"

# Number of files copied in parallel (0 = one per CPU)
workers = 4

# Two photos whose average hashes differ in fewer bits than this are
# treated as the same picture, even when one of them is rotated
similarity_threshold = 5

# Remember the last used folders and reuse them when none are given
remember_locations = true

# Verbose output - show detailed processing information
verbose = false
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// A setting has an unusable value
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::Invalid(message) => write!(f, "Invalid configuration: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}
