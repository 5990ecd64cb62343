//! Remembered source and destination folders
//!
//! The last folders a run was started with are kept in a small JSON file so
//! the next invocation can reuse them when none are given.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default file name for remembered locations
pub const LOCATIONS_FILENAME: &str = "last_location.json";

/// Last used folders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastLocations {
    /// Version for file format compatibility
    version: u32,

    /// Last source folder
    pub source_dir: Option<PathBuf>,

    /// Last destination folder
    pub dest_dir: Option<PathBuf>,

    /// When the locations were last saved
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for LastLocations {
    fn default() -> Self {
        Self::new()
    }
}

impl LastLocations {
    /// Current file format version
    const VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            source_dir: None,
            dest_dir: None,
            updated_at: None,
        }
    }

    /// Load remembered locations, starting fresh when there are none
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(?path, "Locations file does not exist");
            return Ok(Self::new());
        }

        let file = File::open(path)
            .map_err(|e| Error::StateFile(format!("Failed to open locations file: {}", e)))?;
        let reader = BufReader::new(file);

        let locations: Self = serde_json::from_reader(reader)
            .map_err(|e| Error::StateFile(format!("Failed to parse locations file: {}", e)))?;

        if locations.version != Self::VERSION {
            warn!(
                file_version = locations.version,
                current_version = Self::VERSION,
                "Locations file version mismatch, starting fresh"
            );
            return Ok(Self::new());
        }

        Ok(locations)
    }

    /// Save locations, replacing the file atomically
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = Some(chrono::Utc::now());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        let file = File::create(&temp_path).map_err(|e| {
            Error::StateFile(format!("Failed to create temp locations file: {}", e))
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|e| {
            Error::StateFile(format!("Failed to write temp locations file: {}", e))
        })?;

        fs::rename(&temp_path, path).map_err(|e| {
            Error::StateFile(format!("Failed to rename temp locations file: {}", e))
        })?;

        info!(?path, "Saved last used locations");
        Ok(())
    }

    /// Remember a source and destination pair
    pub fn remember(&mut self, source_dir: &Path, dest_dir: &Path) {
        self.source_dir = Some(source_dir.to_path_buf());
        self.dest_dir = Some(dest_dir.to_path_buf());
    }

    /// Remembered source, if it still exists
    pub fn existing_source(&self) -> Option<&Path> {
        self.source_dir.as_deref().filter(|p| p.is_dir())
    }

    /// Remembered destination, if it still exists
    pub fn existing_dest(&self) -> Option<&Path> {
        self.dest_dir.as_deref().filter(|p| p.is_dir())
    }
}
