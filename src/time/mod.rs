//! Capture time resolution for photos
//!
//! Photos are bucketed by the date they were taken. The date comes from
//! EXIF metadata when present and parseable, and otherwise from the file's
//! last modification time.

pub mod exif;

use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Source of the resolved timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// Extracted from EXIF metadata
    Exif,
    /// From file system modification time
    FileSystem,
}

/// Result of capture time resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTime {
    /// The resolved timestamp, in local time
    pub timestamp: NaiveDateTime,
    /// Source of the timestamp
    pub source: TimeSource,
}

/// Resolve the capture time of a photo
///
/// Never fails: any problem reading metadata falls back to the modification
/// time, and a file whose metadata cannot be read at all falls back to the
/// current time so the caller always has a usable date.
pub fn resolve_date(path: &Path) -> CaptureTime {
    match exif::extract_exif_time(path) {
        Ok(timestamp) => {
            debug!(?path, %timestamp, "Resolved capture time from EXIF");
            return CaptureTime {
                timestamp,
                source: TimeSource::Exif,
            };
        }
        Err(e) => {
            debug!(?path, error = %e, "No usable EXIF date, using modification time");
        }
    }

    let timestamp = match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => local_naive(modified),
        Err(e) => {
            warn!(?path, error = %e, "Modification time unavailable, using current time");
            Local::now().naive_local()
        }
    };

    CaptureTime {
        timestamp,
        source: TimeSource::FileSystem,
    }
}

/// Convert a system time to a naive local timestamp
pub fn local_naive(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}
