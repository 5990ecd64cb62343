//! Error types for photo mover

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for photo mover operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for photo mover
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read EXIF data from {path}: {message}")]
    ExifRead { path: PathBuf, message: String },

    #[error("Failed to decode image {path}: {message}")]
    ImageDecode { path: PathBuf, message: String },

    #[error("Invalid file name: {path}")]
    InvalidFileName { path: PathBuf },

    #[error("No capture date available for photo {path}")]
    MissingCaptureDate { path: PathBuf },

    #[error("No source folder selected")]
    NoSelection,

    #[error("Source is not a folder: {path}")]
    InvalidSelection { path: PathBuf },

    #[error("No destination folder selected")]
    NoDestination,

    #[error("No files found to process in {path}")]
    NoFiles { path: PathBuf },

    #[error("Destination {destination} is inside source {source_dir}")]
    DestinationInsideSource {
        destination: PathBuf,
        source_dir: PathBuf,
    },

    #[error("Session has already been started")]
    SessionStarted,

    #[error("State file error: {0}")]
    StateFile(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Whether this error aborts a run before any item is dispatched
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Error::NoSelection
                | Error::InvalidSelection { .. }
                | Error::NoDestination
                | Error::NoFiles { .. }
                | Error::DestinationInsideSource { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_errors() {
        assert!(Error::NoSelection.is_preflight());
        assert!(Error::NoDestination.is_preflight());
        assert!(
            Error::NoFiles {
                path: PathBuf::from("/src")
            }
            .is_preflight()
        );
        assert!(!Error::SessionStarted.is_preflight());
        assert!(
            !Error::InvalidFileName {
                path: PathBuf::from("/src")
            }
            .is_preflight()
        );
    }

    #[test]
    fn test_copy_error_message() {
        let err = Error::Copy {
            from: PathBuf::from("a.jpg"),
            to: PathBuf::from("b.jpg"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(err.to_string(), "Failed to copy a.jpg to b.jpg: disk full");
    }
}
