//! Destination path computation
//!
//! Photos land in `<dest>/<YYYY>/<MM>/`, movies in `<dest>/Movies/` and
//! everything else in `<dest>/Other/`, always keeping the source file name.

use crate::classify::Category;
use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDateTime};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Computes destination paths under one destination root
#[derive(Debug, Clone)]
pub struct DestinationResolver {
    root: PathBuf,
}

impl DestinationResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a file of `category` belongs in, without touching the disk
    pub fn category_dir(
        &self,
        category: Category,
        source: &Path,
        capture: Option<&NaiveDateTime>,
    ) -> Result<PathBuf> {
        match category.folder_name() {
            Some(folder) => Ok(self.root.join(folder)),
            None => {
                let date = capture.ok_or_else(|| Error::MissingCaptureDate {
                    path: source.to_path_buf(),
                })?;
                Ok(self
                    .root
                    .join(format!("{:04}", date.year()))
                    .join(format!("{:02}", date.month())))
            }
        }
    }

    /// Destination path for `source`, creating its directory if needed
    pub fn resolve(
        &self,
        category: Category,
        source: &Path,
        capture: Option<&NaiveDateTime>,
    ) -> Result<PathBuf> {
        let filename = source.file_name().ok_or_else(|| Error::InvalidFileName {
            path: source.to_path_buf(),
        })?;

        let dir = self.category_dir(category, source, capture)?;
        fs::create_dir_all(&dir)?;

        let dest = dir.join(filename);
        trace!(?source, ?dest, ?category, "Resolved destination");
        Ok(dest)
    }
}

/// Find a path that does not exist yet by adding a numeric suffix
///
/// `a.jpg` becomes `a_1.jpg`, `a_2.jpg`, ... until a free name is found.
/// Only probes the file system; nothing is created.
pub fn make_unique(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().map(OsString::from).unwrap_or_default();
    let extension = path.extension();
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut counter: u64 = 0;
    loop {
        counter += 1;

        let mut name = stem.clone();
        name.push(format!("_{}", counter));
        if let Some(ext) = extension {
            name.push(".");
            name.push(ext);
        }

        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
    }
}
