//! Source tree discovery
//!
//! Walks a source directory depth-first and lazily yields every visible
//! file and directory below it. Names starting with `.` or `$` are hidden
//! and neither yielded nor descended into. A directory that cannot be
//! listed produces a warning and its subtree is skipped; siblings are
//! unaffected. Symbolic links are followed, so a linked folder is walked
//! like a real one; link loops and dangling links become warnings.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};
use walkdir::{DirEntry, WalkDir};

/// Name prefixes of entries excluded from discovery
pub const HIDDEN_PREFIXES: &[u8] = b".$";

/// Kind of a discovered entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A discovered file system entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Absolute path of the entry
    pub path: PathBuf,
    /// Base name
    pub name: String,
    pub kind: EntryKind,
    /// Directory containing the entry
    pub parent: PathBuf,
    /// Depth below the walk root (children of the root are at depth 1)
    pub depth: usize,
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Reason a subtree was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    AccessDenied,
    NotFound,
    Io,
}

/// Non-fatal problem met while walking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkWarning {
    pub path: PathBuf,
    pub kind: WarningKind,
    pub message: String,
}

/// Item produced by a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    Entry(Entry),
    Warning(WalkWarning),
}

/// Check whether a name is hidden from discovery
pub fn is_hidden(name: &str) -> bool {
    is_hidden_name(OsStr::new(name))
}

/// Check a raw file name, which need not be valid UTF-8
pub fn is_hidden_name(name: &OsStr) -> bool {
    name.as_encoded_bytes()
        .first()
        .is_some_and(|b| HIDDEN_PREFIXES.contains(b))
}

/// Depth-first walker over a source tree
#[derive(Debug, Clone, Default)]
pub struct Walker;

impl Walker {
    pub fn new() -> Self {
        Self
    }

    /// Start a new walk below `root`
    ///
    /// Each call starts over; the returned iterator reads directories only
    /// as it is advanced.
    pub fn walk(&self, root: &Path) -> Walk {
        let inner = WalkDir::new(root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            // The root itself is exempt: temp and mount directories may be dotted
            .filter_entry(|e| e.depth() == 0 || !entry_is_hidden(e));

        Walk {
            inner: Box::new(inner),
        }
    }
}

/// Lazy sequence of [`WalkEvent`]s
pub struct Walk {
    inner: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send>,
}

impl Iterator for Walk {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<WalkEvent> {
        let next = self.inner.next()?;
        Some(match next {
            Ok(entry) => WalkEvent::Entry(to_entry(&entry)),
            Err(err) => WalkEvent::Warning(to_warning(err)),
        })
    }
}

fn entry_is_hidden(entry: &DirEntry) -> bool {
    let hidden = is_hidden_name(entry.file_name());
    if hidden {
        trace!(path = ?entry.path(), "Skipping hidden entry");
    }
    hidden
}

fn to_entry(entry: &DirEntry) -> Entry {
    let path = entry.path().to_path_buf();
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let kind = if entry.file_type().is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    Entry {
        name: entry.file_name().to_string_lossy().into_owned(),
        path,
        kind,
        parent,
        depth: entry.depth(),
    }
}

fn to_warning(err: walkdir::Error) -> WalkWarning {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    let kind = match err.io_error().map(io::Error::kind) {
        Some(io::ErrorKind::PermissionDenied) => WarningKind::AccessDenied,
        Some(io::ErrorKind::NotFound) => WarningKind::NotFound,
        _ => WarningKind::Io,
    };

    warn!(?path, ?kind, error = %err, "Skipping unreadable subtree");

    WalkWarning {
        path,
        kind,
        message: err.to_string(),
    }
}
