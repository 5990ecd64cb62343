//! Extension-based file classification

use std::path::Path;

/// Extensions treated as photos
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// Extensions treated as movies
pub const MOVIE_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "mkv", "flv", "webm", "m4v"];

/// Category a discovered file is sorted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Still images, bucketed by capture date
    Photo,
    /// Video files, collected under `Movies/`
    Movie,
    /// Everything else, collected under `Other/`
    Other,
}

impl Category {
    /// Fixed destination folder for categories that are not date-bucketed
    pub fn folder_name(&self) -> Option<&'static str> {
        match self {
            Category::Photo => None,
            Category::Movie => Some("Movies"),
            Category::Other => Some("Other"),
        }
    }
}

/// Classify a file name by its extension, ignoring case
pub fn classify(name: &str) -> Category {
    let Some(ext) = lowercase_extension(name) else {
        return Category::Other;
    };

    if PHOTO_EXTENSIONS.contains(&ext.as_str()) {
        Category::Photo
    } else if MOVIE_EXTENSIONS.contains(&ext.as_str()) {
        Category::Movie
    } else {
        Category::Other
    }
}

/// Check if a path carries a photo extension
pub fn is_photo(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| classify(n) == Category::Photo)
}

/// Check if a path carries a movie extension
pub fn is_movie(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| classify(n) == Category::Movie)
}

fn lowercase_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}
