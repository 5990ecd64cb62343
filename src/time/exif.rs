//! EXIF capture time extraction for images

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::trace;

/// EXIF tags to try for date extraction, in priority order
const DATE_TAGS: &[Tag] = &[
    Tag::DateTimeOriginal, // When the original image was taken
    Tag::DateTime,         // File modification date/time
];

/// Fixed EXIF date-time format: "YYYY:MM:DD HH:MM:SS"
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Extract capture time from EXIF metadata
///
/// The first tag present in [`DATE_TAGS`] decides the result; a present but
/// malformed value is an error rather than a reason to try the next tag.
pub fn extract_exif_time(path: &Path) -> Result<NaiveDateTime> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let exif = Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| Error::ExifRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let Some((tag, field)) = DATE_TAGS
        .iter()
        .find_map(|tag| exif.get_field(*tag, In::PRIMARY).map(|f| (*tag, f)))
    else {
        return Err(Error::ExifRead {
            path: path.to_path_buf(),
            message: "No date tag found in EXIF data".to_string(),
        });
    };

    let raw = match &field.value {
        Value::Ascii(values) => values.first().map(|v| String::from_utf8_lossy(v)),
        _ => None,
    }
    .ok_or_else(|| Error::ExifRead {
        path: path.to_path_buf(),
        message: format!("{} is not an ASCII value", tag),
    })?;

    let datetime = parse_exif_datetime(&raw).ok_or_else(|| Error::ExifRead {
        path: path.to_path_buf(),
        message: format!("Unparsable {} value '{}'", tag, raw),
    })?;

    trace!(?path, %tag, %datetime, "Found EXIF date");
    Ok(datetime)
}

/// Parse an EXIF datetime string
fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    // Some writers pad with NULs or spaces
    let s = s.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    NaiveDateTime::parse_from_str(s, EXIF_DATETIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_exif_datetime() {
        let dt = parse_exif_datetime("2024:01:15 14:30:00").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.second(), 0);

        // Trailing padding
        assert!(parse_exif_datetime("2024:01:15 14:30:00\0").is_some());

        // Only the fixed EXIF layout is accepted
        assert!(parse_exif_datetime("2024-01-15 14:30:00").is_none());
        assert!(parse_exif_datetime("    :  :     :  :  ").is_none());
        assert!(parse_exif_datetime("invalid").is_none());
    }

    #[test]
    fn test_original_preferred_over_generic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("both.jpg");
        fixtures::write_jpeg_with_exif(
            &path,
            &fixtures::quadrant_image(32),
            &[
                (Tag::DateTime, "2024:02:02 08:00:00"),
                (Tag::DateTimeOriginal, "2019:07:04 18:15:30"),
            ],
        );

        let dt = extract_exif_time(&path).unwrap();
        assert_eq!(dt.year(), 2019);
        assert_eq!(dt.month(), 7);
        assert_eq!(dt.second(), 30);
    }

    #[test]
    fn test_generic_date_used_when_original_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generic.jpg");
        fixtures::write_jpeg_with_exif(
            &path,
            &fixtures::quadrant_image(32),
            &[(Tag::DateTime, "2021:11:30 23:59:59")],
        );

        let dt = extract_exif_time(&path).unwrap();
        assert_eq!(dt.year(), 2021);
        assert_eq!(dt.month(), 11);
    }

    #[test]
    fn test_malformed_original_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jpg");
        fixtures::write_jpeg_with_exif(
            &path,
            &fixtures::quadrant_image(32),
            &[
                (Tag::DateTimeOriginal, "not a date at all"),
                (Tag::DateTime, "2021:11:30 23:59:59"),
            ],
        );

        assert!(matches!(
            extract_exif_time(&path),
            Err(Error::ExifRead { .. })
        ));
    }

    #[test]
    fn test_no_exif_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.png");
        fixtures::quadrant_image(16).save(&path).unwrap();

        assert!(extract_exif_time(&path).is_err());
    }
}
