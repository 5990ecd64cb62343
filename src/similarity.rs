//! Rotation-aware perceptual image comparison
//!
//! Images are reduced to a 64-bit average hash: the picture is converted to
//! 8-bit grayscale, shrunk to 8x8 and each pixel contributes one bit set
//! when it is brighter than the mean. Two images are considered the same
//! when the Hamming distance between their hashes is below a threshold for
//! any of the four right-angle rotations of the candidate.

use crate::classify::is_photo;
use crate::error::{Error, Result};
use crate::hash::files_identical;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use std::path::Path;
use tracing::{debug, trace, warn};

/// Default Hamming distance threshold (strictly below means "same image")
pub const SIMILARITY_THRESHOLD: u32 = 5;

/// Side length of the reduced image the hash is computed from
const HASH_SIDE: u32 = 8;

/// A 64-bit average hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHash(u64);

impl ImageHash {
    /// Hash a decoded image
    pub fn of(image: &DynamicImage) -> Self {
        Self::of_gray(&image.to_luma8())
    }

    fn of_gray(gray: &GrayImage) -> Self {
        let small = imageops::resize(gray, HASH_SIDE, HASH_SIDE, FilterType::Lanczos3);
        let pixels: Vec<u32> = small.pixels().map(|p| u32::from(p.0[0])).collect();
        let mean = pixels.iter().sum::<u32>() as f64 / pixels.len() as f64;

        let bits = pixels
            .iter()
            .enumerate()
            .filter(|(_, value)| f64::from(**value) > mean)
            .fold(0u64, |acc, (i, _)| acc | (1u64 << i));

        Self(bits)
    }

    /// Number of differing bits
    pub fn distance(&self, other: &ImageHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Raw hash bits
    pub fn bits(&self) -> u64 {
        self.0
    }
}

/// Decides whether two image files show the same picture
#[derive(Debug, Clone, Copy)]
pub struct ImageMatcher {
    threshold: u32,
}

impl Default for ImageMatcher {
    fn default() -> Self {
        Self::new(SIMILARITY_THRESHOLD)
    }
}

impl ImageMatcher {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Compare two image files, allowing the second one to be rotated
    ///
    /// Non-image paths and undecodable files never match.
    pub fn same_image(&self, a: &Path, b: &Path) -> bool {
        if !(is_photo(a) && is_photo(b)) {
            return false;
        }

        match files_identical(a, b) {
            Ok(true) => {
                trace!(?a, ?b, "Files are byte-identical");
                return true;
            }
            Ok(false) => {}
            Err(e) => debug!(?a, ?b, error = %e, "Content comparison failed"),
        }

        match self.compare(a, b) {
            Ok(same) => same,
            Err(e) => {
                warn!(?a, ?b, error = %e, "Error comparing images");
                false
            }
        }
    }

    fn compare(&self, a: &Path, b: &Path) -> Result<bool> {
        let hash_a = ImageHash::of(&open_image(a)?);
        let candidate = open_image(b)?;

        let rotations = [
            candidate.clone(),
            candidate.rotate90(),
            candidate.rotate180(),
            candidate.rotate270(),
        ];

        for (quarter_turns, rotated) in rotations.iter().enumerate() {
            let distance = hash_a.distance(&ImageHash::of(rotated));
            trace!(?a, ?b, degrees = quarter_turns * 90, distance, "Compared image hashes");
            if distance < self.threshold {
                debug!(?a, ?b, degrees = quarter_turns * 90, distance, "Images match");
                return Ok(true);
            }
        }

        Ok(false)
    }
}

/// Compare two image files with the default threshold
pub fn same_image(a: &Path, b: &Path) -> bool {
    ImageMatcher::default().same_image(a, b)
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| Error::ImageDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
