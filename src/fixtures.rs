//! Image fixtures shared by module tests

use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::fs;
use std::io::Cursor;
use std::path::Path;

const BRIGHT: Rgb<u8> = Rgb([240, 240, 240]);
const DARK: Rgb<u8> = Rgb([20, 20, 20]);

/// Square image with only the top-left quadrant bright
pub fn quadrant_image(size: u32) -> DynamicImage {
    let half = size / 2;
    DynamicImage::ImageRgb8(RgbImage::from_fn(size, size, |x, y| {
        if x < half && y < half { BRIGHT } else { DARK }
    }))
}

/// Square image with the top-left and bottom-right quadrants bright
pub fn diagonal_image(size: u32) -> DynamicImage {
    let half = size / 2;
    DynamicImage::ImageRgb8(RgbImage::from_fn(size, size, |x, y| {
        if (x < half) == (y < half) { BRIGHT } else { DARK }
    }))
}

/// Smooth color gradient that looks different under every rotation
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let v = (x * 200 / width + y * 55 / height) as u8;
        Rgb([v, v / 2, 255 - v])
    }))
}

/// Encode `image` as JPEG with the given ASCII EXIF tags embedded
pub fn write_jpeg_with_exif(path: &Path, image: &DynamicImage, tags: &[(Tag, &str)]) {
    let mut jpeg = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut jpeg, ImageFormat::Jpeg)
        .unwrap();
    let jpeg = jpeg.into_inner();

    let fields: Vec<Field> = tags
        .iter()
        .map(|(tag, value)| Field {
            tag: *tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![value.as_bytes().to_vec()]),
        })
        .collect();

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    // SOI, then an APP1 "Exif" segment, then the rest of the encoded stream
    let segment_len = u16::try_from(2 + 6 + tiff.len()).unwrap();
    let mut out = Vec::with_capacity(jpeg.len() + tiff.len() + 10);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);

    fs::write(path, out).unwrap();
}
