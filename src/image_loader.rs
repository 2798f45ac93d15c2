// Image loading module
// Decodes captured photos into RGBA bitmaps and writes binarized previews

use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage};
use log::debug;
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// A captured bitmap, replaced wholesale on each capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Raw RGBA pixel data (4 bytes per pixel)
    pub rgba_data: Vec<u8>,
}

impl ImageData {
    /// Convert a decoded image, resizing first when `scale` is not 1.0
    pub fn from_dynamic(img: DynamicImage, scale: f32) -> Self {
        let img = if (scale - 1.0).abs() > f32::EPSILON {
            let new_width = ((img.width() as f32 * scale) as u32).max(1);
            let new_height = ((img.height() as f32 * scale) as u32).max(1);
            debug!("Scaling image to {}x{}", new_width, new_height);
            img.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
        } else {
            img
        };

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Self {
            width,
            height,
            rgba_data: rgba.into_raw(),
        }
    }
}

/// Load an image from raw bytes (stdin or a file)
pub fn load_bytes(data: &[u8], scale: f32) -> Result<ImageData> {
    let img = load_from_bytes(data)?;
    Ok(ImageData::from_dynamic(img, scale))
}

/// Load an image file
pub fn load_from_path(path: &Path, scale: f32) -> Result<ImageData> {
    let data =
        fs::read(path).with_context(|| format!("Failed to read image file: {}", path.display()))?;
    load_bytes(&data, scale)
        .with_context(|| format!("Failed to load image: {}", path.display()))
}

/// Load an image from raw bytes, auto-detecting the format
fn load_from_bytes(data: &[u8]) -> Result<DynamicImage> {
    // Try to guess the format from the data
    let format = image::guess_format(data).context("Failed to detect image format")?;

    let cursor = Cursor::new(data);
    let img = image::load(cursor, format).context("Failed to decode image")?;

    Ok(img)
}

/// Write the binarized image; the format follows the file extension
pub fn save_preview(img: &RgbImage, path: &Path) -> Result<()> {
    img.save(path)
        .with_context(|| format!("Failed to save preview: {}", path.display()))
}
