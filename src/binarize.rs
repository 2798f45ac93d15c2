// Binarization module
// Turns a colour image into pure black and white for OCR

use image::{GenericImageView, ImageBuffer, Pixel, Rgb, RgbImage, Rgba};
use thiserror::Error;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BinarizeError {
    #[error("invalid image dimensions {width}x{height} for a buffer of {len} bytes")]
    InvalidDimensions { width: u32, height: u32, len: usize },
}

/// Unweighted channel average, rounded down.
#[inline]
fn average(r: u8, g: u8, b: u8) -> u16 {
    (r as u16 + g as u16 + b as u16) / 3
}

/// Binarize an image against `threshold`.
///
/// A pixel becomes black when the average of its red, green and blue channels
/// is strictly below `threshold`, white otherwise. Alpha is dropped, so the
/// result is always opaque. A threshold of 0 gives an all-white image and
/// anything above 255 an all-black one.
pub fn binarize<I>(src: &I, threshold: u16) -> RgbImage
where
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
{
    let (width, height) = src.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = src.get_pixel(x, y).to_rgb();
        if average(r, g, b) < threshold {
            BLACK
        } else {
            WHITE
        }
    })
}

/// Binarize a raw RGBA8 buffer of `width * height` pixels.
pub fn binarize_raw(
    width: u32,
    height: u32,
    rgba: &[u8],
    threshold: u16,
) -> Result<RgbImage, BinarizeError> {
    let invalid = || BinarizeError::InvalidDimensions {
        width,
        height,
        len: rgba.len(),
    };

    // from_raw accepts oversized buffers; a bitmap must match exactly
    let expected = width as usize * height as usize * 4;
    if width == 0 || height == 0 || rgba.len() != expected {
        return Err(invalid());
    }

    let view =
        ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(width, height, rgba).ok_or_else(invalid)?;

    Ok(binarize(&view, threshold))
}
