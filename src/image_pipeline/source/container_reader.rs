//! Still-image container decoding (JPEG, PNG, TIFF, WebP, BMP, GIF and,
//! with the `heif` feature, HEIC/HEIF/AVIF).

use std::path::Path;

use image::{DynamicImage, ImageReader};
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::depth::BitDepth;
use crate::image_pipeline::pixel::PixelBuffer;

/// A decoded container image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub buffer: PixelBuffer,
    /// Significant depth when the decoder knows it. `None` means only the
    /// storage width is known and the depth has to be inferred.
    pub depth_hint: Option<BitDepth>,
}

pub trait ContainerReader: Send + Sync {
    fn read_container(&self, path: &Path) -> Result<DecodedImage>;
}

pub struct StandardContainerReader;

const HEIF_EXTENSIONS: &[&str] = &["heic", "heics", "heif", "heifs", "hif", "avif"];

impl ContainerReader for StandardContainerReader {
    fn read_container(&self, path: &Path) -> Result<DecodedImage> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let decoded = if HEIF_EXTENSIONS.contains(&ext.as_str()) {
            read_heif(path)?
        } else {
            read_with_image(path)?
        };

        debug!(
            "Decoded {}: {}x{}, {} channel(s), {}-byte samples, depth hint {:?}",
            path.display(),
            decoded.buffer.width(),
            decoded.buffer.height(),
            decoded.buffer.channels(),
            decoded.buffer.element_width(),
            decoded.depth_hint
        );
        Ok(decoded)
    }
}

fn read_with_image(path: &Path) -> Result<DecodedImage> {
    let img = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| ConversionError::DecodeError(e.to_string()))?;
    from_dynamic(img)
}

/// Maps a decoded image onto a 1, 3 or 4 channel buffer. Gray+alpha is
/// promoted to RGBA, float data to 16-bit.
pub(crate) fn from_dynamic(img: DynamicImage) -> Result<DecodedImage> {
    let (width, height) = (img.width() as usize, img.height() as usize);

    let (buffer, depth_hint) = match img {
        DynamicImage::ImageLuma8(gray) => (
            PixelBuffer::from_u8(width, height, 1, gray.into_raw())?,
            Some(BitDepth::Eight),
        ),
        DynamicImage::ImageRgb8(rgb) => (
            PixelBuffer::from_u8(width, height, 3, rgb.into_raw())?,
            Some(BitDepth::Eight),
        ),
        DynamicImage::ImageRgba8(rgba) => (
            PixelBuffer::from_u8(width, height, 4, rgba.into_raw())?,
            Some(BitDepth::Eight),
        ),
        DynamicImage::ImageLumaA8(_) => (
            PixelBuffer::from_u8(width, height, 4, img.to_rgba8().into_raw())?,
            Some(BitDepth::Eight),
        ),
        DynamicImage::ImageLuma16(gray) => {
            (PixelBuffer::from_u16(width, height, 1, gray.into_raw())?, None)
        }
        DynamicImage::ImageRgb16(rgb) => {
            (PixelBuffer::from_u16(width, height, 3, rgb.into_raw())?, None)
        }
        DynamicImage::ImageRgba16(rgba) => {
            (PixelBuffer::from_u16(width, height, 4, rgba.into_raw())?, None)
        }
        DynamicImage::ImageLumaA16(_) => (
            PixelBuffer::from_u16(width, height, 4, img.to_rgba16().into_raw())?,
            None,
        ),
        DynamicImage::ImageRgb32F(_) => (
            PixelBuffer::from_u16(width, height, 3, img.to_rgb16().into_raw())?,
            Some(BitDepth::Sixteen),
        ),
        DynamicImage::ImageRgba32F(_) => (
            PixelBuffer::from_u16(width, height, 4, img.to_rgba16().into_raw())?,
            Some(BitDepth::Sixteen),
        ),
        other => (
            PixelBuffer::from_u8(width, height, 4, other.to_rgba8().into_raw())?,
            Some(BitDepth::Eight),
        ),
    };

    Ok(DecodedImage { buffer, depth_hint })
}

#[cfg(feature = "heif")]
fn read_heif(path: &Path) -> Result<DecodedImage> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let path_str = path
        .to_str()
        .ok_or_else(|| ConversionError::LoadError(format!("Invalid path: {:?}", path)))?;
    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_file(path_str)
        .map_err(|e| ConversionError::DecodeError(format!("HEIF read error: {}", e)))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| ConversionError::DecodeError(format!("HEIF handle error: {}", e)))?;

    let width = handle.width() as usize;
    let height = handle.height() as usize;
    let has_alpha = handle.has_alpha_channel();
    let channels = if has_alpha { 4 } else { 3 };
    let bits = handle.luma_bits_per_pixel();
    let wide = bits > 8;

    let chroma = match (wide, has_alpha) {
        (false, false) => RgbChroma::Rgb,
        (false, true) => RgbChroma::Rgba,
        (true, false) => RgbChroma::HdrRgbLe,
        (true, true) => RgbChroma::HdrRgbaLe,
    };
    let image = lib
        .decode(&handle, ColorSpace::Rgb(chroma), None)
        .map_err(|e| ConversionError::DecodeError(format!("HEIF decode error: {}", e)))?;
    let plane = image
        .planes()
        .interleaved
        .ok_or_else(|| ConversionError::DecodeError("No interleaved plane".to_string()))?;

    let row_bytes = width * channels * if wide { 2 } else { 1 };
    let rows = (0..height).map(|y| &plane.data[y * plane.stride..y * plane.stride + row_bytes]);

    let (buffer, depth_hint) = if wide {
        let samples: Vec<u16> = rows
            .flat_map(|row| row.chunks_exact(2).map(|b| u16::from_le_bytes([b[0], b[1]])))
            .collect();
        let depth = match bits {
            10 => BitDepth::Ten,
            12 => BitDepth::Twelve,
            _ => BitDepth::Sixteen,
        };
        (PixelBuffer::from_u16(width, height, channels, samples)?, depth)
    } else {
        let samples: Vec<u8> = rows.flatten().copied().collect();
        (
            PixelBuffer::from_u8(width, height, channels, samples)?,
            BitDepth::Eight,
        )
    };

    Ok(DecodedImage {
        buffer,
        depth_hint: Some(depth_hint),
    })
}

#[cfg(not(feature = "heif"))]
fn read_heif(path: &Path) -> Result<DecodedImage> {
    Err(ConversionError::LoadError(format!(
        "{}: HEIF support requires the 'heif' feature",
        path.display()
    )))
}
