//! Flattening RGBA onto an opaque white background.

use tracing::debug;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::depth::BitDepth;
use crate::image_pipeline::pixel::types::{PixelBuffer, PixelData};

/// Blends one colour sample over white:
/// `out = a/max * c + (1 - a/max) * max`, rounded to nearest.
#[inline]
fn over_white(color: u32, alpha: u32, max: u32) -> u32 {
    let alpha = alpha.min(max);
    let color = color.min(max);
    ((alpha as u64 * color as u64 + (max - alpha) as u64 * max as u64 + (max / 2) as u64)
        / max as u64) as u32
}

/// Composites a 4-channel buffer onto white and drops the alpha channel.
///
/// `depth` is the buffer's significant depth; white and fully opaque are both
/// `depth.max_value()`, so compositing happens at source precision. Buffers
/// without alpha are returned as-is.
pub fn composite_over_white(buffer: PixelBuffer, depth: BitDepth) -> Result<PixelBuffer> {
    if !buffer.has_alpha() {
        return Ok(buffer);
    }

    debug!(
        width = buffer.width(),
        height = buffer.height(),
        %depth,
        "Compositing alpha onto white background"
    );

    let max = depth.max_value() as u32;
    let (width, height) = (buffer.width(), buffer.height());
    let data = match buffer.into_data() {
        PixelData::U8(samples) => PixelData::U8(
            samples
                .chunks_exact(4)
                .flat_map(|px| {
                    let a = px[3] as u32;
                    [
                        over_white(px[0] as u32, a, max) as u8,
                        over_white(px[1] as u32, a, max) as u8,
                        over_white(px[2] as u32, a, max) as u8,
                    ]
                })
                .collect(),
        ),
        PixelData::U16(samples) => PixelData::U16(
            samples
                .chunks_exact(4)
                .flat_map(|px| {
                    let a = px[3] as u32;
                    [
                        over_white(px[0] as u32, a, max) as u16,
                        over_white(px[1] as u32, a, max) as u16,
                        over_white(px[2] as u32, a, max) as u16,
                    ]
                })
                .collect(),
        ),
    };

    PixelBuffer::new(width, height, 3, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_pixel_becomes_white() {
        let buffer = PixelBuffer::from_u8(1, 1, 4, vec![12, 200, 90, 0]).unwrap();
        let out = composite_over_white(buffer, BitDepth::Eight).unwrap();
        assert_eq!(out.channels(), 3);
        assert_eq!(out.data(), &PixelData::U8(vec![255, 255, 255]));
    }

    #[test]
    fn opaque_pixel_is_unchanged() {
        let buffer = PixelBuffer::from_u8(1, 1, 4, vec![12, 200, 90, 255]).unwrap();
        let out = composite_over_white(buffer, BitDepth::Eight).unwrap();
        assert_eq!(out.data(), &PixelData::U8(vec![12, 200, 90]));
    }

    #[test]
    fn half_alpha_blends_toward_white() {
        let buffer = PixelBuffer::from_u8(1, 1, 4, vec![0, 0, 0, 128]).unwrap();
        let out = composite_over_white(buffer, BitDepth::Eight).unwrap();
        // (128*0 + 127*255 + 127) / 255 = 127
        assert_eq!(out.data(), &PixelData::U8(vec![127, 127, 127]));
    }

    #[test]
    fn composites_at_sixteen_bit_precision() {
        let buffer =
            PixelBuffer::from_u16(2, 1, 4, vec![1000, 2000, 3000, 0, 1000, 2000, 3000, 65535])
                .unwrap();
        let out = composite_over_white(buffer, BitDepth::Sixteen).unwrap();
        assert_eq!(
            out.data(),
            &PixelData::U16(vec![65535, 65535, 65535, 1000, 2000, 3000])
        );
    }

    #[test]
    fn ten_bit_white_is_ten_bit_max() {
        let buffer = PixelBuffer::from_u16(1, 1, 4, vec![5, 6, 7, 0]).unwrap();
        let out = composite_over_white(buffer, BitDepth::Ten).unwrap();
        assert_eq!(out.data(), &PixelData::U16(vec![1023, 1023, 1023]));
    }

    #[test]
    fn rgb_passes_through() {
        let buffer = PixelBuffer::from_u8(1, 1, 3, vec![1, 2, 3]).unwrap();
        let out = composite_over_white(buffer.clone(), BitDepth::Eight).unwrap();
        assert_eq!(out, buffer);
    }
}
