//! Bit depth rescaling.
//!
//! Downscaling keeps the high bits (`s >> (from - to)`), upscaling places the
//! value at the top of the wider range with zero low bits
//! (`s << (to - from)`). Both directions use the *significant* bit count, so a
//! 12-bit image stored in 16-bit elements shifts by 4 when going to 8 bits.
//! Going down and back up does not restore the dropped low bits.
//!
//! Storage follows the target depth: 8-bit output is held in `u8` elements,
//! anything wider in `u16`.

use tracing::debug;

use crate::image_pipeline::depth::types::BitDepth;
use crate::image_pipeline::pixel::{PixelBuffer, PixelData};

/// Moves one sample from `from` to `to` significant bits, clamped to the
/// target range.
#[inline]
pub fn rescale_sample(sample: u16, from: BitDepth, to: BitDepth) -> u16 {
    let from_bits = from.bits();
    let to_bits = to.bits();
    let value = sample as u32;
    let shifted = if from_bits > to_bits {
        value >> (from_bits - to_bits)
    } else {
        value << (to_bits - from_bits)
    };
    shifted.min(to.max_value() as u32) as u16
}

/// Converts `buffer` from `from` to `to` significant bits.
///
/// The buffer is consumed; an equal-depth call hands it back untouched, any
/// other call allocates fresh storage of the target element width.
pub fn rescale(buffer: PixelBuffer, from: BitDepth, to: BitDepth) -> PixelBuffer {
    let storage_matches = buffer.element_width() == to.element_width();
    if from == to && storage_matches {
        return buffer;
    }

    debug!(
        %from,
        %to,
        width = buffer.width(),
        height = buffer.height(),
        "Rescaling pixel buffer"
    );

    buffer.map_data(|data| match (data, to) {
        (PixelData::U8(samples), BitDepth::Eight) => PixelData::U8(
            samples
                .into_iter()
                .map(|s| rescale_sample(s as u16, from, to) as u8)
                .collect(),
        ),
        (PixelData::U16(samples), BitDepth::Eight) => PixelData::U8(
            samples
                .into_iter()
                .map(|s| rescale_sample(s, from, to) as u8)
                .collect(),
        ),
        (PixelData::U8(samples), _) => PixelData::U16(
            samples
                .into_iter()
                .map(|s| rescale_sample(s as u16, from, to))
                .collect(),
        ),
        (PixelData::U16(samples), _) => PixelData::U16(
            samples
                .into_iter()
                .map(|s| rescale_sample(s, from, to))
                .collect(),
        ),
    })
}
