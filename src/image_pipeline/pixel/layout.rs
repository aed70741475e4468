//! Channel and byte-order adaptation for encoder backends.
//!
//! Backends disagree on how they want samples handed over: the PNG encoder
//! takes 16-bit samples as big-endian bytes, libheif wants little-endian
//! interleaved planes, the TIFF encoder takes native `u16` slices, and the
//! WebP encoder has no grayscale input. Every transform here moves or
//! duplicates samples; none changes a sample value.

use crate::image_pipeline::depth::BitDepth;
use crate::image_pipeline::pixel::types::{PixelBuffer, PixelData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrayHandling {
    Keep,
    /// Replicate the single channel into R, G and B.
    ExpandToRgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WideSamples {
    /// Keep `u16` elements in native order.
    Native,
    /// Serialize `u16` elements into bytes of the given order.
    Bytes(ByteOrder),
}

/// What an encoder backend expects its input to look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLayout {
    pub gray: GrayHandling,
    pub wide: WideSamples,
}

impl Default for SampleLayout {
    fn default() -> Self {
        Self {
            gray: GrayHandling::Keep,
            wide: WideSamples::Native,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedSamples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    Bytes16 { bytes: Vec<u8>, order: ByteOrder },
}

/// A buffer at its final depth, laid out for one specific backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub depth: BitDepth,
    pub samples: PreparedSamples,
}

impl PreparedImage {
    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    /// Bytes per row for 8-bit or byte-serialized samples.
    pub fn row_bytes(&self) -> usize {
        let element = if self.depth == BitDepth::Eight { 1 } else { 2 };
        self.width * self.channels * element
    }
}

fn expand_gray<T: Copy>(samples: Vec<T>) -> Vec<T> {
    samples.into_iter().flat_map(|g| [g, g, g]).collect()
}

fn to_bytes(samples: &[u16], order: ByteOrder) -> Vec<u8> {
    match order {
        ByteOrder::BigEndian => samples.iter().flat_map(|s| s.to_be_bytes()).collect(),
        ByteOrder::LittleEndian => samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
    }
}

/// Lays out `buffer`, already rescaled to `depth`, the way `layout` asks.
pub fn prepare(buffer: PixelBuffer, depth: BitDepth, layout: SampleLayout) -> PreparedImage {
    let (width, height) = (buffer.width(), buffer.height());
    let expand = buffer.channels() == 1 && layout.gray == GrayHandling::ExpandToRgb;
    let channels = if expand { 3 } else { buffer.channels() };

    let samples = match buffer.into_data() {
        PixelData::U8(v) => PreparedSamples::U8(if expand { expand_gray(v) } else { v }),
        PixelData::U16(v) => {
            let v = if expand { expand_gray(v) } else { v };
            match layout.wide {
                WideSamples::Native => PreparedSamples::U16(v),
                WideSamples::Bytes(order) => PreparedSamples::Bytes16 {
                    bytes: to_bytes(&v, order),
                    order,
                },
            }
        }
    };

    PreparedImage {
        width,
        height,
        channels,
        depth,
        samples,
    }
}
