//! Owned pixel storage

use crate::image_pipeline::common::error::{ConversionError, Result};

/// Sample storage, one element per channel sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelData {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl PixelData {
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_width(&self) -> usize {
        match self {
            Self::U8(_) => 1,
            Self::U16(_) => 2,
        }
    }
}

/// Row-major, channel-interleaved image with no format awareness.
///
/// Fields are private so the sample count always equals
/// `width * height * channels`: every constructor checks it, and the depth
/// converter relies on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    channels: usize,
    data: PixelData,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize, channels: usize, data: PixelData) -> Result<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(ConversionError::UnsupportedChannels(channels));
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels))
            .ok_or(ConversionError::InvalidDimensions(width, height))?;
        if data.len() != expected {
            return Err(ConversionError::InvalidBuffer {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn from_u8(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        Self::new(width, height, channels, PixelData::U8(data))
    }

    pub fn from_u16(width: usize, height: usize, channels: usize, data: Vec<u16>) -> Result<Self> {
        Self::new(width, height, channels, PixelData::U16(data))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    pub fn element_width(&self) -> usize {
        self.data.element_width()
    }

    /// Size of the sample data in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len() * self.element_width()
    }

    pub fn data(&self) -> &PixelData {
        &self.data
    }

    pub fn into_data(self) -> PixelData {
        self.data
    }

    /// Replaces the sample storage with one of the same sample count, keeping
    /// the dimensions. Used by transforms that only change element width or
    /// values.
    pub(crate) fn map_data(self, f: impl FnOnce(PixelData) -> PixelData) -> Self {
        let expected = self.data.len();
        let data = f(self.data);
        assert_eq!(data.len(), expected, "sample count changed by a per-sample transform");
        Self { data, ..self }
    }

    /// Largest sample value across all channels, 0 for an empty image.
    pub fn max_sample(&self) -> u16 {
        match &self.data {
            PixelData::U8(v) => v.iter().copied().max().unwrap_or(0) as u16,
            PixelData::U16(v) => v.iter().copied().max().unwrap_or(0),
        }
    }

    /// Sample at (x, y, channel) widened to u16.
    pub fn sample(&self, x: usize, y: usize, channel: usize) -> u16 {
        let idx = (y * self.width + x) * self.channels + channel;
        match &self.data {
            PixelData::U8(v) => v[idx] as u16,
            PixelData::U16(v) => v[idx],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::common::error::ErrorKind;

    #[test]
    fn byte_length_follows_element_width() {
        let narrow = PixelBuffer::from_u8(3, 2, 3, vec![0; 18]).unwrap();
        assert_eq!(narrow.element_width(), 1);
        assert_eq!(narrow.byte_len(), 3 * 2 * 3);

        let wide = PixelBuffer::from_u16(3, 2, 4, vec![0; 24]).unwrap();
        assert_eq!(wide.element_width(), 2);
        assert_eq!(wide.byte_len(), 3 * 2 * 4 * 2);
        assert!(wide.has_alpha());
    }

    #[test]
    fn rejects_size_mismatch() {
        let err = PixelBuffer::from_u8(2, 2, 3, vec![0; 11]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBuffer);
    }

    #[test]
    fn rejects_two_channel_layout() {
        let err = PixelBuffer::from_u8(1, 1, 2, vec![0; 2]).unwrap_err();
        assert!(matches!(err, ConversionError::UnsupportedChannels(2)));
    }

    #[test]
    fn sample_addressing_is_row_major() {
        let buffer = PixelBuffer::from_u16(2, 2, 1, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(buffer.sample(1, 0, 0), 2);
        assert_eq!(buffer.sample(0, 1, 0), 3);
        assert_eq!(buffer.max_sample(), 4);
    }
}
