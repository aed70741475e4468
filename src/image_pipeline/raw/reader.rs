use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::pixel::PixelBuffer;

/// Decodes camera RAW bytes into linear RGB.
///
/// Implementations always return 16-bit, 3-channel data at the highest
/// precision the decoder offers; depth reduction happens later, once.
pub trait RawImageReader: Send + Sync {
    fn read_raw(&self, data: &[u8]) -> Result<PixelBuffer>;
}
