use std::io::Write;

use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::encode::types::EncodeParams;
use crate::image_pipeline::encode::writer::ImageWriter;
use crate::image_pipeline::pixel::{
    GrayHandling, PreparedImage, PreparedSamples, SampleLayout, WideSamples,
};
use crate::image_pipeline::source::MetadataHandle;

/// Lossy WebP through libwebp. Metadata is never embedded.
pub struct WebpWriter;

impl ImageWriter for WebpWriter {
    /// libwebp only takes RGB or RGBA input.
    fn layout(&self) -> SampleLayout {
        SampleLayout {
            gray: GrayHandling::ExpandToRgb,
            wide: WideSamples::Native,
        }
    }

    fn write_image(
        &self,
        image: &PreparedImage,
        params: &EncodeParams,
        _metadata: &MetadataHandle,
        output: &mut dyn Write,
    ) -> Result<()> {
        let PreparedSamples::U8(data) = &image.samples else {
            return Err(ConversionError::EncodeError(
                "WEBP needs 8-bit samples".to_string(),
            ));
        };

        let (width, height) = (image.width as u32, image.height as u32);
        let encoder = match image.channels {
            3 => webp::Encoder::from_rgb(data, width, height),
            4 => webp::Encoder::from_rgba(data, width, height),
            n => return Err(ConversionError::UnsupportedChannels(n)),
        };

        let quality = params.numeric_quality();
        debug!("Encoding WEBP image: {}x{}, quality {}", width, height, quality);

        let encoded = encoder
            .encode_simple(false, quality as f32)
            .map_err(|e| ConversionError::EncodeError(format!("WebP encoding failed: {:?}", e)))?;

        output.write_all(&encoded)?;
        debug!("WEBP encoding complete, {} bytes", encoded.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::depth::{BitDepth, OutputFormat};
    use crate::image_pipeline::encode::types::{ChromaSubsampling, QualityMode, TiffCompression};
    use crate::image_pipeline::pixel::{PixelBuffer, prepare};

    #[test]
    fn gray_input_is_expanded_and_encoded() {
        let buffer = PixelBuffer::from_u8(4, 4, 1, vec![200; 16]).unwrap();
        let prepared = prepare(buffer, BitDepth::Eight, WebpWriter.layout());
        assert_eq!(prepared.channels, 3);

        let params = EncodeParams {
            format: OutputFormat::Webp,
            quality: QualityMode::Lossy(100),
            chroma: ChromaSubsampling::Default,
            tiff_compression: TiffCompression::Lzw,
            predictor: None,
        };
        let mut out = Vec::new();
        WebpWriter
            .write_image(&prepared, &params, &MetadataHandle::default(), &mut out)
            .unwrap();
        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(&out[8..12], b"WEBP");
    }
}
