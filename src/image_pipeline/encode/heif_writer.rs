//! HEIC / HEIF / AVIF output through libheif.
//!
//! Requires the `heif` feature and system libheif >= 1.17. Without it the
//! writer reports an encode error for every call.

use std::io::Write;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::encode::types::EncodeParams;
use crate::image_pipeline::encode::writer::ImageWriter;
use crate::image_pipeline::pixel::{
    ByteOrder, GrayHandling, PreparedImage, SampleLayout, WideSamples,
};
use crate::image_pipeline::source::MetadataHandle;

/// One writer per HEIF-family output; `Av1` for AVIF, `Hevc` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeifCodec {
    Hevc,
    Av1,
}

pub struct HeifWriter {
    codec: HeifCodec,
}

impl HeifWriter {
    pub fn new(codec: HeifCodec) -> Self {
        Self { codec }
    }
}

impl ImageWriter for HeifWriter {
    /// libheif takes interleaved RGB(A); high bit depth planes are
    /// little-endian.
    fn layout(&self) -> SampleLayout {
        SampleLayout {
            gray: GrayHandling::ExpandToRgb,
            wide: WideSamples::Bytes(ByteOrder::LittleEndian),
        }
    }

    #[cfg(feature = "heif")]
    fn write_image(
        &self,
        image: &PreparedImage,
        params: &EncodeParams,
        metadata: &MetadataHandle,
        output: &mut dyn Write,
    ) -> Result<()> {
        use libheif_rs::{
            Channel, ColorSpace, CompressionFormat, EncoderParameterValue, EncoderQuality,
            HeifContext, Image, LibHeif, RgbChroma,
        };
        use tracing::debug;

        use crate::image_pipeline::encode::types::{ChromaSubsampling, QualityMode};
        use crate::image_pipeline::pixel::PreparedSamples;

        fn encode_err(e: impl std::fmt::Display) -> ConversionError {
            ConversionError::EncodeError(e.to_string())
        }

        let (bytes, wide): (&[u8], bool) = match &image.samples {
            PreparedSamples::U8(data) => (data, false),
            PreparedSamples::Bytes16 {
                bytes,
                order: ByteOrder::LittleEndian,
            } => (bytes, true),
            _ => {
                return Err(ConversionError::EncodeError(
                    "HEIF needs 8-bit or little-endian 16-bit samples".to_string(),
                ));
            }
        };

        let chroma = match (wide, image.has_alpha()) {
            (false, false) => RgbChroma::Rgb,
            (false, true) => RgbChroma::Rgba,
            (true, false) => RgbChroma::HdrRgbLe,
            (true, true) => RgbChroma::HdrRgbaLe,
        };

        let (width, height) = (image.width as u32, image.height as u32);
        let bits = image.depth.bits() as u8;
        debug!(
            "Encoding {:?} image: {}x{}, {} bits, {:?}",
            self.codec, width, height, bits, params.quality
        );

        let mut heif_image =
            Image::new(width, height, ColorSpace::Rgb(chroma)).map_err(encode_err)?;
        heif_image
            .create_plane(Channel::Interleaved, width, height, bits)
            .map_err(encode_err)?;
        {
            let planes = heif_image.planes_mut();
            let plane = planes
                .interleaved
                .ok_or_else(|| ConversionError::EncodeError("No interleaved plane".to_string()))?;
            let row_bytes = image.row_bytes();
            for (y, row) in bytes.chunks_exact(row_bytes).enumerate() {
                let start = y * plane.stride;
                plane.data[start..start + row_bytes].copy_from_slice(row);
            }
        }

        let lib = LibHeif::new();
        let format = match self.codec {
            HeifCodec::Hevc => CompressionFormat::Hevc,
            HeifCodec::Av1 => CompressionFormat::Av1,
        };
        let mut encoder = lib.encoder_for_format(format).map_err(encode_err)?;

        let quality = match params.quality {
            QualityMode::LosslessSentinel => EncoderQuality::LossLess,
            QualityMode::Lossy(q) => EncoderQuality::Lossy(q),
            QualityMode::LosslessCodec => EncoderQuality::Lossy(100),
        };
        encoder.set_quality(quality).map_err(encode_err)?;

        if params.chroma == ChromaSubsampling::Full444 {
            encoder
                .set_parameter_value("chroma", EncoderParameterValue::String("444".to_string()))
                .map_err(encode_err)?;
        }

        let mut context = HeifContext::new().map_err(encode_err)?;
        let handle = context
            .encode_image(&heif_image, &mut encoder, None)
            .map_err(encode_err)?;

        if let Some(exif) = &metadata.exif {
            context.add_exif_metadata(&handle, exif).map_err(encode_err)?;
        }
        if let Some(xmp) = &metadata.xmp {
            context.add_xmp_metadata(&handle, xmp).map_err(encode_err)?;
        }

        let encoded = context.write_to_bytes().map_err(encode_err)?;
        output.write_all(&encoded)?;
        debug!("HEIF encoding complete, {} bytes", encoded.len());
        Ok(())
    }

    #[cfg(not(feature = "heif"))]
    fn write_image(
        &self,
        _image: &PreparedImage,
        params: &EncodeParams,
        _metadata: &MetadataHandle,
        _output: &mut dyn Write,
    ) -> Result<()> {
        Err(ConversionError::EncodeError(format!(
            "{} output requires the 'heif' feature",
            params.format
        )))
    }
}
