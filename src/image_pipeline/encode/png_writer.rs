use std::io::Write;

use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::encode::types::{EncodeParams, QualityMode};
use crate::image_pipeline::encode::writer::ImageWriter;
use crate::image_pipeline::pixel::{
    ByteOrder, GrayHandling, PreparedImage, PreparedSamples, SampleLayout, WideSamples,
};
use crate::image_pipeline::source::MetadataHandle;

const XMP_KEYWORD: &str = "XML:com.adobe.xmp";

pub struct PngWriter;

fn encode_err(e: impl std::fmt::Display) -> ConversionError {
    ConversionError::EncodeError(e.to_string())
}

impl ImageWriter for PngWriter {
    /// PNG stores 16-bit samples big-endian.
    fn layout(&self) -> SampleLayout {
        SampleLayout {
            gray: GrayHandling::Keep,
            wide: WideSamples::Bytes(ByteOrder::BigEndian),
        }
    }

    fn write_image(
        &self,
        image: &PreparedImage,
        params: &EncodeParams,
        metadata: &MetadataHandle,
        output: &mut dyn Write,
    ) -> Result<()> {
        let (data, depth): (&[u8], png::BitDepth) = match &image.samples {
            PreparedSamples::U8(data) => (data, png::BitDepth::Eight),
            PreparedSamples::Bytes16 {
                bytes,
                order: ByteOrder::BigEndian,
            } => (bytes, png::BitDepth::Sixteen),
            _ => {
                return Err(ConversionError::EncodeError(
                    "PNG needs 8-bit or big-endian 16-bit samples".to_string(),
                ));
            }
        };

        let color = match image.channels {
            1 => png::ColorType::Grayscale,
            3 => png::ColorType::Rgb,
            4 => png::ColorType::Rgba,
            n => return Err(ConversionError::UnsupportedChannels(n)),
        };

        // PNG is always lossless; quality only trades speed for size.
        let compression = match params.quality {
            QualityMode::Lossy(_) => png::Compression::Fast,
            QualityMode::LosslessCodec | QualityMode::LosslessSentinel => {
                png::Compression::default()
            }
        };

        debug!(
            "Encoding PNG image: {}x{}, {:?} {:?}",
            image.width, image.height, color, depth
        );

        let mut buffer = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut buffer, image.width as u32, image.height as u32);
            encoder.set_color(color);
            encoder.set_depth(depth);
            encoder.set_compression(compression);

            if let Some(xmp) = &metadata.xmp {
                encoder
                    .add_itxt_chunk(XMP_KEYWORD.to_string(), String::from_utf8_lossy(xmp).into_owned())
                    .map_err(encode_err)?;
            }

            let mut writer = encoder.write_header().map_err(encode_err)?;

            if let Some(exif) = &metadata.exif {
                writer
                    .write_chunk(png::chunk::ChunkType(*b"eXIf"), exif)
                    .map_err(encode_err)?;
            }

            writer.write_image_data(data).map_err(encode_err)?;
            writer.finish().map_err(encode_err)?;
        }

        output.write_all(&buffer)?;
        debug!("PNG encoding complete, {} bytes", buffer.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::depth::{BitDepth, OutputFormat};
    use crate::image_pipeline::encode::types::{ChromaSubsampling, TiffCompression};
    use crate::image_pipeline::pixel::{PixelBuffer, prepare};

    fn params() -> EncodeParams {
        EncodeParams {
            format: OutputFormat::Png,
            quality: QualityMode::LosslessCodec,
            chroma: ChromaSubsampling::Default,
            tiff_compression: TiffCompression::Lzw,
            predictor: None,
        }
    }

    #[test]
    fn sixteen_bit_samples_decode_identically() {
        let samples = vec![0u16, 1, 256, 65535, 4660, 43981, 7, 8, 9, 10, 11, 12];
        let buffer = PixelBuffer::from_u16(2, 2, 3, samples.clone()).unwrap();
        let prepared = prepare(buffer, BitDepth::Sixteen, PngWriter.layout());

        let mut out = Vec::new();
        PngWriter
            .write_image(&prepared, &params(), &MetadataHandle::default(), &mut out)
            .unwrap();

        let decoder = png::Decoder::new(std::io::Cursor::new(out));
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size().unwrap()];
        let info = reader.next_frame(&mut buf).unwrap();
        assert_eq!(info.bit_depth, png::BitDepth::Sixteen);

        let decoded: Vec<u16> = buf[..info.buffer_size()]
            .chunks_exact(2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn xmp_is_stored_in_itxt() {
        let buffer = PixelBuffer::from_u8(1, 1, 1, vec![9]).unwrap();
        let prepared = prepare(buffer, BitDepth::Eight, PngWriter.layout());
        let metadata = MetadataHandle {
            exif: Some(b"MM\0*\0\0\0\x08\0\0".to_vec()),
            xmp: Some(b"<x:xmpmeta></x:xmpmeta>".to_vec()),
            iptc: None,
        };

        let mut out = Vec::new();
        PngWriter
            .write_image(&prepared, &params(), &metadata, &mut out)
            .unwrap();

        let reader = png::Decoder::new(std::io::Cursor::new(out)).read_info().unwrap();
        let itxt = &reader.info().utf8_text;
        assert_eq!(itxt.len(), 1);
        assert_eq!(itxt[0].keyword, XMP_KEYWORD);
    }
}
