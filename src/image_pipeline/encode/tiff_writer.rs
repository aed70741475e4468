use std::io::{Cursor, Seek, Write};

use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder, TiffValue};
use tiff::tags::{Predictor, Tag};
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::encode::types::{EncodeParams, TiffCompression};
use crate::image_pipeline::encode::writer::ImageWriter;
use crate::image_pipeline::pixel::{PreparedImage, PreparedSamples};
use crate::image_pipeline::source::MetadataHandle;

/// XMP packet (Adobe XMP spec, part 3)
const TAG_XMP: u16 = 700;
/// IPTC-NAA record
const TAG_IPTC: u16 = 33723;

pub struct StandardTiffWriter;

fn encode_err(e: impl std::fmt::Display) -> ConversionError {
    ConversionError::EncodeError(e.to_string())
}

fn write_with<W, C>(
    encoder: &mut TiffEncoder<W>,
    width: u32,
    height: u32,
    data: &[C::Inner],
    metadata: &MetadataHandle,
) -> Result<()>
where
    W: Write + Seek,
    C: ColorType,
    [C::Inner]: TiffValue,
{
    let mut image = encoder.new_image::<C>(width, height).map_err(encode_err)?;

    if let Some(xmp) = &metadata.xmp {
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(TAG_XMP), &xmp[..])
            .map_err(encode_err)?;
    }
    if let Some(iptc) = &metadata.iptc {
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(TAG_IPTC), &iptc[..])
            .map_err(encode_err)?;
    }

    image.write_data(data).map_err(encode_err)
}

impl ImageWriter for StandardTiffWriter {
    fn write_image(
        &self,
        image: &PreparedImage,
        params: &EncodeParams,
        metadata: &MetadataHandle,
        output: &mut dyn Write,
    ) -> Result<()> {
        debug!(
            "Encoding TIFF image: {}x{}, {} channel(s), {:?}",
            image.width, image.height, image.channels, params.tiff_compression
        );

        let mut buffer = Vec::new();

        {
            let compression = match params.tiff_compression {
                TiffCompression::None => Compression::Uncompressed,
                TiffCompression::Lzw => Compression::Lzw,
                TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
                TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
                TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
            };

            let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer))
                .map_err(encode_err)?
                .with_compression(compression);

            if let Some(predictor_val) = params.predictor {
                let predictor = match predictor_val {
                    2 => Predictor::Horizontal,
                    _ => Predictor::None,
                };
                encoder = encoder.with_predictor(predictor);
            }

            let (w, h) = (image.width as u32, image.height as u32);
            match (&image.samples, image.channels) {
                (PreparedSamples::U8(data), 1) => {
                    write_with::<_, colortype::Gray8>(&mut encoder, w, h, data, metadata)?
                }
                (PreparedSamples::U8(data), 3) => {
                    write_with::<_, colortype::RGB8>(&mut encoder, w, h, data, metadata)?
                }
                (PreparedSamples::U8(data), 4) => {
                    write_with::<_, colortype::RGBA8>(&mut encoder, w, h, data, metadata)?
                }
                (PreparedSamples::U16(data), 1) => {
                    write_with::<_, colortype::Gray16>(&mut encoder, w, h, data, metadata)?
                }
                (PreparedSamples::U16(data), 3) => {
                    write_with::<_, colortype::RGB16>(&mut encoder, w, h, data, metadata)?
                }
                (PreparedSamples::U16(data), 4) => {
                    write_with::<_, colortype::RGBA16>(&mut encoder, w, h, data, metadata)?
                }
                (_, channels) => {
                    return Err(ConversionError::EncodeError(format!(
                        "TIFF writer cannot encode {} channel(s) in this sample layout",
                        channels
                    )));
                }
            }
        }

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete, {} bytes", buffer.len());
        Ok(())
    }
}
