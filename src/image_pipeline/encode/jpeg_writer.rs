use std::io::Write;

use jpeg_encoder::{ColorType, Encoder};
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::encode::types::EncodeParams;
use crate::image_pipeline::encode::writer::ImageWriter;
use crate::image_pipeline::pixel::{PreparedImage, PreparedSamples};
use crate::image_pipeline::source::MetadataHandle;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
/// Photoshop image resource holding an IPTC-NAA record
const IPTC_RESOURCE_ID: u16 = 0x0404;
/// Resource type, id, empty name and length ahead of the IPTC record
const IPTC_RESOURCE_OVERHEAD: usize = 12;
/// Largest APP segment payload the encoder accepts
pub(crate) const MAX_SEGMENT_DATA: usize = 65_533;

/// Whether an XMP packet fits in one APP1 segment with its namespace header.
pub(crate) fn xmp_fits(xmp: &[u8]) -> bool {
    XMP_HEADER.len() + xmp.len() <= MAX_SEGMENT_DATA
}

/// Whether an IPTC record fits in one APP13 segment once wrapped.
pub(crate) fn iptc_fits(iptc: &[u8]) -> bool {
    PHOTOSHOP_HEADER.len() + IPTC_RESOURCE_OVERHEAD + iptc.len() + iptc.len() % 2
        <= MAX_SEGMENT_DATA
}

pub struct JpegWriter;

fn encode_err(e: impl std::fmt::Display) -> ConversionError {
    ConversionError::EncodeError(e.to_string())
}

fn prefixed(header: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut segment = Vec::with_capacity(header.len() + payload.len());
    segment.extend_from_slice(header);
    segment.extend_from_slice(payload);
    segment
}

/// Wraps an IPTC record in a Photoshop 3.0 image resource block (APP13).
fn photoshop_iptc_segment(iptc: &[u8]) -> Vec<u8> {
    let mut segment =
        Vec::with_capacity(PHOTOSHOP_HEADER.len() + IPTC_RESOURCE_OVERHEAD + iptc.len() + 1);
    segment.extend_from_slice(PHOTOSHOP_HEADER);
    segment.extend_from_slice(b"8BIM");
    segment.extend_from_slice(&IPTC_RESOURCE_ID.to_be_bytes());
    // Empty Pascal-string name, padded to an even length
    segment.extend_from_slice(&[0, 0]);
    segment.extend_from_slice(&(iptc.len() as u32).to_be_bytes());
    segment.extend_from_slice(iptc);
    if iptc.len() % 2 == 1 {
        segment.push(0);
    }
    segment
}

impl ImageWriter for JpegWriter {
    fn write_image(
        &self,
        image: &PreparedImage,
        params: &EncodeParams,
        metadata: &MetadataHandle,
        output: &mut dyn Write,
    ) -> Result<()> {
        let PreparedSamples::U8(data) = &image.samples else {
            return Err(ConversionError::EncodeError(
                "JPEG needs 8-bit samples".to_string(),
            ));
        };

        let color = match image.channels {
            1 => ColorType::Luma,
            3 => ColorType::Rgb,
            n => return Err(ConversionError::UnsupportedChannels(n)),
        };

        let width = u16::try_from(image.width).map_err(|_| {
            ConversionError::EncodeError(format!("JPEG width {} exceeds 65535", image.width))
        })?;
        let height = u16::try_from(image.height).map_err(|_| {
            ConversionError::EncodeError(format!("JPEG height {} exceeds 65535", image.height))
        })?;

        let quality = params.numeric_quality();
        debug!("Encoding JPEG image: {}x{}, quality {}", width, height, quality);

        let mut buffer = Vec::new();
        {
            let mut encoder = Encoder::new(&mut buffer, quality);

            if let Some(exif) = &metadata.exif {
                encoder
                    .add_app_segment(1, &prefixed(EXIF_HEADER, exif))
                    .map_err(encode_err)?;
            }
            if let Some(xmp) = &metadata.xmp {
                encoder
                    .add_app_segment(1, &prefixed(XMP_HEADER, xmp))
                    .map_err(encode_err)?;
            }
            if let Some(iptc) = &metadata.iptc {
                encoder
                    .add_app_segment(13, &photoshop_iptc_segment(iptc))
                    .map_err(encode_err)?;
            }

            encoder
                .encode(data, width, height, color)
                .map_err(encode_err)?;
        }

        output.write_all(&buffer)?;
        debug!("JPEG encoding complete, {} bytes", buffer.len());
        Ok(())
    }
}
