//! RAW image reader implementation using the rawloader library.
//!
//! Supports any RAW format rawloader can decode (ARW, CR2, NEF, DNG, RAF,
//! ORF, RW2, PEF, SRW, ...). The sensor data is developed on the CPU into
//! 16-bit linear RGB.

use std::io::Cursor;

use rawloader::RawImageData as RawloaderImageData;
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::debayer::CpuDebayer;
use crate::image_pipeline::pixel::PixelBuffer;
use crate::image_pipeline::raw::reader::RawImageReader;
use crate::image_pipeline::raw::types::{CfaPattern, RawImageData};

/// RAW image reader that uses the rawloader library for decoding.
pub struct RawLoaderReader {
    debayer: CpuDebayer,
}

impl RawLoaderReader {
    pub fn new(camera_white_balance: bool) -> Self {
        Self {
            debayer: CpuDebayer::new(camera_white_balance),
        }
    }

    /// Decodes the sensor data and calibration without developing it.
    pub fn decode_sensor(&self, data: &[u8]) -> Result<RawImageData> {
        debug!("Decoding RAW image, {} bytes", data.len());

        let decoded = rawloader::decode(&mut Cursor::new(data))
            .map_err(|e| ConversionError::DecodeError(e.to_string()))?;

        debug!(
            "Decoded sensor data: {}x{}, cpp={}, make={} model={}",
            decoded.width, decoded.height, decoded.cpp, decoded.clean_make, decoded.clean_model
        );

        // Integer data is taken as-is, float data (normalized 0.0-1.0) is
        // scaled to the u16 range with a matching white level.
        let (samples, white_levels) = match decoded.data {
            RawloaderImageData::Integer(ref values) => (values.clone(), decoded.whitelevels),
            RawloaderImageData::Float(ref values) => (
                values
                    .iter()
                    .map(|&v| (v.clamp(0.0, 1.0) * u16::MAX as f32) as u16)
                    .collect(),
                [u16::MAX; 4],
            ),
        };

        let cfa = if decoded.cpp == 1 {
            let colors = [
                decoded.cfa.color_at(0, 0),
                decoded.cfa.color_at(0, 1),
                decoded.cfa.color_at(1, 0),
                decoded.cfa.color_at(1, 1),
            ];
            let pattern = CfaPattern::from_colors(colors);
            if pattern.is_none() {
                debug!("Unrecognised CFA layout {:?} ({})", colors, decoded.cfa.name);
            }
            pattern
        } else {
            None
        };

        Ok(RawImageData {
            width: decoded.width,
            height: decoded.height,
            cpp: decoded.cpp,
            data: samples,
            black_levels: decoded.blacklevels,
            white_levels,
            wb_coeffs: decoded.wb_coeffs,
            cam_to_xyz: decoded.cam_to_xyz(),
            cfa,
            crops: decoded.crops,
        })
    }
}

impl Default for RawLoaderReader {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RawImageReader for RawLoaderReader {
    fn read_raw(&self, data: &[u8]) -> Result<PixelBuffer> {
        let sensor = self.decode_sensor(data)?;
        self.debayer.process(&sensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_input_is_a_decode_error() {
        let reader = RawLoaderReader::default();
        let err = reader.read_raw(b"definitely not a raw file").unwrap_err();
        assert!(matches!(err, ConversionError::DecodeError(_)));
    }
}
