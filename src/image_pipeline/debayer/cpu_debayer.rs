use std::io::Cursor;

use bayer::{BayerDepth, CFA, Demosaic, RasterDepth, RasterMut};
use tracing::{debug, info};

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::pixel::PixelBuffer;
use crate::image_pipeline::raw::types::{CfaPattern, RawImageData};

/// Standard XYZ to sRGB (D65) matrix
const XYZ_TO_SRGB: [[f32; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.9692660, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

/// Develops RAW sensor data into 16-bit linear sRGB on the CPU.
///
/// Steps: black and white levels (per photosite colour for mosaic input,
/// per channel otherwise), demosaic (bilinear, mosaic input only), white
/// balance, camera to sRGB matrix, crop.
pub struct CpuDebayer {
    white_balance: bool,
}

impl CpuDebayer {
    pub fn new(white_balance: bool) -> Self {
        Self { white_balance }
    }

    pub fn process(&self, raw_image: &RawImageData) -> Result<PixelBuffer> {
        let width = raw_image.width;
        let height = raw_image.height;
        let expected = width * height * raw_image.cpp;
        if raw_image.data.len() != expected {
            return Err(ConversionError::InvalidBuffer {
                expected,
                actual: raw_image.data.len(),
            });
        }

        info!("Developing RAW image {}x{} (cpp={})", width, height, raw_image.cpp);

        let demosaiced;
        let (rgb, levels): (&[u16], ChannelLevels) = match (raw_image.cpp, raw_image.cfa) {
            (3, _) => (raw_image.data.as_slice(), ChannelLevels::per_channel(raw_image)),
            (1, Some(cfa)) => {
                let leveled = level_mosaic(raw_image, cfa);
                demosaiced = demosaic(raw_image, &leveled, cfa)?;
                (demosaiced.as_slice(), ChannelLevels::NORMALIZED)
            }
            (1, None) => {
                return Err(ConversionError::DecodeError(
                    "Unsupported colour filter layout".to_string(),
                ));
            }
            (cpp, _) => {
                return Err(ConversionError::DecodeError(format!(
                    "Unsupported components per pixel: {cpp}"
                )));
            }
        };

        let developed = self.develop(rgb, &levels, raw_image);
        crop(developed, raw_image)
    }

    fn develop(&self, rgb: &[u16], levels: &ChannelLevels, raw_image: &RawImageData) -> Vec<u16> {
        let wb = if self.white_balance {
            normalized_wb(raw_image.wb_coeffs)
        } else {
            [1.0; 3]
        };
        let matrix = camera_to_srgb(&raw_image.cam_to_xyz);
        if matrix.is_none() {
            debug!("No usable colour matrix, keeping camera RGB");
        }

        let ChannelLevels { black, range } = *levels;

        rgb.chunks_exact(3)
            .flat_map(|px| {
                let mut lin = [0.0f32; 3];
                for c in 0..3 {
                    lin[c] = ((px[c] as f32 - black[c]).max(0.0) / range[c]) * wb[c];
                }

                let out = match &matrix {
                    Some(m) => [
                        m[0][0] * lin[0] + m[0][1] * lin[1] + m[0][2] * lin[2],
                        m[1][0] * lin[0] + m[1][1] * lin[1] + m[1][2] * lin[2],
                        m[2][0] * lin[0] + m[2][1] * lin[1] + m[2][2] * lin[2],
                    ],
                    None => lin,
                };

                out.map(|v| (v.clamp(0.0, 1.0) * 65535.0).round() as u16)
            })
            .collect()
    }
}

/// Black point and usable range of each RGB channel ahead of white balance.
#[derive(Debug, Clone, Copy)]
struct ChannelLevels {
    black: [f32; 3],
    range: [f32; 3],
}

impl ChannelLevels {
    /// Data already scaled to the full 16-bit range.
    const NORMALIZED: Self = Self {
        black: [0.0; 3],
        range: [65535.0; 3],
    };

    fn per_channel(raw_image: &RawImageData) -> Self {
        let mut black = [0.0f32; 3];
        let mut range = [1.0f32; 3];
        for c in 0..3 {
            black[c] = raw_image.black_levels[c] as f32;
            range[c] = (raw_image.white_levels[c] as f32 - black[c]).max(1.0);
        }
        Self { black, range }
    }
}

/// Subtracts each photosite's black level and stretches it to 16 bits,
/// taking the levels of the colour the CFA puts at that position.
fn level_mosaic(raw_image: &RawImageData, cfa: CfaPattern) -> Vec<u16> {
    let width = raw_image.width.max(1);
    raw_image
        .data
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let color = cfa.color_at(i / width, i % width);
            let black = raw_image.black_levels[color] as f32;
            let range = (raw_image.white_levels[color] as f32 - black).max(1.0);
            let scaled = (v as f32 - black).max(0.0) / range;
            (scaled.min(1.0) * 65535.0).round() as u16
        })
        .collect()
}

impl Default for CpuDebayer {
    fn default() -> Self {
        Self::new(true)
    }
}

fn demosaic(raw_image: &RawImageData, mosaic: &[u16], cfa: CfaPattern) -> Result<Vec<u16>> {
    let (width, height) = (raw_image.width, raw_image.height);

    let bayer_bytes: Vec<u8> = mosaic
        .iter()
        .flat_map(|&val| val.to_le_bytes())
        .collect();
    let mut output_buf = vec![0u8; width * height * 3 * 2];

    let cfa = match cfa {
        CfaPattern::Rggb => CFA::RGGB,
        CfaPattern::Bggr => CFA::BGGR,
        CfaPattern::Grbg => CFA::GRBG,
        CfaPattern::Gbrg => CFA::GBRG,
    };
    debug!("Running demosaic with CFA={:?}, algo=Linear", cfa);

    {
        let mut cursor = Cursor::new(&bayer_bytes[..]);
        let mut output_raster = RasterMut::new(width, height, RasterDepth::Depth16, &mut output_buf);
        bayer::run_demosaic(
            &mut cursor,
            BayerDepth::Depth16LE,
            cfa,
            Demosaic::Linear,
            &mut output_raster,
        )
        .map_err(|e| ConversionError::DecodeError(format!("Demosaic failed: {:?}", e)))?;
    }

    Ok(output_buf
        .chunks_exact(2)
        .map(|b| u16::from_ne_bytes([b[0], b[1]]))
        .collect())
}

/// White balance multipliers relative to green. Missing or broken
/// coefficients fall back to neutral.
fn normalized_wb(coeffs: [f32; 4]) -> [f32; 3] {
    let g = coeffs[1];
    if !g.is_finite() || g <= 0.0 {
        return [1.0; 3];
    }
    let scale = |v: f32| {
        let ratio = v / g;
        if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 }
    };
    [scale(coeffs[0]), 1.0, scale(coeffs[2])]
}

/// Combined camera to sRGB matrix with each row normalized to sum to 1, so
/// a neutral camera value stays neutral. `None` when the camera matrix is
/// missing or degenerate.
pub(crate) fn camera_to_srgb(cam_to_xyz: &[[f32; 4]; 3]) -> Option<[[f32; 3]; 3]> {
    let mut m = [[0.0f32; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            m[r][c] = (0..3).map(|k| XYZ_TO_SRGB[r][k] * cam_to_xyz[k][c]).sum();
        }
    }

    for row in &mut m {
        let sum: f32 = row.iter().sum();
        if !sum.is_finite() || sum.abs() < f32::EPSILON {
            return None;
        }
        for v in row.iter_mut() {
            *v /= sum;
        }
    }
    Some(m)
}

fn crop(data: Vec<u16>, raw_image: &RawImageData) -> Result<PixelBuffer> {
    let (width, height) = (raw_image.width, raw_image.height);
    let [top, right, bottom, left] = raw_image.crops;

    if top + bottom >= height || left + right >= width || raw_image.crops == [0; 4] {
        return PixelBuffer::from_u16(width, height, 3, data);
    }

    let out_width = width - left - right;
    let out_height = height - top - bottom;
    debug!("Cropping to {}x{}", out_width, out_height);

    let mut out = Vec::with_capacity(out_width * out_height * 3);
    for row in data.chunks_exact(width * 3).skip(top).take(out_height) {
        out.extend_from_slice(&row[left * 3..(left + out_width) * 3]);
    }
    PixelBuffer::from_u16(out_width, out_height, 3, out)
}
