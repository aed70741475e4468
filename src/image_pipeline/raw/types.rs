//! RAW sensor data types

/// Colour filter layout of a Bayer sensor, named by its top-left 2x2 block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfaPattern {
    Rggb,
    Bggr,
    Grbg,
    Gbrg,
}

impl CfaPattern {
    /// Builds the pattern from the colour index (0 = R, 1 = G, 2 = B) of the
    /// four photosites in the top-left 2x2 block, row-major.
    pub fn from_colors(colors: [usize; 4]) -> Option<Self> {
        match colors {
            [0, 1, 1, 2] => Some(Self::Rggb),
            [2, 1, 1, 0] => Some(Self::Bggr),
            [1, 0, 2, 1] => Some(Self::Grbg),
            [1, 2, 0, 1] => Some(Self::Gbrg),
            _ => None,
        }
    }

    /// Colour index of each photosite in the top-left 2x2 block, row-major.
    pub fn colors(self) -> [usize; 4] {
        match self {
            Self::Rggb => [0, 1, 1, 2],
            Self::Bggr => [2, 1, 1, 0],
            Self::Grbg => [1, 0, 2, 1],
            Self::Gbrg => [1, 2, 0, 1],
        }
    }

    /// Colour index of the photosite at (`row`, `col`).
    pub fn color_at(self, row: usize, col: usize) -> usize {
        self.colors()[(row % 2) * 2 + col % 2]
    }
}

/// Decoded RAW sensor data plus the calibration needed to develop it.
#[derive(Debug, Clone)]
pub struct RawImageData {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// Components per pixel: 1 for a Bayer mosaic, 3 for already-demosaiced data
    pub cpp: usize,
    /// Sensor samples, `width * height * cpp` of them
    pub data: Vec<u16>,
    /// Black level per colour index (R, G, B, G2); for a mosaic each
    /// photosite uses the entry of its CFA colour
    pub black_levels: [u16; 4],
    /// White (saturation) level per colour index, as `black_levels`
    pub white_levels: [u16; 4],
    /// As-shot white balance multipliers (R, G, B, G2)
    pub wb_coeffs: [f32; 4],
    /// Camera to XYZ matrix, one row per XYZ component
    pub cam_to_xyz: [[f32; 4]; 3],
    /// Mosaic layout, `None` when `cpp == 3`
    pub cfa: Option<CfaPattern>,
    /// Crop margins (top, right, bottom, left) applied after demosaic
    pub crops: [usize; 4],
}
