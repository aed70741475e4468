//! Bit depth and output format types

use std::fmt;
use std::str::FromStr;

use crate::image_pipeline::common::error::ConversionError;

/// Number of significant bits per channel sample.
///
/// Depths above 8 are always stored in 16-bit elements; for 10 and 12 bits
/// only the low `bits()` bits of each element are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BitDepth {
    Eight,
    Ten,
    Twelve,
    Sixteen,
}

impl BitDepth {
    pub const ALL: [BitDepth; 4] = [Self::Eight, Self::Ten, Self::Twelve, Self::Sixteen];

    pub const fn bits(self) -> u32 {
        match self {
            Self::Eight => 8,
            Self::Ten => 10,
            Self::Twelve => 12,
            Self::Sixteen => 16,
        }
    }

    /// Largest sample value representable at this depth.
    pub const fn max_value(self) -> u16 {
        match self {
            Self::Eight => (1 << 8) - 1,
            Self::Ten => (1 << 10) - 1,
            Self::Twelve => (1 << 12) - 1,
            Self::Sixteen => u16::MAX,
        }
    }

    /// Bytes per sample in a pixel buffer holding this depth.
    pub const fn element_width(self) -> usize {
        match self {
            Self::Eight => 1,
            _ => 2,
        }
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = ConversionError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            8 => Ok(Self::Eight),
            10 => Ok(Self::Ten),
            12 => Ok(Self::Twelve),
            16 => Ok(Self::Sixteen),
            other => Err(ConversionError::InvalidRequest(format!(
                "bit depth must be one of 8, 10, 12, 16 (got {other})"
            ))),
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Container formats the pipeline can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Tiff,
    Heic,
    Heif,
    Avif,
}

impl OutputFormat {
    pub const COUNT: usize = 7;

    pub const ALL: [OutputFormat; Self::COUNT] = [
        Self::Jpeg,
        Self::Png,
        Self::Webp,
        Self::Tiff,
        Self::Heic,
        Self::Heif,
        Self::Avif,
    ];

    /// Position of this format in format-indexed tables.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Webp => "WEBP",
            Self::Tiff => "TIFF",
            Self::Heic => "HEIC",
            Self::Heif => "HEIF",
            Self::Avif => "AVIF",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            "tiff" | "tif" => Ok(Self::Tiff),
            "heic" => Ok(Self::Heic),
            "heif" => Ok(Self::Heif),
            "avif" => Ok(Self::Avif),
            other => Err(ConversionError::InvalidRequest(format!(
                "unknown output format: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_values_match_bit_counts() {
        for depth in BitDepth::ALL {
            assert_eq!(depth.max_value() as u32, (1u32 << depth.bits()) - 1);
        }
    }

    #[test]
    fn depths_order_by_precision() {
        assert!(BitDepth::Eight < BitDepth::Ten);
        assert!(BitDepth::Twelve < BitDepth::Sixteen);
        assert_eq!(BitDepth::Ten.min(BitDepth::Eight), BitDepth::Eight);
    }

    #[test]
    fn bit_depth_from_integer() {
        assert_eq!(BitDepth::try_from(12).unwrap(), BitDepth::Twelve);
        assert!(BitDepth::try_from(14).is_err());
    }

    #[test]
    fn format_names_parse_case_insensitively() {
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("HEIC".parse::<OutputFormat>().unwrap(), OutputFormat::Heic);
        assert_eq!(".tif".parse::<OutputFormat>().unwrap(), OutputFormat::Tiff);
        assert!("bmp".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn table_indices_are_dense() {
        for (i, format) in OutputFormat::ALL.iter().enumerate() {
            assert_eq!(format.index(), i);
        }
    }
}
