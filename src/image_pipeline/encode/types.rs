//! Encoder parameter types

use crate::image_pipeline::depth::{FormatCapability, LosslessMode, OutputFormat};

/// How the requested quality reaches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityMode {
    /// Numeric quality (1-100) for the backend's lossy path.
    Lossy(u8),
    /// Select a lossless compression codec (PNG, TIFF).
    LosslessCodec,
    /// The backend's explicit lossless switch (HEIF, AVIF).
    LosslessSentinel,
}

impl QualityMode {
    pub fn is_lossless(self) -> bool {
        !matches!(self, Self::Lossy(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaSubsampling {
    /// Whatever the backend picks for its quality setting.
    Default,
    /// Full-resolution chroma.
    Full444,
}

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression (slow, good compression)
    Lzw,
    /// Deflate compression - fast level (good speed/size balance)
    DeflateFast,
    /// Deflate compression - balanced (default)
    DeflateBalanced,
    /// Deflate compression - best compression (slower)
    DeflateBest,
}

/// Encoder knobs that come from configuration rather than the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    /// TIFF compression below quality 100
    pub tiff_compression: TiffCompression,
    /// TIFF compression at quality 100
    pub tiff_lossless_compression: TiffCompression,
    /// TIFF predictor (2 = horizontal differencing)
    pub predictor: Option<u16>,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            tiff_compression: TiffCompression::DeflateBalanced,
            tiff_lossless_compression: TiffCompression::Lzw,
            predictor: None,
        }
    }
}

/// Everything a writer needs to know besides the pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: OutputFormat,
    pub quality: QualityMode,
    pub chroma: ChromaSubsampling,
    pub tiff_compression: TiffCompression,
    pub predictor: Option<u16>,
}

impl EncodeParams {
    /// Maps a 1-100 quality onto the format's backend parameters.
    ///
    /// 100 selects a lossless codec for PNG/TIFF and the lossless switch plus
    /// 4:4:4 chroma for HEIF/AVIF. JPEG and WEBP have no lossless mode, so
    /// 100 is just their best lossy quality. Anything below 100 passes
    /// through unchanged.
    pub fn for_quality(capability: &FormatCapability, quality: u8, settings: &EncoderSettings) -> Self {
        let mode = match (capability.lossless, quality) {
            (LosslessMode::Codec, 100) => QualityMode::LosslessCodec,
            (LosslessMode::Sentinel, 100) => QualityMode::LosslessSentinel,
            (_, q) => QualityMode::Lossy(q),
        };

        let chroma = if mode == QualityMode::LosslessSentinel {
            ChromaSubsampling::Full444
        } else {
            ChromaSubsampling::Default
        };

        let tiff_compression = if mode == QualityMode::LosslessCodec {
            settings.tiff_lossless_compression
        } else {
            settings.tiff_compression
        };

        Self {
            format: capability.format,
            quality: mode,
            chroma,
            tiff_compression,
            predictor: settings.predictor,
        }
    }

    /// Numeric quality for backends that only take a number.
    pub fn numeric_quality(&self) -> u8 {
        match self.quality {
            QualityMode::Lossy(q) => q,
            QualityMode::LosslessCodec | QualityMode::LosslessSentinel => 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::depth::CapabilityTable;

    fn params(format: OutputFormat, quality: u8) -> EncodeParams {
        let table = CapabilityTable::standard();
        EncodeParams::for_quality(table.get(format), quality, &EncoderSettings::default())
    }

    #[test]
    fn jpeg_and_webp_max_quality_stay_lossy() {
        assert_eq!(params(OutputFormat::Jpeg, 100).quality, QualityMode::Lossy(100));
        assert_eq!(params(OutputFormat::Webp, 100).quality, QualityMode::Lossy(100));
        assert_eq!(params(OutputFormat::Jpeg, 100).chroma, ChromaSubsampling::Default);
    }

    #[test]
    fn png_and_tiff_max_quality_pick_lossless_codec() {
        assert_eq!(params(OutputFormat::Png, 100).quality, QualityMode::LosslessCodec);
        let tiff = params(OutputFormat::Tiff, 100);
        assert_eq!(tiff.quality, QualityMode::LosslessCodec);
        assert_eq!(tiff.tiff_compression, TiffCompression::Lzw);
    }

    #[test]
    fn heif_family_max_quality_uses_sentinel_and_full_chroma() {
        for format in [OutputFormat::Heic, OutputFormat::Heif, OutputFormat::Avif] {
            let p = params(format, 100);
            assert_eq!(p.quality, QualityMode::LosslessSentinel);
            assert_eq!(p.chroma, ChromaSubsampling::Full444);
            assert!(p.quality.is_lossless());
        }
    }

    #[test]
    fn lower_quality_passes_through() {
        for format in OutputFormat::ALL {
            let p = params(format, 73);
            assert_eq!(p.quality, QualityMode::Lossy(73));
            assert_eq!(p.numeric_quality(), 73);
        }
        assert_eq!(
            params(OutputFormat::Tiff, 50).tiff_compression,
            TiffCompression::DeflateBalanced
        );
    }
}
