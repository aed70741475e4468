//! Per-format capability table.
//!
//! The table is built once (usually through [`CapabilityTable::standard`]) and
//! shared read-only by every conversion; nothing in it changes after
//! construction.

use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::depth::types::{BitDepth, OutputFormat};

/// How a format honours `quality = 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LosslessMode {
    /// Always lossless; 100 selects a lossless compression codec (PNG, TIFF).
    Codec,
    /// No lossless mode; 100 is simply the highest lossy quality (JPEG, WEBP).
    MaxLossy,
    /// The encoder has an explicit lossless switch, used with 4:4:4 chroma (HEIF, AVIF).
    Sentinel,
}

/// Which metadata kinds a format can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataSupport {
    pub exif: bool,
    pub xmp: bool,
    pub iptc: bool,
}

#[derive(Debug, Clone)]
pub struct FormatCapability {
    pub format: OutputFormat,
    /// Accepted depths, ascending. Never empty.
    pub depths: &'static [BitDepth],
    pub alpha: bool,
    pub lossless: LosslessMode,
    pub metadata: MetadataSupport,
    /// Accepted file extensions; the first one is canonical.
    pub extensions: &'static [&'static str],
}

impl FormatCapability {
    pub fn max_depth(&self) -> BitDepth {
        self.depths[self.depths.len() - 1]
    }

    pub fn supports_depth(&self, depth: BitDepth) -> bool {
        self.depths.contains(&depth)
    }

    pub fn supports_lossless(&self) -> bool {
        self.lossless != LosslessMode::MaxLossy
    }

    pub fn canonical_extension(&self) -> &'static str {
        self.extensions[0]
    }
}

const DEPTHS_8: &[BitDepth] = &[BitDepth::Eight];
/// 10 and 12-bit data sits unshifted in 16-bit samples.
const DEPTHS_ALL: &[BitDepth] = &[
    BitDepth::Eight,
    BitDepth::Ten,
    BitDepth::Twelve,
    BitDepth::Sixteen,
];

const ALL_METADATA: MetadataSupport = MetadataSupport {
    exif: true,
    xmp: true,
    iptc: true,
};

/// HEIF family containers carry EXIF and XMP items but no IPTC.
const HEIF_METADATA: MetadataSupport = MetadataSupport {
    exif: true,
    xmp: true,
    iptc: false,
};

fn entry(
    format: OutputFormat,
    depths: &'static [BitDepth],
    alpha: bool,
    lossless: LosslessMode,
    metadata: MetadataSupport,
    extensions: &'static [&'static str],
) -> FormatCapability {
    FormatCapability {
        format,
        depths,
        alpha,
        lossless,
        metadata,
        extensions,
    }
}

/// Immutable lookup from output format to its capabilities.
#[derive(Debug, Clone)]
pub struct CapabilityTable {
    entries: [FormatCapability; OutputFormat::COUNT],
}

impl CapabilityTable {
    pub fn standard() -> Self {
        Self {
            entries: [
                entry(
                    OutputFormat::Jpeg,
                    DEPTHS_8,
                    false,
                    LosslessMode::MaxLossy,
                    ALL_METADATA,
                    &["jpg", "jpeg"],
                ),
                entry(
                    OutputFormat::Png,
                    DEPTHS_ALL,
                    true,
                    LosslessMode::Codec,
                    MetadataSupport {
                        exif: true,
                        xmp: true,
                        iptc: false,
                    },
                    &["png"],
                ),
                entry(
                    OutputFormat::Webp,
                    DEPTHS_8,
                    true,
                    LosslessMode::MaxLossy,
                    MetadataSupport {
                        exif: false,
                        xmp: false,
                        iptc: false,
                    },
                    &["webp"],
                ),
                entry(
                    OutputFormat::Tiff,
                    DEPTHS_ALL,
                    true,
                    LosslessMode::Codec,
                    MetadataSupport {
                        exif: false,
                        xmp: true,
                        iptc: true,
                    },
                    &["tiff", "tif"],
                ),
                entry(
                    OutputFormat::Heic,
                    DEPTHS_ALL,
                    true,
                    LosslessMode::Sentinel,
                    HEIF_METADATA,
                    &["heic", "heics"],
                ),
                entry(
                    OutputFormat::Heif,
                    DEPTHS_ALL,
                    true,
                    LosslessMode::Sentinel,
                    HEIF_METADATA,
                    &["heif", "heifs", "hif"],
                ),
                entry(
                    OutputFormat::Avif,
                    DEPTHS_ALL,
                    true,
                    LosslessMode::Sentinel,
                    HEIF_METADATA,
                    &["avif"],
                ),
            ],
        }
    }

    pub fn get(&self, format: OutputFormat) -> &FormatCapability {
        &self.entries[format.index()]
    }

    pub fn max_depth_for(&self, format: OutputFormat) -> BitDepth {
        self.get(format).max_depth()
    }

    pub fn is_depth_supported(&self, format: OutputFormat, depth: BitDepth) -> bool {
        self.get(format).supports_depth(depth)
    }

    /// Names of every format the pipeline can write.
    pub fn supported_output_formats(&self) -> Vec<&'static str> {
        self.entries.iter().map(|c| c.format.name()).collect()
    }

    /// Highest depth `format` accepts, as a bit count.
    pub fn get_max_depth(&self, format: OutputFormat) -> u32 {
        self.max_depth_for(format).bits()
    }

    /// Resolves the depth a conversion will actually write.
    ///
    /// Without a request the source depth is kept, capped at the format
    /// maximum. Samples are never shifted up to fill a wider container.
    ///
    /// An explicit request the format cannot store is rejected, and one that
    /// exceeds the source's precision is reported as
    /// [`ConversionError::DepthExceedsSource`] rather than clamped.
    pub fn clamp_request(
        &self,
        format: OutputFormat,
        requested: Option<BitDepth>,
        source_depth: BitDepth,
    ) -> Result<BitDepth> {
        let capability = self.get(format);

        let Some(requested) = requested else {
            let capped = source_depth.min(capability.max_depth());
            let resolved = capability
                .depths
                .iter()
                .copied()
                .rev()
                .find(|&d| d <= capped)
                .unwrap_or(BitDepth::Eight);
            debug!(%format, %source_depth, %resolved, "No depth requested, using native depth");
            return Ok(resolved);
        };

        if !capability.supports_depth(requested) {
            return Err(ConversionError::UnsupportedDepthForFormat {
                format,
                depth: requested,
            });
        }

        if requested > source_depth {
            return Err(ConversionError::DepthExceedsSource {
                requested,
                source_depth,
            });
        }

        Ok(requested)
    }
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::common::error::ErrorKind;

    #[test]
    fn every_format_has_a_depth() {
        let table = CapabilityTable::standard();
        for format in OutputFormat::ALL {
            let capability = table.get(format);
            assert_eq!(capability.format, format);
            assert!(!capability.depths.is_empty());
            assert!(capability.supports_depth(BitDepth::Eight));
            assert!(!capability.extensions.is_empty());
        }
    }

    #[test]
    fn max_depths() {
        let table = CapabilityTable::standard();
        assert_eq!(table.max_depth_for(OutputFormat::Jpeg), BitDepth::Eight);
        assert_eq!(table.max_depth_for(OutputFormat::Webp), BitDepth::Eight);
        assert_eq!(table.max_depth_for(OutputFormat::Png), BitDepth::Sixteen);
        assert_eq!(table.max_depth_for(OutputFormat::Tiff), BitDepth::Sixteen);
        assert_eq!(table.get_max_depth(OutputFormat::Heic), 16);
        assert_eq!(table.get_max_depth(OutputFormat::Avif), 16);
    }

    #[test]
    fn lists_all_output_formats() {
        let names = CapabilityTable::standard().supported_output_formats();
        assert_eq!(names, vec!["JPEG", "PNG", "WEBP", "TIFF", "HEIC", "HEIF", "AVIF"]);
    }

    #[test]
    fn absent_request_keeps_source_depth_capped_by_format() {
        let table = CapabilityTable::standard();
        let depth = table
            .clamp_request(OutputFormat::Jpeg, None, BitDepth::Sixteen)
            .unwrap();
        assert_eq!(depth, BitDepth::Eight);

        let depth = table
            .clamp_request(OutputFormat::Heic, None, BitDepth::Ten)
            .unwrap();
        assert_eq!(depth, BitDepth::Ten);

        let depth = table
            .clamp_request(OutputFormat::Tiff, None, BitDepth::Eight)
            .unwrap();
        assert_eq!(depth, BitDepth::Eight);
    }

    #[test]
    fn absent_request_never_widens_the_source() {
        let table = CapabilityTable::standard();
        for format in [OutputFormat::Png, OutputFormat::Tiff, OutputFormat::Avif] {
            for source in BitDepth::ALL {
                let depth = table.clamp_request(format, None, source).unwrap();
                assert_eq!(depth, source, "{format} from {source}");
            }
        }
    }

    #[test]
    fn request_above_source_is_an_error() {
        let table = CapabilityTable::standard();
        let err = table
            .clamp_request(OutputFormat::Png, Some(BitDepth::Sixteen), BitDepth::Eight)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DepthExceedsSource);
    }

    #[test]
    fn request_outside_format_set_is_rejected() {
        let table = CapabilityTable::standard();
        let err = table
            .clamp_request(OutputFormat::Jpeg, Some(BitDepth::Sixteen), BitDepth::Sixteen)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedDepthForFormat);

        // Format support is checked before source precision.
        let err = table
            .clamp_request(OutputFormat::Webp, Some(BitDepth::Ten), BitDepth::Eight)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedDepthForFormat);
    }

    #[test]
    fn valid_request_is_returned_unchanged() {
        let table = CapabilityTable::standard();
        let depth = table
            .clamp_request(OutputFormat::Heif, Some(BitDepth::Twelve), BitDepth::Sixteen)
            .unwrap();
        assert_eq!(depth, BitDepth::Twelve);
    }

    #[test]
    fn lossless_formats_accept_every_depth() {
        let table = CapabilityTable::standard();
        for format in [OutputFormat::Png, OutputFormat::Tiff, OutputFormat::Heif] {
            for depth in BitDepth::ALL {
                assert!(table.is_depth_supported(format, depth), "{format} {depth}");
            }
        }
    }

    #[test]
    fn only_jpeg_and_webp_lack_lossless() {
        let table = CapabilityTable::standard();
        for format in OutputFormat::ALL {
            let lossless = table.get(format).supports_lossless();
            let expected = !matches!(format, OutputFormat::Jpeg | OutputFormat::Webp);
            assert_eq!(lossless, expected, "{format}");
        }
    }
}
