//! Per-call encode state machine
//!
//! capability check, alpha resolution, depth conversion, layout adaptation,
//! quality mapping, metadata selection, extension normalization, write.
//! Every step runs exactly once, in that order.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info_span, warn};

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::common::timing::PipelineTimings;
use crate::image_pipeline::depth::{BitDepth, CapabilityTable, FormatCapability, OutputFormat, rescale};
use crate::image_pipeline::encode::heif_writer::{HeifCodec, HeifWriter};
use crate::image_pipeline::encode::jpeg_writer::{self, JpegWriter};
use crate::image_pipeline::encode::png_writer::PngWriter;
use crate::image_pipeline::encode::tiff_writer::StandardTiffWriter;
use crate::image_pipeline::encode::types::{EncodeParams, EncoderSettings};
use crate::image_pipeline::encode::webp_writer::WebpWriter;
use crate::image_pipeline::encode::writer::ImageWriter;
use crate::image_pipeline::pixel::{PixelBuffer, composite_over_white, prepare};
use crate::image_pipeline::source::MetadataHandle;
use crate::image_pipeline::source::metadata::MAX_EXIF_BYTES;

/// One encode call's inputs besides the pixels.
#[derive(Debug, Clone, Copy)]
pub struct EncodeJob<'a> {
    pub format: OutputFormat,
    /// Significant depth of the buffer handed to [`FormatEncoder::encode`].
    pub source_depth: BitDepth,
    /// Depth to write, already resolved against the capability table.
    pub depth: BitDepth,
    pub quality: u8,
    pub metadata: &'a MetadataHandle,
    pub output_path: &'a Path,
}

/// What a successful encode produced.
#[derive(Debug, Clone)]
pub struct EncodeOutcome {
    pub output_path: PathBuf,
    pub depth: BitDepth,
    pub params: EncodeParams,
    pub bytes_written: usize,
    pub warnings: Vec<String>,
}

/// Routes buffers to the writer registered for each output format.
pub struct FormatEncoder {
    capabilities: Arc<CapabilityTable>,
    settings: EncoderSettings,
    writers: [Box<dyn ImageWriter>; OutputFormat::COUNT],
}

impl FormatEncoder {
    pub fn new(capabilities: Arc<CapabilityTable>, settings: EncoderSettings) -> Self {
        // Indexed by `OutputFormat::index()`.
        let writers: [Box<dyn ImageWriter>; OutputFormat::COUNT] = [
            Box::new(JpegWriter),
            Box::new(PngWriter),
            Box::new(WebpWriter),
            Box::new(StandardTiffWriter),
            Box::new(HeifWriter::new(HeifCodec::Hevc)),
            Box::new(HeifWriter::new(HeifCodec::Hevc)),
            Box::new(HeifWriter::new(HeifCodec::Av1)),
        ];
        Self {
            capabilities,
            settings,
            writers,
        }
    }

    /// Replaces the backend used for `format`.
    pub fn with_writer(mut self, format: OutputFormat, writer: Box<dyn ImageWriter>) -> Self {
        self.writers[format.index()] = writer;
        self
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    pub fn encode(
        &self,
        buffer: PixelBuffer,
        job: &EncodeJob<'_>,
        timings: &mut PipelineTimings,
    ) -> Result<EncodeOutcome> {
        let capability = self.capabilities.get(job.format);
        let writer = &self.writers[job.format.index()];
        let mut warnings = Vec::new();

        {
            let _span = info_span!("check_capability", format = %job.format, depth = %job.depth).entered();
            if !capability.supports_depth(job.depth) {
                return Err(ConversionError::UnsupportedDepthForFormat {
                    format: job.format,
                    depth: job.depth,
                });
            }
        }

        let buffer = if buffer.has_alpha() && !capability.alpha {
            let _span = info_span!("composite_alpha").entered();
            timings.time("composite_alpha", || {
                composite_over_white(buffer, job.source_depth)
            })?
        } else {
            buffer
        };

        let buffer = {
            let _span = info_span!("rescale", from = %job.source_depth, to = %job.depth).entered();
            timings.time("rescale", || rescale(buffer, job.source_depth, job.depth))
        };

        let prepared = {
            let _span = info_span!("adapt_layout").entered();
            timings.time("adapt_layout", || prepare(buffer, job.depth, writer.layout()))
        };

        let params = EncodeParams::for_quality(capability, job.quality, &self.settings);
        debug!("Encode parameters: {:?}", params);

        let metadata = select_metadata(capability, job.metadata, &mut warnings);

        let output_path = normalize_extension(job.output_path, capability);
        if output_path != job.output_path {
            let message = format!(
                "Output extension changed to .{} for {}",
                capability.canonical_extension(),
                job.format
            );
            warn!("{}", message);
            warnings.push(message);
        }

        let encoded = {
            let _span = info_span!("encode", format = %job.format).entered();
            let mut encoded = Vec::new();
            timings.time("encode", || {
                writer.write_image(&prepared, &params, &metadata, &mut encoded)
            })?;
            encoded
        };

        {
            let _span = info_span!("write_output", path = %output_path.display()).entered();
            timings.time("write_output", || write_output(&output_path, &encoded)).map_err(|e| {
                ConversionError::OutputWriteError(format!("{}: {}", output_path.display(), e))
            })?;
        }

        Ok(EncodeOutcome {
            output_path,
            depth: job.depth,
            params,
            bytes_written: encoded.len(),
            warnings,
        })
    }
}

/// Keeps the metadata kinds `capability` can carry and records a warning
/// for every kind that has to be dropped.
fn select_metadata(
    capability: &FormatCapability,
    metadata: &MetadataHandle,
    warnings: &mut Vec<String>,
) -> MetadataHandle {
    let mut skip = |kind: &str, reason: &str| {
        let message = format!("Skipped {} metadata: {}", kind, reason);
        warn!("{}", message);
        warnings.push(message);
    };

    let unsupported = format!("not supported by {}", capability.format);

    let exif = match &metadata.exif {
        Some(_) if !capability.metadata.exif => {
            skip("EXIF", &unsupported);
            None
        }
        Some(exif) if capability.format == OutputFormat::Jpeg && exif.len() > MAX_EXIF_BYTES => {
            skip("EXIF", "too large for a JPEG APP1 segment");
            None
        }
        other => other.clone(),
    };

    let xmp = match &metadata.xmp {
        Some(_) if !capability.metadata.xmp => {
            skip("XMP", &unsupported);
            None
        }
        Some(xmp) if capability.format == OutputFormat::Jpeg && !jpeg_writer::xmp_fits(xmp) => {
            skip("XMP", "too large for a JPEG APP1 segment");
            None
        }
        other => other.clone(),
    };

    let iptc = match &metadata.iptc {
        Some(_) if !capability.metadata.iptc => {
            skip("IPTC", &unsupported);
            None
        }
        Some(iptc) if capability.format == OutputFormat::Jpeg && !jpeg_writer::iptc_fits(iptc) => {
            skip("IPTC", "too large for a JPEG APP13 segment");
            None
        }
        other => other.clone(),
    };

    MetadataHandle { exif, xmp, iptc }
}

/// Writes `bytes` to a temporary file beside `path` and renames it into
/// place. A failed write leaves `path` as it was.
fn write_output(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".photoconv-").suffix(".part");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }

    let mut file = builder.tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Rewrites the extension of `path` to the format's canonical one unless
/// it already carries an accepted extension (case-insensitive).
pub fn normalize_extension(path: &Path, capability: &FormatCapability) -> PathBuf {
    let current = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match current {
        Some(ext) if capability.extensions.contains(&ext.as_str()) => path.to_path_buf(),
        _ => path.with_extension(capability.canonical_extension()),
    }
}
