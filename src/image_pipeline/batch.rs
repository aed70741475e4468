//! Batch conversion
//!
//! Runs one [`ConversionPipeline`] over a list of input files, naming each
//! output after its input and collecting per-file results. A failed file
//! never stops the batch.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{info, info_span, warn};

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::conversions::{
    ConversionPipeline, ConversionRequest, ConversionResult, DEFAULT_QUALITY,
};
use crate::image_pipeline::depth::{BitDepth, CapabilityTable, OutputFormat};
use crate::image_pipeline::raw::RawImageReader;
use crate::image_pipeline::source::{ContainerReader, MetadataExtractor, SourceKind};

/// What to do when the output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Leave the existing file alone and count the input as skipped
    #[default]
    Skip,
    /// Overwrite the existing file
    Replace,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Target format; ignored when `keep_source_format` is set
    pub format: OutputFormat,
    pub quality: u8,
    pub bit_depth: Option<BitDepth>,
    pub conflict_policy: ConflictPolicy,
    /// Convert files concurrently on the rayon pool
    pub parallel: bool,
    /// Write each file in its own container format (RAW goes to TIFF)
    pub keep_source_format: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: DEFAULT_QUALITY,
            bit_depth: None,
            conflict_policy: ConflictPolicy::Skip,
            parallel: false,
            keep_source_format: false,
        }
    }
}

impl BatchOptions {
    pub fn builder() -> BatchOptionsBuilder {
        BatchOptionsBuilder::default()
    }
}

/// Builder for BatchOptions
#[derive(Default)]
pub struct BatchOptionsBuilder {
    format: Option<OutputFormat>,
    quality: Option<u8>,
    bit_depth: Option<Option<BitDepth>>,
    conflict_policy: Option<ConflictPolicy>,
    parallel: Option<bool>,
    keep_source_format: Option<bool>,
}

impl BatchOptionsBuilder {
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn bit_depth(mut self, depth: Option<BitDepth>) -> Self {
        self.bit_depth = Some(depth);
        self
    }

    pub fn conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = Some(policy);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    pub fn keep_source_format(mut self, keep: bool) -> Self {
        self.keep_source_format = Some(keep);
        self
    }

    pub fn build(self) -> BatchOptions {
        let default = BatchOptions::default();
        BatchOptions {
            format: self.format.unwrap_or(default.format),
            quality: self.quality.unwrap_or(default.quality),
            bit_depth: self.bit_depth.unwrap_or(default.bit_depth),
            conflict_policy: self.conflict_policy.unwrap_or(default.conflict_policy),
            parallel: self.parallel.unwrap_or(default.parallel),
            keep_source_format: self.keep_source_format.unwrap_or(default.keep_source_format),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub input: PathBuf,
    pub status: BatchStatus,
    pub result: ConversionResult,
}

/// Aggregate outcome of a batch, entries in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    fn from_entries(entries: Vec<BatchEntry>) -> Self {
        let count = |status| entries.iter().filter(|e| e.status == status).count();
        Self {
            succeeded: count(BatchStatus::Succeeded),
            failed: count(BatchStatus::Failed),
            skipped: count(BatchStatus::Skipped),
            entries,
        }
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Format a file is written in when the batch keeps source formats.
///
/// RAW sources have no writable container of their own and become TIFF;
/// BMP and GIF, which the pipeline reads but cannot write, become PNG.
pub fn source_output_format(input: &Path, capabilities: &CapabilityTable) -> Result<OutputFormat> {
    if SourceKind::from_path(input)? == SourceKind::Raw {
        return Ok(OutputFormat::Tiff);
    }

    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    Ok(OutputFormat::ALL
        .into_iter()
        .find(|&f| capabilities.get(f).extensions.contains(&ext.as_str()))
        .unwrap_or(OutputFormat::Png))
}

/// `<output_dir>/<input stem>.<canonical extension>`
pub fn output_path_for(
    input: &Path,
    output_dir: &Path,
    format: OutputFormat,
    capabilities: &CapabilityTable,
) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!(
        "{}.{}",
        stem,
        capabilities.get(format).canonical_extension()
    ))
}

pub struct BatchConverter<R: RawImageReader, C: ContainerReader, M: MetadataExtractor> {
    pipeline: ConversionPipeline<R, C, M>,
    options: BatchOptions,
}

impl<R: RawImageReader, C: ContainerReader, M: MetadataExtractor> BatchConverter<R, C, M> {
    pub fn new(pipeline: ConversionPipeline<R, C, M>, options: BatchOptions) -> Self {
        Self { pipeline, options }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub fn pipeline(&self) -> &ConversionPipeline<R, C, M> {
        &self.pipeline
    }

    pub fn run(&self, inputs: &[PathBuf], output_dir: &Path) -> Result<BatchReport> {
        self.run_with_progress(inputs, output_dir, |_, _, _| {})
    }

    /// Converts every input into `output_dir`, calling `progress` with
    /// `(done, total, input)` after each file.
    ///
    /// Only a failure to create `output_dir` is returned as an error.
    pub fn run_with_progress<F>(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        progress: F,
    ) -> Result<BatchReport>
    where
        F: Fn(usize, usize, &Path) + Sync,
    {
        let _span = info_span!("batch", files = inputs.len(), parallel = self.options.parallel).entered();

        std::fs::create_dir_all(output_dir).map_err(|e| {
            ConversionError::OutputWriteError(format!("{}: {}", output_dir.display(), e))
        })?;

        let total = inputs.len();
        let done = AtomicUsize::new(0);
        let process = |input: &PathBuf| {
            let entry = self.convert_one(input, output_dir);
            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            progress(finished, total, input);
            entry
        };

        let entries: Vec<BatchEntry> = if self.options.parallel {
            inputs.par_iter().map(process).collect()
        } else {
            inputs.iter().map(process).collect()
        };

        let report = BatchReport::from_entries(entries);
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "Batch complete"
        );
        Ok(report)
    }

    fn convert_one(&self, input: &Path, output_dir: &Path) -> BatchEntry {
        let entry = |status, result| BatchEntry {
            input: input.to_path_buf(),
            status,
            result,
        };

        let capabilities = self.pipeline.capabilities();
        let format = if self.options.keep_source_format {
            match source_output_format(input, capabilities) {
                Ok(format) => format,
                Err(e) => {
                    warn!("{}: {}", input.display(), e);
                    return entry(BatchStatus::Failed, ConversionResult::failed(&e));
                }
            }
        } else {
            self.options.format
        };

        let output = output_path_for(input, output_dir, format, capabilities);
        if output.exists() && self.options.conflict_policy == ConflictPolicy::Skip {
            let conflict = ConversionError::Conflict(output.display().to_string());
            info!("Skipping {}: {}", input.display(), conflict);
            return entry(BatchStatus::Skipped, ConversionResult::failed(&conflict));
        }

        let request = ConversionRequest::new(input, output, format)
            .with_quality(self.options.quality)
            .with_bit_depth(self.options.bit_depth);
        let result = self.pipeline.convert(&request);

        let status = if result.success {
            BatchStatus::Succeeded
        } else {
            BatchStatus::Failed
        };
        entry(status, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::image_pipeline::common::error::ErrorKind;
    use crate::image_pipeline::conversions::PipelineConfig;

    fn write_png(dir: &Path, name: &str, value: u8) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(2, 2, image::Rgb([value, value, value]))
            .save(&path)
            .unwrap();
        path
    }

    fn converter(options: BatchOptions) -> BatchConverter<
        crate::image_pipeline::raw::RawLoaderReader,
        crate::image_pipeline::source::StandardContainerReader,
        crate::image_pipeline::source::ContainerMetadataExtractor,
    > {
        BatchConverter::new(ConversionPipeline::new(PipelineConfig::default()), options)
    }

    #[test]
    fn test_output_naming() {
        let table = CapabilityTable::standard();
        assert_eq!(
            output_path_for(Path::new("in/IMG.0001.png"), Path::new("out"), OutputFormat::Jpeg, &table),
            PathBuf::from("out/IMG.0001.jpg")
        );
        assert_eq!(
            output_path_for(Path::new("a.arw"), Path::new("out"), OutputFormat::Heif, &table),
            PathBuf::from("out/a.heif")
        );
    }

    #[test]
    fn test_source_format_mapping() {
        let table = CapabilityTable::standard();
        let format = |name: &str| source_output_format(Path::new(name), &table).unwrap();
        assert_eq!(format("a.NEF"), OutputFormat::Tiff);
        assert_eq!(format("a.jpeg"), OutputFormat::Jpeg);
        assert_eq!(format("a.tif"), OutputFormat::Tiff);
        assert_eq!(format("a.hif"), OutputFormat::Heif);
        assert_eq!(format("a.bmp"), OutputFormat::Png);
        assert_eq!(format("a.gif"), OutputFormat::Png);
        assert!(source_output_format(Path::new("a.txt"), &table).is_err());
    }

    #[test]
    fn test_options_builder() {
        let options = BatchOptions::builder()
            .format(OutputFormat::Tiff)
            .conflict_policy(ConflictPolicy::Replace)
            .parallel(true)
            .build();
        assert_eq!(options.format, OutputFormat::Tiff);
        assert_eq!(options.conflict_policy, ConflictPolicy::Replace);
        assert!(options.parallel);
        assert!(!options.keep_source_format);
        assert_eq!(options.quality, DEFAULT_QUALITY);
    }

    #[test]
    fn test_batch_creates_output_dir_and_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_png(dir.path(), "good.png", 200);
        let corrupt = dir.path().join("corrupt.png");
        std::fs::write(&corrupt, b"not a png").unwrap();
        let out = dir.path().join("nested/out");

        let options = BatchOptions::builder().format(OutputFormat::Tiff).build();
        let report = converter(options).run(&[corrupt, good], &out).unwrap();

        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert!(report.has_failures());
        assert_eq!(report.entries[0].result.error_kind, Some(ErrorKind::Load));
        assert!(out.join("good.tiff").exists());
        assert!(!out.join("corrupt.tiff").exists());
    }

    #[test]
    fn test_conflict_policies() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "photo.png", 10);
        let out = dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        let existing = out.join("photo.jpg");
        std::fs::write(&existing, b"keep me").unwrap();

        let report = converter(BatchOptions::default())
            .run(&[input.clone()], &out)
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.entries[0].status, BatchStatus::Skipped);
        assert_eq!(report.entries[0].result.error_kind, Some(ErrorKind::Conflict));
        assert_eq!(std::fs::read(&existing).unwrap(), b"keep me");

        let options = BatchOptions::builder()
            .conflict_policy(ConflictPolicy::Replace)
            .build();
        let report = converter(options).run(&[input], &out).unwrap();
        assert_eq!(report.succeeded, 1);
        assert_ne!(std::fs::read(&existing).unwrap(), b"keep me");
    }

    #[test]
    fn test_keep_source_format() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "scan.png", 128);
        let out = dir.path().join("out");

        let options = BatchOptions::builder()
            .format(OutputFormat::Jpeg)
            .keep_source_format(true)
            .build();
        let report = converter(options).run(&[input], &out).unwrap();

        assert_eq!(report.succeeded, 1);
        assert!(out.join("scan.png").exists());
        assert!(!out.join("scan.jpg").exists());
    }

    #[test]
    fn test_parallel_progress() {
        let dir = tempfile::tempdir().unwrap();
        let inputs: Vec<PathBuf> = (0..4u8)
            .map(|i| write_png(dir.path(), &format!("frame{i}.png"), i * 40))
            .collect();
        let out = dir.path().join("out");

        let seen = Mutex::new(Vec::new());
        let options = BatchOptions::builder()
            .format(OutputFormat::Png)
            .parallel(true)
            .build();
        let report = converter(options)
            .run_with_progress(&inputs, &out, |done, total, _| {
                seen.lock().unwrap().push((done, total));
            })
            .unwrap();

        assert_eq!(report.succeeded, 4);
        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
        for (entry, input) in report.entries.iter().zip(&inputs) {
            assert_eq!(&entry.input, input);
        }
    }
}
