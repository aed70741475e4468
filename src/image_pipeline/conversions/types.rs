//! Conversion request and result types

use std::path::{Path, PathBuf};

use crate::image_pipeline::common::error::{ConversionError, ErrorKind, Result};
use crate::image_pipeline::depth::{BitDepth, OutputFormat};
use crate::image_pipeline::encode::EncodeOutcome;

pub const DEFAULT_QUALITY: u8 = 90;

/// One file to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub format: OutputFormat,
    /// 1-100; 100 asks for lossless where the format has it
    pub quality: u8,
    /// `None` keeps the source depth, capped by the format
    pub bit_depth: Option<BitDepth>,
}

impl ConversionRequest {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        format: OutputFormat,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            format,
            quality: DEFAULT_QUALITY,
            bit_depth: None,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_bit_depth(mut self, depth: Option<BitDepth>) -> Self {
        self.bit_depth = depth;
        self
    }

    /// Checks everything that can be checked before decoding.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(ConversionError::InvalidRequest(format!(
                "quality must be between 1 and 100, got {}",
                self.quality
            )));
        }
        check_regular_file(&self.input_path)
    }
}

fn check_regular_file(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path)
        .map_err(|e| ConversionError::LoadError(format!("{}: {}", path.display(), e)))?;
    if !meta.is_file() {
        return Err(ConversionError::LoadError(format!(
            "{}: not a regular file",
            path.display()
        )));
    }
    Ok(())
}

/// Outcome of one `convert` call. Never an `Err`: failures are reported here.
#[derive(Debug, Clone, Default)]
pub struct ConversionResult {
    pub success: bool,
    /// Human-readable failure message
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// Path actually written, after extension normalization
    pub output_path: Option<PathBuf>,
    /// Depth actually written
    pub output_depth: Option<BitDepth>,
    /// Non-fatal issues: depth fallback, skipped metadata, renamed output
    pub warnings: Vec<String>,
}

impl ConversionResult {
    pub fn succeeded(outcome: EncodeOutcome) -> Self {
        Self {
            success: true,
            error: None,
            error_kind: None,
            output_path: Some(outcome.output_path),
            output_depth: Some(outcome.depth),
            warnings: outcome.warnings,
        }
    }

    pub fn failed(error: &ConversionError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            ..Self::default()
        }
    }
}
