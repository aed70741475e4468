use thiserror::Error;

use crate::image_pipeline::depth::{BitDepth, OutputFormat};

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to load source image: {0}")]
    LoadError(String),

    #[error("Unsupported input extension: {0}")]
    UnsupportedExtension(String),

    #[error("Requested {requested} exceeds the source depth of {source_depth}")]
    DepthExceedsSource {
        requested: BitDepth,
        source_depth: BitDepth,
    },

    #[error("{format} cannot store {depth} samples")]
    UnsupportedDepthForFormat { format: OutputFormat, depth: BitDepth },

    #[error("Invalid conversion request: {0}")]
    InvalidRequest(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Pixel buffer does not match its dimensions: expected {expected} samples, got {actual}")]
    InvalidBuffer { expected: usize, actual: usize },

    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(usize),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Output file already exists: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Copyable tag for a [`ConversionError`], carried on results so callers can
/// match on the failure class without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Load,
    UnsupportedExtension,
    DepthExceedsSource,
    UnsupportedDepthForFormat,
    InvalidRequest,
    InvalidDimensions,
    InvalidBuffer,
    Decode,
    Encode,
    OutputWrite,
    Conflict,
    Io,
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LoadError(_) => ErrorKind::Load,
            Self::UnsupportedExtension(_) => ErrorKind::UnsupportedExtension,
            Self::DepthExceedsSource { .. } => ErrorKind::DepthExceedsSource,
            Self::UnsupportedDepthForFormat { .. } => ErrorKind::UnsupportedDepthForFormat,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::InvalidDimensions(..) => ErrorKind::InvalidDimensions,
            Self::InvalidBuffer { .. } | Self::UnsupportedChannels(_) => ErrorKind::InvalidBuffer,
            Self::DecodeError(_) => ErrorKind::Decode,
            Self::EncodeError(_) => ErrorKind::Encode,
            Self::OutputWriteError(_) => ErrorKind::OutputWrite,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::IoError(_) => ErrorKind::Io,
        }
    }

    /// Failures that stop the current file. Everything except the depth
    /// fallback, which the pipeline recovers from by writing 8-bit output.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::DepthExceedsSource { .. })
    }
}

pub type Result<T> = std::result::Result<T, ConversionError>;
