//! Image processing pipeline module
//!
//! Bit-depth-aware photo conversion: sources are decoded into format-agnostic
//! pixel buffers, the output depth is resolved against what the target format
//! can store, and the buffer is rescaled and encoded with metadata carried
//! over where the container allows it.

pub mod batch;
pub mod common;
pub mod conversions;
pub mod debayer;
pub mod depth;
pub mod encode;
pub mod pixel;
pub mod raw;
pub mod source;

pub use common::{
    ConversionError,
    ErrorKind,
    PipelineTimings,
    Result,
};

pub use depth::{
    BitDepth,
    CapabilityTable,
    FormatCapability,
    OutputFormat,
};

pub use pixel::{
    PixelBuffer,
    PixelData,
};

pub use raw::{
    RawImageReader,
    RawLoaderReader,
};

pub use source::{
    ContainerMetadataExtractor,
    MetadataHandle,
    SourceLoader,
    StandardContainerReader,
    is_supported_input,
};

pub use encode::{
    FormatEncoder,
    ImageWriter,
    TiffCompression,
};

pub use conversions::{
    ConversionPipeline,
    ConversionRequest,
    ConversionResult,
    PipelineConfig,
    PipelineConfigBuilder,
};

pub use batch::{
    BatchConverter,
    BatchOptions,
    BatchReport,
    BatchStatus,
    ConflictPolicy,
};

/// The pipeline wired to the built-in RAW, container and metadata readers.
pub type StandardPipeline =
    ConversionPipeline<RawLoaderReader, StandardContainerReader, ContainerMetadataExtractor>;
