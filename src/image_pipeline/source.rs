//! Source loading
//!
//! Dispatches on the input extension to the RAW or container decoder,
//! determines the source's significant bit depth and collects its metadata.

pub mod container_reader;
pub mod loader;
pub mod metadata;

pub use container_reader::{ContainerReader, DecodedImage, StandardContainerReader};
pub use loader::{
    CONTAINER_EXTENSIONS, LoadedImage, RAW_EXTENSIONS, SourceKind, SourceLoader,
    detect_source_depth, is_supported_input,
};
pub use metadata::{ContainerMetadataExtractor, MetadataExtractor, MetadataHandle};
