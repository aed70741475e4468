//! RAW image reading module
//!
//! Decodes camera RAW files into 16-bit linear RGB pixel buffers.

mod rawloader_reader;
mod reader;
pub mod types;

pub use rawloader_reader::RawLoaderReader;
pub use reader::RawImageReader;
pub use types::{CfaPattern, RawImageData};
