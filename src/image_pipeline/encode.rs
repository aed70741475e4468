//! Output encoding
//!
//! One [`ImageWriter`] per output format behind a format-indexed dispatch
//! table, driven by [`FormatEncoder`].

pub mod format_encoder;
pub mod heif_writer;
pub mod jpeg_writer;
pub mod png_writer;
pub mod tiff_writer;
pub mod types;
pub mod webp_writer;
mod writer;

pub use format_encoder::{EncodeJob, EncodeOutcome, FormatEncoder, normalize_extension};
pub use heif_writer::{HeifCodec, HeifWriter};
pub use jpeg_writer::JpegWriter;
pub use png_writer::PngWriter;
pub use tiff_writer::StandardTiffWriter;
pub use types::{ChromaSubsampling, EncodeParams, EncoderSettings, QualityMode, TiffCompression};
pub use webp_writer::WebpWriter;
pub use writer::ImageWriter;
