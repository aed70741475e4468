//! Format-agnostic pixel storage and the sample-preserving transforms that
//! run on it before encoding.

pub mod alpha;
pub mod layout;
pub mod types;

pub use alpha::composite_over_white;
pub use layout::{
    ByteOrder, GrayHandling, PreparedImage, PreparedSamples, SampleLayout, WideSamples, prepare,
};
pub use types::{PixelBuffer, PixelData};
