//! Bit depth model
//!
//! Supported depths, the per-format capability table and the rescaling
//! rules used to move pixel data between depths.

pub mod capability;
pub mod converter;
pub mod types;

pub use capability::{CapabilityTable, FormatCapability, LosslessMode, MetadataSupport};
pub use converter::{rescale, rescale_sample};
pub use types::{BitDepth, OutputFormat};
