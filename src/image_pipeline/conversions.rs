//! Pipeline conversions module
//!
//! Orchestrates one conversion: load, validate, resolve the output depth,
//! then hand the buffer to the format encoder.

mod config;
mod pipeline;
mod types;


pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use pipeline::ConversionPipeline;
pub use types::{ConversionRequest, ConversionResult, DEFAULT_QUALITY};
