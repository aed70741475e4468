//! Pipeline configuration types

use crate::image_pipeline::encode::{EncoderSettings, TiffCompression};

/// Configuration shared by every conversion a pipeline runs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// TIFF compression below quality 100
    pub tiff_compression: TiffCompression,
    /// TIFF compression at quality 100
    pub tiff_lossless_compression: TiffCompression,
    /// Predictor value for TIFF compression (typically 2 for horizontal differencing)
    /// Note: Predictor adds processing time, set to None for maximum speed
    pub predictor: Option<u16>,
    /// Whether to validate image dimensions before encoding
    pub validate_dimensions: bool,
    /// Largest accepted width or height when validating
    pub max_dimension: Option<usize>,
    /// Apply the camera's as-shot white balance when developing RAW files
    pub camera_white_balance: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tiff_compression: TiffCompression::DeflateBalanced,
            tiff_lossless_compression: TiffCompression::Lzw,
            predictor: Some(2),
            validate_dimensions: true,
            max_dimension: Some(50000),
            camera_white_balance: true,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            tiff_compression: self.tiff_compression,
            tiff_lossless_compression: self.tiff_lossless_compression,
            predictor: self.predictor,
        }
    }
}

/// Builder for PipelineConfig
#[derive(Default)]
pub struct PipelineConfigBuilder {
    tiff_compression: Option<TiffCompression>,
    tiff_lossless_compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
    validate_dimensions: Option<bool>,
    max_dimension: Option<Option<usize>>,
    camera_white_balance: Option<bool>,
}

impl PipelineConfigBuilder {
    pub fn tiff_compression(mut self, compression: TiffCompression) -> Self {
        self.tiff_compression = Some(compression);
        self
    }

    pub fn tiff_lossless_compression(mut self, compression: TiffCompression) -> Self {
        self.tiff_lossless_compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn max_dimension(mut self, max: Option<usize>) -> Self {
        self.max_dimension = Some(max);
        self
    }

    pub fn camera_white_balance(mut self, enable: bool) -> Self {
        self.camera_white_balance = Some(enable);
        self
    }

    pub fn build(self) -> PipelineConfig {
        let default = PipelineConfig::default();
        PipelineConfig {
            tiff_compression: self.tiff_compression.unwrap_or(default.tiff_compression),
            tiff_lossless_compression: self
                .tiff_lossless_compression
                .unwrap_or(default.tiff_lossless_compression),
            predictor: self.predictor.unwrap_or(default.predictor),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
            max_dimension: self.max_dimension.unwrap_or(default.max_dimension),
            camera_white_balance: self
                .camera_white_balance
                .unwrap_or(default.camera_white_balance),
        }
    }
}
