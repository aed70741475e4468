use std::sync::Arc;

use tracing::{error, info, info_span, instrument, warn};

use crate::image_pipeline::{
    common::error::{ConversionError, Result},
    common::timing::PipelineTimings,
    conversions::config::PipelineConfig,
    conversions::types::{ConversionRequest, ConversionResult},
    depth::{BitDepth, CapabilityTable, OutputFormat},
    encode::{EncodeJob, EncodeOutcome, FormatEncoder},
    raw::{RawImageReader, RawLoaderReader},
    source::{
        ContainerMetadataExtractor, ContainerReader, MetadataExtractor, SourceLoader,
        StandardContainerReader,
    },
};

/// Loads one source file and writes it in the requested format and depth.
pub struct ConversionPipeline<R: RawImageReader, C: ContainerReader, M: MetadataExtractor> {
    loader: SourceLoader<R, C, M>,
    encoder: FormatEncoder,
    config: PipelineConfig,
}

impl ConversionPipeline<RawLoaderReader, StandardContainerReader, ContainerMetadataExtractor> {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_capabilities(Arc::new(CapabilityTable::standard()), config)
    }

    /// Builds a pipeline around a capability table shared with other pipelines.
    pub fn with_capabilities(capabilities: Arc<CapabilityTable>, config: PipelineConfig) -> Self {
        Self {
            loader: SourceLoader::new(config.camera_white_balance),
            encoder: FormatEncoder::new(capabilities, config.encoder_settings()),
            config,
        }
    }
}

impl<R: RawImageReader, C: ContainerReader, M: MetadataExtractor> ConversionPipeline<R, C, M> {
    pub fn with_custom(
        loader: SourceLoader<R, C, M>,
        encoder: FormatEncoder,
        config: PipelineConfig,
    ) -> Self {
        Self {
            loader,
            encoder,
            config,
        }
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions(width, height));
        }

        if let Some(max) = self.config.max_dimension {
            if width > max || height > max {
                return Err(ConversionError::InvalidDimensions(width, height));
            }
        }

        Ok(())
    }

    /// Picks the output depth, falling back to 8-bit when the request asks
    /// for more precision than the source has.
    fn resolve_depth(
        &self,
        request: &ConversionRequest,
        source_depth: BitDepth,
        warnings: &mut Vec<String>,
    ) -> Result<BitDepth> {
        let _span = info_span!("resolve_depth", format = %request.format).entered();

        match self
            .encoder
            .capabilities()
            .clamp_request(request.format, request.bit_depth, source_depth)
        {
            Err(err @ ConversionError::DepthExceedsSource { .. }) => {
                let message = format!("{}; writing 8-bit output instead", err);
                warn!("{}", message);
                warnings.push(message);
                Ok(BitDepth::Eight)
            }
            other => other,
        }
    }

    /// Runs the conversion and propagates the first terminal error.
    pub fn try_convert(
        &self,
        request: &ConversionRequest,
        timings: &mut PipelineTimings,
    ) -> Result<EncodeOutcome> {
        {
            let _span = info_span!("validate_request").entered();
            request.validate()?;
        }

        let loaded = {
            let _span = info_span!("load_source").entered();
            timings.time("load", || self.loader.load(&request.input_path))?
        };

        {
            let _span = info_span!(
                "validate_dimensions",
                width = loaded.buffer.width(),
                height = loaded.buffer.height()
            )
            .entered();
            self.validate_dimensions(loaded.buffer.width(), loaded.buffer.height())?;
        }

        let mut warnings = Vec::new();
        let depth = self.resolve_depth(request, loaded.source_depth, &mut warnings)?;

        let job = EncodeJob {
            format: request.format,
            source_depth: loaded.source_depth,
            depth,
            quality: request.quality,
            metadata: &loaded.metadata,
            output_path: &request.output_path,
        };

        let mut outcome = self.encoder.encode(loaded.buffer, &job, timings)?;
        warnings.append(&mut outcome.warnings);
        outcome.warnings = warnings;
        Ok(outcome)
    }

    /// Converts one file. Never panics on bad input and never returns an
    /// error; failures are described by the result.
    #[instrument(skip(self, request), fields(
        input = %request.input_path.display(),
        format = %request.format,
    ))]
    pub fn convert(&self, request: &ConversionRequest) -> ConversionResult {
        self.convert_with_timings(request).0
    }

    pub fn convert_with_timings(
        &self,
        request: &ConversionRequest,
    ) -> (ConversionResult, PipelineTimings) {
        info!("Starting conversion");
        let mut timings = PipelineTimings::new();

        let result = match self.try_convert(request, &mut timings) {
            Ok(outcome) => {
                info!(
                    output = %outcome.output_path.display(),
                    depth = %outcome.depth,
                    bytes = outcome.bytes_written,
                    "Conversion complete"
                );
                ConversionResult::succeeded(outcome)
            }
            Err(e) => {
                error!("Conversion failed: {}", e);
                ConversionResult::failed(&e)
            }
        };

        timings.log_summary();
        (result, timings)
    }

    /// Names of every output format, in capability table order.
    pub fn supported_output_formats(&self) -> Vec<&'static str> {
        self.encoder.capabilities().supported_output_formats()
    }

    pub fn get_max_depth(&self, format: OutputFormat) -> u32 {
        self.encoder.capabilities().get_max_depth(format)
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        self.encoder.capabilities()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}
