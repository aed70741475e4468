use std::io::Write;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::encode::types::EncodeParams;
use crate::image_pipeline::pixel::{PreparedImage, SampleLayout};
use crate::image_pipeline::source::MetadataHandle;

/// One encoder backend.
///
/// `metadata` holds only the kinds the format can carry; writers embed
/// whatever is present.
pub trait ImageWriter: Send + Sync {
    /// How the backend wants its samples laid out.
    fn layout(&self) -> SampleLayout {
        SampleLayout::default()
    }

    fn write_image(
        &self,
        image: &PreparedImage,
        params: &EncodeParams,
        metadata: &MetadataHandle,
        output: &mut dyn Write,
    ) -> Result<()>;
}
