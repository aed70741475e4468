use std::path::Path;

use tracing::{debug, info_span};

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::depth::BitDepth;
use crate::image_pipeline::pixel::PixelBuffer;
use crate::image_pipeline::raw::{RawImageReader, RawLoaderReader};
use crate::image_pipeline::source::container_reader::{ContainerReader, StandardContainerReader};
use crate::image_pipeline::source::metadata::{
    ContainerMetadataExtractor, MetadataExtractor, MetadataHandle,
};

/// Camera RAW extensions routed to the RAW decoder.
pub const RAW_EXTENSIONS: &[&str] = &[
    "cr2", "cr3", "nef", "nrw", "arw", "dng", "orf", "rw2", "pef", "raf", "raw", "srw",
];

/// Extensions routed to the general still-image decoder.
pub const CONTAINER_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "webp", "heic", "heics", "heif", "heifs", "hif", "avif",
    "bmp", "gif",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Raw,
    Container,
}

impl SourceKind {
    /// Classifies `path` by its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if RAW_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Raw)
        } else if CONTAINER_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Container)
        } else {
            Err(ConversionError::UnsupportedExtension(path.display().to_string()))
        }
    }
}

/// Whether `path` has an extension the loader can decode.
pub fn is_supported_input(path: &Path) -> bool {
    SourceKind::from_path(path).is_ok()
}

/// A decoded source, ready for depth resolution.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub buffer: PixelBuffer,
    pub source_depth: BitDepth,
    pub metadata: MetadataHandle,
    pub kind: SourceKind,
}

/// Infers the significant depth of a decoded buffer.
///
/// A decoder-supplied hint wins. Otherwise 8-bit storage means 8-bit data,
/// and 16-bit storage is classified by its largest sample: up to 1023 is
/// taken as 10-bit, up to 4095 as 12-bit, anything above as 16-bit. All
/// channels take part, alpha included.
///
/// The value-range test cannot tell a 10-bit image in 16-bit storage from a
/// genuinely 16-bit image that happens to be very dark; the latter is
/// reported as 10 or 12-bit.
pub fn detect_source_depth(buffer: &PixelBuffer, hint: Option<BitDepth>) -> BitDepth {
    if let Some(depth) = hint {
        return depth;
    }
    if buffer.element_width() == 1 {
        return BitDepth::Eight;
    }
    match buffer.max_sample() {
        0..=1023 => BitDepth::Ten,
        1024..=4095 => BitDepth::Twelve,
        _ => BitDepth::Sixteen,
    }
}

/// Decodes a source file into a pixel buffer, its depth and its metadata.
pub struct SourceLoader<R: RawImageReader, C: ContainerReader, M: MetadataExtractor> {
    raw_reader: R,
    container_reader: C,
    metadata_extractor: M,
}

impl SourceLoader<RawLoaderReader, StandardContainerReader, ContainerMetadataExtractor> {
    pub fn new(camera_white_balance: bool) -> Self {
        Self {
            raw_reader: RawLoaderReader::new(camera_white_balance),
            container_reader: StandardContainerReader,
            metadata_extractor: ContainerMetadataExtractor,
        }
    }
}

impl<R: RawImageReader, C: ContainerReader, M: MetadataExtractor> SourceLoader<R, C, M> {
    pub fn with_custom(raw_reader: R, container_reader: C, metadata_extractor: M) -> Self {
        Self {
            raw_reader,
            container_reader,
            metadata_extractor,
        }
    }

    pub fn load(&self, path: &Path) -> Result<LoadedImage> {
        let kind = SourceKind::from_path(path)?;

        let (buffer, source_depth) = match kind {
            SourceKind::Raw => {
                let _span = info_span!("decode_raw").entered();
                let bytes = std::fs::read(path)
                    .map_err(|e| ConversionError::LoadError(format!("{}: {}", path.display(), e)))?;
                let buffer = self
                    .raw_reader
                    .read_raw(&bytes)
                    .map_err(|e| load_error(path, e))?;
                // RAW is always developed at full precision.
                (buffer, BitDepth::Sixteen)
            }
            SourceKind::Container => {
                let _span = info_span!("decode_container").entered();
                let decoded = self
                    .container_reader
                    .read_container(path)
                    .map_err(|e| load_error(path, e))?;
                let depth = detect_source_depth(&decoded.buffer, decoded.depth_hint);
                (decoded.buffer, depth)
            }
        };

        debug!(
            "Loaded {}: {}x{}, {} channel(s), source depth {}",
            path.display(),
            buffer.width(),
            buffer.height(),
            buffer.channels(),
            source_depth
        );

        let metadata = {
            let _span = info_span!("extract_metadata").entered();
            self.metadata_extractor.extract(path)
        };

        Ok(LoadedImage {
            buffer,
            source_depth,
            metadata,
            kind,
        })
    }
}

/// Decoder failures surface as load failures for the file.
fn load_error(path: &Path, err: ConversionError) -> ConversionError {
    match err {
        ConversionError::LoadError(_) => err,
        other => ConversionError::LoadError(format!("{}: {}", path.display(), other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::common::error::ErrorKind;
    use crate::image_pipeline::source::container_reader::DecodedImage;

    struct FixedRaw(PixelBuffer);

    impl RawImageReader for FixedRaw {
        fn read_raw(&self, _data: &[u8]) -> Result<PixelBuffer> {
            Ok(self.0.clone())
        }
    }

    struct FixedContainer(Option<DecodedImage>);

    impl ContainerReader for FixedContainer {
        fn read_container(&self, _path: &Path) -> Result<DecodedImage> {
            self.0
                .clone()
                .ok_or_else(|| ConversionError::DecodeError("corrupt".to_string()))
        }
    }

    struct NoMetadata;

    impl MetadataExtractor for NoMetadata {
        fn extract(&self, _path: &Path) -> MetadataHandle {
            MetadataHandle::default()
        }
    }

    fn rgb16(max: u16) -> PixelBuffer {
        PixelBuffer::from_u16(1, 1, 3, vec![0, max / 2, max]).unwrap()
    }

    #[test]
    fn classifies_extensions_case_insensitively() {
        assert_eq!(SourceKind::from_path(Path::new("a.NEF")).unwrap(), SourceKind::Raw);
        assert_eq!(SourceKind::from_path(Path::new("a.Jpeg")).unwrap(), SourceKind::Container);
        assert_eq!(SourceKind::from_path(Path::new("a.gif")).unwrap(), SourceKind::Container);
        let err = SourceKind::from_path(Path::new("a.txt")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedExtension);
        assert!(!is_supported_input(Path::new("noextension")));
    }

    #[test]
    fn sniffs_depth_from_value_range() {
        assert_eq!(detect_source_depth(&rgb16(1023), None), BitDepth::Ten);
        assert_eq!(detect_source_depth(&rgb16(1024), None), BitDepth::Twelve);
        assert_eq!(detect_source_depth(&rgb16(4095), None), BitDepth::Twelve);
        assert_eq!(detect_source_depth(&rgb16(4096), None), BitDepth::Sixteen);
    }

    #[test]
    fn dark_sixteen_bit_image_is_misread_as_ten_bit() {
        // Known limitation of value-range inference.
        assert_eq!(detect_source_depth(&rgb16(800), None), BitDepth::Ten);
    }

    #[test]
    fn hint_and_narrow_storage_skip_sniffing() {
        assert_eq!(
            detect_source_depth(&rgb16(100), Some(BitDepth::Sixteen)),
            BitDepth::Sixteen
        );
        let narrow = PixelBuffer::from_u8(1, 1, 1, vec![3]).unwrap();
        assert_eq!(detect_source_depth(&narrow, None), BitDepth::Eight);
    }

    #[test]
    fn container_source_depth_is_inferred() {
        let loader = SourceLoader::with_custom(
            FixedRaw(rgb16(65535)),
            FixedContainer(Some(DecodedImage {
                buffer: rgb16(4000),
                depth_hint: None,
            })),
            NoMetadata,
        );
        let loaded = loader.load(Path::new("scan.png")).unwrap();
        assert_eq!(loaded.source_depth, BitDepth::Twelve);
        assert_eq!(loaded.kind, SourceKind::Container);
    }

    #[test]
    fn decoder_failure_is_a_load_error() {
        let loader = SourceLoader::with_custom(FixedRaw(rgb16(1)), FixedContainer(None), NoMetadata);
        let err = loader.load(Path::new("broken.jpg")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
    }

    #[test]
    fn raw_source_is_always_sixteen_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.arw");
        std::fs::write(&path, b"sensor bytes").unwrap();

        let loader = SourceLoader::with_custom(FixedRaw(rgb16(200)), FixedContainer(None), NoMetadata);
        let loaded = loader.load(&path).unwrap();
        assert_eq!(loaded.source_depth, BitDepth::Sixteen);
        assert_eq!(loaded.kind, SourceKind::Raw);
    }

    #[test]
    fn missing_raw_file_is_a_load_error() {
        let loader = SourceLoader::with_custom(FixedRaw(rgb16(1)), FixedContainer(None), NoMetadata);
        let err = loader.load(Path::new("/nonexistent/frame.cr2")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
    }
}
