//! Metadata extraction
//!
//! Pulls EXIF, XMP and IPTC blobs out of a source file so they can be
//! re-embedded in the output. The blobs are never interpreted beyond what
//! is needed to find their boundaries.

use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use exif::{In, Tag};
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};

/// Largest EXIF payload kept verbatim. A single JPEG APP1 segment tops out
/// just below 64 KiB.
pub const MAX_EXIF_BYTES: usize = 65_000;

const XMP_OPEN: &[u8] = b"<x:xmpmeta";
const XMP_CLOSE: &[u8] = b"</x:xmpmeta>";

/// IPTC-IIM record 2 always opens with the record version dataset (2:00),
/// which has a two-byte payload.
const IPTC_START: &[u8] = &[0x1C, 0x02, 0x00, 0x00, 0x02];

/// Raw metadata blobs found in a source file.
///
/// `exif` is a bare TIFF structure (`II*\0` / `MM\0*`), `xmp` the XML packet
/// and `iptc` a run of IIM datasets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataHandle {
    pub exif: Option<Vec<u8>>,
    pub xmp: Option<Vec<u8>>,
    pub iptc: Option<Vec<u8>>,
}

impl MetadataHandle {
    pub fn is_empty(&self) -> bool {
        self.exif.is_none() && self.xmp.is_none() && self.iptc.is_none()
    }
}

pub trait MetadataExtractor: Send + Sync {
    /// Never fails: anything that cannot be read is simply absent.
    fn extract(&self, path: &Path) -> MetadataHandle;
}

/// Extracts metadata from any container kamadak-exif understands (JPEG,
/// TIFF and TIFF-based RAW, PNG, WebP, HEIF) and scans the file bytes for
/// XMP and IPTC payloads.
pub struct ContainerMetadataExtractor;

impl MetadataExtractor for ContainerMetadataExtractor {
    fn extract(&self, path: &Path) -> MetadataHandle {
        let exif = match read_exif(path) {
            Ok(exif) => exif,
            Err(e) => {
                debug!("No EXIF in {}: {}", path.display(), e);
                None
            }
        };

        let (xmp, iptc) = match std::fs::read(path) {
            Ok(bytes) => (find_xmp(&bytes), find_iptc(&bytes)),
            Err(e) => {
                debug!("Could not scan {} for XMP/IPTC: {}", path.display(), e);
                (None, None)
            }
        };

        let handle = MetadataHandle { exif, xmp, iptc };
        debug!(
            exif = handle.exif.as_ref().map(Vec::len),
            xmp = handle.xmp.as_ref().map(Vec::len),
            iptc = handle.iptc.as_ref().map(Vec::len),
            "Extracted metadata"
        );
        handle
    }
}

fn read_exif(path: &Path) -> Result<Option<Vec<u8>>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| ConversionError::DecodeError(e.to_string()))?;

    // TIFF-based containers hand back the whole file as the EXIF buffer.
    if exif.buf().len() <= MAX_EXIF_BYTES && !is_tiff_based(path) {
        return Ok(Some(exif.buf().to_vec()));
    }

    let mut writer = exif::experimental::Writer::new();
    for field in exif
        .fields()
        .filter(|f| f.ifd_num == In::PRIMARY && !is_structural(f.tag))
    {
        writer.push_field(field);
    }
    let mut out = Cursor::new(Vec::new());
    writer
        .write(&mut out, exif.little_endian())
        .map_err(|e| ConversionError::DecodeError(e.to_string()))?;
    Ok(Some(out.into_inner()))
}

fn is_tiff_based(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    ext == "tif" || ext == "tiff" || super::loader::RAW_EXTENSIONS.contains(&ext.as_str())
}

/// Tags that describe file layout rather than the photo. The writer
/// recomputes IFD pointers itself, and offsets into the source file are
/// meaningless in the output.
fn is_structural(tag: Tag) -> bool {
    [
        Tag::ExifIFDPointer,
        Tag::GPSInfoIFDPointer,
        Tag::InteropIFDPointer,
        Tag::StripOffsets,
        Tag::StripByteCounts,
        Tag::TileOffsets,
        Tag::TileByteCounts,
        Tag::JPEGInterchangeFormat,
        Tag::JPEGInterchangeFormatLength,
        Tag::MakerNote,
    ]
    .contains(&tag)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// The first `<x:xmpmeta ...>...</x:xmpmeta>` envelope in the file.
pub fn find_xmp(bytes: &[u8]) -> Option<Vec<u8>> {
    let start = find(bytes, XMP_OPEN, 0)?;
    let end = find(bytes, XMP_CLOSE, start)? + XMP_CLOSE.len();
    Some(bytes[start..end].to_vec())
}

/// The first run of IPTC-IIM record 2 datasets in the file.
pub fn find_iptc(bytes: &[u8]) -> Option<Vec<u8>> {
    let start = find(bytes, IPTC_START, 0)?;
    let mut pos = start;

    // Dataset: 0x1C, record, dataset number, 16-bit big-endian length, data.
    while bytes.len() >= pos + 5 && bytes[pos] == 0x1C && bytes[pos + 1] == 0x02 {
        let size = u16::from_be_bytes([bytes[pos + 3], bytes[pos + 4]]) as usize;
        // Extended datasets (high bit set) do not occur in record 2.
        if size & 0x8000 != 0 || pos + 5 + size > bytes.len() {
            break;
        }
        pos += 5 + size;
    }

    (pos > start).then(|| bytes[start..pos].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xmp_envelope_is_extracted() {
        let mut file = b"\xFF\xD8junk".to_vec();
        file.extend_from_slice(b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"><rdf:RDF/></x:xmpmeta>");
        file.extend_from_slice(b"trailing");

        let xmp = find_xmp(&file).unwrap();
        assert!(xmp.starts_with(b"<x:xmpmeta"));
        assert!(xmp.ends_with(b"</x:xmpmeta>"));
    }

    #[test]
    fn unterminated_xmp_is_ignored() {
        assert_eq!(find_xmp(b"<x:xmpmeta never closed"), None);
    }

    #[test]
    fn iptc_datasets_are_walked() {
        let mut file = vec![0xAA, 0xBB];
        // 2:00 record version
        file.extend_from_slice(&[0x1C, 0x02, 0x00, 0x00, 0x02, 0x00, 0x04]);
        // 2:05 object name "Sky"
        file.extend_from_slice(&[0x1C, 0x02, 0x05, 0x00, 0x03, b'S', b'k', b'y']);
        // Unrelated bytes after the record
        file.extend_from_slice(&[0x00, 0x1C]);

        let iptc = find_iptc(&file).unwrap();
        assert_eq!(iptc.len(), 7 + 8);
        assert_eq!(&iptc[iptc.len() - 3..], b"Sky");
    }

    #[test]
    fn missing_file_gives_empty_handle() {
        let handle = ContainerMetadataExtractor.extract(Path::new("/nonexistent/photo.jpg"));
        assert!(handle.is_empty());
    }
}
