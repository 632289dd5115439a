use std::fs;
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::layout::StorageLayout;
use crate::storage::segment::{Segment, SegmentHeader, SegmentId};

pub struct SegmentReader;

impl SegmentReader {
    /// Load a whole segment, verifying version and checksum.
    pub fn read(storage: &StorageLayout, segment_id: SegmentId) -> Result<Segment> {
        let path = storage.segment_path(&segment_id);
        let data = fs::read(&path).map_err(|e| {
            Error::new(
                ErrorKind::IndexUnavailable,
                format!("cannot read segment {}: {}", path.display(), e),
            )
        })?;

        if data.len() < SegmentHeader::SIZE {
            return Err(Error::decode(format!("segment {} is truncated", segment_id.0)));
        }
        let header: SegmentHeader = bincode::deserialize(&data[..SegmentHeader::SIZE])?;

        if header.version != SegmentHeader::VERSION {
            return Err(Error::decode(format!(
                "segment {} has version {}, expected {}",
                segment_id.0, header.version, SegmentHeader::VERSION
            )));
        }

        let body = &data[SegmentHeader::SIZE..];
        if body.len() as u64 != header.body_len || crc32fast::hash(body) != header.checksum {
            return Err(Error::decode(format!("segment {} failed checksum", segment_id.0)));
        }

        let raw = lz4_flex::decompress_size_prepended(body)
            .map_err(|e| Error::decode(format!("segment {}: {}", segment_id.0, e)))?;
        let segment: Segment = bincode::deserialize(&raw)?;

        if segment.id != segment_id || segment.doc_count() != header.doc_count {
            return Err(Error::decode(format!("segment {} header does not match body", segment_id.0)));
        }
        Ok(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::Analyzer;
    use crate::core::types::{Document, Field, FieldOptions, FieldValue};
    use crate::storage::segment_writer::SegmentWriter;

    fn segment() -> Segment {
        let mut doc = Document::new();
        doc.add(Field::new("token", FieldValue::Str("00ff".into()), FieldOptions::KEYWORD_STORED));
        doc.add(Field::new("value", FieldValue::Str("hello world".into()), FieldOptions::TEXT));
        Segment::build(&[doc], &Analyzer::english())
    }

    #[test]
    fn written_segment_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();
        let segment = segment();

        let size = SegmentWriter::new(&storage).write(&segment).unwrap();
        assert_eq!(storage.segments_size().unwrap(), size);

        let loaded = SegmentReader::read(&storage, segment.id).unwrap();
        assert_eq!(loaded.documents, segment.documents);
        assert_eq!(loaded.documents[0].get_str("token"), Some("00ff"));
        assert!(loaded.documents[0].get("value").is_none());
        assert_eq!(loaded.index.term_count(), 3);
    }

    #[test]
    fn corrupted_segment_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();
        let segment = segment();
        SegmentWriter::new(&storage).write(&segment).unwrap();

        let path = storage.segment_path(&segment.id);
        let mut data = fs::read(&path).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        fs::write(&path, data).unwrap();

        let err = SegmentReader::read(&storage, segment.id).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
    }
}
