use std::fs::{self, File};
use std::io::Write;
use crc32fast::Hasher;
use crate::core::error::Result;
use crate::storage::layout::StorageLayout;
use crate::storage::segment::{Segment, SegmentHeader};

pub struct SegmentWriter<'a> {
    storage: &'a StorageLayout,
}

impl<'a> SegmentWriter<'a> {
    pub fn new(storage: &'a StorageLayout) -> Self {
        SegmentWriter { storage }
    }

    // [ HEADER (version, doc_count, checksum, body_len) ] <- byte 0
    // [ LZ4 BLOCK (size-prepended bincode of the segment) ]
    //
    // Written to a temporary name and renamed, so a crash never leaves a torn
    // segment under its final name.
    pub fn write(&self, segment: &Segment) -> Result<u64> {
        let data = bincode::serialize(segment)?;
        let body = lz4_flex::compress_prepend_size(&data);

        let mut hasher = Hasher::new();
        hasher.update(&body);

        let mut header = SegmentHeader::new(segment.doc_count());
        header.checksum = hasher.finalize();
        header.body_len = body.len() as u64;
        let header_data = bincode::serialize(&header)?;

        let path = self.storage.segment_path(&segment.id);
        let tmp_path = path.with_extension("seg.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&header_data)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        Ok((header_data.len() + body.len()) as u64)
    }
}
