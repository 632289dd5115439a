use crate::reader::snapshot::SegmentSnapshot;

/// Policy for deciding when and how to merge segments
pub trait MergePolicy: Send + Sync {
    /// Check if segments should be merged
    fn should_merge(&self, segments: &[SegmentSnapshot]) -> bool;

    /// Positions of the segments to fold into one, ascending. Empty when nothing
    /// is worth merging.
    fn select_segments_to_merge(&self, segments: &[SegmentSnapshot]) -> Vec<usize>;
}

/// Tiered merge policy: once a commit leaves more than `max_segments_per_tier`
/// segments, the smallest ones are folded together.
#[derive(Debug, Clone)]
pub struct TieredMergePolicy {
    pub max_segments_per_tier: usize,
    pub max_segment_size_mb: usize,
    pub min_segments_to_merge: usize,
    pub max_segments_to_merge: usize,
}

impl Default for TieredMergePolicy {
    fn default() -> Self {
        TieredMergePolicy {
            max_segments_per_tier: 10,
            max_segment_size_mb: 512,
            min_segments_to_merge: 2,
            max_segments_to_merge: 10,
        }
    }
}

impl TieredMergePolicy {
    fn max_merge_bytes(&self) -> usize {
        self.max_segment_size_mb * 1024 * 1024
    }
}

// Live share of the segment's footprint; deleted documents are dropped by a merge
fn live_bytes(view: &SegmentSnapshot) -> usize {
    let docs = view.segment.doc_count() as usize;
    if docs == 0 {
        return 0;
    }
    view.segment.metadata.ram_bytes * view.live_docs() as usize / docs
}

impl MergePolicy for TieredMergePolicy {
    fn should_merge(&self, segments: &[SegmentSnapshot]) -> bool {
        segments.len() > self.max_segments_per_tier
    }

    fn select_segments_to_merge(&self, segments: &[SegmentSnapshot]) -> Vec<usize> {
        let mut by_size: Vec<(usize, usize)> = segments
            .iter()
            .enumerate()
            .map(|(position, view)| (position, live_bytes(view)))
            .collect();
        by_size.sort_by_key(|&(_, size)| size);

        let max_merge_bytes = self.max_merge_bytes();
        let mut selected = Vec::new();
        let mut current_size = 0;

        for (position, size) in by_size {
            // Large segments are left alone
            if size > max_merge_bytes / 2 {
                continue;
            }
            if current_size + size > max_merge_bytes {
                break;
            }

            selected.push(position);
            current_size += size;

            if selected.len() >= self.max_segments_to_merge {
                break;
            }
        }

        if selected.len() < self.min_segments_to_merge.max(2) {
            return Vec::new();
        }
        selected.sort_unstable();
        selected
    }
}
