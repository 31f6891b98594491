//! Static bulk-loaded R-tree wrappers over `rstar`, indexed by position in
//! the owning index's `Vec<SubSegment>` / `Vec<Cluster>` rather than by
//! reference, sidestepping self-referential-struct issues while the records
//! those indices point to live exactly as long as the owning `RouteIndex`.

use rstar::{RTree, RTreeObject, AABB};

use crate::geo_utils::Rect;

/// A sub-segment's buffered rectangle plus its index into the index's
/// `Vec<SubSegment>`.
#[derive(Debug, Clone, Copy)]
pub struct IndexedSubSegment {
    pub idx: usize,
    pub rect: Rect,
}

impl RTreeObject for IndexedSubSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.rect.to_aabb()
    }
}

/// A cluster's padded rectangle plus its index into the index's
/// `Vec<Cluster>`.
#[derive(Debug, Clone, Copy)]
pub struct IndexedCluster {
    pub idx: usize,
    pub rect: Rect,
}

impl RTreeObject for IndexedCluster {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.rect.to_aabb()
    }
}

/// Build a bulk-loaded R-tree of sub-segment envelopes.
pub fn build_sub_segment_rtree(entries: Vec<IndexedSubSegment>) -> RTree<IndexedSubSegment> {
    RTree::bulk_load(entries)
}

/// Build a bulk-loaded R-tree of cluster envelopes.
pub fn build_cluster_rtree(entries: Vec<IndexedCluster>) -> RTree<IndexedCluster> {
    RTree::bulk_load(entries)
}

/// Indices of every sub-segment whose rectangle overlaps `query`.
pub fn search_sub_segments(tree: &RTree<IndexedSubSegment>, query: &Rect) -> Vec<usize> {
    tree.locate_in_envelope_intersecting(&query.to_aabb())
        .map(|entry| entry.idx)
        .collect()
}

/// Indices of every cluster whose rectangle overlaps `query`.
pub fn search_clusters(tree: &RTree<IndexedCluster>, query: &Rect) -> Vec<usize> {
    tree.locate_in_envelope_intersecting(&query.to_aabb())
        .map(|entry| entry.idx)
        .collect()
}
