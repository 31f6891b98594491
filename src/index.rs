//! `RouteIndex`: the immutable, queryable spatial index over a route.

use std::collections::HashMap;

use rstar::RTree;

use crate::cluster::Cluster;
use crate::query::{self, QueryOptions};
use crate::rtree::{IndexedCluster, IndexedSubSegment};
use crate::subsegment::SubSegment;
use crate::{IndexConfig, LatLng, RouteMetadata, SegmentPoint};

/// The static, two-level spatial index over a route.
///
/// Built once via [`crate::build_index`] and immutable thereafter. May be
/// queried concurrently from any number of threads with no external
/// synchronization, provided the configured distance function is itself
/// pure (or at least thread-safe).
pub struct RouteIndex {
    pub(crate) sub_segments: Vec<SubSegment>,
    pub(crate) clusters: Vec<Cluster>,
    pub(crate) sub_segment_tree: RTree<IndexedSubSegment>,
    pub(crate) cluster_tree: RTree<IndexedCluster>,
    /// segment_index -> sub-segment indices (into `sub_segments`), in
    /// emission order, for the cluster-expansion step of the query engine.
    pub(crate) segment_lookup: HashMap<u32, Vec<usize>>,
    pub(crate) metadata: RouteMetadata,
    pub(crate) config: IndexConfig,
}

impl RouteIndex {
    pub(crate) fn new(
        sub_segments: Vec<SubSegment>,
        clusters: Vec<Cluster>,
        sub_segment_tree: RTree<IndexedSubSegment>,
        cluster_tree: RTree<IndexedCluster>,
        segment_lookup: HashMap<u32, Vec<usize>>,
        metadata: RouteMetadata,
        config: IndexConfig,
    ) -> Self {
        Self {
            sub_segments,
            clusters,
            sub_segment_tree,
            cluster_tree,
            segment_lookup,
            metadata,
            config,
        }
    }

    /// Find the point on the route nearest to `location`.
    ///
    /// Total for any finite `location`: never panics, never returns an
    /// error. See the crate-level docs for the dispatch and projection
    /// algorithm.
    pub fn find_nearest_point(&self, location: &LatLng, opts: &QueryOptions) -> SegmentPoint {
        query::find_nearest_point(self, location, opts)
    }

    /// Route-level aggregate metadata accumulated at construction.
    pub fn metadata(&self) -> &RouteMetadata {
        &self.metadata
    }

    pub fn sub_segments(&self) -> &[SubSegment] {
        &self.sub_segments
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn len_sub_segments(&self) -> usize {
        self.sub_segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sub_segments.is_empty()
    }

    /// Whether the cluster level is present (built and non-empty).
    pub fn has_cluster_level(&self) -> bool {
        !self.clusters.is_empty()
    }
}
