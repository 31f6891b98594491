//! Index construction: walks an input route, emits sub-segment records,
//! accumulates route metadata, and bulk-loads both R-trees.

use std::collections::HashMap;
use std::time::Instant;

use log::info;

use crate::cluster::Cluster;
use crate::error::{Result, RouteIndexError};
use crate::geo_utils::Rect;
use crate::index::RouteIndex;
use crate::rtree::{build_cluster_rtree, build_sub_segment_rtree, IndexedCluster, IndexedSubSegment};
use crate::subsegment::SubSegment;
use crate::{IndexConfig, LatLng, Route, RouteMetadata};

/// Build a [`RouteIndex`] from `route`.
///
/// Fails if `route` has no segments, or if every segment is empty. Segments
/// with fewer than two points are accepted and contribute no sub-segments —
/// that is not an error.
pub fn build_index(route: &Route, config: IndexConfig) -> Result<RouteIndex> {
    let start = Instant::now();

    if route.is_empty() {
        return Err(RouteIndexError::EmptyRoute {
            reason: "route contains zero segments".to_string(),
        });
    }
    if route.iter().all(|segment| segment.is_empty()) {
        return Err(RouteIndexError::EmptyRoute {
            reason: "every segment in the route is empty".to_string(),
        });
    }

    let distance = config.distance_calculator.clone();
    let mut sub_segments: Vec<SubSegment> = Vec::new();
    let mut segment_lookup: HashMap<u32, Vec<usize>> = HashMap::new();
    let mut all_endpoints: Vec<LatLng> = Vec::new();
    let mut total_length_meters = 0.0;

    for (segment_index, segment) in route.iter().enumerate() {
        let segment_index = segment_index as u32;
        all_endpoints.extend(segment.iter().copied());

        if segment.len() < 2 {
            segment_lookup.entry(segment_index).or_default();
            continue;
        }

        let mut indices_in_segment = Vec::with_capacity(segment.len() - 1);
        for (sub_segment_index, pair) in segment.windows(2).enumerate() {
            let sub = SubSegment::new(
                pair[0],
                pair[1],
                segment_index,
                sub_segment_index as u32,
                config.buffer_size,
                distance.as_ref(),
            );
            total_length_meters += sub.length_meters;
            indices_in_segment.push(sub_segments.len());
            sub_segments.push(sub);
        }
        segment_lookup.insert(segment_index, indices_in_segment);
    }

    let bounds = Rect::from_points_tight(&all_endpoints).unwrap_or(Rect {
        left: 0.0,
        top: 0.0,
        width: 0.0,
        height: 0.0,
    });

    let metadata = RouteMetadata {
        total_segments: route.len() as u32,
        total_sub_segments: sub_segments.len() as u32,
        total_length_meters,
        bounds,
    };

    let sub_segment_entries: Vec<IndexedSubSegment> = sub_segments
        .iter()
        .enumerate()
        .map(|(idx, sub)| IndexedSubSegment { idx, rect: sub.rect })
        .collect();
    let sub_segment_tree = build_sub_segment_rtree(sub_segment_entries);

    let (clusters, cluster_tree) = build_clusters(&sub_segments, &config);

    info!(
        "built route index: {} segments, {} sub-segments, {} clusters in {}ms",
        metadata.total_segments,
        metadata.total_sub_segments,
        clusters.len(),
        start.elapsed().as_millis()
    );

    Ok(RouteIndex::new(
        sub_segments,
        clusters,
        sub_segment_tree,
        cluster_tree,
        segment_lookup,
        metadata,
        config,
    ))
}

/// Partition `sub_segments` into clusters of `config.cluster_size` (emission
/// order, final cluster may be shorter) and bulk-load the cluster R-tree.
///
/// The cluster level is built only when `use_cluster_level` is enabled and
/// the total sub-segment count exceeds `2 * cluster_size`; otherwise both
/// returned collections are empty and queries bypass the cluster stage.
fn build_clusters(
    sub_segments: &[SubSegment],
    config: &IndexConfig,
) -> (Vec<Cluster>, rstar::RTree<IndexedCluster>) {
    let should_cluster =
        config.use_cluster_level && sub_segments.len() > 2 * config.cluster_size;

    if !should_cluster {
        return (Vec::new(), build_cluster_rtree(Vec::new()));
    }

    let mut clusters = Vec::new();
    let mut cluster_id = 0u32;

    for run in sub_segments.chunks(config.cluster_size) {
        let refs: Vec<&SubSegment> = run.iter().collect();
        clusters.push(Cluster::from_run(cluster_id, &refs, config.buffer_size));
        cluster_id += 1;
    }

    let entries: Vec<IndexedCluster> = clusters
        .iter()
        .enumerate()
        .map(|(idx, cluster)| IndexedCluster { idx, rect: cluster.rect })
        .collect();
    let tree = build_cluster_rtree(entries);

    (clusters, tree)
}
