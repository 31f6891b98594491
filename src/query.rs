//! The query engine: `find_nearest_point` and its supporting dispatch,
//! two-stage cluster/segment narrowing, direct fallback, and point-to-segment
//! projection.

use std::cmp::Ordering;
use std::collections::HashSet;

use log::{debug, log_enabled, Level};

use crate::geo_utils::{approx_planar_distance, search_rect};
use crate::index::RouteIndex;
use crate::subsegment::SubSegment;
use crate::{DistanceFn, LatLng, SegmentPoint};

/// Converts a meter distance to an approximate degree-scale radius (one
/// degree is roughly 111km at the equator; this crate uses the coarser
/// 100km approximation the reference behavior is built on).
const METERS_PER_DEGREE_APPROX: f64 = 100_000.0;

/// Safety margin applied to the degree-scale pruning bound in the two-stage
/// path's second candidate pass.
const PRUNE_SLACK: f64 = 1.5;

/// A result within this distance is accepted immediately without widening
/// the search radius.
const NEAR_HIT_THRESHOLD_METERS: f64 = 10.0;

/// Query-time options for [`RouteIndex::find_nearest_point`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryOptions {
    /// Seed radius (degrees) for both the cluster and direct searches.
    pub initial_search_radius_degrees: f64,
    /// Hard ceiling (degrees) on radius expansion in the direct path and the
    /// two-stage path's widening step.
    pub max_search_radius_degrees: f64,
    /// Stage-1 candidate cap.
    pub max_initial_segments_to_check: usize,
    /// Combined stage-1 + stage-2 candidate cap.
    pub max_total_segments_to_check: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            initial_search_radius_degrees: 0.005,
            max_search_radius_degrees: 0.05,
            max_initial_segments_to_check: 100,
            max_total_segments_to_check: 400,
        }
    }
}

impl QueryOptions {
    pub fn with_initial_search_radius_degrees(mut self, value: f64) -> Self {
        self.initial_search_radius_degrees = value;
        self
    }

    pub fn with_max_search_radius_degrees(mut self, value: f64) -> Self {
        self.max_search_radius_degrees = value;
        self
    }

    pub fn with_max_initial_segments_to_check(mut self, value: usize) -> Self {
        self.max_initial_segments_to_check = value;
        self
    }

    pub fn with_max_total_segments_to_check(mut self, value: usize) -> Self {
        self.max_total_segments_to_check = value;
        self
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn sort_by_planar_distance(indices: &mut [usize], sub_segments: &[SubSegment], target: &LatLng) {
    indices.sort_by(|&a, &b| {
        let da = approx_planar_distance(&sub_segments[a].midpoint, target);
        let db = approx_planar_distance(&sub_segments[b].midpoint, target);
        cmp_f64(da, db)
    });
}

/// Entry point for [`RouteIndex::find_nearest_point`].
///
/// Dispatches to the two-stage path when the cluster level exists and is
/// non-empty and the route is large enough to benefit; otherwise falls
/// through to the direct path.
pub fn find_nearest_point(index: &RouteIndex, location: &LatLng, opts: &QueryOptions) -> SegmentPoint {
    if index.is_empty() {
        return SegmentPoint::none(*location);
    }

    let total = index.len_sub_segments();
    if total <= opts.max_initial_segments_to_check || !index.has_cluster_level() {
        direct_path(index, location, opts)
    } else {
        two_stage_path(index, location, opts)
    }
}

/// Seed-and-expand search directly against the sub-segment R-tree, falling
/// back to a global sort when no radius within the ceiling finds anything
/// (guarantees termination on pathological inputs, e.g. a target far from a
/// tiny route).
fn direct_path(index: &RouteIndex, location: &LatLng, opts: &QueryOptions) -> SegmentPoint {
    let mut radius = opts.initial_search_radius_degrees;
    let mut candidates;

    loop {
        let rect = search_rect(location, radius);
        candidates = crate::rtree::search_sub_segments(&index.sub_segment_tree, &rect);
        if !candidates.is_empty() || radius >= opts.max_search_radius_degrees {
            break;
        }
        radius = (radius * 2.0).min(opts.max_search_radius_degrees);
        if log_enabled!(Level::Debug) {
            debug!("direct path: widening radius to {radius}");
        }
    }

    if candidates.is_empty() {
        candidates = (0..index.len_sub_segments()).collect();
    }

    sort_by_planar_distance(&mut candidates, &index.sub_segments, location);
    candidates.truncate(opts.max_total_segments_to_check);

    project_best(index, location, &candidates)
}

/// Cluster lookup, candidate collection by outer-segment membership, a
/// first projection pass, early exit on a near-zero hit, adaptive radius
/// widening against the sub-segment tree, pruning, and a second projection
/// pass.
fn two_stage_path(index: &RouteIndex, location: &LatLng, opts: &QueryOptions) -> SegmentPoint {
    let cluster_indices = select_clusters(index, location, opts);
    let stage1 = collect_stage1_candidates(index, location, opts, &cluster_indices);

    let best = project_best(index, location, &stage1);
    if best.distance_meters < NEAR_HIT_THRESHOLD_METERS {
        return best;
    }

    let expanded_radius = (2.0 * opts.initial_search_radius_degrees)
        .max(best.distance_meters / METERS_PER_DEGREE_APPROX + 2.0 * index.config.buffer_size)
        .min(opts.max_search_radius_degrees);

    if log_enabled!(Level::Debug) {
        debug!("two-stage path: widening to {expanded_radius} after best {}m", best.distance_meters);
    }

    let widened_rect = search_rect(location, expanded_radius);
    let raw_additions = crate::rtree::search_sub_segments(&index.sub_segment_tree, &widened_rect);

    let stage1_set: HashSet<usize> = stage1.iter().copied().collect();
    let mut additions: Vec<usize> = raw_additions
        .into_iter()
        .filter(|idx| !stage1_set.contains(idx))
        .collect();

    sort_by_planar_distance(&mut additions, &index.sub_segments, location);

    let remaining_budget = opts.max_total_segments_to_check.saturating_sub(stage1.len());
    let bound = best.distance_meters / METERS_PER_DEGREE_APPROX + index.config.buffer_size;
    let threshold = PRUNE_SLACK * bound * bound;

    let mut accepted: Vec<usize> = Vec::new();
    for idx in additions {
        if accepted.len() >= remaining_budget {
            break;
        }
        let d = approx_planar_distance(&index.sub_segments[idx].midpoint, location);
        if d >= threshold {
            // sorted ascending: every subsequent candidate is farther still
            break;
        }
        accepted.push(idx);
    }

    if accepted.is_empty() {
        return best;
    }

    let second_best = project_best(index, location, &accepted);
    if second_best.distance_meters < best.distance_meters {
        second_best
    } else {
        best
    }
}

/// Select the clusters to draw stage-1 candidates from: an adaptive radius
/// search of the cluster R-tree, falling back to the five nearest clusters
/// by centroid when even a 4x-widened search comes back empty (as long as
/// any cluster exists at all).
fn select_clusters(index: &RouteIndex, location: &LatLng, opts: &QueryOptions) -> Vec<usize> {
    let mut radius = opts.initial_search_radius_degrees;
    let mut clusters;

    loop {
        let rect = search_rect(location, radius);
        clusters = crate::rtree::search_clusters(&index.cluster_tree, &rect);
        if !clusters.is_empty() {
            break;
        }
        let next = radius * 2.0;
        if next > 4.0 * opts.initial_search_radius_degrees {
            break;
        }
        radius = next;
    }

    if clusters.is_empty() && !index.clusters.is_empty() {
        let mut all: Vec<usize> = (0..index.clusters.len()).collect();
        all.sort_by(|&a, &b| {
            let da = approx_planar_distance(&index.clusters[a].centroid, location);
            let db = approx_planar_distance(&index.clusters[b].centroid, location);
            cmp_f64(da, db)
        });
        all.truncate(5);
        clusters = all;
    }

    clusters
}

/// Collect stage-1 candidates by outer-segment membership: for each
/// selected cluster, every sub-segment of every outer segment whose index
/// falls in `[start_segment_index, end_segment_index]` is unioned in.
///
/// This collects by outer-segment membership, not by the cluster's own
/// sub-segment index range — so a cluster can contribute more than
/// `cluster_size` sub-segments when its outer segments are longer than the
/// cluster's slice. This is preserved intentionally (narrowing to the exact
/// index range would reduce candidate counts and could silently change
/// query results); whether the original behavior this mirrors is
/// intentional or an oversight could not be established, but the contract
/// here is coverage, not economy.
fn collect_stage1_candidates(
    index: &RouteIndex,
    location: &LatLng,
    opts: &QueryOptions,
    cluster_indices: &[usize],
) -> Vec<usize> {
    let mut seen: HashSet<usize> = HashSet::new();

    'clusters: for &cluster_idx in cluster_indices {
        let cluster = &index.clusters[cluster_idx];
        for segment_index in cluster.start_segment_index..=cluster.end_segment_index {
            if let Some(sub_indices) = index.segment_lookup.get(&segment_index) {
                for &idx in sub_indices {
                    seen.insert(idx);
                    if seen.len() >= opts.max_initial_segments_to_check {
                        break 'clusters;
                    }
                }
            }
        }
    }

    let mut candidates: Vec<usize> = seen.into_iter().collect();
    sort_by_planar_distance(&mut candidates, &index.sub_segments, location);
    candidates.truncate(opts.max_initial_segments_to_check);
    candidates
}

/// Project `location` onto every sub-segment named by `indices` and return
/// the closest resulting point. Returns the defensive "none" default if
/// `indices` is empty.
fn project_best(index: &RouteIndex, location: &LatLng, indices: &[usize]) -> SegmentPoint {
    let distance_fn = &index.config.distance_calculator;
    let mut best: Option<SegmentPoint> = None;

    for &idx in indices {
        let candidate = project_onto_sub_segment(&index.sub_segments[idx], location, distance_fn);
        best = match best {
            None => Some(candidate),
            Some(current) if candidate.distance_meters < current.distance_meters => Some(candidate),
            Some(current) => Some(current),
        };
    }

    best.unwrap_or_else(|| SegmentPoint::none(*location))
}

/// Project `target` onto the line through `sub.start`/`sub.end` in an
/// equirectangular tangent frame local to `target`'s latitude.
fn project_onto_sub_segment(sub: &SubSegment, target: &LatLng, distance_fn: &DistanceFn) -> SegmentPoint {
    let factor = target.lat.to_radians().cos();

    let sx = sub.start.lng * factor;
    let sy = sub.start.lat;
    let ex = sub.end.lng * factor;
    let ey = sub.end.lat;
    let px = target.lng * factor;
    let py = target.lat;

    let dx = ex - sx;
    let dy = ey - sy;
    let length_sq = dx * dx + dy * dy;

    if length_sq < 1e-10 {
        let distance = distance_fn(target, &sub.start);
        return SegmentPoint {
            point: sub.start,
            distance_meters: distance,
            segment_index: sub.segment_index as i64,
            sub_segment_index: sub.sub_segment_index as i64,
        };
    }

    let t = (((px - sx) * dx + (py - sy) * dy) / length_sq).clamp(0.0, 1.0);
    let proj_x = sx + t * dx;
    let proj_y = sy + t * dy;
    let projected = LatLng::new(proj_y, proj_x / factor);
    let distance = distance_fn(target, &projected);

    SegmentPoint {
        point: projected,
        distance_meters: distance,
        segment_index: sub.segment_index as i64,
        sub_segment_index: sub.sub_segment_index as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_index;
    use crate::geo_utils::haversine_distance;
    use crate::{IndexConfig, Route};

    fn p(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng)
    }

    fn equatorial_route() -> Route {
        vec![vec![p(0.0, 0.0), p(0.0, 1.0), p(0.0, 2.0), p(0.0, 3.0)]]
    }

    #[test]
    fn test_straight_equatorial_line() {
        let index = build_index(&equatorial_route(), IndexConfig::default()).unwrap();
        let result = index.find_nearest_point(&p(0.0, 1.5), &QueryOptions::default());
        assert!(result.distance_meters < 1.0);
        assert!((result.point.lat - 0.0).abs() < 0.001);
        assert!((result.point.lng - 1.5).abs() < 0.001);
        assert_eq!(result.segment_index, 0);
    }

    #[test]
    fn test_off_axis_point() {
        let index = build_index(&equatorial_route(), IndexConfig::default()).unwrap();
        let result = index.find_nearest_point(&p(0.1, 1.5), &QueryOptions::default());
        assert!((result.point.lat - 0.0).abs() < 0.001);
        assert!((result.point.lng - 1.5).abs() < 0.001);
        assert!((result.distance_meters - 11_100.0).abs() < 500.0);
    }

    #[test]
    fn test_rectangle_edge_projection() {
        let route: Route = vec![vec![
            p(0.0, 0.0),
            p(0.0, 1.0),
            p(1.0, 1.0),
            p(1.0, 0.0),
            p(0.0, 0.0),
        ]];
        let index = build_index(&route, IndexConfig::default()).unwrap();
        let result = index.find_nearest_point(&p(0.5, -0.5), &QueryOptions::default());
        // target sits due west of the square at mid-height; nearest point is
        // the midpoint of the west edge (lng = 0), not a corner.
        assert!((result.point.lat - 0.5).abs() < 0.01);
        assert!((result.point.lng - 0.0).abs() < 0.01);
    }

    #[test]
    fn test_rectangle_corner_projection() {
        let route: Route = vec![vec![
            p(0.0, 0.0),
            p(0.0, 1.0),
            p(1.0, 1.0),
            p(1.0, 0.0),
            p(0.0, 0.0),
        ]];
        let index = build_index(&route, IndexConfig::default()).unwrap();
        let result = index.find_nearest_point(&p(1.1, 1.1), &QueryOptions::default());
        assert!((result.point.lat - 1.0).abs() < 0.01);
        assert!((result.point.lng - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_symmetry() {
        let route: Route = vec![vec![p(0.0, -1.0), p(0.0, 1.0)]];
        let index = build_index(&route, IndexConfig::default()).unwrap();
        let above = index.find_nearest_point(&p(0.5, 0.0), &QueryOptions::default());
        let below = index.find_nearest_point(&p(-0.5, 0.0), &QueryOptions::default());
        assert!((above.point.lat - below.point.lat).abs() < 0.01);
        assert!((above.point.lng - below.point.lng).abs() < 0.01);
        assert!((above.distance_meters - below.distance_meters).abs() < 1.0);
    }

    #[test]
    fn test_exact_vertex_query() {
        let route = equatorial_route();
        let index = build_index(&route, IndexConfig::default()).unwrap();
        let vertex = p(0.0, 2.0);
        let result = index.find_nearest_point(&vertex, &QueryOptions::default());
        assert!(result.distance_meters < 0.1);
        assert!((result.point.lat - vertex.lat).abs() < 0.01);
        assert!((result.point.lng - vertex.lng).abs() < 0.01);
    }

    #[test]
    fn test_budget_monotonicity_does_not_increase_distance() {
        let route = sparse_large_route();
        let index = build_index(&route, IndexConfig::default()).unwrap();
        let target = p(0.3, 0.55);

        let small_budget = QueryOptions::default().with_max_total_segments_to_check(20);
        let large_budget = QueryOptions::default().with_max_total_segments_to_check(400);

        let small = index.find_nearest_point(&target, &small_budget);
        let large = index.find_nearest_point(&target, &large_budget);

        assert!(large.distance_meters <= small.distance_meters + 1e-6);
    }

    #[test]
    fn test_never_worse_than_any_vertex() {
        let route = sparse_large_route();
        let index = build_index(&route, IndexConfig::default()).unwrap();
        let target = p(0.12, 0.34);
        let result = index.find_nearest_point(&target, &QueryOptions::default());

        for segment in &route {
            for vertex in segment {
                assert!(result.distance_meters <= haversine_distance(&target, vertex) + 1e-6);
            }
        }
    }

    #[test]
    fn test_projection_parameter_within_sub_segment_bounds() {
        let route = equatorial_route();
        let index = build_index(&route, IndexConfig::default()).unwrap();
        let target = p(0.2, 1.3);
        let result = index.find_nearest_point(&target, &QueryOptions::default());

        let sub = index
            .sub_segments()
            .iter()
            .find(|s| {
                s.segment_index == result.segment_index as u32
                    && s.sub_segment_index == result.sub_segment_index as u32
            })
            .unwrap();

        let lo_lng = sub.start.lng.min(sub.end.lng);
        let hi_lng = sub.start.lng.max(sub.end.lng);
        assert!(result.point.lng >= lo_lng - 1e-6 && result.point.lng <= hi_lng + 1e-6);
    }

    #[test]
    fn test_large_route_two_stage_agrees_with_brute_force() {
        let route = deterministic_route(150);
        let index = build_index(&route, IndexConfig::default()).unwrap();
        assert!(index.has_cluster_level());

        for i in 0..20u64 {
            let target = lcg_point(9000 + i, 0.0, 2.0);
            let indexed = index.find_nearest_point(&target, &QueryOptions::default());
            let brute = brute_force_nearest(&route, &target);
            assert!(
                (indexed.distance_meters - brute).abs() < 0.1,
                "mismatch at target {:?}: indexed={} brute={}",
                target,
                indexed.distance_meters,
                brute
            );
        }
    }

    fn sparse_large_route() -> Route {
        let mut points = Vec::new();
        for i in 0..500 {
            points.push(p(0.0, i as f64 * 0.002));
        }
        vec![points]
    }

    // Small linear-congruential generator so the "large route agreement"
    // scenario is reproducible without a `rand` dependency (test-only).
    fn lcg_next(seed: u64) -> u64 {
        seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407)
    }

    fn lcg_point(seed: u64, lat_base: f64, lng_span: f64) -> LatLng {
        let s1 = lcg_next(seed);
        let s2 = lcg_next(s1);
        let lat = lat_base + ((s1 % 1000) as f64 / 1000.0 - 0.5) * 0.5;
        let lng = (s2 % 10000) as f64 / 10000.0 * lng_span;
        p(lat, lng)
    }

    fn deterministic_route(vertex_count: usize) -> Route {
        let mut seed = 42u64;
        let mut points = Vec::with_capacity(vertex_count);
        for i in 0..vertex_count {
            seed = lcg_next(seed);
            let lat = (seed % 1000) as f64 / 1000.0 * 1.0;
            let lng = i as f64 * 0.02;
            points.push(p(lat, lng));
        }
        vec![points]
    }

    fn brute_force_nearest(route: &Route, target: &LatLng) -> f64 {
        let mut best = f64::INFINITY;
        for segment in route {
            for pair in segment.windows(2) {
                let candidate = project_pair(pair[0], pair[1], target);
                if candidate < best {
                    best = candidate;
                }
            }
        }
        best
    }

    fn project_pair(start: LatLng, end: LatLng, target: &LatLng) -> f64 {
        let factor = target.lat.to_radians().cos();
        let sx = start.lng * factor;
        let sy = start.lat;
        let ex = end.lng * factor;
        let ey = end.lat;
        let px = target.lng * factor;
        let py = target.lat;
        let dx = ex - sx;
        let dy = ey - sy;
        let length_sq = dx * dx + dy * dy;
        if length_sq < 1e-10 {
            return haversine_distance(target, &start);
        }
        let t = (((px - sx) * dx + (py - sy) * dy) / length_sq).clamp(0.0, 1.0);
        let proj = LatLng::new(sy + t * dy, (sx + t * dx) / factor);
        haversine_distance(target, &proj)
    }
}
