//! Cluster record: a coarse index entry over a contiguous run of sub-segments.

use crate::geo_utils::Rect;
use crate::subsegment::SubSegment;
use crate::LatLng;

/// A contiguous run of up to `cluster_size` sub-segments, in emission order,
/// used as a coarse index entry ahead of the sub-segment R-tree.
///
/// `rect` is padded by `2 * buffer_size` per side (twice the sub-segment
/// buffer), giving clusters a wider capture radius than individual
/// sub-segments so the cluster-level search in the two-stage query path
/// rarely comes back empty.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub cluster_id: u32,
    pub start_segment_index: u32,
    pub end_segment_index: u32,
    pub start_sub_segment_index: u32,
    pub end_sub_segment_index: u32,
    pub centroid: LatLng,
    pub rect: Rect,
}

impl Cluster {
    /// Build a cluster from a contiguous run of sub-segments (their emission
    /// order, not sorted by anything else). `run` must be non-empty.
    pub fn from_run(cluster_id: u32, run: &[&SubSegment], buffer_size: f64) -> Self {
        debug_assert!(!run.is_empty(), "cluster run must be non-empty");

        let start_segment_index = run.iter().map(|s| s.segment_index).min().unwrap();
        let end_segment_index = run.iter().map(|s| s.segment_index).max().unwrap();
        let start_sub_segment_index = run.first().unwrap().sub_segment_index;
        let end_sub_segment_index = run.last().unwrap().sub_segment_index;

        let mut endpoints: Vec<LatLng> = Vec::with_capacity(run.len() * 2);
        for sub in run {
            endpoints.push(sub.start);
            endpoints.push(sub.end);
        }

        let sum_lat: f64 = endpoints.iter().map(|p| p.lat).sum();
        let sum_lng: f64 = endpoints.iter().map(|p| p.lng).sum();
        let n = endpoints.len() as f64;
        let centroid = LatLng::new(sum_lat / n, sum_lng / n);

        let rect = Rect::from_points_union_buffered(&endpoints, 2.0 * buffer_size)
            .expect("run is non-empty, so endpoints is non-empty");

        Self {
            cluster_id,
            start_segment_index,
            end_segment_index,
            start_sub_segment_index,
            end_sub_segment_index,
            centroid,
            rect,
        }
    }
}
