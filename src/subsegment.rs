//! Sub-segment record: the atomic unit of the route index.

use crate::geo_utils::Rect;
use crate::LatLng;

/// A single straight edge between two consecutive vertices of an outer
/// segment.
///
/// `length_meters` is computed once at construction from the caller-supplied
/// distance function and never recomputed. Zero-length sub-segments
/// (coincident endpoints) are legal; their `rect` degenerates to the buffer
/// square.
///
/// Sub-segments spanning the ±180° antimeridian are not split; their `rect`
/// can spread across nearly the full longitude range, defeating the R-tree
/// for that sub-segment. This is a known limitation, not handled here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubSegment {
    pub start: LatLng,
    pub end: LatLng,
    pub segment_index: u32,
    pub sub_segment_index: u32,
    pub length_meters: f64,
    pub rect: Rect,
    pub midpoint: LatLng,
}

impl SubSegment {
    /// Build a sub-segment, eagerly computing `length_meters`, `rect`
    /// (buffered by `buffer_size` on all sides) and `midpoint`.
    pub fn new(
        start: LatLng,
        end: LatLng,
        segment_index: u32,
        sub_segment_index: u32,
        buffer_size: f64,
        distance: &dyn Fn(&LatLng, &LatLng) -> f64,
    ) -> Self {
        let length_meters = distance(&start, &end);
        let rect = Rect::from_points_buffered(&start, &end, buffer_size);
        let midpoint = LatLng::new((start.lat + end.lat) / 2.0, (start.lng + end.lng) / 2.0);

        Self {
            start,
            end,
            segment_index,
            sub_segment_index,
            length_meters,
            rect,
            midpoint,
        }
    }

    /// Identity used for dedup during a query: `(segment_index,
    /// sub_segment_index)`. Collision-free by construction, unlike the
    /// `segment * 10000 + sub` multiplicative encoding it replaces.
    pub fn identity(&self) -> (u32, u32) {
        (self.segment_index, self.sub_segment_index)
    }
}
