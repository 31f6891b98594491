//! Geographic distance and rectangle utilities.
//!
//! Two distance notions are used throughout this crate: [`haversine_distance`]
//! for reported, true great-circle distances, and [`approx_planar_distance`]
//! purely as a cheap ordering key. Never use the latter where a caller-visible
//! distance is expected.

use crate::LatLng;

/// WGS-84 mean earth radius, in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points, in meters.
///
/// Commutative and non-negative; returns 0 for equal inputs. This is the
/// default `distance_calculator` for [`crate::IndexConfig`].
pub fn haversine_distance(a: &LatLng, b: &LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_METERS * c
}

/// Squared Euclidean distance in (lat, lng) degree space.
///
/// Unitless and monotone in true planar distance only for small extents; used
/// exclusively to order candidates by approximate proximity, never as a
/// reported distance.
pub fn approx_planar_distance(p: &LatLng, q: &LatLng) -> f64 {
    let dlat = p.lat - q.lat;
    let dlng = p.lng - q.lng;
    dlat * dlat + dlng * dlng
}

/// Axis-aligned rectangle in (longitude, latitude) space.
///
/// Stored as `(left, top, width, height)`: `left` is the minimum longitude,
/// `top` the minimum latitude.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Build the tight rectangle spanning two points, with an equal buffer
    /// added on all four sides.
    pub fn from_points_buffered(a: &LatLng, b: &LatLng, buffer: f64) -> Self {
        let min_lng = a.lng.min(b.lng) - buffer;
        let max_lng = a.lng.max(b.lng) + buffer;
        let min_lat = a.lat.min(b.lat) - buffer;
        let max_lat = a.lat.max(b.lat) + buffer;
        Self {
            left: min_lng,
            top: min_lat,
            width: (max_lng - min_lng).max(0.0),
            height: (max_lat - min_lat).max(0.0),
        }
    }

    /// Build the rectangle covering every point in `points`, with `buffer`
    /// added on all four sides. Returns `None` if `points` is empty.
    pub fn from_points_union_buffered(points: &[LatLng], buffer: f64) -> Option<Self> {
        let first = points.first()?;
        let mut min_lng = first.lng;
        let mut max_lng = first.lng;
        let mut min_lat = first.lat;
        let mut max_lat = first.lat;

        for p in &points[1..] {
            min_lng = min_lng.min(p.lng);
            max_lng = max_lng.max(p.lng);
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
        }

        Some(Self {
            left: min_lng - buffer,
            top: min_lat - buffer,
            width: (max_lng - min_lng + 2.0 * buffer).max(0.0),
            height: (max_lat - min_lat + 2.0 * buffer).max(0.0),
        })
    }

    /// The tight (unbuffered) rectangle covering every point in `points`.
    pub fn from_points_tight(points: &[LatLng]) -> Option<Self> {
        Self::from_points_union_buffered(points, 0.0)
    }

    pub fn min_lng(&self) -> f64 {
        self.left
    }

    pub fn max_lng(&self) -> f64 {
        self.left + self.width
    }

    pub fn min_lat(&self) -> f64 {
        self.top
    }

    pub fn max_lat(&self) -> f64 {
        self.top + self.height
    }

    /// Convert to an `rstar` axis-aligned bounding box in `[lng, lat]` order.
    pub fn to_aabb(self) -> rstar::AABB<[f64; 2]> {
        rstar::AABB::from_corners([self.min_lng(), self.min_lat()], [self.max_lng(), self.max_lat()])
    }
}

/// Axis-aligned square search rectangle centered on `center`, side
/// `2 * radius_degrees`.
pub fn search_rect(center: &LatLng, radius_degrees: f64) -> Rect {
    Rect {
        left: center.lng - radius_degrees,
        top: center.lat - radius_degrees,
        width: 2.0 * radius_degrees,
        height: 2.0 * radius_degrees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng)
    }

    #[test]
    fn test_haversine_distance_known_cities() {
        let london = p(51.5074, -0.1278);
        let paris = p(48.8566, 2.3522);
        let dist = haversine_distance(&london, &paris);
        assert!(dist > 340_000.0 && dist < 350_000.0);
    }

    #[test]
    fn test_haversine_commutative_and_zero() {
        let a = p(10.0, 20.0);
        let b = p(11.0, 21.0);
        assert_eq!(haversine_distance(&a, &b), haversine_distance(&b, &a));
        assert_eq!(haversine_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_approx_planar_distance_monotone_small_extent() {
        let origin = p(0.0, 0.0);
        let near = p(0.001, 0.0);
        let far = p(0.01, 0.0);
        assert!(approx_planar_distance(&origin, &near) < approx_planar_distance(&origin, &far));
    }

    #[test]
    fn test_search_rect_centered() {
        let center = p(10.0, 20.0);
        let rect = search_rect(&center, 0.5);
        assert_eq!(rect.left, 19.5);
        assert_eq!(rect.top, 9.5);
        assert_eq!(rect.width, 1.0);
        assert_eq!(rect.height, 1.0);
    }

    #[test]
    fn test_rect_from_points_buffered() {
        let a = p(0.0, 0.0);
        let b = p(1.0, 1.0);
        let rect = Rect::from_points_buffered(&a, &b, 0.0001);
        assert!((rect.min_lat() - (-0.0001)).abs() < 1e-9);
        assert!((rect.max_lat() - 1.0001).abs() < 1e-9);
    }

    #[test]
    fn test_rect_from_points_union_buffered_empty() {
        assert!(Rect::from_points_union_buffered(&[], 0.1).is_none());
    }
}
