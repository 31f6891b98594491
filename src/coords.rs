//! Coordinate adapter: a collaborator interface for lifting user coordinate
//! types into the internal [`LatLng`] type. Out of scope for the index's
//! core algorithm — the index itself is monomorphic over `LatLng` and never
//! dispatches through this trait on the query hot path.

use crate::{LatLng, Route};

/// Capability set plugging an arbitrary user coordinate type `T` into the
/// index. Implementors provide `from_coords`/`to_coords`/`from_route`;
/// `from_segment` has a default built from `from_coords`.
///
/// `from_route` intentionally has no default body: the shape of a user's
/// "list of segments" type is not assumed by this trait.
pub trait CoordinateAdapter<T> {
    /// Lift a single user coordinate into `LatLng`.
    fn from_coords(value: T) -> LatLng;

    /// Lower a `LatLng` back into the user coordinate type.
    fn to_coords(point: LatLng) -> T;

    /// Lift a single outer segment of user coordinates into `Vec<LatLng>`.
    fn from_segment(values: Vec<T>) -> Vec<LatLng> {
        values.into_iter().map(Self::from_coords).collect()
    }

    /// Lift a full route of user coordinates into the index's [`Route`]
    /// type.
    fn from_route(values: Vec<Vec<T>>) -> Route;
}
