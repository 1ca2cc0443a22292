//! Named geographic clusters of points of interest.
//!
//! An [`Area`] is a named cluster of [`PointOfInterest`] records with a
//! centroid derived from its points. The [`AreaRegistry`] owns the
//! authoritative list of areas and reconciles freshly parsed datasets
//! against it, replacing only areas whose geometry actually changed so
//! that existing world anchors are not invalidated unnecessarily.

mod model;
mod registry;

pub use model::{Area, PointOfInterest};
pub use registry::{AreaRegistry, ReconcileSummary, GEOMETRY_TOLERANCE_KM};
