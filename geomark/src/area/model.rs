//! Core data types for areas and their points of interest.

use crate::geo::Coordinate;

/// A single point of interest within an area.
///
/// Created during dataset parsing and never mutated afterwards; ownership
/// stays with the containing [`Area`].
#[derive(Debug, Clone, PartialEq)]
pub struct PointOfInterest {
    /// Geographic position of the point.
    pub coordinate: Coordinate,
    /// Human-readable title. May be empty.
    pub title: String,
    /// Resource URL for the point. May be empty.
    pub url: String,
}

impl PointOfInterest {
    /// Create a new point of interest.
    pub fn new(coordinate: Coordinate, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            coordinate,
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A named geographic cluster of points of interest.
///
/// The centroid is the arithmetic mean of the points' coordinates and is
/// computed once at construction. Areas are replaced wholesale by the
/// registry's reconciliation rule, never partially mutated, so the centroid
/// invariant holds by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    name: String,
    centroid: Coordinate,
    points: Vec<PointOfInterest>,
}

impl Area {
    /// Create a new area from its points, computing the centroid.
    pub fn new(name: impl Into<String>, points: Vec<PointOfInterest>) -> Self {
        let centroid = centroid_of(&points);
        Self {
            name: name.into(),
            centroid,
            points,
        }
    }

    /// The area's name, unique within a registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arithmetic mean of the points' coordinates.
    pub fn centroid(&self) -> Coordinate {
        self.centroid
    }

    /// The points of interest, in dataset order.
    pub fn points(&self) -> &[PointOfInterest] {
        &self.points
    }

    /// Number of points in this area.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the area has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distance from `from` to the nearest individual point, in kilometers.
    ///
    /// Uses the nearest point rather than the centroid since clusters can
    /// be non-circular. Returns `None` for an empty area.
    pub fn nearest_distance_km(&self, from: Coordinate) -> Option<f64> {
        self.points
            .iter()
            .map(|p| crate::geo::distance_km(p.coordinate, from))
            .min_by(|a, b| a.total_cmp(b))
    }
}

fn centroid_of(points: &[PointOfInterest]) -> Coordinate {
    if points.is_empty() {
        // Empty areas never leave the parser; keep the centroid well-defined anyway.
        return Coordinate::default();
    }
    let n = points.len() as f64;
    let (lat_sum, lon_sum) = points.iter().fold((0.0, 0.0), |(lat, lon), p| {
        (lat + p.coordinate.latitude, lon + p.coordinate.longitude)
    });
    Coordinate {
        latitude: lat_sum / n,
        longitude: lon_sum / n,
    }
}
