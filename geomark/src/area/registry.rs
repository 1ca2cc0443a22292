//! The authoritative area registry and its reconciliation rule.

use tracing::{debug, info};

use super::model::{Area, PointOfInterest};
use crate::geo::{distance_km, Coordinate};

/// Tolerance in kilometers when comparing area geometry during reconciliation.
///
/// Centroids or same-indexed points that differ by less than this are
/// considered identical, so a re-downloaded dataset with unchanged geometry
/// does not replace areas (and therefore does not invalidate anchors).
pub const GEOMETRY_TOLERANCE_KM: f64 = 1e-7;

/// Outcome of a reconciliation pass, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Areas inserted because no existing area shared their name.
    pub inserted: usize,
    /// Areas replaced because their geometry changed beyond tolerance.
    pub replaced: usize,
    /// Areas left untouched because they matched within tolerance.
    pub retained: usize,
}

/// Owns the authoritative list of areas.
///
/// Areas are kept in insertion order; the nearest-area scan iterates in that
/// order and keeps only strictly smaller minima, so the first-inserted area
/// wins exact distance ties. Area names are unique.
#[derive(Debug, Default)]
pub struct AreaRegistry {
    areas: Vec<Area>,
}

impl AreaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of areas in the registry.
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Whether the registry holds no areas.
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// All areas, in insertion order.
    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    /// Look up an area by index.
    pub fn area(&self, index: usize) -> Option<&Area> {
        self.areas.get(index)
    }

    /// Look up an area by name.
    pub fn get(&self, name: &str) -> Option<&Area> {
        self.areas.iter().find(|a| a.name() == name)
    }

    /// Reconcile a freshly parsed dataset against the registry.
    ///
    /// For each candidate area:
    /// - no existing area with the same name: insert as new;
    /// - same name but centroid or any same-indexed point differs beyond
    ///   [`GEOMETRY_TOLERANCE_KM`] (mismatched lengths count as a
    ///   difference): replace the existing area wholesale;
    /// - everything matches within tolerance: retain the existing area
    ///   unchanged.
    ///
    /// Replacement happens in place, so area indices are stable across
    /// reconciliation. The operation is idempotent: reconciling the same
    /// candidate twice produces no additional replacements.
    pub fn reconcile(
        &mut self,
        candidate: Vec<(String, Vec<PointOfInterest>)>,
    ) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        for (name, points) in candidate {
            let incoming = Area::new(name, points);
            match self.areas.iter().position(|a| a.name() == incoming.name()) {
                None => {
                    debug!(area = %incoming.name(), points = incoming.len(), "Inserting new area");
                    self.areas.push(incoming);
                    summary.inserted += 1;
                }
                Some(index) => {
                    if geometry_differs(&self.areas[index], &incoming) {
                        debug!(area = %incoming.name(), "Replacing area with changed geometry");
                        self.areas[index] = incoming;
                        summary.replaced += 1;
                    } else {
                        summary.retained += 1;
                    }
                }
            }
        }

        info!(
            inserted = summary.inserted,
            replaced = summary.replaced,
            retained = summary.retained,
            total = self.areas.len(),
            "Area registry reconciled"
        );
        summary
    }

    /// Find the area with the globally smallest nearest-point distance.
    ///
    /// Returns the area's index and that distance in kilometers, or `None`
    /// when the registry is empty.
    pub fn nearest_area(&self, from: Coordinate) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (index, area) in self.areas.iter().enumerate() {
            let Some(d) = area.nearest_distance_km(from) else {
                continue;
            };
            // Strict comparison keeps the first-inserted area on exact ties.
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((index, d));
            }
        }
        best
    }
}

/// Whether two same-named areas differ beyond tolerance.
fn geometry_differs(existing: &Area, incoming: &Area) -> bool {
    if distance_km(existing.centroid(), incoming.centroid()) > GEOMETRY_TOLERANCE_KM {
        return true;
    }
    if existing.len() != incoming.len() {
        return true;
    }
    // Points are compared pairwise by index, not by identity.
    existing
        .points()
        .iter()
        .zip(incoming.points())
        .any(|(a, b)| distance_km(a.coordinate, b.coordinate) > GEOMETRY_TOLERANCE_KM)
}
