//! Tracking-session capability boundary and anchor lifecycle.
//!
//! The AR tracking session is an external collaborator. This module defines
//! the [`TrackingSession`] trait the engine consumes (enabling test doubles)
//! and the [`AnchorBindings`] manager that creates one terrain anchor per
//! point of interest exactly once per activation, releasing any anchors from
//! a previous activation first so anchors never accumulate.

use glam::{Mat4, Quat};
use tracing::{debug, info};

use crate::area::Area;
use crate::geo::Coordinate;

/// Hover height above resolved terrain for marker anchors, in meters.
pub const HOVER_ABOVE_TERRAIN_M: f64 = 0.5;

/// Opaque handle to a world anchor owned by the tracking session.
///
/// The engine holds only the handle; poses are read live from the session
/// each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorHandle(u64);

impl AnchorHandle {
    /// Create a handle from a session-assigned id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The session-assigned id.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Geospatial device pose reported by the tracking session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeospatialPosition {
    /// Device position.
    pub coordinate: Coordinate,
    /// Compass heading in degrees.
    pub heading_degrees: f64,
    /// Whether the geospatial tracking estimate is currently good.
    pub tracking_good: bool,
}

/// Capabilities consumed from the AR tracking collaborator.
///
/// Implementations are expected to be cheap to call per frame; anchor pose
/// queries must not block.
pub trait TrackingSession: Send + Sync {
    /// Current geospatial device pose, or `None` when unavailable.
    fn current_position(&self) -> Option<GeospatialPosition>;

    /// Request a terrain-relative anchor hovering `hover_meters` above the
    /// terrain at `coordinate`, with the given rotation.
    fn resolve_terrain_anchor(
        &self,
        coordinate: Coordinate,
        hover_meters: f64,
        rotation: Quat,
    ) -> AnchorHandle;

    /// Current world pose of the anchor as a model matrix, or `None` when
    /// the session has no pose for it yet.
    fn anchor_pose(&self, handle: AnchorHandle) -> Option<Mat4>;

    /// Whether the anchor's terrain resolution has completed successfully.
    fn anchor_terrain_resolved(&self, handle: AnchorHandle) -> bool;

    /// Whether the anchor is currently tracked.
    fn anchor_tracking(&self, handle: AnchorHandle) -> bool;

    /// Release the anchor.
    fn detach(&self, handle: AnchorHandle);
}

/// Ordered anchor handles parallel to the committed area's points.
///
/// Handle at index `i` corresponds to point at index `i`.
#[derive(Debug, Default)]
pub struct AnchorBindings {
    handles: Vec<AnchorHandle>,
    area: Option<usize>,
}

impl AnchorBindings {
    /// Create an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bound anchor handles, in point order.
    pub fn handles(&self) -> &[AnchorHandle] {
        &self.handles
    }

    /// Registry index of the area the bindings belong to, if any.
    pub fn bound_area(&self) -> Option<usize> {
        self.area
    }

    /// Whether any anchors are currently bound.
    pub fn is_bound(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Bind anchors for a committed area.
    ///
    /// Creates one terrain anchor per point, in order, with an identity
    /// rotation. Binding the same area again while its anchors exist is a
    /// no-op; binding a different area releases all prior anchors first.
    ///
    /// Returns the number of anchors created.
    pub fn bind(
        &mut self,
        area_index: usize,
        area: &Area,
        session: &dyn TrackingSession,
        hover_meters: f64,
    ) -> usize {
        if self.area == Some(area_index) && self.is_bound() {
            debug!(area = %area.name(), "Anchors already bound, skipping");
            return 0;
        }

        let released = self.release(session);

        for point in area.points() {
            let handle =
                session.resolve_terrain_anchor(point.coordinate, hover_meters, Quat::IDENTITY);
            self.handles.push(handle);
        }
        self.area = Some(area_index);

        info!(
            area = %area.name(),
            anchors = self.handles.len(),
            released,
            "Terrain anchors bound"
        );
        self.handles.len()
    }

    /// Detach all bound anchors. Returns the number released.
    pub fn release(&mut self, session: &dyn TrackingSession) -> usize {
        let released = self.handles.len();
        for handle in self.handles.drain(..) {
            session.detach(handle);
        }
        self.area = None;
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::PointOfInterest;
    use parking_lot::Mutex;

    /// Minimal scripted session: records resolve/detach calls.
    #[derive(Default)]
    struct RecordingSession {
        next_id: Mutex<u64>,
        resolved: Mutex<Vec<AnchorHandle>>,
        detached: Mutex<Vec<AnchorHandle>>,
    }

    impl TrackingSession for RecordingSession {
        fn current_position(&self) -> Option<GeospatialPosition> {
            None
        }

        fn resolve_terrain_anchor(
            &self,
            _coordinate: Coordinate,
            _hover_meters: f64,
            _rotation: Quat,
        ) -> AnchorHandle {
            let mut next = self.next_id.lock();
            let handle = AnchorHandle::new(*next);
            *next += 1;
            self.resolved.lock().push(handle);
            handle
        }

        fn anchor_pose(&self, _handle: AnchorHandle) -> Option<Mat4> {
            Some(Mat4::IDENTITY)
        }

        fn anchor_terrain_resolved(&self, _handle: AnchorHandle) -> bool {
            true
        }

        fn anchor_tracking(&self, _handle: AnchorHandle) -> bool {
            true
        }

        fn detach(&self, handle: AnchorHandle) {
            self.detached.lock().push(handle);
        }
    }

    fn area(name: &str, count: usize) -> Area {
        let points = (0..count)
            .map(|i| {
                PointOfInterest::new(
                    Coordinate::new(i as f64 * 0.001, 0.0).unwrap(),
                    format!("point {}", i),
                    "",
                )
            })
            .collect();
        Area::new(name, points)
    }

    #[test]
    fn test_bind_creates_one_anchor_per_point_in_order() {
        let session = RecordingSession::default();
        let mut bindings = AnchorBindings::new();
        let campus = area("campus", 3);

        let created = bindings.bind(0, &campus, &session, HOVER_ABOVE_TERRAIN_M);
        assert_eq!(created, 3);
        assert_eq!(bindings.handles().len(), 3);
        assert_eq!(bindings.bound_area(), Some(0));

        // Handles are parallel to points: handle i was resolved i-th.
        let resolved = session.resolved.lock();
        assert_eq!(&resolved[..], bindings.handles());
    }

    #[test]
    fn test_rebinding_same_area_is_noop() {
        let session = RecordingSession::default();
        let mut bindings = AnchorBindings::new();
        let campus = area("campus", 2);

        bindings.bind(0, &campus, &session, HOVER_ABOVE_TERRAIN_M);
        let created = bindings.bind(0, &campus, &session, HOVER_ABOVE_TERRAIN_M);

        assert_eq!(created, 0);
        assert_eq!(session.resolved.lock().len(), 2);
        assert!(session.detached.lock().is_empty());
    }

    #[test]
    fn test_binding_new_area_releases_prior_anchors_first() {
        let session = RecordingSession::default();
        let mut bindings = AnchorBindings::new();
        let campus = area("campus", 3);
        let park = area("park", 2);

        bindings.bind(0, &campus, &session, HOVER_ABOVE_TERRAIN_M);
        let prior = bindings.handles().to_vec();

        bindings.bind(1, &park, &session, HOVER_ABOVE_TERRAIN_M);

        // Released count equals the prior point count, and the detached
        // handles are exactly the prior ones.
        let detached = session.detached.lock();
        assert_eq!(detached.len(), 3);
        assert_eq!(&detached[..], &prior[..]);
        assert_eq!(bindings.handles().len(), 2);
        assert_eq!(bindings.bound_area(), Some(1));
    }

    #[test]
    fn test_release_clears_bindings() {
        let session = RecordingSession::default();
        let mut bindings = AnchorBindings::new();
        bindings.bind(0, &area("campus", 2), &session, HOVER_ABOVE_TERRAIN_M);

        let released = bindings.release(&session);
        assert_eq!(released, 2);
        assert!(!bindings.is_bound());
        assert_eq!(bindings.bound_area(), None);
    }
}
