//! Per-frame marker transform computation.
//!
//! Every render tick the engine composes a model-view-projection matrix for
//! each anchor whose terrain resolution has succeeded and whose pose is
//! actively tracked. Anchors that are not yet resolved or not currently
//! tracked are skipped for the frame; that is normal operation, not an
//! error. This path runs once per frame and must never allocate anchors or
//! parse data.

use glam::Mat4;

use crate::anchor::{AnchorBindings, TrackingSession};

/// Compose model-view-projection matrices for the bound anchors.
///
/// Matrices follow glam's column-major convention:
/// `mvp = projection * view * model`, where the model matrix is the
/// anchor's current world pose as reported by the session.
pub fn frame_transforms(
    view: Mat4,
    projection: Mat4,
    bindings: &AnchorBindings,
    session: &dyn TrackingSession,
) -> Vec<Mat4> {
    let mut transforms = Vec::with_capacity(bindings.handles().len());

    for &handle in bindings.handles() {
        if !session.anchor_terrain_resolved(handle) {
            continue;
        }
        if !session.anchor_tracking(handle) {
            continue;
        }
        let Some(model) = session.anchor_pose(handle) else {
            continue;
        };
        transforms.push(projection * view * model);
    }

    transforms
}
