//! Integration tests for the engine service.
//!
//! These tests verify the complete flow:
//! - dataset payload → parser → registry reconciliation
//! - position fixes → activation countdown → commit
//! - commit → anchor creation through the tracking session
//! - render-thread reads of status, markers, and frame transforms
//!
//! Run with: `cargo test --test engine_integration`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use glam::{Mat4, Quat};
use parking_lot::Mutex;

use geomark::{
    AnchorHandle, Coordinate, Engine, EngineConfig, EngineService, EngineStatus,
    GeospatialPosition, TrackingSession,
};

// ============================================================================
// Test Doubles & Helpers
// ============================================================================

/// Dataset with one nearby area (two points around the origin), one distant
/// area, and one malformed block that must be skipped.
const PAYLOAD: &str = "\
<resources>\
<string-array name=\"campus\">\
<item>0.0010,0.0,North Bin,https://example.com/north</item>\
<item>-0.0010,0.0,South Bin,https://example.com/south</item>\
</string-array>\
<string-array name=\"park_ridge\">\
<item>10.0,10.0,Remote Bin</item>\
</string-array>\
<string-array name=\"broken\
<item>1.0,1.0,Orphan</item>\
</resources>";

/// Scripted tracking session shared between the owner task and the test.
#[derive(Default)]
struct ScriptedSession {
    position: Mutex<Option<GeospatialPosition>>,
    next_id: Mutex<u64>,
    live_anchors: Mutex<HashMap<AnchorHandle, Coordinate>>,
    resolved_total: Mutex<usize>,
    detached_total: Mutex<usize>,
}

impl ScriptedSession {
    fn set_position(&self, lat: f64, lon: f64, tracking_good: bool) {
        *self.position.lock() = Some(GeospatialPosition {
            coordinate: Coordinate::new(lat, lon).unwrap(),
            heading_degrees: 90.0,
            tracking_good,
        });
    }

    fn live_anchor_count(&self) -> usize {
        self.live_anchors.lock().len()
    }

    fn resolved_total(&self) -> usize {
        *self.resolved_total.lock()
    }
}

impl TrackingSession for ScriptedSession {
    fn current_position(&self) -> Option<GeospatialPosition> {
        *self.position.lock()
    }

    fn resolve_terrain_anchor(
        &self,
        coordinate: Coordinate,
        _hover_meters: f64,
        _rotation: Quat,
    ) -> AnchorHandle {
        let mut next = self.next_id.lock();
        let handle = AnchorHandle::new(*next);
        *next += 1;
        self.live_anchors.lock().insert(handle, coordinate);
        *self.resolved_total.lock() += 1;
        handle
    }

    fn anchor_pose(&self, handle: AnchorHandle) -> Option<Mat4> {
        self.live_anchors
            .lock()
            .contains_key(&handle)
            .then_some(Mat4::IDENTITY)
    }

    fn anchor_terrain_resolved(&self, handle: AnchorHandle) -> bool {
        self.live_anchors.lock().contains_key(&handle)
    }

    fn anchor_tracking(&self, handle: AnchorHandle) -> bool {
        self.live_anchors.lock().contains_key(&handle)
    }

    fn detach(&self, handle: AnchorHandle) {
        self.live_anchors.lock().remove(&handle);
        *self.detached_total.lock() += 1;
    }
}

/// Engine with a short commit delay so tests stay fast.
fn test_engine(session: Arc<ScriptedSession>) -> Engine {
    Engine::new(
        session,
        EngineConfig::default().with_commit_delay(Duration::from_millis(100)),
    )
}

const TICK: Duration = Duration::from_millis(25);

/// Wait until `predicate` holds or the deadline passes.
async fn wait_for(mut predicate: impl FnMut() -> bool) {
    for _ in 0..80 {
        if predicate() {
            return;
        }
        tokio::time::sleep(TICK).await;
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

/// Dataset payload flows through parsing and reconciliation on the owner
/// task, with malformed blocks skipped.
#[tokio::test]
async fn test_dataset_handoff_to_owner_task() {
    let session = Arc::new(ScriptedSession::default());
    let (handle, task) = EngineService::start(test_engine(Arc::clone(&session)), TICK);

    handle.submit_dataset(PAYLOAD);
    wait_for(|| handle.area_count() == 2).await;

    assert_eq!(handle.area_count(), 2, "Malformed block must be skipped");
    assert_eq!(handle.status(), EngineStatus::Calculating);

    drop(handle);
    task.await.unwrap();
}

/// The complete activation flow: good fix, countdown, commit, anchors,
/// markers, and frame transforms.
#[tokio::test]
async fn test_activation_commits_and_binds_anchors() {
    let session = Arc::new(ScriptedSession::default());
    session.set_position(0.0, 0.0, true);

    let (handle, task) = EngineService::start(test_engine(Arc::clone(&session)), TICK);
    handle.submit_dataset(PAYLOAD);
    handle.trigger_activation();

    wait_for(|| handle.status() == EngineStatus::Active("campus".to_string())).await;

    assert_eq!(handle.status(), EngineStatus::Active("campus".to_string()));
    assert_eq!(session.live_anchor_count(), 2);

    let markers = handle.active_markers();
    assert_eq!(markers.len(), 2);
    assert_eq!(markers[0].title, "North Bin");
    assert_eq!(markers[0].url, "https://example.com/north");
    assert_eq!(markers[1].title, "South Bin");

    // Identity pose/view/projection compose to identity MVPs.
    let transforms = handle.frame_transforms(Mat4::IDENTITY, Mat4::IDENTITY);
    assert_eq!(transforms.len(), 2);
    assert_eq!(transforms[0], Mat4::IDENTITY);

    drop(handle);
    task.await.unwrap();
}

/// A device far from every area surfaces TooFar and binds nothing.
#[tokio::test]
async fn test_activation_too_far() {
    let session = Arc::new(ScriptedSession::default());
    session.set_position(45.0, -90.0, true);

    let (handle, task) = EngineService::start(test_engine(Arc::clone(&session)), TICK);
    handle.submit_dataset(PAYLOAD);
    handle.trigger_activation();

    wait_for(|| handle.status() == EngineStatus::TooFar).await;

    assert_eq!(handle.status(), EngineStatus::TooFar);
    assert_eq!(session.live_anchor_count(), 0);
    assert!(handle.active_markers().is_empty());
    assert!(handle
        .frame_transforms(Mat4::IDENTITY, Mat4::IDENTITY)
        .is_empty());

    drop(handle);
    task.await.unwrap();
}

/// Repeated activation requests and dataset refreshes never duplicate
/// anchors once committed.
#[tokio::test]
async fn test_commitment_is_idempotent_under_repeated_inputs() {
    let session = Arc::new(ScriptedSession::default());
    session.set_position(0.0, 0.0, true);

    let (handle, task) = EngineService::start(test_engine(Arc::clone(&session)), TICK);
    handle.submit_dataset(PAYLOAD);
    handle.trigger_activation();

    wait_for(|| session.live_anchor_count() == 2).await;

    // Re-trigger and re-submit an identical dataset several times.
    for _ in 0..3 {
        handle.trigger_activation();
        handle.submit_dataset(PAYLOAD);
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(session.resolved_total(), 2, "Anchors created exactly once");
    assert_eq!(session.live_anchor_count(), 2);
    assert_eq!(handle.status(), EngineStatus::Active("campus".to_string()));

    drop(handle);
    task.await.unwrap();
}

/// Without a tracking fix the engine stays calculating and takes no
/// transition; once the fix arrives, the pending flow proceeds.
#[tokio::test]
async fn test_no_fix_then_recovery() {
    let session = Arc::new(ScriptedSession::default());

    let (handle, task) = EngineService::start(test_engine(Arc::clone(&session)), TICK);
    handle.submit_dataset(PAYLOAD);
    handle.trigger_activation();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.status(), EngineStatus::Calculating);
    assert_eq!(session.live_anchor_count(), 0);

    // Tracking comes up; the 1 Hz tick arms and commits automatically.
    session.set_position(0.0, 0.0, true);
    wait_for(|| handle.status() == EngineStatus::Active("campus".to_string())).await;

    assert_eq!(session.live_anchor_count(), 2);

    drop(handle);
    task.await.unwrap();
}
