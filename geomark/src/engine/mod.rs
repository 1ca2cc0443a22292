//! The area resolver and anchor lifecycle engine.
//!
//! `Engine` is the single owned object threading the area registry, the
//! activation state machine, and the anchor bindings together with the
//! injected tracking session. There is no ambient state: everything the
//! engine knows lives in this struct, and all mutations go through `&mut
//! self` so a single owner context serializes them naturally.
//!
//! ```text
//! dataset payload ──► reconcile_dataset ──► AreaRegistry
//! position stream ──► tick ──► ActivationMachine ──► AnchorBindings
//! render tick ──► frame_transforms (read-only, never allocates anchors)
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Mat4;
use tracing::{debug, warn};

use crate::activation::{
    ActivationConfig, ActivationMachine, Evaluation, DEFAULT_COMMIT_DELAY,
    DEFAULT_PROXIMITY_THRESHOLD_KM,
};
use crate::anchor::{AnchorBindings, TrackingSession, HOVER_ABOVE_TERRAIN_M};
use crate::area::AreaRegistry;
use crate::dataset::ParsedDataset;
use crate::geo::Coordinate;
use crate::render;

/// User-facing engine status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    /// Tracking or evaluation is still in progress.
    Calculating,
    /// The last evaluation found no area within the proximity threshold.
    TooFar,
    /// An area is committed and its markers are live.
    Active(String),
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineStatus::Calculating => write!(f, "calculating"),
            EngineStatus::TooFar => write!(f, "too far"),
            EngineStatus::Active(name) => write!(f, "active: {}", name),
        }
    }
}

/// A marker for 2D map display.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    /// Marker position.
    pub coordinate: Coordinate,
    /// Marker title. May be empty.
    pub title: String,
    /// Resource URL. May be empty.
    pub url: String,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum nearest-point distance for an eligible area, in kilometers.
    pub proximity_threshold_km: f64,
    /// Hold before a pending activation is evaluated.
    pub commit_delay: Duration,
    /// Hover height above terrain for marker anchors, in meters.
    pub hover_above_terrain_m: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_km: DEFAULT_PROXIMITY_THRESHOLD_KM,
            commit_delay: DEFAULT_COMMIT_DELAY,
            hover_above_terrain_m: HOVER_ABOVE_TERRAIN_M,
        }
    }
}

impl EngineConfig {
    /// Set the proximity threshold in kilometers.
    pub fn with_proximity_threshold_km(mut self, km: f64) -> Self {
        self.proximity_threshold_km = km;
        self
    }

    /// Set the commit delay.
    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    /// Set the hover height above terrain in meters.
    pub fn with_hover_above_terrain_m(mut self, meters: f64) -> Self {
        self.hover_above_terrain_m = meters;
        self
    }
}

/// The geospatial area resolver and anchor lifecycle engine.
pub struct Engine {
    config: EngineConfig,
    registry: AreaRegistry,
    machine: ActivationMachine,
    bindings: AnchorBindings,
    session: Arc<dyn TrackingSession>,
    status: EngineStatus,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("areas", &self.registry.len())
            .field("state", &self.machine.state())
            .field("status", &self.status)
            .finish()
    }
}

impl Engine {
    /// Create an engine with the given tracking session and configuration.
    pub fn new(session: Arc<dyn TrackingSession>, config: EngineConfig) -> Self {
        let machine = ActivationMachine::new(ActivationConfig {
            commit_delay: config.commit_delay,
            proximity_threshold_km: config.proximity_threshold_km,
        });
        Self {
            config,
            registry: AreaRegistry::new(),
            machine,
            bindings: AnchorBindings::new(),
            session,
            status: EngineStatus::Calculating,
        }
    }

    /// Create an engine with default configuration.
    pub fn with_defaults(session: Arc<dyn TrackingSession>) -> Self {
        Self::new(session, EngineConfig::default())
    }

    /// The area registry.
    pub fn registry(&self) -> &AreaRegistry {
        &self.registry
    }

    /// Current user-facing status.
    pub fn current_status(&self) -> EngineStatus {
        self.status.clone()
    }

    /// Reconcile a parsed dataset into the registry.
    ///
    /// Runs once per successful parse, including refreshed downloads; areas
    /// whose geometry is unchanged are retained so existing anchors stay
    /// valid.
    pub fn reconcile_dataset(&mut self, parsed: ParsedDataset) {
        self.registry.reconcile(parsed);
    }

    /// Request activation of the nearest area at `now`.
    ///
    /// While an area is committed this is a no-op; the engine never creates
    /// duplicate anchors for repeated requests.
    pub fn trigger_activation(&mut self, now: Instant) {
        let tracking_good = self
            .session
            .current_position()
            .map(|p| p.tracking_good)
            .unwrap_or(false);

        use crate::activation::RequestOutcome;
        match self.machine.request(tracking_good, now) {
            RequestOutcome::Armed => {
                self.status = EngineStatus::Calculating;
            }
            RequestOutcome::AlreadyPending => {}
            RequestOutcome::AlreadyCommitted(area) => {
                debug!(area, "Activation requested while committed, ignoring");
            }
            RequestOutcome::StillCalculating => {
                self.status = EngineStatus::Calculating;
            }
        }
    }

    /// Advance the engine at `now`.
    ///
    /// Reads the current device position from the session, arms the
    /// activation countdown on a good fix, evaluates a due activation, and
    /// binds anchors when a commit happens. Intended to be driven at the
    /// position update rate (~1 Hz); intermediate ticks are cheap no-ops.
    pub fn tick(&mut self, now: Instant) {
        let position = self.session.current_position();

        // A fresh position with good tracking arms the countdown automatically.
        if let Some(pos) = position {
            if pos.tracking_good {
                self.machine.request(true, now);
            }
        }

        let device = position.filter(|p| p.tracking_good).map(|p| p.coordinate);

        match self.machine.tick(now, device, &self.registry) {
            Some(Evaluation::Committed(index)) => {
                let Some(area) = self.registry.area(index) else {
                    // Registry shrank between evaluation and bind; cannot happen
                    // with in-place reconciliation, but fail soft regardless.
                    warn!(index, "Committed area missing from registry");
                    return;
                };
                self.bindings
                    .bind(index, area, &*self.session, self.config.hover_above_terrain_m);
                self.status = EngineStatus::Active(area.name().to_string());
            }
            Some(Evaluation::TooFar) => {
                self.status = EngineStatus::TooFar;
            }
            Some(Evaluation::StillCalculating) => {
                self.status = EngineStatus::Calculating;
            }
            None => {}
        }
    }

    /// Markers for the committed area, for 2D map display.
    ///
    /// Empty while no area is committed.
    pub fn active_markers(&self) -> Vec<MapMarker> {
        let Some(index) = self.machine.committed_area() else {
            return Vec::new();
        };
        let Some(area) = self.registry.area(index) else {
            return Vec::new();
        };
        area.points()
            .iter()
            .map(|p| MapMarker {
                coordinate: p.coordinate,
                title: p.title.clone(),
                url: p.url.clone(),
            })
            .collect()
    }

    /// Model-view-projection matrices for the committed area's markers.
    ///
    /// Empty while no area is committed or an activation is mid-flight.
    /// Runs once per render tick: never allocates anchors or parses data.
    pub fn frame_transforms(&self, view: Mat4, projection: Mat4) -> Vec<Mat4> {
        if self.machine.committed_area().is_none() || self.machine.is_pending() {
            return Vec::new();
        }
        render::frame_transforms(view, projection, &self.bindings, &*self.session)
    }
}
