//! Activation state machine: deciding which area is active.
//!
//! States flow `Idle → Pending → Committed`. A request (user trigger or a
//! fresh position fix with good tracking) arms the machine; after the
//! commit delay elapses the machine scans the registry for the area whose
//! nearest individual point is closest to the device and commits to it if
//! that distance is under the proximity threshold, otherwise it falls back
//! to `Idle` and can be re-armed.
//!
//! There is no timer primitive here: the caller supplies "now" on each
//! tick, which keeps the machine deterministic and trivially testable.
//!
//! Once committed, the machine stays committed for the rest of the process
//! lifetime; proximity is never re-evaluated to switch areas. This is the
//! documented contract, and repeated activation requests while committed
//! are no-ops.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::area::AreaRegistry;
use crate::geo::Coordinate;

/// Default hold before an activation request is evaluated, absorbing GPS
/// fix noise.
pub const DEFAULT_COMMIT_DELAY: Duration = Duration::from_secs(2);

/// Default maximum nearest-point distance for an area to be eligible, in
/// kilometers.
pub const DEFAULT_PROXIMITY_THRESHOLD_KM: f64 = 0.3;

/// Configuration for the activation state machine.
#[derive(Debug, Clone)]
pub struct ActivationConfig {
    /// Hold before a pending activation is evaluated.
    pub commit_delay: Duration,
    /// Maximum nearest-point distance for an eligible area, in kilometers.
    pub proximity_threshold_km: f64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            commit_delay: DEFAULT_COMMIT_DELAY,
            proximity_threshold_km: DEFAULT_PROXIMITY_THRESHOLD_KM,
        }
    }
}

/// Current state of the activation machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// No activation in progress.
    Idle,
    /// An activation request is held until the commit delay elapses.
    Pending {
        /// When the request was armed.
        since: Instant,
    },
    /// An area has been committed. Terminal for the process lifetime.
    Committed {
        /// Registry index of the committed area.
        area: usize,
    },
}

/// Result of an activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The request armed the commit countdown.
    Armed,
    /// A request was already pending; the countdown continues.
    AlreadyPending,
    /// An area is already committed; the request is a no-op.
    AlreadyCommitted(usize),
    /// Tracking is not available; no transition taken.
    StillCalculating,
}

/// Result of evaluating a due activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Committed to the area at this registry index.
    Committed(usize),
    /// No area's nearest point was within the proximity threshold; the
    /// machine returned to `Idle` and can be re-armed.
    TooFar,
    /// Position was unavailable at evaluation time; retried next tick.
    StillCalculating,
}

/// The activation state machine.
///
/// Exactly one area may be committed at a time; the machine holds at most
/// one pending request.
#[derive(Debug)]
pub struct ActivationMachine {
    config: ActivationConfig,
    state: ActivationState,
}

impl ActivationMachine {
    /// Create a machine with the given configuration.
    pub fn new(config: ActivationConfig) -> Self {
        Self {
            config,
            state: ActivationState::Idle,
        }
    }

    /// Create a machine with default thresholds.
    pub fn with_defaults() -> Self {
        Self::new(ActivationConfig::default())
    }

    /// Current state.
    pub fn state(&self) -> ActivationState {
        self.state
    }

    /// Registry index of the committed area, if any.
    pub fn committed_area(&self) -> Option<usize> {
        match self.state {
            ActivationState::Committed { area } => Some(area),
            _ => None,
        }
    }

    /// Whether an activation request is currently pending.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, ActivationState::Pending { .. })
    }

    /// Request activation at `now`.
    ///
    /// Arms the commit countdown when idle and tracking is good. While
    /// committed this is defensively idempotent: no duplicate anchors can
    /// ever result from repeated requests.
    pub fn request(&mut self, tracking_good: bool, now: Instant) -> RequestOutcome {
        match self.state {
            ActivationState::Committed { area } => RequestOutcome::AlreadyCommitted(area),
            ActivationState::Pending { .. } => RequestOutcome::AlreadyPending,
            ActivationState::Idle => {
                if !tracking_good {
                    return RequestOutcome::StillCalculating;
                }
                debug!("Activation armed, starting commit countdown");
                self.state = ActivationState::Pending { since: now };
                RequestOutcome::Armed
            }
        }
    }

    /// Advance the machine at `now`.
    ///
    /// Returns `Some(Evaluation)` when a pending activation came due and
    /// was evaluated, `None` otherwise. `position` is the device position
    /// with tracking confirmed good, or `None` when tracking is lost; a
    /// lost position at evaluation time leaves the request pending so the
    /// next tick retries.
    pub fn tick(
        &mut self,
        now: Instant,
        position: Option<Coordinate>,
        registry: &AreaRegistry,
    ) -> Option<Evaluation> {
        let ActivationState::Pending { since } = self.state else {
            return None;
        };
        if now.saturating_duration_since(since) < self.config.commit_delay {
            return None;
        }

        let Some(position) = position else {
            debug!("Commit delay elapsed but tracking unavailable, retrying next tick");
            return Some(Evaluation::StillCalculating);
        };

        match registry.nearest_area(position) {
            Some((index, distance)) if distance < self.config.proximity_threshold_km => {
                let name = registry
                    .area(index)
                    .map(|a| a.name().to_string())
                    .unwrap_or_default();
                info!(area = %name, distance_km = distance, "Area committed");
                self.state = ActivationState::Committed { area: index };
                Some(Evaluation::Committed(index))
            }
            nearest => {
                if let Some((_, distance)) = nearest {
                    warn!(
                        distance_km = distance,
                        threshold_km = self.config.proximity_threshold_km,
                        "No area within proximity threshold"
                    );
                } else {
                    warn!("No areas loaded, cannot activate");
                }
                self.state = ActivationState::Idle;
                Some(Evaluation::TooFar)
            }
        }
    }
}
