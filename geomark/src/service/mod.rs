//! Async owner context for the engine.
//!
//! Dataset refreshes and activation requests can arrive from different
//! execution contexts (a downloader task, a UI callback) while the engine's
//! state must only ever be mutated sequentially. `EngineService` merges
//! everything onto one command queue consumed by a single tokio task, which
//! also drives the engine tick at the position update rate.
//!
//! The engine itself lives behind a shared read-write lock so the render
//! thread can read frame transforms and status without going through the
//! queue. Writes happen only from the owner task; render-path reads are
//! cheap and never allocate anchors or parse data.
//!
//! ```text
//! downloader ──ReloadDataset──┐
//! UI trigger ──TriggerActivation──► command queue ──► owner task ──► Engine
//! 1 Hz interval ──────────────┘                                      ▲
//! render thread ── status / markers / frame_transforms (read lock) ──┘
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Mat4;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::dataset;
use crate::engine::{Engine, EngineStatus, MapMarker};

/// Default engine tick interval, matching the ~1 Hz GPS fix rate. The
/// commit countdown needs no finer resolution than this.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Commands serialized onto the owner task.
#[derive(Debug)]
enum EngineCommand {
    /// A freshly downloaded dataset payload to parse and reconcile.
    ReloadDataset(String),
    /// A user-initiated activation request.
    TriggerActivation,
}

/// Handle to a running engine service.
///
/// Cloneable; dropping all handles stops the owner task.
#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<RwLock<Engine>>,
    tx: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    /// Hand off a raw dataset payload for parsing and reconciliation.
    ///
    /// Parsing happens on the owner task; the caller (typically a download
    /// completion callback) never touches the registry directly.
    pub fn submit_dataset(&self, raw: impl Into<String>) {
        let _ = self.tx.send(EngineCommand::ReloadDataset(raw.into()));
    }

    /// Request activation of the nearest area.
    pub fn trigger_activation(&self) {
        let _ = self.tx.send(EngineCommand::TriggerActivation);
    }

    /// Current user-facing status.
    pub fn status(&self) -> EngineStatus {
        self.engine.read().current_status()
    }

    /// Markers for the committed area, for 2D map display.
    pub fn active_markers(&self) -> Vec<MapMarker> {
        self.engine.read().active_markers()
    }

    /// Model-view-projection matrices for the committed area's markers.
    ///
    /// Called from the render thread every frame; takes a read lock only.
    pub fn frame_transforms(&self, view: Mat4, projection: Mat4) -> Vec<Mat4> {
        self.engine.read().frame_transforms(view, projection)
    }

    /// Number of areas currently in the registry.
    pub fn area_count(&self) -> usize {
        self.engine.read().registry().len()
    }
}

/// Owner task wrapper around an [`Engine`].
pub struct EngineService;

impl EngineService {
    /// Start the owner task for `engine`, ticking at `tick_interval`.
    ///
    /// Returns the handle for submitting work and reading state, and the
    /// join handle of the owner task. The task stops when every
    /// [`EngineHandle`] has been dropped.
    pub fn start(engine: Engine, tick_interval: Duration) -> (EngineHandle, JoinHandle<()>) {
        let engine = Arc::new(RwLock::new(engine));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let shared = Arc::clone(&engine);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    command = rx.recv() => {
                        match command {
                            Some(EngineCommand::ReloadDataset(raw)) => {
                                let parsed = dataset::parse(&raw);
                                shared.write().reconcile_dataset(parsed);
                            }
                            Some(EngineCommand::TriggerActivation) => {
                                shared.write().trigger_activation(Instant::now());
                            }
                            None => break,
                        }
                    }
                    _ = ticker.tick() => {
                        shared.write().tick(Instant::now());
                    }
                }
            }
            debug!("Engine service stopped");
        });

        (EngineHandle { engine, tx }, task)
    }

    /// Start with the default tick interval.
    pub fn start_with_defaults(engine: Engine) -> (EngineHandle, JoinHandle<()>) {
        Self::start(engine, DEFAULT_TICK_INTERVAL)
    }
}
