//! GeoMark - Geospatial area resolution and AR anchor lifecycle
//!
//! This library decides which named geographic cluster of points of
//! interest ("area") a device is currently near, and maintains one
//! terrain-relative world anchor per point so a rendering layer can draw
//! markers at each anchor's live screen projection.
//!
//! The flow: a delimited-text dataset is parsed into named areas and
//! reconciled into the [`area::AreaRegistry`]; a stream of device GPS fixes
//! drives the [`activation::ActivationMachine`], which commits to the
//! nearest area after a short countdown; on commit, the engine creates
//! anchors through the injected [`anchor::TrackingSession`] capability; and
//! every render tick the engine composes model-view-projection matrices for
//! the anchors that are resolved and tracked.

pub mod activation;
pub mod anchor;
pub mod area;
pub mod dataset;
pub mod engine;
pub mod geo;
pub mod render;
pub mod service;

pub use activation::{ActivationConfig, ActivationMachine, ActivationState};
pub use anchor::{AnchorBindings, AnchorHandle, GeospatialPosition, TrackingSession};
pub use area::{Area, AreaRegistry, PointOfInterest};
pub use dataset::{DatasetError, ParsedDataset};
pub use engine::{Engine, EngineConfig, EngineStatus, MapMarker};
pub use geo::{distance_km, Coordinate, GeoError};
pub use service::{EngineHandle, EngineService};
