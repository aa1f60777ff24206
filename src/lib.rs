#![forbid(unsafe_code)]

//! Circular ("fan") genealogical chart engine: an explicit SVG scene graph,
//! animated reconciliation when the chart root changes, and raster export
//! that frames exactly like the live view.

pub mod chart;
pub mod color;
pub mod config;
pub mod ease;
pub mod error;
pub mod export;
pub mod gradient;
pub mod layout;
pub mod person;
pub mod reconcile;
pub mod scene;
pub mod source;
pub mod svg;
pub mod transition;
pub mod viewport;

pub use chart::{Chart, ClickOutcome};
pub use color::Rgba8;
pub use config::Configuration;
pub use ease::Ease;
pub use error::{ChartError, ChartResult};
pub use export::{DEFAULT_FILENAME, ExportedImage};
pub use layout::{FanLayout, Wedge};
pub use person::{PersonId, PersonNode};
pub use reconcile::{NodeState, PreviousState, ReconcilePlan, classify};
pub use scene::{LabelMark, RingRole, Scene, Segment, build_scene};
pub use source::{DataSource, HttpDataSource, StaticDataSource};
pub use transition::{
    BatchStatus, Completion, FinalizePlan, TransitionBatch, TransitionCoordinator, Tween,
    TweenProp, TweenTarget,
};
pub use viewport::{MIN_HEIGHT, MIN_PADDING, Viewport, compute_viewport};
