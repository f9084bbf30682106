//! Dashflow turns a static SVG with dashed strokes into a looping animated GIF.
//!
//! A run parses the scene once ([`SvgScene`]), derives a frame count from the speed control
//! ([`SpeedConfig`]), patches per-frame dash and glint offsets into a fresh copy of the document
//! ([`compute_frame_state`], [`SvgScene::apply_frame_state`]), rasterizes each frame
//! ([`Rasterizer`]) and encodes the ordered frames into one blob ([`Encoder`]). [`generate`]
//! drives the whole run and reports through a [`ProgressTracker`].
#![forbid(unsafe_code)]

mod foundation;

pub mod config;
pub mod encode;
pub mod overlay;
pub mod pipeline;
pub mod progress;
pub mod raster;
pub mod scene;
pub mod schedule;
pub mod speed;

pub use crate::foundation::core::{CancelToken, Color};
pub use crate::foundation::error::{BoxError, DashflowError, DashflowResult};

pub use crate::config::{AnimationConfig, DashflowConfig, OutputConfig};
pub use crate::encode::{
    EncodeFailure, EncodeJob, EncodeOptions, Encoder, GifEncoder, encode_frames,
};
pub use crate::overlay::{
    GlintOverlay, GradientSweep, OverlayKind, OverlaySpec, OverlayStrategy, PlainStroke,
    select_strategy,
};
pub use crate::pipeline::{GenerateRequest, Generated, Plan, generate, plan};
pub use crate::progress::{
    Clock, ProgressState, ProgressStep, ProgressTracker, StepStatus, StepUpdate, SubscriptionId,
    SystemClock,
};
pub use crate::raster::{
    RasterSettings, Rasterizer, ResvgRasterizer, render_frame, render_frames,
};
pub use crate::scene::{DashedPath, FrameStyle, SvgScene};
pub use crate::schedule::{FrameState, compute_frame_state};
pub use crate::speed::{SpeedConfig, SpeedCurve, SpeedPreset, frame_delay_ms};
