use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{
    encode::EncodeOptions,
    foundation::core::Color,
    foundation::error::{DashflowError, DashflowResult},
    speed::SpeedConfig,
};

/// Look of one animation pass. Fixed before rendering starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimationConfig {
    /// Speed multiplier, within the configured [`SpeedConfig`] range.
    pub speed: f64,
    pub color_from: Color,
    pub color_to: Color,
    /// Race a bright `color_to` segment over a `color_from` base stroke.
    pub use_glint_overlay: bool,
    /// Sweep a repeating `color_from`/`color_to` gradient along the strokes (ignored when the
    /// glint overlay is on).
    pub gradient_sweep: bool,
    /// Gradient cycles across the canvas width.
    pub wave_frequency: f64,
    /// Width of the highlight band; also sizes the glint.
    pub wave_band_width: f64,
    /// Glint pacing in `(0, 1]`: small is ease-in, large is ease-out.
    pub glint_speed: f64,
    /// Uniform stroke width override for animated paths.
    pub stroke_width: Option<f64>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            speed: 2.0,
            color_from: Color::BLACK,
            color_to: Color::rgb(255, 0, 0),
            use_glint_overlay: false,
            gradient_sweep: false,
            wave_frequency: 4.0,
            wave_band_width: 0.2,
            glint_speed: 0.5,
            stroke_width: None,
        }
    }
}

impl AnimationConfig {
    pub fn validate(&self, speed: &SpeedConfig) -> DashflowResult<()> {
        if !self.speed.is_finite() || !(speed.min..=speed.max).contains(&self.speed) {
            return Err(DashflowError::validation(format!(
                "speed {} is outside [{}, {}]",
                self.speed, speed.min, speed.max
            )));
        }
        if !self.wave_frequency.is_finite() || self.wave_frequency <= 0.0 {
            return Err(DashflowError::validation("wave_frequency must be > 0"));
        }
        if !self.wave_band_width.is_finite() || self.wave_band_width < 0.0 {
            return Err(DashflowError::validation("wave_band_width must be >= 0"));
        }
        if !(self.glint_speed > 0.0 && self.glint_speed <= 1.0) {
            return Err(DashflowError::validation("glint_speed must be in (0, 1]"));
        }
        if let Some(w) = self.stroke_width
            && (!w.is_finite() || w <= 0.0)
        {
            return Err(DashflowError::validation("stroke_width must be > 0"));
        }
        Ok(())
    }
}

/// Highest frame rate a GIF can play back: its delays have 10 ms resolution.
pub const MAX_FPS: u32 = 100;

/// Output raster and container settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub fps: u32,
    /// Opaque fill behind every frame.
    pub background: Color,
    /// Override the scene's pixel size.
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// NeuQuant sampling factor, 1 (best) to 30 (fastest).
    pub quality: u8,
    pub workers: usize,
    pub transparent: bool,
    pub dither: bool,
    pub global_palette: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let enc = EncodeOptions::default();
        Self {
            fps: 24,
            background: enc.background,
            width: None,
            height: None,
            quality: enc.quality,
            workers: enc.workers,
            transparent: enc.transparent,
            dither: enc.dither,
            global_palette: enc.global_palette,
        }
    }
}

impl OutputConfig {
    pub fn validate(&self) -> DashflowResult<()> {
        if self.fps == 0 || self.fps > MAX_FPS {
            return Err(DashflowError::validation(format!(
                "fps must be in [1, {MAX_FPS}], got {}",
                self.fps
            )));
        }
        if !self.background.is_opaque() {
            return Err(DashflowError::validation("background must be opaque"));
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(DashflowError::validation("output width/height must be > 0"));
        }
        self.encode_options().validate()
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            quality: self.quality,
            workers: self.workers,
            transparent: self.transparent,
            dither: self.dither,
            global_palette: self.global_palette,
            background: self.background,
        }
    }
}

/// Everything a generation request needs besides the scene, as loaded from a JSON file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashflowConfig {
    pub animation: AnimationConfig,
    pub output: OutputConfig,
    pub speed: SpeedConfig,
}

impl DashflowConfig {
    pub fn from_json_str(s: &str) -> DashflowResult<Self> {
        let cfg: Self = serde_json::from_str(s).context("parse config JSON")?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> DashflowResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> DashflowResult<()> {
        self.speed.validate()?;
        self.animation.validate(&self.speed)?;
        self.output.validate()
    }
}
