//! Stroke effects layered on top of the dash scroll.
//!
//! Three strategies share one contract: [`PlainStroke`] leaves the artwork's colors alone,
//! [`GradientSweep`] strokes every animated path with one repeating two-color gradient that slides
//! across the canvas, and [`GlintOverlay`] recolors each path to a dim base and races a short bright
//! copy of its outline over it once per cycle.

use crate::{
    config::AnimationConfig,
    foundation::core::{Color, fmt_num},
    scene::DashedPath,
};

/// Gap after the glint segment. Far longer than any drawable path, so `[glint, gap]` never shows a
/// second segment.
pub const GLINT_GAP_LENGTH: f64 = 1.0e6;

pub const GLINT_MIN_LENGTH: f64 = 2.0;

/// Gradient slides this many wave lengths per cycle.
pub const WAVE_SPEED_FACTOR: f64 = 1.2;

pub const WAVE_GRADIENT_ID: &str = "dashflow-wave";

/// Per-path glint geometry, derived once per path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlaySpec {
    pub glint_length: f64,
    pub gap_length: f64,
    /// Glint pacing in `(0, 1]`.
    pub speed_multiplier: f64,
    /// Distance the glint travels over one cycle.
    pub path_length: f64,
}

impl OverlaySpec {
    /// The overlay's `stroke-dasharray`.
    pub fn dash_pattern(&self) -> [f64; 2] {
        [self.glint_length, self.gap_length]
    }
}

/// Glint length as a fraction of the path, driven by the band width.
pub fn glint_fraction(band_width: f64) -> f64 {
    (0.02 + band_width * 0.25).clamp(0.03, 0.20)
}

pub fn glint_length(total_length: f64, band_width: f64) -> f64 {
    (total_length * glint_fraction(band_width)).max(GLINT_MIN_LENGTH)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayKind {
    Plain,
    GradientSweep,
    Glint,
}

pub trait OverlayStrategy: Send + Sync {
    fn kind(&self) -> OverlayKind;

    /// Glint geometry for `path`, or `None` when this strategy draws no per-path overlay.
    fn build_overlay(&self, path: &DashedPath, cfg: &AnimationConfig) -> Option<OverlaySpec>;

    /// Stroke paint for the base path, when the strategy recolors it.
    fn base_stroke(&self) -> Option<String> {
        None
    }

    /// Stroke paint for the overlay copy.
    fn overlay_stroke(&self) -> Option<String> {
        None
    }

    /// `<defs>` content for the frame at normalized time `t`.
    fn defs(&self, _t: f64) -> Option<String> {
        None
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PlainStroke;

impl OverlayStrategy for PlainStroke {
    fn kind(&self) -> OverlayKind {
        OverlayKind::Plain
    }

    fn build_overlay(&self, _path: &DashedPath, _cfg: &AnimationConfig) -> Option<OverlaySpec> {
        None
    }
}

#[derive(Clone, Debug)]
pub struct GlintOverlay {
    pub color_from: Color,
    pub color_to: Color,
}

impl GlintOverlay {
    pub fn new(cfg: &AnimationConfig) -> Self {
        Self {
            color_from: cfg.color_from,
            color_to: cfg.color_to,
        }
    }
}

impl OverlayStrategy for GlintOverlay {
    fn kind(&self) -> OverlayKind {
        OverlayKind::Glint
    }

    fn build_overlay(&self, path: &DashedPath, cfg: &AnimationConfig) -> Option<OverlaySpec> {
        let glint = glint_length(path.total_length, cfg.wave_band_width);
        Some(OverlaySpec {
            glint_length: glint,
            gap_length: GLINT_GAP_LENGTH.max(2.0 * (path.total_length + glint)),
            speed_multiplier: cfg.glint_speed.clamp(f64::MIN_POSITIVE, 1.0),
            path_length: path.total_length,
        })
    }

    fn base_stroke(&self) -> Option<String> {
        Some(self.color_from.to_hex())
    }

    fn overlay_stroke(&self) -> Option<String> {
        Some(self.color_to.to_hex())
    }
}

#[derive(Clone, Debug)]
pub struct GradientSweep {
    pub color_from: Color,
    pub color_to: Color,
    /// User-space length of one gradient cycle.
    pub wave_length: f64,
    /// Band width as a fraction of the cycle.
    pub band_width: f64,
}

impl GradientSweep {
    pub fn new(cfg: &AnimationConfig, canvas_width: f64) -> Self {
        let cycles = if cfg.wave_frequency > 0.0 {
            cfg.wave_frequency
        } else {
            1.0
        };
        Self {
            color_from: cfg.color_from,
            color_to: cfg.color_to,
            wave_length: (canvas_width / cycles).max(1.0),
            band_width: cfg.wave_band_width.clamp(0.02, 1.0),
        }
    }

    /// Horizontal shift of the gradient at normalized time `t`, in `[0, wave_length)`.
    pub fn shift(&self, t: f64) -> f64 {
        (self.wave_length * t * WAVE_SPEED_FACTOR).rem_euclid(self.wave_length)
    }
}

impl OverlayStrategy for GradientSweep {
    fn kind(&self) -> OverlayKind {
        OverlayKind::GradientSweep
    }

    fn build_overlay(&self, _path: &DashedPath, _cfg: &AnimationConfig) -> Option<OverlaySpec> {
        None
    }

    fn base_stroke(&self) -> Option<String> {
        Some(format!("url(#{WAVE_GRADIENT_ID})"))
    }

    fn defs(&self, t: f64) -> Option<String> {
        let half = self.band_width / 2.0;
        let from = self.color_from.to_hex();
        let to = self.color_to.to_hex();
        let stops = [
            (0.0, &from),
            ((0.5 - half).max(0.0), &from),
            (0.5, &to),
            ((0.5 + half).min(1.0), &from),
            (1.0, &from),
        ];

        let mut out = format!(
            r#"<linearGradient id="{WAVE_GRADIENT_ID}" gradientUnits="userSpaceOnUse" x1="0" y1="0" x2="{}" y2="0" spreadMethod="repeat" gradientTransform="translate({},0)">"#,
            fmt_num(self.wave_length),
            fmt_num(-self.shift(t)),
        );
        for (offset, color) in stops {
            out.push_str(&format!(
                r#"<stop offset="{}" stop-color="{color}"/>"#,
                fmt_num(offset)
            ));
        }
        out.push_str("</linearGradient>");
        Some(out)
    }
}

/// Pick the strategy the config asks for. The glint overlay replaces the gradient sweep.
pub fn select_strategy(cfg: &AnimationConfig, canvas_width: f64) -> Box<dyn OverlayStrategy> {
    if cfg.use_glint_overlay {
        Box::new(GlintOverlay::new(cfg))
    } else if cfg.gradient_sweep {
        Box::new(GradientSweep::new(cfg, canvas_width))
    } else {
        Box::new(PlainStroke)
    }
}

#[cfg(test)]
#[path = "../tests/unit/overlay.rs"]
mod tests;
