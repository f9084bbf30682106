//! Speed control: maps a 0–100 slider onto a speed multiplier through a configurable curve, and
//! a speed onto a cycle duration and frame count.

use serde::{Deserialize, Serialize};

use crate::foundation::error::{DashflowError, DashflowResult};

/// Shape applied to the normalized slider position before it is mapped into the speed range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeedCurve {
    Linear,
    #[default]
    Exponential,
    Logarithmic,
    EaseInOut,
}

impl SpeedCurve {
    pub const ALL: [Self; 4] = [
        Self::Linear,
        Self::Exponential,
        Self::Logarithmic,
        Self::EaseInOut,
    ];

    /// Forward curve on `[0, 1]`.
    pub fn apply(self, normalized: f64) -> f64 {
        let n = normalized.clamp(0.0, 1.0);
        match self {
            Self::Linear => n,
            Self::Exponential => n.powi(3),
            Self::Logarithmic => (n * 9.0 + 1.0).log10(),
            Self::EaseInOut => (1.0 - (n * std::f64::consts::PI).cos()) / 2.0,
        }
    }

    /// Exact inverse of [`SpeedCurve::apply`] on `[0, 1]`.
    pub fn invert(self, curved: f64) -> f64 {
        let c = curved.clamp(0.0, 1.0);
        match self {
            Self::Linear => c,
            Self::Exponential => c.cbrt(),
            Self::Logarithmic => (10f64.powf(c) - 1.0) / 9.0,
            Self::EaseInOut => (1.0 - 2.0 * c).acos() / std::f64::consts::PI,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeedConfig {
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub curve: SpeedCurve,
    /// Cycle duration in seconds at 1x speed.
    pub base_duration: f64,
    /// Lower bound on the frame count so any speed still shows motion.
    pub min_frames: u32,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            min: 0.25,
            max: 50.0,
            default: 2.0,
            curve: SpeedCurve::Exponential,
            base_duration: 0.5,
            min_frames: 3,
        }
    }
}

impl SpeedConfig {
    pub fn validate(&self) -> DashflowResult<()> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min <= 0.0 {
            return Err(DashflowError::validation(
                "speed range must be finite with min > 0",
            ));
        }
        if self.min >= self.max {
            return Err(DashflowError::validation("speed min must be < max"));
        }
        if !(self.min..=self.max).contains(&self.default) {
            return Err(DashflowError::validation(
                "default speed must lie within [min, max]",
            ));
        }
        if !self.base_duration.is_finite() || self.base_duration <= 0.0 {
            return Err(DashflowError::validation("base_duration must be > 0"));
        }
        if self.min_frames < 3 {
            return Err(DashflowError::validation("min_frames must be >= 3"));
        }
        Ok(())
    }

    pub fn clamp_speed(&self, speed: f64) -> f64 {
        if speed.is_nan() {
            return self.default;
        }
        speed.clamp(self.min, self.max)
    }

    /// Slider position (0–100) to speed multiplier.
    pub fn slider_to_speed(&self, slider: f64) -> f64 {
        let normalized = slider.clamp(0.0, 100.0) / 100.0;
        let curved = self.curve.apply(normalized);
        let speed = self.min + curved * (self.max - self.min);
        tracing::debug!(slider, normalized, curved, speed, "speed from slider");
        speed
    }

    /// Speed multiplier to slider position (0–100), unrounded so that
    /// `slider_to_speed(speed_to_slider(s)) == s` up to float error.
    pub fn speed_to_slider(&self, speed: f64) -> f64 {
        let speed = self.clamp_speed(speed);
        let normalized = (speed - self.min) / (self.max - self.min);
        self.curve.invert(normalized) * 100.0
    }

    /// Integer slider position, as a UI control would display it.
    pub fn speed_to_slider_rounded(&self, speed: f64) -> u8 {
        self.speed_to_slider(speed).round() as u8
    }

    /// Cycle duration in seconds; higher speed means a shorter cycle.
    pub fn duration(&self, speed: f64) -> f64 {
        let speed = self.clamp_speed(speed);
        let duration = self.base_duration / speed;
        tracing::debug!(
            speed,
            base_duration = self.base_duration,
            duration,
            "cycle duration"
        );
        duration
    }

    pub fn frame_count(&self, speed: f64, fps: u32) -> u32 {
        let duration = self.duration(speed);
        let raw = (f64::from(fps) * duration).round();
        let frames = if raw.is_finite() && raw > 0.0 {
            (raw.min(f64::from(u32::MAX)) as u32).max(self.min_frames)
        } else {
            self.min_frames
        };
        tracing::debug!(speed, fps, duration, frames, "frame count");
        frames
    }
}

/// Per-frame delay of the output container.
pub fn frame_delay_ms(fps: u32) -> u32 {
    if fps == 0 {
        return 0;
    }
    (1000.0 / f64::from(fps)).round() as u32
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub value: f64,
    /// Display duration in seconds.
    pub duration: f64,
    pub description: &'static str,
}

pub const SPEED_PRESETS: [SpeedPreset; 6] = [
    SpeedPreset {
        id: "cinematic",
        name: "Cinematic",
        value: 0.5,
        duration: 1.0,
        description: "Slow, dramatic reveal",
    },
    SpeedPreset {
        id: "smooth",
        name: "Smooth",
        value: 1.0,
        duration: 0.5,
        description: "Gentle, easy to follow",
    },
    SpeedPreset {
        id: "normal",
        name: "Normal",
        value: 2.0,
        duration: 0.25,
        description: "Standard speed",
    },
    SpeedPreset {
        id: "quick",
        name: "Quick",
        value: 4.0,
        duration: 0.125,
        description: "Fast but visible",
    },
    SpeedPreset {
        id: "rapid",
        name: "Rapid",
        value: 8.0,
        duration: 0.0625,
        description: "Very fast animation",
    },
    SpeedPreset {
        id: "instant",
        name: "Instant",
        value: 20.0,
        duration: 0.025,
        description: "Near-instant reveal",
    },
];

pub fn preset(id: &str) -> Option<&'static SpeedPreset> {
    SPEED_PRESETS.iter().find(|p| p.id == id)
}

/// Preset whose value is nearest to `speed`; ties go to the slower preset.
pub fn closest_preset(speed: f64) -> &'static SpeedPreset {
    let mut best = &SPEED_PRESETS[0];
    let mut best_diff = f64::INFINITY;
    for p in &SPEED_PRESETS {
        let diff = (p.value - speed).abs();
        if diff < best_diff {
            best_diff = diff;
            best = p;
        }
    }
    best
}

pub fn format_speed(speed: f64) -> String {
    if speed < 1.0 {
        format!("{:.1}× slower", 1.0 / speed)
    } else if speed == 1.0 {
        "1× (normal)".to_string()
    } else {
        format!("{speed:.1}× faster")
    }
}

pub fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else if seconds < 10.0 {
        format!("{seconds:.2}s")
    } else {
        format!("{seconds:.1}s")
    }
}

#[cfg(test)]
#[path = "../tests/unit/speed.rs"]
mod tests;
