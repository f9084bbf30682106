use crate::overlay::OverlaySpec;

/// Lower end of the glint pacing range; `glint_speed` at or below this gets the strongest ease-in.
pub const PACE_EPSILON: f64 = 0.05;

/// Ease-in exponent used at the slowest glint pacing.
pub const PACE_POWER_SLOW: f64 = 3.0;

/// Ease-out exponent used at the fastest glint pacing.
pub const PACE_POWER_FAST: f64 = 0.5;

/// Offsets for every animated path at one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameState {
    pub index: u32,
    /// Normalized cycle position in `[0, 1]`.
    pub t: f64,
    /// `stroke-dashoffset` per animated path.
    pub dash_offsets: Vec<f64>,
    /// `stroke-dashoffset` per glint overlay, present only when the overlay is on.
    pub glint_offsets: Option<Vec<f64>>,
}

/// `t` for `frame_index`; the last frame lands exactly on `1.0`. A single frame is the end pose.
pub fn normalized_time(frame_index: u32, frame_count: u32) -> f64 {
    if frame_count > 1 {
        let last = frame_count - 1;
        f64::from(frame_index.min(last)) / f64::from(last)
    } else {
        1.0
    }
}

/// Easing exponent for the glint: small `speed_multiplier` eases in, large eases out.
pub fn pace_power(speed_multiplier: f64) -> f64 {
    let s = speed_multiplier.clamp(PACE_EPSILON, 1.0);
    let u = (s - PACE_EPSILON) / (1.0 - PACE_EPSILON);
    PACE_POWER_SLOW + (PACE_POWER_FAST - PACE_POWER_SLOW) * u
}

/// Glint offset at `t`: starts at `0` and always reaches `-path_length` at `t = 1`.
pub fn glint_offset(spec: &OverlaySpec, t: f64) -> f64 {
    let eased = t.clamp(0.0, 1.0).powf(pace_power(spec.speed_multiplier));
    -spec.path_length * eased
}

/// Pure per-frame state: identical inputs always give identical output.
pub fn compute_frame_state(
    frame_index: u32,
    frame_count: u32,
    dash_lengths: &[f64],
    overlays: Option<&[OverlaySpec]>,
) -> FrameState {
    let t = normalized_time(frame_index, frame_count);
    let dash_offsets = dash_lengths.iter().map(|len| -len * t).collect();
    let glint_offsets =
        overlays.map(|specs| specs.iter().map(|spec| glint_offset(spec, t)).collect());

    FrameState {
        index: frame_index,
        t,
        dash_offsets,
        glint_offsets,
    }
}

#[cfg(test)]
#[path = "../tests/unit/schedule.rs"]
mod tests;
