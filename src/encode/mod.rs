//! Frame sequence to animated-image blob.
//!
//! [`encode_frames`] owns the contract every container backend shares: refuse empty input, flatten
//! frames onto an opaque background, keep progress monotonic, and map the backend's terminal
//! outcome onto [`DashflowError`]. The container itself lives behind [`Encoder`].

pub mod gif;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::foundation::{
    core::{CancelToken, Color},
    error::{BoxError, DashflowError, DashflowResult},
};

pub use self::gif::GifEncoder;

pub const QUALITY_BEST: u8 = 1;
pub const QUALITY_FASTEST: u8 = 30;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeOptions {
    /// Palette sampling factor: 1 samples every pixel, 30 samples the fewest.
    pub quality: u8,
    /// Threads used to quantize frames.
    pub workers: usize,
    /// Reserve the palette slot nearest `background` as the transparency key.
    pub transparent: bool,
    /// Floyd-Steinberg dithering. Off keeps colors stable from frame to frame.
    pub dither: bool,
    /// One palette for every frame instead of one per frame.
    pub global_palette: bool,
    pub background: Color,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            quality: 10,
            workers: 2,
            transparent: false,
            dither: false,
            global_palette: true,
            background: Color::WHITE,
        }
    }
}

impl EncodeOptions {
    pub fn validate(&self) -> DashflowResult<()> {
        if !(QUALITY_BEST..=QUALITY_FASTEST).contains(&self.quality) {
            return Err(DashflowError::validation(format!(
                "quality must be in [{QUALITY_BEST}, {QUALITY_FASTEST}], got {}",
                self.quality
            )));
        }
        if self.workers == 0 {
            return Err(DashflowError::validation("workers must be >= 1"));
        }
        Ok(())
    }
}

/// Ordered, normalized frames handed to an [`Encoder`]. All frames share one size.
#[derive(Clone, Copy, Debug)]
pub struct EncodeJob<'a> {
    pub frames: &'a [RgbaImage],
    pub frame_delay_ms: u32,
    pub options: &'a EncodeOptions,
}

impl EncodeJob<'_> {
    pub fn dimensions(&self) -> (u32, u32) {
        self.frames.first().map_or((0, 0), RgbaImage::dimensions)
    }
}

/// Terminal failure reported by an [`Encoder`].
#[derive(Debug)]
pub enum EncodeFailure {
    Aborted,
    Failed(BoxError),
}

impl EncodeFailure {
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed(err.into())
    }
}

pub trait Encoder {
    /// Encode `job` into one blob, reporting a fraction in `[0, 1]` as work completes.
    ///
    /// Must write frames in the order given. Returns [`EncodeFailure::Aborted`] once `cancel` is
    /// observed.
    fn encode(
        &mut self,
        job: &EncodeJob<'_>,
        on_progress: &mut dyn FnMut(f64),
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, EncodeFailure>;
}

/// Paint `frame` over an opaque `background` so no transparency reaches the container.
pub fn normalize_frame(frame: &RgbaImage, background: Color) -> RgbaImage {
    let (w, h) = frame.dimensions();
    let mut out = RgbaImage::from_pixel(w, h, background.opaque().to_image_rgba());
    image::imageops::overlay(&mut out, frame, 0, 0);
    out
}

#[tracing::instrument(skip_all, fields(frames = bitmaps.len(), frame_delay_ms = frame_delay_ms))]
pub fn encode_frames(
    bitmaps: &[RgbaImage],
    frame_delay_ms: u32,
    options: &EncodeOptions,
    encoder: &mut dyn Encoder,
    mut on_progress: Option<&mut dyn FnMut(f64)>,
    cancel: &CancelToken,
) -> DashflowResult<Vec<u8>> {
    let Some(first) = bitmaps.first() else {
        return Err(DashflowError::NoFrames);
    };
    options.validate()?;

    let dims = first.dimensions();
    if let Some((i, frame)) = bitmaps
        .iter()
        .enumerate()
        .find(|(_, f)| f.dimensions() != dims)
    {
        return Err(DashflowError::validation(format!(
            "frame {i} is {:?}, expected {dims:?}",
            frame.dimensions()
        )));
    }

    let frames: Vec<RgbaImage> = bitmaps
        .iter()
        .map(|f| normalize_frame(f, options.background))
        .collect();

    cancel.check()?;

    let mut high = 0.0_f64;
    let mut forward = |p: f64| {
        if p.is_finite() {
            high = high.max(p.clamp(0.0, 1.0));
        }
        if let Some(cb) = on_progress.as_mut() {
            cb(high);
        }
    };

    let job = EncodeJob {
        frames: &frames,
        frame_delay_ms,
        options,
    };
    match encoder.encode(&job, &mut forward, cancel) {
        Ok(bytes) if bytes.is_empty() => Err(DashflowError::encoder("encoder produced no bytes")),
        Ok(bytes) => {
            forward(1.0);
            tracing::debug!(bytes = bytes.len(), "encoded");
            Ok(bytes)
        }
        Err(EncodeFailure::Aborted) => Err(DashflowError::EncodingAborted),
        Err(EncodeFailure::Failed(err)) => Err(DashflowError::Encoder(err)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/mod.rs"]
mod tests;
