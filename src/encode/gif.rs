use std::borrow::Cow;

use color_quant::NeuQuant;
use image::{Rgba, RgbaImage, imageops::ColorMap};
use rayon::prelude::*;

use super::{EncodeFailure, EncodeJob, EncodeOptions, Encoder};
use crate::foundation::core::CancelToken;

const PALETTE_SIZE: usize = 256;

/// Largest width or height a GIF logical screen can declare.
pub const GIF_MAX_DIM: u32 = u16::MAX as u32;

/// Frames sampled to train a shared palette.
const PALETTE_SAMPLE_FRAMES: usize = 8;

/// GIF delays are stored in centiseconds; `ms` is rounded to the nearest one (at least 1).
pub fn delay_centis(ms: u32) -> u16 {
    let cs = (u64::from(ms) + 5) / 10;
    cs.clamp(1, u64::from(u16::MAX)) as u16
}

/// Looping GIF container with NeuQuant palettes.
///
/// Frames are quantized on a rayon pool of `workers` threads, one chunk at a time, and written in
/// order as each chunk completes.
#[derive(Clone, Copy, Debug, Default)]
pub struct GifEncoder;

impl GifEncoder {
    pub fn new() -> Self {
        Self
    }
}

struct QuantizedFrame {
    indices: Vec<u8>,
    palette: Option<Vec<u8>>,
    transparent: Option<u8>,
}

/// Adapts a trained palette to `image`'s dithering.
struct PaletteMap<'a>(&'a NeuQuant);

impl ColorMap for PaletteMap<'_> {
    type Color = Rgba<u8>;

    fn index_of(&self, color: &Rgba<u8>) -> usize {
        self.0.index_of(&color.0)
    }

    fn lookup(&self, index: usize) -> Option<Rgba<u8>> {
        self.0.lookup(index).map(Rgba)
    }

    fn has_lookup(&self) -> bool {
        true
    }

    fn map_color(&self, color: &mut Rgba<u8>) {
        self.0.map_pixel(&mut color.0);
    }
}

fn train_shared_palette(frames: &[RgbaImage], quality: u8) -> NeuQuant {
    let step = frames.len().div_ceil(PALETTE_SAMPLE_FRAMES).max(1);
    let mut sample = Vec::new();
    for frame in frames.iter().step_by(step) {
        sample.extend_from_slice(frame.as_raw());
    }
    NeuQuant::new(i32::from(quality), PALETTE_SIZE, &sample)
}

fn quantize_frame(
    frame: &RgbaImage,
    shared: Option<&NeuQuant>,
    options: &EncodeOptions,
) -> QuantizedFrame {
    let local;
    let quant = match shared {
        Some(q) => q,
        None => {
            local = NeuQuant::new(i32::from(options.quality), PALETTE_SIZE, frame.as_raw());
            &local
        }
    };

    // `imageops::dither` diffuses into the next column unchecked; single-column frames map directly.
    let indices = if options.dither && frame.width() >= 2 {
        let mut dithered = frame.clone();
        image::imageops::dither(&mut dithered, &PaletteMap(quant));
        dithered.pixels().map(|p| quant.index_of(&p.0) as u8).collect()
    } else {
        frame.pixels().map(|p| quant.index_of(&p.0) as u8).collect()
    };
    let transparent = options
        .transparent
        .then(|| quant.index_of(&options.background.opaque().to_image_rgba().0) as u8);

    QuantizedFrame {
        indices,
        palette: shared.is_none().then(|| quant.color_map_rgb()),
        transparent,
    }
}

impl Encoder for GifEncoder {
    fn encode(
        &mut self,
        job: &EncodeJob<'_>,
        on_progress: &mut dyn FnMut(f64),
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, EncodeFailure> {
        let (w, h) = job.dimensions();
        let width = u16::try_from(w)
            .map_err(|_| EncodeFailure::failed(format!("frame width {w} exceeds the GIF limit")))?;
        let height = u16::try_from(h).map_err(|_| {
            EncodeFailure::failed(format!("frame height {h} exceeds the GIF limit"))
        })?;
        let options = job.options;
        let workers = options.workers.max(1);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(EncodeFailure::failed)?;

        let shared = options
            .global_palette
            .then(|| train_shared_palette(job.frames, options.quality));
        let header_palette = shared
            .as_ref()
            .map(NeuQuant::color_map_rgb)
            .unwrap_or_default();

        let mut encoder = ::gif::Encoder::new(Vec::new(), width, height, &header_palette)
            .map_err(EncodeFailure::failed)?;
        encoder
            .set_repeat(::gif::Repeat::Infinite)
            .map_err(EncodeFailure::failed)?;

        let delay = delay_centis(job.frame_delay_ms);
        // Keyed-out pixels must not show the previous frame through.
        let dispose = if options.transparent {
            ::gif::DisposalMethod::Background
        } else {
            ::gif::DisposalMethod::Keep
        };
        let total = job.frames.len();
        let mut written = 0usize;

        for chunk in job.frames.chunks(workers) {
            if cancel.is_cancelled() {
                tracing::debug!(written, total, "gif encoding aborted");
                return Err(EncodeFailure::Aborted);
            }

            let quantized: Vec<QuantizedFrame> = pool.install(|| {
                chunk
                    .par_iter()
                    .map(|frame| quantize_frame(frame, shared.as_ref(), options))
                    .collect()
            });

            for q in quantized {
                let frame = ::gif::Frame {
                    width,
                    height,
                    delay,
                    dispose,
                    transparent: q.transparent,
                    palette: q.palette,
                    buffer: Cow::Owned(q.indices),
                    ..::gif::Frame::default()
                };
                encoder.write_frame(&frame).map_err(EncodeFailure::failed)?;
                written += 1;
            }
            on_progress(written as f64 / total as f64);
        }

        encoder.into_inner().map_err(EncodeFailure::failed)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/gif.rs"]
mod tests;
