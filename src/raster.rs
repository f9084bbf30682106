use std::sync::Arc;

use image::RgbaImage;
use resvg::tiny_skia::{Pixmap, Transform};

use crate::{
    config::AnimationConfig,
    foundation::core::{CancelToken, Color},
    foundation::error::{BoxError, DashflowError, DashflowResult},
    overlay::{OverlaySpec, OverlayStrategy, select_strategy},
    scene::{FrameStyle, SvgScene},
    schedule::compute_frame_state,
};

/// Turns one serialized SVG frame into pixels.
///
/// The surface arrives allocated at the output size and pre-filled with the opaque background; the
/// document must be scaled to it rather than sized from its own attributes.
pub trait Rasterizer {
    fn rasterize(&mut self, svg: &str, surface: &mut Pixmap) -> Result<(), BoxError>;
}

/// [`Rasterizer`] backed by `usvg` parsing and `resvg` CPU rendering.
pub struct ResvgRasterizer {
    options: usvg::Options<'static>,
}

impl ResvgRasterizer {
    /// Uses the system fonts for any `<text>` in the scene.
    pub fn new() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        Self::with_fontdb(db)
    }

    pub fn with_fontdb(db: usvg::fontdb::Database) -> Self {
        Self {
            options: usvg::Options {
                fontdb: Arc::new(db),
                ..Default::default()
            },
        }
    }
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for ResvgRasterizer {
    fn rasterize(&mut self, svg: &str, surface: &mut Pixmap) -> Result<(), BoxError> {
        let tree = usvg::Tree::from_str(svg, &self.options)?;
        let size = tree.size();
        let sx = surface.width() as f32 / size.width();
        let sy = surface.height() as f32 / size.height();
        resvg::render(&tree, Transform::from_scale(sx, sy), &mut surface.as_mut());
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterSettings {
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
    pub background: Color,
}

/// Per-pass state shared by every frame: the strategy and glint geometry are built once.
struct FramePass<'a> {
    scene: &'a SvgScene,
    dash_lengths: &'a [f64],
    settings: &'a RasterSettings,
    stroke_width: Option<f64>,
    strategy: Box<dyn OverlayStrategy>,
    overlays: Option<Vec<OverlaySpec>>,
}

impl<'a> FramePass<'a> {
    fn new(
        scene: &'a SvgScene,
        dash_lengths: &'a [f64],
        settings: &'a RasterSettings,
        anim: &AnimationConfig,
    ) -> DashflowResult<Self> {
        if settings.frame_count == 0 {
            return Err(DashflowError::validation("frame_count must be >= 1"));
        }
        if dash_lengths.len() != scene.paths().len() {
            return Err(DashflowError::validation(format!(
                "got {} dash lengths for {} animated paths",
                dash_lengths.len(),
                scene.paths().len()
            )));
        }

        let strategy = select_strategy(anim, scene.width());
        let specs: Vec<OverlaySpec> = scene
            .paths()
            .iter()
            .filter_map(|p| strategy.build_overlay(p, anim))
            .collect();
        let overlays = (!specs.is_empty() && specs.len() == scene.paths().len()).then_some(specs);
        tracing::debug!(strategy = ?strategy.kind(), "frame pass ready");

        Ok(Self {
            scene,
            dash_lengths,
            settings,
            stroke_width: anim.stroke_width,
            strategy,
            overlays,
        })
    }

    fn render(&self, index: u32, rasterizer: &mut dyn Rasterizer) -> DashflowResult<RgbaImage> {
        let settings = self.settings;
        let background = settings.background.opaque();
        let state = compute_frame_state(
            index,
            settings.frame_count,
            self.dash_lengths,
            self.overlays.as_deref(),
        );
        let style = FrameStyle {
            background,
            stroke_width: self.stroke_width,
            strategy: self.strategy.as_ref(),
            overlays: self.overlays.as_deref(),
        };
        let svg = self.scene.apply_frame_state(&state, &style);

        let mut surface = Pixmap::new(settings.width, settings.height).ok_or_else(|| {
            DashflowError::raster_context(format!(
                "cannot allocate {}x{} surface for frame {index}",
                settings.width, settings.height
            ))
        })?;
        surface.fill(background.to_skia());
        rasterizer
            .rasterize(&svg, &mut surface)
            .map_err(DashflowError::Rasterizer)?;
        Ok(pixmap_to_rgba(&surface))
    }
}

/// Render every frame of one cycle, in index order.
///
/// `on_frame` receives the 1-based index of each finished frame. The scene is only read.
#[tracing::instrument(
    skip_all,
    fields(frames = settings.frame_count, width = settings.width, height = settings.height)
)]
pub fn render_frames(
    scene: &SvgScene,
    dash_lengths: &[f64],
    settings: &RasterSettings,
    anim: &AnimationConfig,
    rasterizer: &mut dyn Rasterizer,
    mut on_frame: Option<&mut dyn FnMut(u32)>,
    cancel: &CancelToken,
) -> DashflowResult<Vec<RgbaImage>> {
    let pass = FramePass::new(scene, dash_lengths, settings, anim)?;

    let mut frames = Vec::new();
    for i in 0..settings.frame_count {
        cancel.check()?;
        frames.push(pass.render(i, rasterizer)?);
        if let Some(cb) = on_frame.as_mut() {
            cb(i + 1);
        }
    }
    Ok(frames)
}

/// Render frame `index` of a `settings.frame_count` cycle on its own.
pub fn render_frame(
    scene: &SvgScene,
    dash_lengths: &[f64],
    index: u32,
    settings: &RasterSettings,
    anim: &AnimationConfig,
    rasterizer: &mut dyn Rasterizer,
) -> DashflowResult<RgbaImage> {
    if index >= settings.frame_count {
        return Err(DashflowError::validation(format!(
            "frame {index} is outside a {}-frame cycle",
            settings.frame_count
        )));
    }
    FramePass::new(scene, dash_lengths, settings, anim)?.render(index, rasterizer)
}

/// Straight-alpha copy of a premultiplied pixmap.
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    img
}

#[cfg(test)]
#[path = "../tests/unit/raster.rs"]
mod tests;
