use crate::{
    config::{AnimationConfig, OutputConfig},
    encode::{Encoder, encode_frames, gif::GIF_MAX_DIM},
    foundation::core::CancelToken,
    foundation::error::{DashflowError, DashflowResult},
    progress::{ProgressTracker, StepStatus, StepUpdate},
    raster::{RasterSettings, Rasterizer, render_frames},
    scene::SvgScene,
    speed::{SpeedConfig, frame_delay_ms},
};

pub const STEP_PREPARE: &str = "prepare";
pub const STEP_RENDER: &str = "render";
pub const STEP_ENCODE: &str = "encode";

pub const STEPS: [(&str, &str); 3] = [
    (STEP_PREPARE, "Preparing scene"),
    (STEP_RENDER, "Rendering frames"),
    (STEP_ENCODE, "Encoding GIF"),
];

/// Inputs for one generation run.
#[derive(Clone, Copy, Debug)]
pub struct GenerateRequest<'a> {
    pub scene: &'a SvgScene,
    pub animation: &'a AnimationConfig,
    pub output: &'a OutputConfig,
    pub speed: &'a SpeedConfig,
}

#[derive(Clone, Debug)]
pub struct Generated {
    pub bytes: Vec<u8>,
    pub frame_count: u32,
    pub frame_delay_ms: u32,
    pub width: u32,
    pub height: u32,
}

/// Frame count, delay and pixel size resolved for a request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plan {
    pub frame_count: u32,
    pub frame_delay_ms: u32,
    pub width: u32,
    pub height: u32,
}

/// Validate `req` and work out what will be rendered, without rendering anything.
pub fn plan(req: &GenerateRequest<'_>) -> DashflowResult<Plan> {
    req.speed.validate()?;
    req.animation.validate(req.speed)?;
    req.output.validate()?;
    if req.scene.paths().is_empty() {
        return Err(DashflowError::invalid_scene("no dashed paths to animate"));
    }

    let (scene_w, scene_h) = req.scene.pixel_size();
    let width = req.output.width.unwrap_or(scene_w);
    let height = req.output.height.unwrap_or(scene_h);
    if width > GIF_MAX_DIM || height > GIF_MAX_DIM {
        return Err(DashflowError::validation(format!(
            "output size {width}x{height} exceeds the GIF limit of {GIF_MAX_DIM}"
        )));
    }

    Ok(Plan {
        frame_count: req
            .speed
            .frame_count(req.animation.speed, req.output.fps),
        frame_delay_ms: frame_delay_ms(req.output.fps),
        width,
        height,
    })
}

/// Render and encode one looping animation, reporting through `tracker`.
///
/// Any failure is recorded on the tracker against the step it happened in and returned as is.
#[tracing::instrument(skip_all, fields(paths = req.scene.paths().len()))]
pub fn generate(
    req: &GenerateRequest<'_>,
    rasterizer: &mut dyn Rasterizer,
    encoder: &mut dyn Encoder,
    tracker: &ProgressTracker,
    cancel: &CancelToken,
) -> DashflowResult<Generated> {
    tracker.start_process(&STEPS);

    let fail = |stage: &str, err: DashflowError| {
        tracker.set_error(err.to_string(), Some(stage));
        err
    };

    tracker.update_step(STEP_PREPARE, StepUpdate::status(StepStatus::InProgress));
    let plan = plan(req).map_err(|e| fail(STEP_PREPARE, e))?;
    tracker.update_step(
        STEP_PREPARE,
        StepUpdate::status(StepStatus::Completed).with_message(format!(
            "{} paths, {} frames at {}x{}",
            req.scene.paths().len(),
            plan.frame_count,
            plan.width,
            plan.height
        )),
    );

    tracker.update_step(STEP_RENDER, StepUpdate::status(StepStatus::InProgress));
    let settings = RasterSettings {
        width: plan.width,
        height: plan.height,
        frame_count: plan.frame_count,
        background: req.output.background,
    };
    let mut on_frame = |i: u32| {
        tracker.update_step(
            STEP_RENDER,
            StepUpdate::progress(100.0 * f64::from(i) / f64::from(plan.frame_count)),
        );
    };
    let frames = render_frames(
        req.scene,
        &req.scene.dash_lengths(),
        &settings,
        req.animation,
        rasterizer,
        Some(&mut on_frame),
        cancel,
    )
    .map_err(|e| fail(STEP_RENDER, e))?;
    tracker.update_step(STEP_RENDER, StepUpdate::status(StepStatus::Completed));

    tracker.update_step(STEP_ENCODE, StepUpdate::status(StepStatus::InProgress));
    let mut on_progress = |p: f64| {
        tracker.update_step(STEP_ENCODE, StepUpdate::progress(p * 100.0));
    };
    let bytes = encode_frames(
        &frames,
        plan.frame_delay_ms,
        &req.output.encode_options(),
        encoder,
        Some(&mut on_progress),
        cancel,
    )
    .map_err(|e| fail(STEP_ENCODE, e))?;
    tracker.update_step(
        STEP_ENCODE,
        StepUpdate::status(StepStatus::Completed).with_message(format!("{} bytes", bytes.len())),
    );

    tracing::info!(
        frames = plan.frame_count,
        bytes = bytes.len(),
        "generated animation"
    );
    Ok(Generated {
        bytes,
        frame_count: plan.frame_count,
        frame_delay_ms: plan.frame_delay_ms,
        width: plan.width,
        height: plan.height,
    })
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
