use super::*;

const SCENE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20"><path id="a" d="M0 10 L40 10" stroke="#ff0000" stroke-width="6" stroke-dasharray="100 0"/></svg>"##;

#[derive(Default)]
struct Recorder {
    svgs: Vec<String>,
    fail_at: Option<usize>,
}

#[derive(Debug)]
struct Rejected;

impl std::fmt::Display for Rejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("rejected document")
    }
}

impl std::error::Error for Rejected {}

impl Rasterizer for Recorder {
    fn rasterize(&mut self, svg: &str, surface: &mut Pixmap) -> Result<(), BoxError> {
        if self.fail_at == Some(self.svgs.len()) {
            return Err(Box::new(Rejected));
        }
        self.svgs.push(svg.to_string());
        surface.pixels_mut()[0] =
            resvg::tiny_skia::PremultipliedColorU8::from_rgba(0, 0, 255, 255).unwrap();
        Ok(())
    }
}

fn settings(frame_count: u32) -> RasterSettings {
    RasterSettings {
        width: 40,
        height: 20,
        frame_count,
        background: Color::rgb(0, 255, 0),
    }
}

#[test]
fn frames_come_back_in_order_with_progress() {
    let scene = SvgScene::parse(SCENE).unwrap();
    let mut rec = Recorder::default();
    let mut seen = Vec::new();
    let mut on_frame = |i: u32| seen.push(i);

    let frames = render_frames(
        &scene,
        &scene.dash_lengths(),
        &settings(4),
        &AnimationConfig::default(),
        &mut rec,
        Some(&mut on_frame),
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(frames.len(), 4);
    assert_eq!(seen, vec![1, 2, 3, 4]);
    assert!(rec.svgs[0].contains(r#"stroke-dashoffset="0""#));
    assert!(rec.svgs[3].contains(r#"stroke-dashoffset="-100""#));
    for frame in &frames {
        assert_eq!(frame.dimensions(), (40, 20));
        // Surface is pre-filled with the background before rasterizing.
        assert_eq!(frame.get_pixel(39, 19).0, [0, 255, 0, 255]);
        assert_eq!(frame.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }
}

#[test]
fn rasterizer_errors_keep_their_source() {
    let scene = SvgScene::parse(SCENE).unwrap();
    let mut rec = Recorder {
        fail_at: Some(1),
        ..Recorder::default()
    };
    let err = render_frames(
        &scene,
        &scene.dash_lengths(),
        &settings(3),
        &AnimationConfig::default(),
        &mut rec,
        None,
        &CancelToken::new(),
    )
    .unwrap_err();

    let DashflowError::Rasterizer(source) = err else {
        panic!("expected rasterizer error, got {err:?}");
    };
    assert!(source.downcast_ref::<Rejected>().is_some());
}

#[test]
fn zero_sized_surface_is_a_context_error() {
    let scene = SvgScene::parse(SCENE).unwrap();
    let err = render_frames(
        &scene,
        &scene.dash_lengths(),
        &RasterSettings {
            width: 0,
            ..settings(3)
        },
        &AnimationConfig::default(),
        &mut Recorder::default(),
        None,
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, DashflowError::RasterContext(_)));
}

#[test]
fn mismatched_dash_lengths_are_rejected() {
    let scene = SvgScene::parse(SCENE).unwrap();
    let err = render_frames(
        &scene,
        &[1.0, 2.0],
        &settings(3),
        &AnimationConfig::default(),
        &mut Recorder::default(),
        None,
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, DashflowError::Validation(_)));
}

#[test]
fn cancellation_stops_between_frames() {
    let scene = SvgScene::parse(SCENE).unwrap();
    let cancel = CancelToken::new();
    let mut rec = Recorder::default();
    let token = cancel.clone();
    let mut on_frame = move |i: u32| {
        if i == 2 {
            token.cancel();
        }
    };
    let err = render_frames(
        &scene,
        &scene.dash_lengths(),
        &settings(5),
        &AnimationConfig::default(),
        &mut rec,
        Some(&mut on_frame),
        &cancel,
    )
    .unwrap_err();
    assert!(matches!(err, DashflowError::Cancelled));
    assert_eq!(rec.svgs.len(), 2);
}

#[test]
fn glint_frames_carry_overlay_copies() {
    let scene = SvgScene::parse(SCENE).unwrap();
    let anim = AnimationConfig {
        use_glint_overlay: true,
        ..AnimationConfig::default()
    };
    let mut rec = Recorder::default();
    render_frames(
        &scene,
        &scene.dash_lengths(),
        &settings(3),
        &anim,
        &mut rec,
        None,
        &CancelToken::new(),
    )
    .unwrap();
    assert!(rec.svgs.iter().all(|s| s.matches("<path").count() == 2));
}

#[test]
fn resvg_paints_the_stroke() {
    let scene = SvgScene::parse(SCENE).unwrap();
    let mut rasterizer = ResvgRasterizer::with_fontdb(usvg::fontdb::Database::new());
    let frames = render_frames(
        &scene,
        &scene.dash_lengths(),
        &settings(3),
        &AnimationConfig::default(),
        &mut rasterizer,
        None,
        &CancelToken::new(),
    )
    .unwrap();

    for frame in &frames {
        assert_eq!(frame.get_pixel(20, 10).0, [255, 0, 0, 255]);
        assert_eq!(frame.get_pixel(20, 1).0, [0, 255, 0, 255]);
    }
}

#[test]
fn resvg_rejects_garbage() {
    let mut rasterizer = ResvgRasterizer::with_fontdb(usvg::fontdb::Database::new());
    let mut surface = Pixmap::new(4, 4).unwrap();
    assert!(rasterizer.rasterize("<svg", &mut surface).is_err());
}

#[test]
fn single_frame_matches_the_full_pass() {
    let scene = SvgScene::parse(SCENE).unwrap();
    let mut all = Recorder::default();
    render_frames(
        &scene,
        &scene.dash_lengths(),
        &settings(4),
        &AnimationConfig::default(),
        &mut all,
        None,
        &CancelToken::new(),
    )
    .unwrap();

    let mut one = Recorder::default();
    render_frame(
        &scene,
        &scene.dash_lengths(),
        2,
        &settings(4),
        &AnimationConfig::default(),
        &mut one,
    )
    .unwrap();
    assert_eq!(one.svgs, vec![all.svgs[2].clone()]);

    let err = render_frame(
        &scene,
        &scene.dash_lengths(),
        4,
        &settings(4),
        &AnimationConfig::default(),
        &mut one,
    )
    .unwrap_err();
    assert!(matches!(err, DashflowError::Validation(_)));
}
