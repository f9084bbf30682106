use super::*;
use crate::{
    config::AnimationConfig,
    overlay::{GlintOverlay, GradientSweep, PlainStroke},
    schedule::compute_frame_state,
};

const SCENE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="200" height="100" viewBox="0 0 200 100">
  <metadata>exported</metadata>
  <defs><style>.a{}</style></defs>
  <rect x="0" y="0" width="200" height="100" fill="#123456"></rect>
  <g stroke-linecap="round">
    <path id="arrow" d="M0 50 L200 50" stroke="#000000" stroke-width="2" stroke-dasharray="8 4" stroke-dashoffset="3"/>
    <path d="M0 0 L100 0" style="stroke: #333; stroke-dasharray: 5; stroke-dashoffset: 1"><title>second</title></path>
    <path d="M0 0 L10 10" stroke="#000"/>
  </g>
</svg>"##;

fn plain_style<'a>() -> FrameStyle<'a> {
    FrameStyle {
        background: Color::WHITE,
        stroke_width: None,
        strategy: &PlainStroke,
        overlays: None,
    }
}

#[test]
fn parse_finds_dashed_paths_only() {
    let scene = SvgScene::parse(SCENE).unwrap();
    assert_eq!(scene.width(), 200.0);
    assert_eq!(scene.height(), 100.0);
    assert_eq!(scene.pixel_size(), (200, 100));

    let paths = scene.paths();
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0].id, "arrow");
    assert_eq!(paths[0].dash_pattern, vec![8.0, 4.0]);
    assert!((paths[0].total_length - 200.0).abs() < 1e-6);
    assert_eq!(paths[1].id, "dash-1");
    assert!((paths[1].total_length - 100.0).abs() < 1e-6);

    // The scroll distance is the plain pattern sum, odd-length patterns included.
    assert_eq!(scene.dash_lengths(), vec![12.0, 5.0]);
}

#[test]
fn parse_rejects_scenes_without_dashes() {
    let err = SvgScene::parse(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><path d="M0 0 L1 1" stroke-dasharray="none"/></svg>"#,
    )
    .unwrap_err();
    assert!(matches!(err, DashflowError::InvalidScene(_)));

    let err = SvgScene::parse("<svg><path").unwrap_err();
    assert!(matches!(err, DashflowError::InvalidScene(_)));

    let err = SvgScene::parse(r#"<html><path stroke-dasharray="1"/></html>"#).unwrap_err();
    assert!(matches!(err, DashflowError::InvalidScene(_)));
}

#[test]
fn size_falls_back_to_view_box() {
    let scene = SvgScene::parse(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 64.5 32" width="100%"><path d="M0 0 L10 0" stroke-dasharray="2,2"/></svg>"#,
    )
    .unwrap();
    assert_eq!(scene.width(), 64.5);
    assert_eq!(scene.height(), 32.0);
    assert_eq!(scene.pixel_size(), (65, 32));
}

#[test]
fn unmeasurable_paths_fall_back_to_dash_period() {
    let scene = SvgScene::parse(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><path d="garbage" stroke-dasharray="3 1"/></svg>"#,
    )
    .unwrap();
    assert_eq!(scene.paths()[0].total_length, 4.0);
}

#[test]
fn odd_dash_pattern_scrolls_by_its_sum() {
    let scene = SvgScene::parse(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><path d="garbage" stroke-dasharray="6"/></svg>"#,
    )
    .unwrap();
    assert_eq!(scene.dash_lengths(), vec![6.0]);
    assert_eq!(scene.paths()[0].total_length, 6.0);

    let last = compute_frame_state(5, 6, &scene.dash_lengths(), None);
    assert_eq!(last.dash_offsets, vec![-6.0]);
    let out = scene.apply_frame_state(&last, &plain_style());
    assert!(out.contains(r#"stroke-dashoffset="-6""#), "{out}");
}

#[test]
fn frame_patch_sets_offsets_and_background() {
    let scene = SvgScene::parse(SCENE).unwrap();
    let state = compute_frame_state(1, 3, &scene.dash_lengths(), None);
    let out = scene.apply_frame_state(&state, &plain_style());

    assert!(out.contains(r#"stroke-dashoffset="-6""#), "{out}");
    assert!(out.contains(r#"stroke-dashoffset="-2.5""#), "{out}");
    assert!(!out.contains(r#"stroke-dashoffset="3""#));
    assert!(!out.contains("stroke-dashoffset: 1"));
    // Untouched style declarations survive.
    assert!(out.contains("stroke:#333"));
    assert!(out.contains("<title>second</title></path>"));
    // Exported background recolored, and a full-canvas one inserted.
    assert!(!out.contains("#123456"));
    assert!(out.contains(r##"<rect x="0" y="0" width="100%" height="100%" fill="#ffffff"/>"##));
    assert!(out.contains(r##"fill="#ffffff"></rect>"##));

    roxmltree::Document::parse(&out).unwrap();
    // Source is never mutated.
    assert_eq!(scene.source(), SCENE);
}

#[test]
fn frame_patch_is_deterministic() {
    let scene = SvgScene::parse(SCENE).unwrap();
    let state = compute_frame_state(2, 5, &scene.dash_lengths(), None);
    assert_eq!(
        scene.apply_frame_state(&state, &plain_style()),
        scene.apply_frame_state(&state, &plain_style())
    );
}

#[test]
fn stroke_width_override_applies_to_every_animated_path() {
    let scene = SvgScene::parse(SCENE).unwrap();
    let state = compute_frame_state(0, 2, &scene.dash_lengths(), None);
    let style = FrameStyle {
        stroke_width: Some(3.5),
        ..plain_style()
    };
    let out = scene.apply_frame_state(&state, &style);
    assert_eq!(out.matches(r#"stroke-width="3.5""#).count(), 2);
    assert!(!out.contains(r#"stroke-width="2""#));
}

#[test]
fn glint_overlay_follows_each_base_path() {
    let scene = SvgScene::parse(SCENE).unwrap();
    let cfg = AnimationConfig {
        use_glint_overlay: true,
        color_from: Color::rgb(0x22, 0x22, 0x22),
        color_to: Color::rgb(0xff, 0xcc, 0x00),
        ..AnimationConfig::default()
    };
    let strategy = GlintOverlay::new(&cfg);
    let specs: Vec<_> = scene
        .paths()
        .iter()
        .filter_map(|p| strategy.build_overlay(p, &cfg))
        .collect();
    let state = compute_frame_state(4, 5, &scene.dash_lengths(), Some(&specs));
    let style = FrameStyle {
        background: Color::BLACK,
        stroke_width: None,
        strategy: &strategy,
        overlays: Some(&specs),
    };
    let out = scene.apply_frame_state(&state, &style);

    assert_eq!(out.matches(r##"stroke="#ffcc00""##).count(), 2);
    assert_eq!(out.matches(r##"stroke="#222222""##).count(), 2);
    assert_eq!(out.matches(r#"id="arrow""#).count(), 1);
    // The glint ends the cycle one full path length along.
    assert!(out.contains(r#"stroke-dashoffset="-200""#), "{out}");

    let base = out.find(r#"id="arrow""#).unwrap();
    let glint = out.find(r##"stroke="#ffcc00""##).unwrap();
    assert!(glint > base);

    roxmltree::Document::parse(&out).unwrap();
}

#[test]
fn gradient_sweep_inserts_defs() {
    let scene = SvgScene::parse(SCENE).unwrap();
    let cfg = AnimationConfig {
        gradient_sweep: true,
        ..AnimationConfig::default()
    };
    let strategy = GradientSweep::new(&cfg, scene.width());
    let state = compute_frame_state(0, 4, &scene.dash_lengths(), None);
    let style = FrameStyle {
        strategy: &strategy,
        ..plain_style()
    };
    let out = scene.apply_frame_state(&state, &style);
    assert!(out.contains("<defs><linearGradient"));
    assert_eq!(out.matches(r#"stroke="url(#dashflow-wave)""#).count(), 2);
    roxmltree::Document::parse(&out).unwrap();
}

#[test]
fn measures_curved_paths() {
    let quarter = measure_path_length("M100 0 A100 100 0 0 1 0 100").unwrap();
    assert!((quarter - std::f64::consts::FRAC_PI_2 * 100.0).abs() < 0.5);
    assert!(measure_path_length("not a path").is_none());
}

#[test]
fn dashed_path_rejects_bad_input() {
    assert!(DashedPath::new("x", 0.0, vec![1.0]).is_err());
    assert!(DashedPath::new("x", 10.0, vec![-1.0]).is_err());
    assert_eq!(
        DashedPath::new("x", 10.0, vec![2.0, 3.0, 1.0])
            .unwrap()
            .dash_length(),
        6.0
    );
}
