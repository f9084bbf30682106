//! Parsed SVG scene: the dashed paths to animate plus a clone-and-patch template that renders a
//! fresh SVG string for every frame without touching the parsed source.

use std::ops::Range;

use kurbo::{BezPath, ParamCurveArclen as _};

use crate::{
    foundation::core::{Color, fmt_num},
    foundation::error::{DashflowError, DashflowResult},
    overlay::{OverlaySpec, OverlayStrategy},
    schedule::FrameState,
};

const ARCLEN_ACCURACY: f64 = 1e-3;

/// Elements that may precede the exported background rect without being painted.
const NON_GRAPHIC: [&str; 6] = ["defs", "desc", "metadata", "style", "title", "script"];

/// One dashed stroke to animate.
#[derive(Clone, Debug, PartialEq)]
pub struct DashedPath {
    pub id: String,
    /// Geometric length of the outline, or the dash pattern sum when it cannot be measured.
    pub total_length: f64,
    pub dash_pattern: Vec<f64>,
}

impl DashedPath {
    pub fn new(
        id: impl Into<String>,
        total_length: f64,
        dash_pattern: Vec<f64>,
    ) -> DashflowResult<Self> {
        if !total_length.is_finite() || total_length <= 0.0 {
            return Err(DashflowError::validation("path total_length must be > 0"));
        }
        if dash_pattern.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(DashflowError::validation(
                "dash pattern entries must be finite and >= 0",
            ));
        }
        Ok(Self {
            id: id.into(),
            total_length,
            dash_pattern,
        })
    }

    /// Sum of the dash pattern: how far the dashes scroll per cycle.
    pub fn dash_length(&self) -> f64 {
        dash_sum(&self.dash_pattern)
    }
}

fn dash_sum(pattern: &[f64]) -> f64 {
    pattern.iter().sum()
}

/// Per-pass styling applied while serializing a frame.
pub struct FrameStyle<'a> {
    pub background: Color,
    pub stroke_width: Option<f64>,
    pub strategy: &'a dyn OverlayStrategy,
    /// Glint geometry per animated path; required when `FrameState::glint_offsets` is set.
    pub overlays: Option<&'a [OverlaySpec]>,
}

#[derive(Clone, Debug)]
struct ElementTemplate {
    range: Range<usize>,
    start_tag_end: usize,
    self_closing: bool,
    tag: String,
    attrs: Vec<(String, String)>,
    style: Vec<(String, String)>,
}

#[derive(Clone, Copy, Debug)]
enum Splice {
    Background,
    Path(usize),
}

#[derive(Clone, Debug)]
pub struct SvgScene {
    source: String,
    width: f64,
    height: f64,
    paths: Vec<DashedPath>,
    animated: Vec<ElementTemplate>,
    background_rect: Option<ElementTemplate>,
    /// Byte offset just past the root start tag.
    content_start: usize,
    splices: Vec<(usize, Splice)>,
}

impl SvgScene {
    /// Parse `svg` once and locate every dashed `<path>`.
    ///
    /// Fails with [`DashflowError::InvalidScene`] for malformed documents and for documents with no
    /// animatable dashed path.
    #[tracing::instrument(skip(svg), fields(bytes = svg.len()))]
    pub fn parse(svg: &str) -> DashflowResult<Self> {
        let doc = roxmltree::Document::parse(svg)
            .map_err(|e| DashflowError::invalid_scene(format!("malformed svg: {e}")))?;
        let root = doc.root_element();
        if root.tag_name().name() != "svg" {
            return Err(DashflowError::invalid_scene(format!(
                "root element is <{}>, expected <svg>",
                root.tag_name().name()
            )));
        }

        let (width, height) = scene_size(root)?;
        let content_start = start_tag_end(svg, root.range().start)
            .ok_or_else(|| DashflowError::invalid_scene("unterminated <svg> start tag"))?;

        let mut paths = Vec::new();
        let mut animated = Vec::new();
        for node in root
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "path")
        {
            let tpl = ElementTemplate::from_node(svg, node)?;
            let Some(pattern) = tpl.dash_pattern() else {
                continue;
            };
            let period = dash_sum(&pattern);
            if period <= 0.0 {
                tracing::debug!(range = ?tpl.range, "skipping dashed path with zero-length pattern");
                continue;
            }

            let total_length = node
                .attribute("d")
                .and_then(measure_path_length)
                .filter(|len| *len > 0.0)
                .unwrap_or(period);
            let id = node
                .attribute("id")
                .map(str::to_string)
                .unwrap_or_else(|| format!("dash-{}", paths.len()));

            paths.push(DashedPath::new(id, total_length, pattern)?);
            animated.push(tpl);
        }

        if paths.is_empty() {
            return Err(DashflowError::invalid_scene("no dashed paths found"));
        }

        let background_rect = root
            .children()
            .filter(|n| n.is_element())
            .find(|n| !NON_GRAPHIC.contains(&n.tag_name().name()))
            .filter(|n| n.tag_name().name() == "rect")
            .map(|n| ElementTemplate::from_node(svg, n))
            .transpose()?;

        let mut splices: Vec<(usize, Splice)> = animated
            .iter()
            .enumerate()
            .map(|(i, tpl)| (tpl.range.start, Splice::Path(i)))
            .collect();
        if let Some(bg) = &background_rect {
            splices.push((bg.range.start, Splice::Background));
        }
        splices.sort_by_key(|(start, _)| *start);

        tracing::debug!(paths = paths.len(), width, height, "parsed svg scene");

        Ok(Self {
            source: svg.to_string(),
            width,
            height,
            paths,
            animated,
            background_rect,
            content_start,
            splices,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Document size rounded up to whole pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width.ceil() as u32).max(1),
            (self.height.ceil() as u32).max(1),
        )
    }

    pub fn paths(&self) -> &[DashedPath] {
        &self.paths
    }

    /// Scroll distance per cycle for every animated path, in document order.
    pub fn dash_lengths(&self) -> Vec<f64> {
        self.paths.iter().map(DashedPath::dash_length).collect()
    }

    /// Serialize the scene for one frame.
    ///
    /// Animated paths get the frame's `stroke-dashoffset` and the strategy's stroke paint; with a
    /// glint overlay each path is followed by its overlay copy so the copy paints on top. A
    /// full-canvas background rect and the strategy's `<defs>` are inserted first.
    pub fn apply_frame_state(&self, state: &FrameState, style: &FrameStyle<'_>) -> String {
        let src = self.source.as_str();
        let mut out = String::with_capacity(src.len() + 256 * (self.animated.len() + 1));
        let background = style.background.to_hex();
        let base_stroke = style.strategy.base_stroke();
        let overlay_stroke = style.strategy.overlay_stroke();

        out.push_str(&src[..self.content_start]);
        out.push_str(&format!(
            r#"<rect x="0" y="0" width="100%" height="100%" fill="{background}"/>"#
        ));
        if let Some(defs) = style.strategy.defs(state.t) {
            out.push_str("<defs>");
            out.push_str(&defs);
            out.push_str("</defs>");
        }

        let mut cursor = self.content_start;
        for &(start, splice) in &self.splices {
            if start < cursor {
                continue;
            }
            out.push_str(&src[cursor..start]);
            match splice {
                Splice::Background => {
                    let Some(bg) = &self.background_rect else {
                        continue;
                    };
                    bg.write_patched(&mut out, src, &[("fill", background.clone())]);
                    cursor = bg.range.end;
                }
                Splice::Path(i) => {
                    let tpl = &self.animated[i];
                    let mut overrides = vec![(
                        "stroke-dashoffset",
                        fmt_num(state.dash_offsets.get(i).copied().unwrap_or(0.0)),
                    )];
                    if let Some(w) = style.stroke_width {
                        overrides.push(("stroke-width", fmt_num(w)));
                    }
                    if let Some(paint) = &base_stroke {
                        overrides.push(("stroke", paint.clone()));
                    }
                    tpl.write_patched(&mut out, src, &overrides);

                    let glint = state
                        .glint_offsets
                        .as_ref()
                        .and_then(|offsets| offsets.get(i))
                        .zip(style.overlays.and_then(|specs| specs.get(i)));
                    if let Some((offset, spec)) = glint {
                        let [on, off] = spec.dash_pattern();
                        let mut overrides = vec![
                            ("stroke-dasharray", format!("{} {}", fmt_num(on), fmt_num(off))),
                            ("stroke-dashoffset", fmt_num(*offset)),
                            ("fill", "none".to_string()),
                        ];
                        if let Some(w) = style.stroke_width {
                            overrides.push(("stroke-width", fmt_num(w)));
                        }
                        if let Some(paint) = &overlay_stroke {
                            overrides.push(("stroke", paint.clone()));
                        }
                        tpl.write_overlay_copy(&mut out, &overrides);
                    }
                    cursor = tpl.range.end;
                }
            }
        }
        out.push_str(&src[cursor..]);
        out
    }
}

impl ElementTemplate {
    fn from_node(src: &str, node: roxmltree::Node<'_, '_>) -> DashflowResult<Self> {
        let range = node.range();
        let start_tag_end = start_tag_end(src, range.start).ok_or_else(|| {
            DashflowError::invalid_scene(format!(
                "unterminated <{}> start tag",
                node.tag_name().name()
            ))
        })?;
        let self_closing = src[..start_tag_end].ends_with("/>");
        let tag: String = src[range.start + 1..start_tag_end]
            .chars()
            .take_while(|c| !c.is_whitespace() && *c != '/' && *c != '>')
            .collect();

        let mut attrs = Vec::new();
        let mut style = Vec::new();
        for attr in node.attributes() {
            let name = match attr.namespace().and_then(|uri| node.lookup_prefix(uri)) {
                Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", attr.name()),
                _ => attr.name().to_string(),
            };
            if name == "style" {
                style = parse_style(attr.value());
            } else {
                attrs.push((name, attr.value().to_string()));
            }
        }

        Ok(Self {
            range,
            start_tag_end,
            self_closing,
            tag,
            attrs,
            style,
        })
    }

    /// `stroke-dasharray` from `style` (which wins) or the presentation attribute.
    fn dash_pattern(&self) -> Option<Vec<f64>> {
        let raw = self
            .style
            .iter()
            .find(|(k, _)| k == "stroke-dasharray")
            .or_else(|| self.attrs.iter().find(|(k, _)| k == "stroke-dasharray"))
            .map(|(_, v)| v.trim())?;
        if raw.is_empty() || raw == "none" {
            return None;
        }
        let values = parse_number_list(raw)?;
        if values.is_empty() || values.iter().any(|v| *v < 0.0) {
            return None;
        }
        Some(values)
    }

    fn write_start_tag(&self, out: &mut String, overrides: &[(&str, String)], copy: bool) {
        let overridden = |name: &str| overrides.iter().any(|(n, _)| *n == name);

        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            if overridden(name) || (copy && name == "id") {
                continue;
            }
            push_attr(out, name, value);
        }
        let style: Vec<String> = self
            .style
            .iter()
            .filter(|(k, _)| !overridden(k))
            .map(|(k, v)| format!("{k}:{v}"))
            .collect();
        if !style.is_empty() {
            push_attr(out, "style", &style.join(";"));
        }
        for (name, value) in overrides {
            push_attr(out, name, value);
        }
    }

    /// The element with `overrides` replacing same-named attributes and style declarations.
    fn write_patched(&self, out: &mut String, src: &str, overrides: &[(&str, String)]) {
        self.write_start_tag(out, overrides, false);
        if self.self_closing {
            out.push_str("/>");
        } else {
            out.push('>');
            out.push_str(&src[self.start_tag_end..self.range.end]);
        }
    }

    /// Childless copy of the element without its `id`.
    fn write_overlay_copy(&self, out: &mut String, overrides: &[(&str, String)]) {
        self.write_start_tag(out, overrides, true);
        out.push_str("/>");
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

/// Byte offset just past the `>` closing the start tag that begins at `from`.
fn start_tag_end(src: &str, from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in src.as_bytes().iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i + 1),
            None => {}
        }
    }
    None
}

fn parse_style(s: &str) -> Vec<(String, String)> {
    s.split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

fn parse_number_list(s: &str) -> Option<Vec<f64>> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .map(|p| p.trim_end_matches("px").parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

fn parse_length(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.ends_with('%') {
        return None;
    }
    s.trim_end_matches("px")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn scene_size(root: roxmltree::Node<'_, '_>) -> DashflowResult<(f64, f64)> {
    let view_box = root
        .attribute("viewBox")
        .and_then(parse_number_list)
        .filter(|v| v.len() == 4);
    let width = root
        .attribute("width")
        .and_then(parse_length)
        .or_else(|| view_box.as_ref().map(|v| v[2]));
    let height = root
        .attribute("height")
        .and_then(parse_length)
        .or_else(|| view_box.as_ref().map(|v| v[3]));

    match (width, height) {
        (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Ok((w, h)),
        _ => Err(DashflowError::invalid_scene(
            "svg has no usable width/height or viewBox",
        )),
    }
}

/// Arc length of an SVG path `d` string.
pub fn measure_path_length(d: &str) -> Option<f64> {
    let path = BezPath::from_svg(d).ok()?;
    let len: f64 = path
        .segments()
        .map(|seg| seg.arclen(ARCLEN_ACCURACY))
        .sum();
    len.is_finite().then_some(len)
}

#[cfg(test)]
#[path = "../tests/unit/scene.rs"]
mod tests;
