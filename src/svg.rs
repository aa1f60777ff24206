use std::f64::consts::PI;
use std::fmt::Write as _;

use crate::{
    color::SEGMENT_STROKE,
    layout::Wedge,
    scene::{Label, RingSlice, Scene, Segment},
    viewport::Viewport,
};

/// Format a coordinate for SVG output: two decimals, trailing zeros trimmed.
fn num(v: f64) -> String {
    let r = (v * 100.0).round() / 100.0;
    if r == r.trunc() {
        format!("{}", r as i64)
    } else {
        format!("{r}")
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Path data for one annular sector: along the outer arc, in along the end
/// radius, back along the inner arc. The disc case is handled by the caller
/// with a `<circle>` element.
pub fn wedge_path(w: &Wedge) -> String {
    let large = if w.end - w.start > PI { 1 } else { 0 };
    let o0 = Wedge::point(w.outer, w.start);
    let o1 = Wedge::point(w.outer, w.end);
    let i1 = Wedge::point(w.inner, w.end);
    let i0 = Wedge::point(w.inner, w.start);

    format!(
        "M{},{} A{},{} 0 {} 1 {},{} L{},{} A{},{} 0 {} 0 {},{} Z",
        num(o0.x),
        num(o0.y),
        num(w.outer),
        num(w.outer),
        large,
        num(o1.x),
        num(o1.y),
        num(i1.x),
        num(i1.y),
        num(w.inner),
        num(w.inner),
        large,
        num(i0.x),
        num(i0.y),
    )
}

fn write_wedge(out: &mut String, segment: &Segment) {
    let stroke = SEGMENT_STROKE.to_svg();
    if segment.wedge.is_disc() {
        let _ = write!(
            out,
            r#"  <circle cx="0" cy="0" r="{}" fill="{}" stroke="{}" stroke-width="1" opacity="{}"/>"#,
            num(segment.wedge.outer),
            segment.fill.to_svg(),
            stroke,
            num(segment.opacity),
        );
    } else {
        let _ = write!(
            out,
            r#"  <path d="{}" fill="{}" stroke="{}" stroke-width="1" opacity="{}"/>"#,
            wedge_path(&segment.wedge),
            segment.fill.to_svg(),
            stroke,
            num(segment.opacity),
        );
    }
    out.push('\n');
}

fn write_ring_slice(out: &mut String, slice: &RingSlice) {
    let _ = write!(
        out,
        r#"  <path d="{}" fill="{}" opacity="{}"/>"#,
        wedge_path(&slice.wedge),
        slice.fill.to_svg(),
        num(slice.opacity),
    );
    out.push('\n');
}

fn write_label(out: &mut String, label: &Label) {
    let transform = if label.rotation_deg == 0.0 {
        String::new()
    } else {
        format!(
            r#" transform="rotate({} {} {})""#,
            num(label.rotation_deg),
            num(label.pos.x),
            num(label.pos.y),
        )
    };
    let _ = write!(
        out,
        r#"  <text x="{}" y="{}" font-size="{}" fill="{}" opacity="{}" text-anchor="middle"{}>{}</text>"#,
        num(label.pos.x),
        num(label.pos.y),
        num(label.font_size),
        label.fill.to_svg(),
        num(label.opacity),
        transform,
        escape(&label.text),
    );
    out.push('\n');
}

/// Serialize the scene into a standalone SVG document framed by `viewport`.
///
/// Wedges are written first, then the color ring, then every label, so text
/// always sits on top of the paint underneath it.
pub fn document(scene: &Scene, viewport: &Viewport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="{}">"#,
        num(viewport.width),
        num(viewport.height),
        viewport.view_box(),
    );

    for segment in &scene.segments {
        write_wedge(&mut out, segment);
    }
    for slice in &scene.ring {
        write_ring_slice(&mut out, slice);
    }
    for segment in &scene.segments {
        for label in &segment.labels {
            write_label(&mut out, label);
        }
    }

    out.push_str("</svg>\n");
    out
}
