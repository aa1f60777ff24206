use crate::{
    color::{EMPTY_SEGMENT_FILL, Rgba8, SEGMENT_FILL},
    config::Configuration,
    layout::{FanLayout, Wedge},
    person::PersonNode,
};

/// Width of the color ring band outside the outermost generation.
pub const RING_BAND_WIDTH: f64 = 12.0;

const HUE_SPAN: f64 = 300.0;
const SATURATION: f64 = 0.45;

/// Deterministic fill of one segment.
///
/// With gradients disabled every real person shares the flat default fill.
/// With gradients enabled the hue tracks the segment's position along the fan
/// and the lightness rises with depth, so outer generations fade toward
/// white. Placeholders always get the neutral empty fill.
pub fn segment_fill(config: &Configuration, layout: &FanLayout, node: &PersonNode, wedge: &Wedge) -> Rgba8 {
    if node.is_placeholder() {
        return EMPTY_SEGMENT_FILL;
    }
    if !config.show_color_gradients {
        return SEGMENT_FILL;
    }

    let hue = layout.span_fraction(wedge.mid_angle()) * HUE_SPAN;
    let lightness = (0.42 + 0.06 * f64::from(node.depth)).min(0.85);
    Rgba8::from_hsl(hue, SATURATION, lightness)
}

/// Angular slices of the outer color ring, one per node of the outermost
/// occupied generation. Each slice carries the fully saturated hue of its
/// angular position so the ring reads as a legend for the gradient.
pub fn ring_slices(
    layout: &FanLayout,
    nodes: &[PersonNode],
    wedges: &std::collections::BTreeMap<crate::person::PersonId, Wedge>,
) -> Vec<(Wedge, Rgba8)> {
    let Some(max_depth) = nodes.iter().map(|n| n.depth).max() else {
        return Vec::new();
    };
    if max_depth == 0 {
        return Vec::new();
    }

    let (inner, outer) = layout.ring_band(max_depth, RING_BAND_WIDTH);
    nodes
        .iter()
        .filter(|n| n.depth == max_depth)
        .filter_map(|n| wedges.get(&n.id).map(|w| (n, w)))
        .map(|(_, wedge)| {
            let hue = layout.span_fraction(wedge.mid_angle()) * HUE_SPAN;
            let band = Wedge {
                inner,
                outer,
                start: wedge.start,
                end: wedge.end,
            };
            (band, Rgba8::from_hsl(hue, 0.85, 0.55))
        })
        .collect()
}
