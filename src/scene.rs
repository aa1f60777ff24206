use std::collections::BTreeSet;

use kurbo::{Point, Rect};

use crate::{
    color::{LABEL_FILL, Rgba8},
    config::Configuration,
    gradient,
    layout::{FanLayout, Wedge},
    person::{PersonId, PersonNode},
    reconcile::{NodeState, PreviousState},
};

/// Distinguishes labels placed before this update cycle from freshly staged
/// ones, so the two sets can fade in opposite directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelMark {
    /// Settled label of the resting scene.
    Current,
    /// Label from before the cycle, fading out.
    Outgoing,
    /// Label staged for the incoming dataset, fading in.
    Incoming,
}

#[derive(Clone, Debug)]
pub struct Label {
    pub text: String,
    pub pos: Point,
    pub font_size: f64,
    pub rotation_deg: f64,
    pub fill: Rgba8,
    pub opacity: f64,
    pub mark: LabelMark,
}

/// Role of a color-ring slice across an update cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RingRole {
    Current,
    Incoming,
}

#[derive(Clone, Debug)]
pub struct RingSlice {
    pub wedge: Wedge,
    pub fill: Rgba8,
    pub opacity: f64,
    pub role: RingRole,
}

/// One person slot of the visible scene: arc geometry, paint state, labels
/// and the transient classification of the in-flight cycle.
#[derive(Clone, Debug)]
pub struct Segment {
    pub id: PersonId,
    pub xref: String,
    pub depth: u32,
    pub url: String,
    pub update_url: String,
    pub wedge: Wedge,
    pub fill: Rgba8,
    pub opacity: f64,
    /// Clickable mark of the resting scene; placeholders are never available.
    pub available: bool,
    /// Classification of the in-flight cycle, `None` between cycles.
    pub state: Option<NodeState>,
    pub labels: Vec<Label>,
}

impl Segment {
    pub fn is_placeholder(&self) -> bool {
        self.xref.is_empty()
    }
}

/// Explicit scene graph owned by the chart. Mutated only by the one cycle in
/// flight; everything the renderer and the exporter need is readable here.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub segments: Vec<Segment>,
    pub ring: Vec<RingSlice>,
}

impl Scene {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.ring.clear();
    }

    pub fn segment(&self, id: PersonId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn segment_mut(&mut self, id: PersonId) -> Option<&mut Segment> {
        self.segments.iter_mut().find(|s| s.id == id)
    }

    /// Value-object snapshot of the previous visual state handed to the
    /// reconciler at cycle start.
    pub fn previous_state(&self) -> PreviousState {
        let mut present = BTreeSet::new();
        let mut available = BTreeSet::new();
        for segment in &self.segments {
            present.insert(segment.id);
            if segment.available {
                available.insert(segment.id);
            }
        }
        PreviousState { present, available }
    }

    pub fn remove_segments(&mut self, ids: &[PersonId]) {
        self.segments.retain(|s| !ids.contains(&s.id));
    }

    /// Tight bounding box of everything visible; `None` for an empty scene.
    pub fn content_bounds(&self) -> Option<Rect> {
        let mut bounds: Option<Rect> = None;
        let mut grow = |r: Rect| {
            bounds = Some(match bounds {
                Some(b) => b.union(r),
                None => r,
            });
        };
        for segment in &self.segments {
            grow(segment.wedge.bounds());
        }
        for slice in &self.ring {
            grow(slice.wedge.bounds());
        }
        bounds
    }
}

/// Build the settled scene for one dataset snapshot.
///
/// Segments come out in dataset order, labeled and marked available where the
/// node carries a real person. Placeholders are always built here; the chart
/// decides whether they stay visible (`hide_empty_segments` drops them after
/// a draw, or fades them out across an update). The color ring is built only
/// when gradients are on.
pub fn build_scene(config: &Configuration, nodes: &[PersonNode]) -> Scene {
    let layout = FanLayout::new(config);
    let wedges = layout.place(nodes);

    let mut segments = Vec::with_capacity(nodes.len());
    for node in nodes {
        let wedge = wedges[&node.id];
        segments.push(Segment {
            id: node.id,
            xref: node.xref.clone(),
            depth: node.depth,
            url: node.url.clone(),
            update_url: node.update_url.clone(),
            wedge,
            fill: gradient::segment_fill(config, &layout, node, &wedge),
            opacity: 1.0,
            available: !node.is_placeholder(),
            state: None,
            labels: build_labels(config, node, &wedge, LabelMark::Current, 1.0),
        });
    }

    let ring = if config.show_color_gradients {
        gradient::ring_slices(&layout, nodes, &wedges)
            .into_iter()
            .map(|(wedge, fill)| RingSlice {
                wedge,
                fill,
                opacity: 1.0,
                role: RingRole::Current,
            })
            .collect()
    } else {
        Vec::new()
    };

    Scene { segments, ring }
}

/// Name and timespan lines for one segment, placed on the wedge midline.
pub fn build_labels(
    config: &Configuration,
    node: &PersonNode,
    wedge: &Wedge,
    mark: LabelMark,
    opacity: f64,
) -> Vec<Label> {
    if node.is_placeholder() {
        return Vec::new();
    }

    let scale = f64::from(config.font_scale) / 100.0;
    let name_size = ((15.0 - f64::from(node.depth)) * scale).max(8.0);
    let span_size = (name_size - 3.0).max(7.0);

    let mut labels = Vec::new();
    let mut push = |text: &str, pos: Point, size: f64, rotation_deg: f64| {
        if text.is_empty() {
            return;
        }
        labels.push(Label {
            text: text.to_string(),
            pos,
            font_size: size,
            rotation_deg,
            fill: LABEL_FILL,
            opacity,
            mark,
        });
    };

    if wedge.is_disc() {
        push(&node.name, Point::new(0.0, -4.0), name_size, 0.0);
        push(&node.timespan, Point::new(0.0, 14.0), span_size, 0.0);
        return labels;
    }

    let angle = wedge.mid_angle();
    let rotation = angle.to_degrees();
    let radius = wedge.mid_radius();
    push(&node.name, Wedge::point(radius + 6.0, angle), name_size, rotation);
    push(&node.timespan, Wedge::point(radius - 10.0, angle), span_size, rotation);
    labels
}
