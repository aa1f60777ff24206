use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, TAU};

use kurbo::{Point, Rect};

use crate::{
    config::Configuration,
    person::{PersonId, PersonNode},
};

/// One annular sector of the fan, in chart coordinates.
///
/// Angles are radians with 0 pointing up and positive values turning
/// clockwise; `start <= end`. The root generation is a full disc
/// (`inner == 0`, span `TAU`).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Wedge {
    pub inner: f64,
    pub outer: f64,
    pub start: f64,
    pub end: f64,
}

impl Wedge {
    pub fn is_disc(&self) -> bool {
        self.inner == 0.0 && self.end - self.start >= TAU - 1e-9
    }

    pub fn mid_angle(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn mid_radius(&self) -> f64 {
        (self.inner + self.outer) / 2.0
    }

    /// Polar to chart coordinates for this angle convention.
    pub fn point(radius: f64, angle: f64) -> Point {
        Point::new(radius * angle.sin(), -radius * angle.cos())
    }

    /// Tight axis-aligned bounding box of the sector.
    ///
    /// Extreme coordinates occur either at one of the four corners or where
    /// the outer arc crosses a multiple of 90 degrees.
    pub fn bounds(&self) -> Rect {
        if self.is_disc() {
            return Rect::new(-self.outer, -self.outer, self.outer, self.outer);
        }

        let mut bounds: Option<Rect> = None;
        let mut grow = |p: Point| {
            let r = Rect::new(p.x, p.y, p.x, p.y);
            bounds = Some(match bounds {
                Some(b) => b.union(r),
                None => r,
            });
        };

        for radius in [self.inner, self.outer] {
            for angle in [self.start, self.end] {
                grow(Self::point(radius, angle));
            }
        }

        let mut k = (self.start / FRAC_PI_2).ceil();
        while k * FRAC_PI_2 <= self.end {
            grow(Self::point(self.outer, k * FRAC_PI_2));
            k += 1.0;
        }

        bounds.unwrap_or(Rect::ZERO)
    }
}

/// Hierarchical angle/radius assignment for one dataset snapshot.
///
/// Generation `d` splits the configured fan angle equally among its nodes in
/// dataset order; a complete ahnentafel enumeration (placeholders included)
/// therefore puts every parent pair exactly over its child. Depth 0 becomes
/// the center disc.
#[derive(Clone, Copy, Debug)]
pub struct FanLayout {
    span: f64,
    start: f64,
    center_radius: f64,
    ring_width: f64,
}

impl FanLayout {
    pub fn new(config: &Configuration) -> Self {
        let span = f64::from(config.fan_degree).to_radians();
        Self {
            span,
            start: -span / 2.0,
            center_radius: config.center_radius,
            ring_width: config.ring_width,
        }
    }

    /// Fraction of the fan span covered up to `angle`, clamped to 0..1.
    /// Drives hue assignment along the fan.
    pub fn span_fraction(&self, angle: f64) -> f64 {
        if self.span == 0.0 {
            return 0.0;
        }
        ((angle - self.start) / self.span).clamp(0.0, 1.0)
    }

    /// Inner and outer radius of generation `depth`.
    pub fn radii(&self, depth: u32) -> (f64, f64) {
        if depth == 0 {
            return (0.0, self.center_radius);
        }
        let inner = self.center_radius + f64::from(depth - 1) * self.ring_width;
        (inner, inner + self.ring_width)
    }

    pub fn place(&self, nodes: &[PersonNode]) -> BTreeMap<PersonId, Wedge> {
        let mut by_depth: BTreeMap<u32, Vec<&PersonNode>> = BTreeMap::new();
        for node in nodes {
            by_depth.entry(node.depth).or_default().push(node);
        }

        let mut placed = BTreeMap::new();
        for (depth, row) in by_depth {
            if depth == 0 {
                for node in row {
                    placed.insert(
                        node.id,
                        Wedge {
                            inner: 0.0,
                            outer: self.center_radius,
                            start: 0.0,
                            end: TAU,
                        },
                    );
                }
                continue;
            }

            let (inner, outer) = self.radii(depth);
            let slice = self.span / row.len() as f64;
            for (i, node) in row.iter().enumerate() {
                let start = self.start + i as f64 * slice;
                placed.insert(
                    node.id,
                    Wedge {
                        inner,
                        outer,
                        start,
                        end: start + slice,
                    },
                );
            }
        }

        placed
    }

    /// Radial band just outside the outermost occupied generation, where the
    /// color ring sits.
    pub fn ring_band(&self, max_depth: u32, band_width: f64) -> (f64, f64) {
        let (_, outer) = self.radii(max_depth);
        (outer, outer + band_width)
    }
}
