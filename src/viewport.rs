use kurbo::{Rect, Size};

use crate::error::{ChartError, ChartResult};

/// Minimum viewport height even when the content is shorter.
pub const MIN_HEIGHT: f64 = 500.0;
/// Minimum padding around the view box.
pub const MIN_PADDING: f64 = 10.0;

/// The coordinate rectangle framing rendered content, shared between the live
/// SVG view box and the export raster. All values are ceiled to whole units.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// SVG `viewBox` attribute form.
    pub fn view_box(&self) -> String {
        format!("{} {} {} {}", self.left, self.top, self.width, self.height)
    }
}

/// Compute the viewport for `content` inside `container`.
///
/// The view is at least as large as the container (and `min_height` tall), the
/// content is centered inside any extra space, and `min_padding` is applied on
/// all sides. Pure: identical inputs yield identical viewports.
///
/// Zero-area content degrades to a `min_height` square anchored at the content
/// origin instead of dividing into centering offsets.
pub fn compute_viewport(
    content: Rect,
    container: Size,
    min_height: f64,
    min_padding: f64,
) -> ChartResult<Viewport> {
    for (name, v) in [
        ("content.x", content.x0),
        ("content.y", content.y0),
        ("content.width", content.width()),
        ("content.height", content.height()),
        ("container.width", container.width),
        ("container.height", container.height),
        ("min_height", min_height),
        ("min_padding", min_padding),
    ] {
        if !v.is_finite() {
            return Err(ChartError::validation(format!(
                "viewport input {name} must be finite"
            )));
        }
    }
    for (name, v) in [
        ("content.width", content.width()),
        ("content.height", content.height()),
        ("container.width", container.width),
        ("container.height", container.height),
        ("min_height", min_height),
        ("min_padding", min_padding),
    ] {
        if v < 0.0 {
            return Err(ChartError::validation(format!(
                "viewport input {name} must be >= 0"
            )));
        }
    }

    if content.width() == 0.0 || content.height() == 0.0 {
        let side = (min_height + 2.0 * min_padding).ceil();
        return Ok(Viewport {
            left: (content.x0 - min_padding).ceil(),
            top: (content.y0 - min_padding).ceil(),
            width: side,
            height: side,
        });
    }

    let view_width = container.width.max(content.width());
    let view_height = container.height.max(content.height()).max(min_height);

    let offset_x = (view_width - content.width()) / 2.0;
    let offset_y = (view_height - content.height()) / 2.0;

    Ok(Viewport {
        left: (content.x0 - offset_x - min_padding).ceil(),
        top: (content.y0 - offset_y - min_padding).ceil(),
        width: (view_width + 2.0 * min_padding).ceil(),
        height: (view_height + 2.0 * min_padding).ceil(),
    })
}
