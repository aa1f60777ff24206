use crate::error::{ChartError, ChartResult};

/// Chart options recognized by the engine.
///
/// All fields have defaults so a configuration can be deserialized from a
/// partial JSON object (or built with `Configuration::default()` and adjusted).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Duration of one update transition batch, in milliseconds.
    pub update_duration: u32,
    /// Fully hide placeholder segments instead of rendering them in a neutral fill.
    pub hide_empty_segments: bool,
    /// Enable the outer color ring and its fade logic on updates.
    pub show_color_gradients: bool,
    /// Angular span of the fan in degrees (180..=360).
    pub fan_degree: u32,
    /// Number of generations shown, root included (2..=12).
    pub generations: u32,
    /// Radius of the root disc at the chart center.
    pub center_radius: f64,
    /// Radial thickness of one generation ring.
    pub ring_width: f64,
    /// Label font scale in percent.
    pub font_scale: u32,
    /// Width of the hosting element, used to frame the viewport.
    pub container_width: f64,
    /// Height of the hosting element, used to frame the viewport.
    pub container_height: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            update_duration: 1250,
            hide_empty_segments: false,
            show_color_gradients: false,
            fan_degree: 210,
            generations: 6,
            center_radius: 85.0,
            ring_width: 60.0,
            font_scale: 100,
            container_width: 0.0,
            container_height: 0.0,
        }
    }
}

impl Configuration {
    pub fn validate(&self) -> ChartResult<()> {
        if self.update_duration == 0 {
            return Err(ChartError::validation("update_duration must be > 0 ms"));
        }
        if !(180..=360).contains(&self.fan_degree) {
            return Err(ChartError::validation("fan_degree must be in 180..=360"));
        }
        if !(2..=12).contains(&self.generations) {
            return Err(ChartError::validation("generations must be in 2..=12"));
        }
        if !self.center_radius.is_finite() || self.center_radius <= 0.0 {
            return Err(ChartError::validation("center_radius must be > 0"));
        }
        if !self.ring_width.is_finite() || self.ring_width <= 0.0 {
            return Err(ChartError::validation("ring_width must be > 0"));
        }
        if self.font_scale == 0 {
            return Err(ChartError::validation("font_scale must be > 0 percent"));
        }
        for (name, v) in [
            ("container_width", self.container_width),
            ("container_height", self.container_height),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ChartError::validation(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        Ok(())
    }
}
