use serde::{Deserialize, Serialize};

const NODE_WIDTH: f32 = 200.0;
const NODE_MIN_HEIGHT: f32 = 60.0;
const NODE_VERTICAL_PADDING: f32 = 20.0;
const NODE_HEADER_HEIGHT: f32 = 30.0;
const NODE_ACTIONS_HEIGHT: f32 = 40.0;
const HORIZONTAL_SPACING: f32 = 80.0;
const VERTICAL_SPACING: f32 = 40.0;
const CHARS_PER_LINE: usize = 25;
const LINE_HEIGHT: f32 = 18.0;

/// Size and spacing constants used by the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default = "default_node_width")]
    pub node_width: f32,
    #[serde(default = "default_node_min_height")]
    pub node_min_height: f32,
    /// Top plus bottom padding around the text block.
    #[serde(default = "default_node_vertical_padding")]
    pub node_vertical_padding: f32,
    /// Text block height floor, also used for empty text.
    #[serde(default = "default_node_header_height")]
    pub node_header_height: f32,
    #[serde(default = "default_node_actions_height")]
    pub node_actions_height: f32,
    #[serde(default = "default_horizontal_spacing")]
    pub horizontal_spacing: f32,
    #[serde(default = "default_vertical_spacing")]
    pub vertical_spacing: f32,
    #[serde(default = "default_chars_per_line")]
    pub chars_per_line: usize,
    #[serde(default = "default_line_height")]
    pub line_height: f32,
}

fn default_node_width() -> f32 {
    NODE_WIDTH
}
fn default_node_min_height() -> f32 {
    NODE_MIN_HEIGHT
}
fn default_node_vertical_padding() -> f32 {
    NODE_VERTICAL_PADDING
}
fn default_node_header_height() -> f32 {
    NODE_HEADER_HEIGHT
}
fn default_node_actions_height() -> f32 {
    NODE_ACTIONS_HEIGHT
}
fn default_horizontal_spacing() -> f32 {
    HORIZONTAL_SPACING
}
fn default_vertical_spacing() -> f32 {
    VERTICAL_SPACING
}
fn default_chars_per_line() -> usize {
    CHARS_PER_LINE
}
fn default_line_height() -> f32 {
    LINE_HEIGHT
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            node_width: NODE_WIDTH,
            node_min_height: NODE_MIN_HEIGHT,
            node_vertical_padding: NODE_VERTICAL_PADDING,
            node_header_height: NODE_HEADER_HEIGHT,
            node_actions_height: NODE_ACTIONS_HEIGHT,
            horizontal_spacing: HORIZONTAL_SPACING,
            vertical_spacing: VERTICAL_SPACING,
            chars_per_line: CHARS_PER_LINE,
            line_height: LINE_HEIGHT,
        }
    }
}

impl Geometry {
    /// Rejects values that would make the layout meaningless. Only positivity
    /// and finiteness are checked.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("node_width", self.node_width),
            ("node_min_height", self.node_min_height),
            ("node_vertical_padding", self.node_vertical_padding),
            ("node_header_height", self.node_header_height),
            ("node_actions_height", self.node_actions_height),
            ("horizontal_spacing", self.horizontal_spacing),
            ("vertical_spacing", self.vertical_spacing),
            ("line_height", self.line_height),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("Invalid geometry value for {}: {}", name, value));
            }
        }
        if self.chars_per_line == 0 {
            return Err("Invalid geometry value for chars_per_line: 0".to_string());
        }
        Ok(())
    }

    /// Horizontal distance between a parent's left edge and its children's.
    pub fn column_step(&self) -> f32 {
        self.node_width + self.horizontal_spacing
    }

    /// Estimated rendered height of a node holding `text`.
    ///
    /// Line count grows with character count, so long text only ever makes a
    /// node taller, never wider.
    pub fn node_height(&self, text: &str) -> f32 {
        let chars = text.chars().count();
        let lines = chars.div_ceil(self.chars_per_line);
        let text_height = (lines as f32 * self.line_height).max(self.node_header_height);
        (text_height + self.node_vertical_padding + self.node_actions_height)
            .max(self.node_min_height)
    }
}

#[cfg(test)]
mod tests {
    use super::Geometry;

    #[test]
    fn long_text_is_taller_than_short_text() {
        let geometry = Geometry::default();
        let short = geometry.node_height(&"x".repeat(10));
        let long = geometry.node_height(&"x".repeat(500));
        assert!(long > short);
        assert!(short >= geometry.node_min_height);
        assert!(long >= geometry.node_min_height);
    }

    #[test]
    fn empty_text_gets_at_least_min_height() {
        let geometry = Geometry::default();
        assert_eq!(geometry.node_height(""), 90.0);

        let tall_floor = Geometry {
            node_min_height: 150.0,
            ..Geometry::default()
        };
        assert_eq!(tall_floor.node_height(""), 150.0);
    }

    #[test]
    fn height_counts_characters_not_bytes() {
        let geometry = Geometry::default();
        // 25 multi-byte chars still fit on one line.
        assert_eq!(geometry.node_height(&"é".repeat(25)), 90.0);
        // 26 chars wrap onto a second line: 2 * 18 = 36 > header 30.
        assert_eq!(geometry.node_height(&"é".repeat(26)), 96.0);
    }

    #[test]
    fn validate_rejects_non_positive_values() {
        assert!(Geometry::default().validate().is_ok());

        let zero_width = Geometry {
            node_width: 0.0,
            ..Geometry::default()
        };
        assert!(zero_width.validate().unwrap_err().contains("node_width"));

        let nan_gap = Geometry {
            vertical_spacing: f32::NAN,
            ..Geometry::default()
        };
        assert!(nan_gap.validate().is_err());

        let no_wrap = Geometry {
            chars_per_line: 0,
            ..Geometry::default()
        };
        assert!(no_wrap.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let geometry: Geometry = toml::from_str("node_width = 240.0\n").unwrap();
        assert_eq!(geometry.node_width, 240.0);
        assert_eq!(geometry.vertical_spacing, 40.0);
        assert_eq!(geometry.chars_per_line, 25);
    }
}
