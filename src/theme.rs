use serde::{Deserialize, Serialize};

const LIGHT_BACKGROUND: &str = "#ffffff";
const LIGHT_NODE_FILL: &str = "#f6f8fa";
const LIGHT_NODE_STROKE: &str = "#d0d7de";
const LIGHT_TEXT: &str = "#24292f";
const LIGHT_CONNECTOR: &str = "#8c959f";
const LIGHT_ACCENT: &str = "#ddf4ff";
const LIGHT_SELECTION: &str = "#0969da";

const DARK_BACKGROUND: &str = "#0d1117";
const DARK_NODE_FILL: &str = "#161b22";
const DARK_NODE_STROKE: &str = "#30363d";
const DARK_TEXT: &str = "#c9d1d9";
const DARK_CONNECTOR: &str = "#6e7681";
const DARK_ACCENT: &str = "#1f3b5c";
const DARK_SELECTION: &str = "#58a6ff";

const FONT_FAMILY: &str = "sans-serif";
const FONT_SIZE: f32 = 14.0;
const CORNER_RADIUS: f32 = 8.0;

const BUILTIN_THEMES: &[&str] = &["light", "dark"];

/// Colors and text settings used when drawing a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default = "default_node_fill")]
    pub node_fill_color: String,
    #[serde(default = "default_node_stroke")]
    pub node_stroke_color: String,
    #[serde(default = "default_text")]
    pub text_color: String,
    #[serde(default = "default_connector")]
    pub connector_color: String,
    /// Fill for nodes that carry a color tag without a usable hex value,
    /// such as accepted suggestions.
    #[serde(default = "default_accent")]
    pub accent_color: String,
    #[serde(default = "default_selection")]
    pub selection_color: String,

    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_corner_radius")]
    pub corner_radius: f32,
}

fn default_background() -> String {
    LIGHT_BACKGROUND.to_string()
}
fn default_node_fill() -> String {
    LIGHT_NODE_FILL.to_string()
}
fn default_node_stroke() -> String {
    LIGHT_NODE_STROKE.to_string()
}
fn default_text() -> String {
    LIGHT_TEXT.to_string()
}
fn default_connector() -> String {
    LIGHT_CONNECTOR.to_string()
}
fn default_accent() -> String {
    LIGHT_ACCENT.to_string()
}
fn default_selection() -> String {
    LIGHT_SELECTION.to_string()
}
fn default_font_family() -> String {
    FONT_FAMILY.to_string()
}
fn default_font_size() -> f32 {
    FONT_SIZE
}
fn default_corner_radius() -> f32 {
    CORNER_RADIUS
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}

impl Theme {
    pub fn light() -> Self {
        Theme {
            background_color: LIGHT_BACKGROUND.to_string(),
            node_fill_color: LIGHT_NODE_FILL.to_string(),
            node_stroke_color: LIGHT_NODE_STROKE.to_string(),
            text_color: LIGHT_TEXT.to_string(),
            connector_color: LIGHT_CONNECTOR.to_string(),
            accent_color: LIGHT_ACCENT.to_string(),
            selection_color: LIGHT_SELECTION.to_string(),
            font_family: FONT_FAMILY.to_string(),
            font_size: FONT_SIZE,
            corner_radius: CORNER_RADIUS,
        }
    }

    pub fn dark() -> Self {
        Theme {
            background_color: DARK_BACKGROUND.to_string(),
            node_fill_color: DARK_NODE_FILL.to_string(),
            node_stroke_color: DARK_NODE_STROKE.to_string(),
            text_color: DARK_TEXT.to_string(),
            connector_color: DARK_CONNECTOR.to_string(),
            accent_color: DARK_ACCENT.to_string(),
            selection_color: DARK_SELECTION.to_string(),
            ..Self::light()
        }
    }

    pub fn from_builtin(name: &str) -> Result<Self, String> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "light" => Ok(Self::light()),
            "dark" => Ok(Self::dark()),
            _ => Err(format!(
                "Unknown built-in theme '{}'. Available: {}",
                name,
                Self::list_builtins().join(", ")
            )),
        }
    }

    pub fn list_builtins() -> Vec<&'static str> {
        BUILTIN_THEMES.to_vec()
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse theme TOML: {}", e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| format!("Failed to parse theme YAML: {}", e))
    }

    /// A builtin name, or a path to a TOML or YAML theme file.
    pub fn load(name_or_path: &str) -> Result<Self, String> {
        let path = std::path::Path::new(name_or_path);
        if !path.is_file() {
            return Self::from_builtin(name_or_path);
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read theme file: {}", e))?;
        // Try TOML first, then YAML
        if let Ok(theme) = Self::from_toml(&content) {
            Ok(theme)
        } else if let Ok(theme) = Self::from_yaml(&content) {
            Ok(theme)
        } else {
            Err(format!(
                "Failed to parse theme file as TOML or YAML: {}",
                path.display()
            ))
        }
    }
}
