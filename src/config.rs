use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::mindmap::Geometry;
use crate::suggest::SuggestConfig;
use crate::theme::Theme;

/// Environment variable naming the data directory.
pub const HOME_ENV: &str = "MINDBLOOM_HOME";
const DEFAULT_HOME: &str = ".mindbloom";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Where the map collection lives. Defaults to the data directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Everything the binaries can be configured with. Missing sections take
/// their defaults, so an empty file is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub geometry: Geometry,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub suggest: SuggestConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config TOML: {}", e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| format!("Failed to parse config YAML: {}", e))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
        let config = match Self::from_toml(&content) {
            Ok(config) => config,
            Err(toml_err) => Self::from_yaml(&content).map_err(|yaml_err| {
                format!(
                    "Failed to parse config file {} as TOML ({}) or YAML ({})",
                    path.display(),
                    toml_err,
                    yaml_err
                )
            })?,
        };
        config.geometry.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Loads `path` if given, else `config.toml` from the data directory if
    /// present, else the defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self, String> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = home_dir().join(CONFIG_FILE);
                if default_path.is_file() {
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn store_dir(&self) -> PathBuf {
        self.store.dir.clone().unwrap_or_else(home_dir)
    }
}

/// `$MINDBLOOM_HOME`, or `./.mindbloom`.
pub fn home_dir() -> PathBuf {
    std::env::var_os(HOME_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn sections_override_individually() {
        let config = Config::from_toml(
            r##"
[geometry]
node_width = 240.0
horizontal_spacing = 100.0

[theme]
accent_color = "#ffcc00"

[suggest]
model = "gemini-1.5-pro"

[store]
dir = "/tmp/maps"
"##,
        )
        .unwrap();

        assert_eq!(config.geometry.node_width, 240.0);
        assert_eq!(config.geometry.column_step(), 340.0);
        assert_eq!(config.geometry.line_height, Geometry::default().line_height);
        assert_eq!(config.theme.accent_color, "#ffcc00");
        assert_eq!(config.suggest.model, "gemini-1.5-pro");
        assert_eq!(config.suggest.suggestions, 3);
        assert_eq!(config.store_dir(), PathBuf::from("/tmp/maps"));
    }

    #[test]
    fn load_falls_back_to_yaml_and_validates() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("config.yaml");
        std::fs::write(&yaml, "geometry:\n  chars_per_line: 30\ntheme:\n  font_size: 12.0\n").unwrap();
        let config = Config::load(&yaml).unwrap();
        assert_eq!(config.geometry.chars_per_line, 30);
        assert_eq!(config.theme.font_size, 12.0);

        let invalid = dir.path().join("bad.toml");
        std::fs::write(&invalid, "[geometry]\nnode_width = -5.0\n").unwrap();
        assert!(Config::load(&invalid).is_err());

        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }
}
