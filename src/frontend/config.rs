use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Names looked up, in order, in each directory by [`Config::discover`].
pub const CONFIG_FILE_NAMES: &[&str] = &[".typyrc", ".typyrc.toml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Plugins consulted for call-site hooks, in priority order.
    #[serde(default = "default_plugins")]
    pub plugins: Vec<String>,

    #[serde(default)]
    pub check: CheckConfig,

    #[serde(default)]
    pub errors: ErrorConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Report `reveal_type` notes.
    #[serde(default = "default_true")]
    pub show_revealed_types: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorConfig {
    #[serde(default = "default_100")]
    pub max_errors: usize,

    #[serde(default = "default_true")]
    pub show_suggestions: bool,

    #[serde(default = "default_true")]
    pub color: bool,

    #[serde(default)]
    pub format: ErrorFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorFormat {
    #[default]
    Default,
    Json,
    Compact,
}

impl FromStr for ErrorFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(ErrorFormat::Default),
            "json" => Ok(ErrorFormat::Json),
            "compact" => Ok(ErrorFormat::Compact),
            other => Err(format!(
                "Unknown format: {} (expected default, json or compact)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugins: default_plugins(),
            check: CheckConfig::default(),
            errors: ErrorConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self { enabled: true, show_revealed_types: true }
    }
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            max_errors: 100,
            show_suggestions: true,
            color: true,
            format: ErrorFormat::Default,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            include: vec!["**/*.py".to_string()],
            exclude: vec![
                "**/__pycache__/**".to_string(),
                "**/venv/**".to_string(),
                "**/.venv/**".to_string(),
            ],
        }
    }
}

fn default_true() -> bool { true }
fn default_100() -> usize { 100 }
fn default_plugins() -> Vec<String> { vec!["returns".to_string()] }

impl Config {
    /// Load configuration from a `.typyrc` file
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Find and load the nearest configuration file, starting from the
    /// current directory.
    pub fn discover() -> Self {
        match std::env::current_dir() {
            Ok(dir) => Self::discover_from(&dir),
            Err(_) => Self::default(),
        }
    }

    /// Walk up from `start` and load the first configuration file found.
    /// Unreadable or invalid files are skipped.
    pub fn discover_from(start: &Path) -> Self {
        match Self::find_file(start) {
            Some(path) => match Self::load(&path) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring configuration file");
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    fn find_file(start: &Path) -> Option<PathBuf> {
        start.ancestors().find_map(|dir| {
            CONFIG_FILE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
    }

    fn matches_glob(path: &Path, pattern: &str) -> bool {
        match glob::Pattern::new(&pattern.replace('\\', "/")) {
            Ok(compiled) => {
                let normalized = path.to_string_lossy().replace('\\', "/");
                compiled.matches(&normalized)
            }
            Err(e) => {
                warn!(pattern, error = %e, "Invalid path pattern");
                false
            }
        }
    }

    /// Check if a path should be checked based on include/exclude patterns
    pub fn should_check(&self, path: &Path) -> bool {
        if self.paths.exclude.iter().any(|p| Self::matches_glob(path, p)) {
            return false;
        }

        self.paths.include.is_empty()
            || self.paths.include.iter().any(|p| Self::matches_glob(path, p))
    }

    /// Generate default configuration file content
    pub fn generate_default() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate config"))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(path, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.check.enabled);
        assert_eq!(config.plugins, vec!["returns".to_string()]);
        assert_eq!(config.errors.format, ErrorFormat::Default);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
plugins = []

[check]
show_revealed_types = false

[errors]
max_errors = 50
format = "json"
"#;

        let config = Config::parse(toml).unwrap();
        assert!(config.check.enabled);
        assert!(!config.check.show_revealed_types);
        assert!(config.plugins.is_empty());
        assert_eq!(config.errors.max_errors, 50);
        assert_eq!(config.errors.format, ErrorFormat::Json);
    }

    #[test]
    fn test_missing_plugins_key_keeps_default() {
        let config = Config::parse("[errors]\ncolor = false\n").unwrap();
        assert_eq!(config.plugins, vec!["returns".to_string()]);
        assert!(!config.errors.color);
    }

    #[test]
    fn test_invalid_config() {
        let error = Config::parse("[errors]\nmax_errors = \"many\"\n").unwrap_err();
        assert!(error.starts_with("Failed to parse config"));
    }

    #[test]
    fn test_should_check() {
        let config = Config::default();
        assert!(config.should_check(Path::new("src/main.py")));
        assert!(!config.should_check(Path::new("project/venv/lib/site.py")));
        assert!(!config.should_check(Path::new("src/notes.txt")));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("compact".parse::<ErrorFormat>(), Ok(ErrorFormat::Compact));
        assert!("xml".parse::<ErrorFormat>().is_err());
    }

    #[test]
    fn test_generated_default_round_trips() {
        let generated = Config::generate_default();
        assert_eq!(Config::parse(&generated).unwrap(), Config::default());
    }
}
