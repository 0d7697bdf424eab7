//! Configuration management for the grabwin daemon.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. `%APPDATA%/grabwin/grabwin/config/config.toml` (Windows standard)
//! 2. `~/.config/grabwin/config.toml` (Unix-style, for WSL compatibility)
//! 3. `./config.toml` (current directory, for development)

use anyhow::{Context, Result};
use directories::ProjectDirs;
use grabwin_core::{Exclusion, Modifiers, Settings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for grabwin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Modifiers that must be held to grab windows.
    pub activation: Modifiers,
    /// Edge snapping.
    pub snapping: SnappingConfig,
    /// Dimming of the window being manipulated.
    pub transparency: TransparencyConfig,
    /// Mouse-wheel Z-order cycling.
    pub rolodex: RolodexConfig,
    /// Behavior configuration.
    pub behavior: BehaviorConfig,
    /// Windows that are never grabbed.
    ///
    /// ```toml
    /// [[exclusions]]
    /// class = "Chrome_WidgetWin_1"
    /// title = ".*Picture in picture.*"
    ///
    /// [[exclusions]]
    /// class = "Progman"
    /// ```
    pub exclusions: Vec<Exclusion>,
}

/// Snapping-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnappingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Distance in pixels at which an edge snaps.
    #[serde(default = "default_threshold")]
    pub threshold: i32,

    /// Gap in pixels kept between snapped windows.
    pub padding: i32,
}

impl Default for SnappingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: default_threshold(),
            padding: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransparencyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Opacity while dragging (0-255).
    #[serde(default = "default_opacity")]
    pub opacity: u8,
}

impl Default for TransparencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            opacity: default_opacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolodexConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RolodexConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Behavior-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Smallest width and height a resize may produce.
    #[serde(default = "default_minimum_window_size")]
    pub minimum_window_size: i32,

    /// Minimum delay between window updates while dragging.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    /// Ignore the hotkey while a full-screen game or presentation runs.
    #[serde(default = "default_true")]
    pub disable_in_game_mode: bool,

    /// Holding the hotkey and moving the mouse records the window under
    /// the cursor as an exclusion.
    pub exclusion_detection: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            minimum_window_size: default_minimum_window_size(),
            update_interval_ms: default_update_interval_ms(),
            disable_in_game_mode: true,
            exclusion_detection: false,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_threshold() -> i32 {
    30
}

fn default_opacity() -> u8 {
    210
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_minimum_window_size() -> i32 {
    200
}

fn default_update_interval_ms() -> u64 {
    32
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A value that was out of range and has been replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: &str, message: String) -> Self {
        Self {
            field: field.to_string(),
            message,
        }
    }
}

/// Clamp `value` into `range`, recording a warning when it moves.
fn clamp_field<T>(value: &mut T, min: T, max: T, field: &str, warnings: &mut Vec<ConfigWarning>)
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    let clamped = if *value < min {
        min
    } else if *value > max {
        max
    } else {
        return;
    };
    warnings.push(ConfigWarning::new(
        field,
        format!("{} is outside {}..={}, using {}", value, min, max, clamped),
    ));
    *value = clamped;
}

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Tries the following locations in order:
    /// 1. `%APPDATA%/grabwin/grabwin/config/config.toml`
    /// 2. `~/.config/grabwin/config.toml`
    /// 3. `./config.toml`
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self> {
        match existing_config_path() {
            Some(path) => {
                tracing::info!("Loading config from: {}", path.display());
                Self::load_from_path(&path)
            }
            None => {
                tracing::info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Write the config back to the file it was loaded from, or to the
    /// primary location if there is none. Returns the path written.
    pub fn save(&self) -> Result<PathBuf> {
        let path = existing_config_path().unwrap_or_else(primary_config_path);
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write config file: {}", path.display()))?;
        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Clamp out-of-range values in place and describe what changed.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.activation.is_empty() {
            warnings.push(ConfigWarning::new(
                "activation",
                "no modifier selected, falling back to Alt".to_string(),
            ));
            self.activation = Modifiers::default();
        }

        clamp_field(&mut self.snapping.threshold, 0, 200, "snapping.threshold", &mut warnings);
        clamp_field(&mut self.snapping.padding, 0, 100, "snapping.padding", &mut warnings);
        clamp_field(
            &mut self.behavior.minimum_window_size,
            50,
            2000,
            "behavior.minimum_window_size",
            &mut warnings,
        );
        clamp_field(
            &mut self.behavior.update_interval_ms,
            1,
            1000,
            "behavior.update_interval_ms",
            &mut warnings,
        );

        let level = self.behavior.log_level.to_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            self.behavior.log_level = level;
        } else {
            warnings.push(ConfigWarning::new(
                "behavior.log_level",
                format!("unknown level {:?}, using info", self.behavior.log_level),
            ));
            self.behavior.log_level = default_log_level();
        }

        warnings
    }

    /// Runtime settings for the engine.
    pub fn to_settings(&self) -> Settings {
        Settings {
            activation: self.activation,
            snapping_enabled: self.snapping.enabled,
            snapping_threshold: self.snapping.threshold,
            snapping_padding: self.snapping.padding,
            transparency_enabled: self.transparency.enabled,
            transparency_opacity: self.transparency.opacity,
            rolodex_enabled: self.rolodex.enabled,
            minimum_window_size: self.behavior.minimum_window_size,
            update_interval: Duration::from_millis(self.behavior.update_interval_ms),
            exclusion_detection: self.behavior.exclusion_detection,
            exclusions: self.exclusions.clone(),
            disable_in_game_mode: self.behavior.disable_in_game_mode,
        }
    }

    /// Append exclusions not already listed. Returns how many were added.
    pub fn add_exclusions(&mut self, exclusions: Vec<Exclusion>) -> usize {
        let before = self.exclusions.len();
        for exclusion in exclusions {
            if !self.exclusions.contains(&exclusion) {
                self.exclusions.push(exclusion);
            }
        }
        self.exclusions.len() - before
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Windows standard: %APPDATA%/grabwin/grabwin/config/config.toml
    if let Some(proj_dirs) = ProjectDirs::from("com", "grabwin", "grabwin") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    // 2. Unix-style: ~/.config/grabwin/config.toml
    if let Some(home) = dirs_home() {
        paths.push(home.join(".config").join("grabwin").join("config.toml"));
    }

    // 3. Current directory: ./config.toml
    paths.push(PathBuf::from("config.toml"));

    paths
}

/// First config file that exists on disk.
pub fn existing_config_path() -> Option<PathBuf> {
    config_paths().into_iter().find(|p| p.exists())
}

/// Where a new config file is created.
pub fn primary_config_path() -> PathBuf {
    config_paths()
        .into_iter()
        .next()
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.activation.alt);
        assert!(!config.activation.win);
        assert!(config.snapping.enabled);
        assert_eq!(config.snapping.threshold, 30);
        assert_eq!(config.snapping.padding, 0);
        assert_eq!(config.transparency.opacity, 210);
        assert!(config.rolodex.enabled);
        assert_eq!(config.behavior.log_level, "info");
        assert_eq!(config.behavior.update_interval_ms, 32);
        assert!(config.behavior.disable_in_game_mode);
        assert!(config.exclusions.is_empty());
    }

    #[test]
    fn test_defaults_match_engine_defaults() {
        assert_eq!(Config::default().to_settings(), Settings::default());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = Config::default();
        config.snapping.padding = 8;
        config.exclusions.push(Exclusion::class("Progman"));
        config.exclusions.push(Exclusion::class("Chrome_WidgetWin_1").with_title(".*Meet.*"));

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_partial_parse() {
        // Config with only some fields should use defaults for the rest
        let toml_str = r#"
            [snapping]
            threshold = 15

            [activation]
            ctrl = true
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.snapping.threshold, 15);
        assert!(config.snapping.enabled); // default
        assert_eq!(config.snapping.padding, 0); // default
        // Alt stays on unless turned off explicitly
        assert!(config.activation.alt);
        assert!(config.activation.ctrl);
        assert_eq!(config.transparency.opacity, 210);
    }

    #[test]
    fn test_exclusions_parse() {
        let toml_str = r#"
            [[exclusions]]
            class = "Shell_TrayWnd"

            [[exclusions]]
            class = "ApplicationFrameWindow"
            title = "Calculator"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.exclusions.len(), 2);
        assert_eq!(config.exclusions[0], Exclusion::class("Shell_TrayWnd"));
        assert_eq!(config.exclusions[1].title.as_deref(), Some("Calculator"));
    }

    #[test]
    fn test_validate_clamps_out_of_range() {
        let toml_str = r#"
            [snapping]
            threshold = 500
            padding = -4

            [behavior]
            minimum_window_size = 10
            update_interval_ms = 0
        "#;
        let mut config: Config = toml::from_str(toml_str).unwrap();
        let warnings = config.validate();

        assert_eq!(config.snapping.threshold, 200);
        assert_eq!(config.snapping.padding, 0);
        assert_eq!(config.behavior.minimum_window_size, 50);
        assert_eq!(config.behavior.update_interval_ms, 1);
        let fields: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "snapping.threshold",
                "snapping.padding",
                "behavior.minimum_window_size",
                "behavior.update_interval_ms",
            ]
        );
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let mut config = Config::default();
        assert!(config.validate().is_empty());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_validate_empty_activation_falls_back_to_alt() {
        let toml_str = r#"
            [activation]
            alt = false
        "#;
        let mut config: Config = toml::from_str(toml_str).unwrap();
        let warnings = config.validate();

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "activation");
        assert_eq!(config.activation, Modifiers::default());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();
        config.behavior.log_level = "DEBUG".to_string();
        assert!(config.validate().is_empty());
        assert_eq!(config.behavior.log_level, "debug");

        config.behavior.log_level = "verbose".to_string();
        assert_eq!(config.validate().len(), 1);
        assert_eq!(config.behavior.log_level, "info");
    }

    #[test]
    fn test_to_settings() {
        let toml_str = r#"
            [activation]
            alt = false
            win = true

            [snapping]
            enabled = false
            padding = 6

            [transparency]
            opacity = 128

            [rolodex]
            enabled = false

            [behavior]
            minimum_window_size = 320
            update_interval_ms = 16
            exclusion_detection = true
            disable_in_game_mode = false

            [[exclusions]]
            class = "Progman"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let settings = config.to_settings();

        assert!(settings.activation.win);
        assert!(!settings.activation.alt);
        assert!(!settings.snapping_enabled);
        assert_eq!(settings.snapping_padding, 6);
        assert_eq!(settings.transparency_opacity, 128);
        assert!(!settings.rolodex_enabled);
        assert_eq!(settings.minimum_window_size, 320);
        assert_eq!(settings.update_interval, Duration::from_millis(16));
        assert!(settings.exclusion_detection);
        assert!(!settings.disable_in_game_mode);
        assert_eq!(settings.exclusions, vec![Exclusion::class("Progman")]);
    }

    #[test]
    fn test_add_exclusions_skips_duplicates() {
        let mut config = Config::default();
        config.exclusions.push(Exclusion::class("Progman"));

        let added = config.add_exclusions(vec![
            Exclusion::class("Progman"),
            Exclusion::class("Notepad").with_title("Untitled"),
        ]);
        assert_eq!(added, 1);
        assert_eq!(config.exclusions.len(), 2);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("grabwin-config-test-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");

        let mut config = Config::default();
        config.behavior.exclusion_detection = true;
        config.exclusions.push(Exclusion::class(r"Qt5\.15Window").with_title(r"Notes \(1\)"));
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_from_missing_path_fails_with_context() {
        let path = std::env::temp_dir().join("grabwin-does-not-exist").join("config.toml");
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_config_paths_not_empty() {
        let paths = config_paths();
        assert!(!paths.is_empty());
        assert_eq!(paths.last(), Some(&PathBuf::from("config.toml")));
        assert_eq!(primary_config_path(), paths[0]);
    }
}
