//! Resolved runtime settings.

use crate::exclusion::Exclusion;
use crate::hotkey::Modifiers;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Every tunable the engine consumes, already validated.
///
/// The daemon builds this from its TOML config; tests build it with struct
/// update syntax over [`Settings::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Modifiers that make up the activation hotkey.
    pub activation: Modifiers,
    pub snapping_enabled: bool,
    /// Distance in pixels within which an edge snaps.
    pub snapping_threshold: i32,
    /// Gap kept between snapped windows.
    pub snapping_padding: i32,
    pub transparency_enabled: bool,
    /// Alpha applied while a window is being manipulated.
    pub transparency_opacity: u8,
    pub rolodex_enabled: bool,
    /// Smallest width and height a resize may produce.
    pub minimum_window_size: i32,
    /// Minimum gap between applied move/resize updates.
    pub update_interval: Duration,
    /// Holding the hotkey and moving the mouse enters exclusion detection.
    pub exclusion_detection: bool,
    pub exclusions: Vec<Exclusion>,
    pub disable_in_game_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            activation: Modifiers::default(),
            snapping_enabled: true,
            snapping_threshold: 30,
            snapping_padding: 0,
            transparency_enabled: true,
            transparency_opacity: 210,
            rolodex_enabled: true,
            minimum_window_size: 200,
            update_interval: Duration::from_millis(32),
            exclusion_detection: false,
            exclusions: Vec::new(),
            disable_in_game_mode: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.activation.alt);
        assert!(!settings.activation.ctrl);
        assert_eq!(settings.snapping_threshold, 30);
        assert_eq!(settings.transparency_opacity, 210);
        assert_eq!(settings.minimum_window_size, 200);
        assert_eq!(settings.update_interval, Duration::from_millis(32));
        assert!(!settings.exclusion_detection);
    }
}
