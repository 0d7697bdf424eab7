//! Activation hotkey tracking.
//!
//! The keyboard hook only sees individual key transitions. This module folds
//! them into [`InputEvent::HotKeyPressed`] / [`InputEvent::HotKeyReleased`]
//! for the configured set of modifiers.

use crate::platform::InputEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Set of modifiers that make up the activation hotkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub win: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            alt: true,
            ctrl: false,
            shift: false,
            win: false,
        }
    }
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        alt: false,
        ctrl: false,
        shift: false,
        win: false,
    };

    pub fn is_empty(&self) -> bool {
        !(self.alt || self.ctrl || self.shift || self.win)
    }

    /// Whether `key` belongs to this set.
    pub fn includes(&self, key: ModifierKey) -> bool {
        match key {
            ModifierKey::LeftAlt | ModifierKey::RightAlt => self.alt,
            ModifierKey::LeftCtrl | ModifierKey::RightCtrl => self.ctrl,
            ModifierKey::LeftShift | ModifierKey::RightShift => self.shift,
            ModifierKey::LeftWin | ModifierKey::RightWin => self.win,
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [(self.ctrl, "Ctrl"), (self.alt, "Alt"), (self.shift, "Shift"), (self.win, "Win")];
        let held: Vec<&str> = names.iter().filter(|(on, _)| *on).map(|(_, name)| *name).collect();
        if held.is_empty() {
            f.write_str("(none)")
        } else {
            f.write_str(&held.join("+"))
        }
    }
}

/// A physical modifier key. Left and right are distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKey {
    LeftAlt,
    RightAlt,
    LeftCtrl,
    RightCtrl,
    LeftShift,
    RightShift,
    LeftWin,
    RightWin,
}

impl ModifierKey {
    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Folds raw modifier transitions into hotkey press/release events.
#[derive(Debug)]
pub struct HotkeyTracker {
    required: Modifiers,
    held: u8,
    active: bool,
}

impl HotkeyTracker {
    pub fn new(required: Modifiers) -> Self {
        Self {
            required,
            held: 0,
            active: false,
        }
    }

    pub fn required(&self) -> Modifiers {
        self.required
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Record a key transition. Returns an event when the hotkey changes
    /// state; auto-repeat and unrelated keys return `None`.
    pub fn key(&mut self, key: ModifierKey, down: bool) -> Option<InputEvent> {
        if down {
            self.held |= key.bit();
        } else {
            self.held &= !key.bit();
        }
        self.update()
    }

    /// Switch to a different modifier set. An active hotkey is released.
    pub fn set_required(&mut self, required: Modifiers) -> Option<InputEvent> {
        self.required = required;
        if self.active {
            self.active = false;
            return Some(InputEvent::HotKeyReleased);
        }
        None
    }

    fn either(&self, left: ModifierKey, right: ModifierKey) -> bool {
        self.held & (left.bit() | right.bit()) != 0
    }

    fn all_required_held(&self) -> bool {
        if self.required.is_empty() {
            return false;
        }
        let r = self.required;
        (!r.alt || self.either(ModifierKey::LeftAlt, ModifierKey::RightAlt))
            && (!r.ctrl || self.either(ModifierKey::LeftCtrl, ModifierKey::RightCtrl))
            && (!r.shift || self.either(ModifierKey::LeftShift, ModifierKey::RightShift))
            && (!r.win || self.either(ModifierKey::LeftWin, ModifierKey::RightWin))
    }

    fn update(&mut self) -> Option<InputEvent> {
        let held = self.all_required_held();
        match (self.active, held) {
            (false, true) => {
                self.active = true;
                Some(InputEvent::HotKeyPressed)
            }
            (true, false) => {
                self.active = false;
                Some(InputEvent::HotKeyReleased)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_display() {
        assert_eq!(Modifiers::default().to_string(), "Alt");
        let combo = Modifiers {
            alt: true,
            ctrl: true,
            shift: false,
            win: true,
        };
        assert_eq!(combo.to_string(), "Ctrl+Alt+Win");
        assert_eq!(Modifiers::NONE.to_string(), "(none)");
    }

    #[test]
    fn test_alt_press_and_release() {
        let mut tracker = HotkeyTracker::new(Modifiers::default());

        assert_eq!(tracker.key(ModifierKey::LeftAlt, true), Some(InputEvent::HotKeyPressed));
        // Auto-repeat
        assert_eq!(tracker.key(ModifierKey::LeftAlt, true), None);
        assert_eq!(tracker.key(ModifierKey::LeftAlt, false), Some(InputEvent::HotKeyReleased));
    }

    #[test]
    fn test_left_and_right_tracked_separately() {
        let mut tracker = HotkeyTracker::new(Modifiers::default());

        assert_eq!(tracker.key(ModifierKey::LeftAlt, true), Some(InputEvent::HotKeyPressed));
        assert_eq!(tracker.key(ModifierKey::RightAlt, true), None);
        // Right Alt is still down
        assert_eq!(tracker.key(ModifierKey::LeftAlt, false), None);
        assert_eq!(tracker.key(ModifierKey::RightAlt, false), Some(InputEvent::HotKeyReleased));
    }

    #[test]
    fn test_combination_requires_all() {
        let mut tracker = HotkeyTracker::new(Modifiers {
            alt: false,
            ctrl: true,
            shift: true,
            win: false,
        });

        assert_eq!(tracker.key(ModifierKey::LeftCtrl, true), None);
        assert_eq!(tracker.key(ModifierKey::LeftAlt, true), None);
        assert_eq!(tracker.key(ModifierKey::RightShift, true), Some(InputEvent::HotKeyPressed));
        assert_eq!(tracker.key(ModifierKey::LeftAlt, false), None);
        assert_eq!(tracker.key(ModifierKey::LeftCtrl, false), Some(InputEvent::HotKeyReleased));
    }

    #[test]
    fn test_changing_activation_releases() {
        let mut tracker = HotkeyTracker::new(Modifiers::default());
        tracker.key(ModifierKey::LeftAlt, true);

        let ctrl = Modifiers {
            alt: false,
            ctrl: true,
            ..Modifiers::NONE
        };
        assert_eq!(tracker.set_required(ctrl), Some(InputEvent::HotKeyReleased));
        assert!(!tracker.is_active());
        assert_eq!(tracker.set_required(ctrl), None);

        // Alt no longer matters
        assert_eq!(tracker.key(ModifierKey::LeftAlt, false), None);
        assert_eq!(tracker.key(ModifierKey::RightCtrl, true), Some(InputEvent::HotKeyPressed));
    }

    #[test]
    fn test_empty_set_never_activates() {
        let mut tracker = HotkeyTracker::new(Modifiers::NONE);
        assert_eq!(tracker.key(ModifierKey::LeftAlt, true), None);
        assert!(Modifiers::NONE.is_empty());
        assert!(Modifiers::default().includes(ModifierKey::RightAlt));
        assert!(!Modifiers::default().includes(ModifierKey::LeftWin));
    }
}
