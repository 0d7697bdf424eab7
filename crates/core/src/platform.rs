//! Collaborator interfaces the engine drives.
//!
//! The engine never talks to the OS directly. It consumes:
//! - [`InputHooks`]: keyboard/mouse hook installation and synthetic input
//! - [`WindowSurface`]: window queries and mutations
//! - [`DisplayTopology`]: monitor enumeration
//! - [`CursorOverlay`]: the small glyph window that follows the cursor
//!
//! All methods take `&self`; implementations wrap OS handles or, in tests,
//! shared recording state.

use crate::cursor::CursorGlyph;
use crate::geometry::{Point, Rect};
use crate::hotkey::Modifiers;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque identifier for a top-level window.
/// On Windows this is the HWND value; the OS owns the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Opaque identifier for a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitorId(pub u64);

/// Errors reported by platform collaborators.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Window {0} no longer exists")]
    WindowGone(WindowId),

    #[error("{call} failed for window {window}: {message}")]
    CallFailed {
        call: &'static str,
        window: WindowId,
        message: String,
    },

    #[error("Hook installation failed: {0}")]
    HookInstallFailed(String),
}

/// Mouse buttons that drive operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
}

/// Discrete input events, delivered in OS temporal order per hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// All activation modifiers are now held.
    HotKeyPressed,
    /// An activation modifier was released.
    HotKeyReleased,
    MouseDown { point: Point, button: MouseButton },
    MouseUp { point: Point, button: MouseButton },
    MouseMove { point: Point },
    /// Positive delta is wheel-up (away from the user).
    MouseWheel { point: Point, delta: i32 },
}

/// Show-state and restored rectangle of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Rectangle the window occupies when neither minimized nor maximized.
    pub normal: Rect,
    pub maximized: bool,
}

/// Class name and title of a window, used for exclusion matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowIdentity {
    pub class: String,
    pub title: String,
}

/// Extended window style bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedStyle(pub u32);

impl ExtendedStyle {
    /// `WS_EX_LAYERED`.
    pub const LAYERED: u32 = 0x0008_0000;

    pub fn is_layered(self) -> bool {
        self.0 & Self::LAYERED != 0
    }

    pub fn with_layered(self) -> Self {
        Self(self.0 | Self::LAYERED)
    }
}

/// Layered-window attributes of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayeredAttributes {
    /// Constant alpha, if the window uses one.
    pub alpha: Option<u8>,
}

/// Z-order targets for [`WindowSurface::set_z_order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrder {
    Top,
    Bottom,
    TopMost,
    NoTopMost,
}

/// A window that other windows may snap against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnappableWindow {
    pub id: WindowId,
    /// Visible frame of the window.
    pub rect: Rect,
    pub identity: WindowIdentity,
}

/// A monitor and its usable area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorInfo {
    pub id: MonitorId,
    pub bounds: Rect,
    /// Bounds minus taskbars and docked toolbars.
    pub work_area: Rect,
}

/// Window queries and mutations.
pub trait WindowSurface {
    /// Top-level window under a screen point.
    fn window_at(&self, point: Point) -> Option<WindowId>;

    /// Rectangle the OS reports for the window, including invisible borders.
    fn window_rect(&self, id: WindowId) -> Result<Rect, SurfaceError>;

    /// Visible frame of the window, excluding drop shadow.
    fn frame_bounds(&self, id: WindowId) -> Result<Rect, SurfaceError>;

    fn placement(&self, id: WindowId) -> Result<Placement, SurfaceError>;

    fn identity(&self, id: WindowId) -> Result<WindowIdentity, SurfaceError>;

    fn extended_style(&self, id: WindowId) -> Result<ExtendedStyle, SurfaceError>;

    fn set_extended_style(&self, id: WindowId, style: ExtendedStyle) -> Result<(), SurfaceError>;

    fn layered_attributes(&self, id: WindowId) -> Result<LayeredAttributes, SurfaceError>;

    fn set_layered_alpha(&self, id: WindowId, alpha: u8) -> Result<(), SurfaceError>;

    /// Force a full repaint of the window and its frame.
    fn redraw(&self, id: WindowId) -> Result<(), SurfaceError>;

    /// Move and resize without activating or reordering.
    fn set_rect(&self, id: WindowId, rect: Rect) -> Result<(), SurfaceError>;

    /// Reorder without moving, resizing or activating.
    fn set_z_order(&self, id: WindowId, order: ZOrder) -> Result<(), SurfaceError>;

    /// Leave the maximized state.
    fn restore(&self, id: WindowId) -> Result<(), SurfaceError>;

    /// Visible, non-minimized, captioned, resizable top-level windows except
    /// `exclude`.
    fn snappable_windows(&self, exclude: WindowId) -> Vec<SnappableWindow>;

    /// Visible non-tool windows whose bounds contain `point`, topmost first.
    fn windows_at(&self, point: Point) -> Vec<WindowId>;

    fn foreground_window(&self) -> Option<WindowId>;

    fn has_caption(&self, id: WindowId) -> Result<bool, SurfaceError>;

    /// The shell reports an exclusive full-screen Direct3D application.
    fn fullscreen_exclusive_active(&self) -> bool;
}

/// Monitor enumeration.
pub trait DisplayTopology {
    fn monitors(&self) -> Vec<MonitorInfo>;

    fn monitor_for_window(&self, id: WindowId) -> Option<MonitorInfo>;
}

/// Global input hooks.
///
/// Events are delivered out of band (the daemon forwards them to
/// [`Manager::handle_event`](crate::Manager::handle_event)); this trait only
/// controls what is being listened to.
pub trait InputHooks {
    fn install_keyboard_hook(&self) -> Result<(), SurfaceError>;

    fn uninstall_keyboard_hook(&self);

    fn install_mouse_hook(&self) -> Result<(), SurfaceError>;

    fn uninstall_mouse_hook(&self);

    /// Tap a control key so the shell does not open the menu bar when Alt is
    /// released after an operation.
    fn send_control_key(&self);

    /// Change which modifiers make up the activation hotkey.
    fn set_activation(&self, modifiers: Modifiers);
}

/// The glyph window that follows the cursor during an operation.
pub trait CursorOverlay {
    fn show(&self, glyph: CursorGlyph, point: Point);

    fn move_to(&self, point: Point);

    fn hide(&self);
}
