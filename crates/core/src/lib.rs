//! grabwin Core
//!
//! Platform-agnostic engine for hotkey-driven window manipulation.
//!
//! Holding the activation hotkey and dragging with the mouse:
//! - Left button moves the window under the cursor
//! - Right button resizes it from the nearest corner
//! - The mouse wheel sends windows to the back or brings the lowest one forward
//!
//! Moved and resized edges snap against other windows and monitor work areas.
//! Everything that touches the OS goes through the traits in [`platform`], so
//! the whole state machine runs against in-memory fakes in tests.

pub mod cursor;
pub mod exclusion;
pub mod game_mode;
pub mod geometry;
pub mod hotkey;
pub mod manager;
pub mod operation;
pub mod platform;
pub mod rate_limit;
pub mod rolodex;
pub mod settings;
pub mod snap;
pub mod target;
pub mod transparency;

mod testing;

pub use cursor::{CursorController, CursorGlyph};
pub use exclusion::{Exclusion, ExclusionDetector, ExclusionFilter};
pub use game_mode::GameModeGuard;
pub use geometry::{Insets, Point, Rect};
pub use hotkey::{HotkeyTracker, ModifierKey, Modifiers};
pub use manager::{Manager, ManagerError, ManagerState, Operation};
pub use operation::{MoveController, ResizeController, ResizeEdge};
pub use platform::{
    CursorOverlay, DisplayTopology, ExtendedStyle, InputEvent, InputHooks, LayeredAttributes,
    MonitorId, MonitorInfo, MouseButton, Placement, SnappableWindow, SurfaceError, WindowId,
    WindowIdentity, WindowSurface, ZOrder,
};
pub use rate_limit::{Clock, RateLimiter, SystemClock};
pub use rolodex::RolodexController;
pub use settings::Settings;
pub use snap::{SnapCandidate, SnapEngine};
pub use target::{TargetWindow, TargetWindowTracker};
pub use transparency::TransparencyController;
