//! Z-order cycling with the mouse wheel.

use crate::geometry::Point;
use crate::platform::{WindowId, WindowSurface, ZOrder};
use tracing::debug;

/// Sends windows under the cursor to the back, or brings the lowest one
/// forward, without activating anything.
#[derive(Debug)]
pub struct RolodexController {
    enabled: bool,
}

impl RolodexController {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Wheel-up sends to back, wheel-down brings forward.
    pub fn on_wheel<S: WindowSurface + ?Sized>(&self, point: Point, delta: i32, surface: &S) -> Option<WindowId> {
        if !self.enabled || delta == 0 {
            return None;
        }
        if delta > 0 {
            self.send_to_back(point, surface)
        } else {
            self.bring_bottom_to_top(point, surface)
        }
    }

    /// Move the window under `point` to the bottom of the Z-order.
    pub fn send_to_back<S: WindowSurface + ?Sized>(&self, point: Point, surface: &S) -> Option<WindowId> {
        let id = surface.window_at(point)?;
        if let Err(e) = surface.set_z_order(id, ZOrder::Bottom) {
            debug!("Cannot send {} to back: {}", id, e);
            return None;
        }
        debug!("Sent {} to back", id);
        Some(id)
    }

    /// Promote the lowest window containing `point` above all non-topmost
    /// windows.
    pub fn bring_bottom_to_top<S: WindowSurface + ?Sized>(&self, point: Point, surface: &S) -> Option<WindowId> {
        let id = surface.windows_at(point).last().copied()?;

        // Bouncing through topmost forces it above everything else without
        // leaving it pinned
        for order in [ZOrder::Top, ZOrder::TopMost, ZOrder::NoTopMost] {
            if let Err(e) = surface.set_z_order(id, order) {
                debug!("Cannot raise {} ({:?}): {}", id, order, e);
            }
        }
        debug!("Brought {} to top", id);
        Some(id)
    }
}
