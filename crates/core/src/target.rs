//! Tracking of the window being manipulated.
//!
//! The tracker holds at most one [`TargetWindow`]. It is captured when an
//! operation starts and cleared when it ends. Maximized windows are restored
//! lazily on the first move/resize tick so a plain click never unmaximizes
//! anything.

use crate::geometry::{Point, Rect};
use crate::platform::{DisplayTopology, SurfaceError, WindowId, WindowSurface};
use tracing::debug;

/// The window under manipulation and its geometry at operation start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetWindow {
    pub id: WindowId,
    /// Rectangle all cursor deltas are applied to.
    pub initial_placement: Rect,
    /// Restored (non-maximized) rectangle reported by the OS.
    pub normal_placement: Rect,
    /// Still maximized; cleared once restored.
    pub maximized: bool,
}

/// Owner of the current target window.
#[derive(Debug, Default)]
pub struct TargetWindowTracker {
    current: Option<TargetWindow>,
}

impl TargetWindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the top-level window under `point`.
    ///
    /// Returns `None` and leaves the tracker empty if there is no window or
    /// its geometry cannot be read.
    pub fn capture<S, D>(&mut self, point: Point, surface: &S, display: &D) -> Option<TargetWindow>
    where
        S: WindowSurface + ?Sized,
        D: DisplayTopology + ?Sized,
    {
        self.current = None;

        let id = surface.window_at(point)?;
        let placement = match surface.placement(id) {
            Ok(p) => p,
            Err(e) => {
                debug!("Cannot read placement of {}: {}", id, e);
                return None;
            }
        };
        let rect = match surface.window_rect(id) {
            Ok(r) => r,
            Err(e) => {
                debug!("Cannot read rect of {}: {}", id, e);
                return None;
            }
        };

        // A maximized window's rect overhangs the monitor by its border;
        // deltas are applied to the work area instead.
        let initial_placement = if placement.maximized {
            display
                .monitor_for_window(id)
                .map(|m| m.work_area)
                .unwrap_or(rect)
        } else {
            rect
        };

        let target = TargetWindow {
            id,
            initial_placement,
            normal_placement: placement.normal,
            maximized: placement.maximized,
        };
        debug!("Captured target {:?}", target);
        self.current = Some(target);
        self.current
    }

    pub fn current(&self) -> Option<TargetWindow> {
        self.current
    }

    pub fn is_set(&self) -> bool {
        self.current.is_some()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Restore a maximized target so it can be dragged off, centring the
    /// restored size under the cursor within the work area.
    ///
    /// Returns the new rectangle, or `None` if the target was not maximized.
    pub fn restore_for_move<S, D>(
        &mut self,
        cursor: Point,
        surface: &S,
        display: &D,
    ) -> Result<Option<Rect>, SurfaceError>
    where
        S: WindowSurface + ?Sized,
        D: DisplayTopology + ?Sized,
    {
        let Some(target) = self.current.as_mut().filter(|t| t.maximized) else {
            return Ok(None);
        };
        target.maximized = false;

        let work_area = display
            .monitor_for_window(target.id)
            .map(|m| m.work_area)
            .unwrap_or(target.initial_placement);
        surface.restore(target.id)?;

        let width = target.normal_placement.width();
        let height = target.normal_placement.height();
        let rect = Rect::from_origin_size(cursor.x - width / 2, work_area.top, width, height)
            .translate_into(&work_area);
        surface.set_rect(target.id, rect)?;

        target.initial_placement = rect;
        debug!("Restored {} for move at {:?}", target.id, rect);
        Ok(Some(rect))
    }

    /// Restore a maximized target filling its work area, so resizing starts
    /// from the same visible size.
    pub fn restore_for_resize<S, D>(&mut self, surface: &S, display: &D) -> Result<Option<Rect>, SurfaceError>
    where
        S: WindowSurface + ?Sized,
        D: DisplayTopology + ?Sized,
    {
        let Some(target) = self.current.as_mut().filter(|t| t.maximized) else {
            return Ok(None);
        };
        target.maximized = false;

        surface.restore(target.id)?;
        let Some(monitor) = display.monitor_for_window(target.id) else {
            return Ok(None);
        };
        surface.set_rect(target.id, monitor.work_area)?;

        target.initial_placement = monitor.work_area;
        debug!("Restored {} for resize at {:?}", target.id, monitor.work_area);
        Ok(Some(monitor.work_area))
    }
}
