//! Move and resize controllers.
//!
//! Both controllers turn the cursor delta since operation start into a new
//! window rectangle, run it through the [`SnapEngine`] and apply it. Rate
//! limiting happens in the manager before either controller is called.

use crate::geometry::{Point, Rect};
use crate::platform::{DisplayTopology, SurfaceError, WindowSurface};
use crate::snap::SnapEngine;
use crate::target::TargetWindowTracker;

/// Corner a resize is dragged from, fixed for the whole operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeEdge {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeEdge {
    /// Pick the corner from the quadrant of `rect` that `point` falls in.
    /// Points on a centre line belong to the right/bottom half.
    pub fn from_quadrant(rect: &Rect, point: Point) -> Self {
        let left = 2 * (point.x as i64 - rect.left as i64) < rect.width() as i64;
        let top = 2 * (point.y as i64 - rect.top as i64) < rect.height() as i64;
        match (left, top) {
            (true, true) => ResizeEdge::TopLeft,
            (false, true) => ResizeEdge::TopRight,
            (true, false) => ResizeEdge::BottomLeft,
            (false, false) => ResizeEdge::BottomRight,
        }
    }

    pub fn moves_left(self) -> bool {
        matches!(self, ResizeEdge::TopLeft | ResizeEdge::BottomLeft)
    }

    pub fn moves_top(self) -> bool {
        matches!(self, ResizeEdge::TopLeft | ResizeEdge::TopRight)
    }

    /// Apply a cursor delta to the edges this corner drags.
    pub fn apply_delta(self, rect: Rect, dx: i32, dy: i32) -> Rect {
        let mut out = rect;
        if self.moves_left() {
            out.left = out.left.saturating_add(dx);
        } else {
            out.right = out.right.saturating_add(dx);
        }
        if self.moves_top() {
            out.top = out.top.saturating_add(dy);
        } else {
            out.bottom = out.bottom.saturating_add(dy);
        }
        out
    }

    /// Grow the dragged edges until the rectangle is at least `min` wide and
    /// tall. Anchored edges never move.
    pub fn enforce_minimum(self, rect: Rect, min: i32) -> Rect {
        let mut out = rect;
        if out.width() < min {
            if self.moves_left() {
                out.left = out.right - min;
            } else {
                out.right = out.left + min;
            }
        }
        if out.height() < min {
            if self.moves_top() {
                out.top = out.bottom - min;
            } else {
                out.bottom = out.top + min;
            }
        }
        out
    }
}

/// Drags the target window with the cursor.
#[derive(Debug, Default)]
pub struct MoveController {
    origin: Point,
    last: Option<Rect>,
}

impl MoveController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, point: Point) {
        self.origin = point;
        self.last = None;
    }

    pub fn stop(&mut self) {
        self.last = None;
    }

    /// Move the target for a cursor at `point`.
    ///
    /// Returns the applied rectangle, or `None` when nothing changed.
    pub fn move_window<S, D>(
        &mut self,
        point: Point,
        tracker: &mut TargetWindowTracker,
        snap: &mut SnapEngine,
        surface: &S,
        display: &D,
    ) -> Result<Option<Rect>, SurfaceError>
    where
        S: WindowSurface + ?Sized,
        D: DisplayTopology + ?Sized,
    {
        if let Some(restored) = tracker.restore_for_move(point, surface, display)? {
            // The restored window is re-anchored under the cursor
            self.origin = point;
            self.last = Some(restored);
            if let Some(target) = tracker.current() {
                snap.refresh_border(target.id, surface);
            }
        }
        let Some(target) = tracker.current() else {
            return Ok(None);
        };

        let rect = target
            .initial_placement
            .offset(point.x - self.origin.x, point.y - self.origin.y);
        let snapped = snap.snap_moving_window(rect);
        if self.last == Some(snapped) {
            return Ok(None);
        }

        surface.set_rect(target.id, snapped)?;
        self.last = Some(snapped);
        Ok(Some(snapped))
    }
}

/// Resizes the target window from one corner.
#[derive(Debug)]
pub struct ResizeController {
    origin: Point,
    edge: ResizeEdge,
    minimum_size: i32,
    last: Option<Rect>,
}

impl ResizeController {
    pub fn new(minimum_size: i32) -> Self {
        Self {
            origin: Point::default(),
            edge: ResizeEdge::BottomRight,
            minimum_size,
            last: None,
        }
    }

    pub fn set_minimum_size(&mut self, minimum_size: i32) {
        self.minimum_size = minimum_size;
    }

    /// Start resizing `initial` from the corner nearest `point`.
    pub fn start(&mut self, point: Point, initial: &Rect) -> ResizeEdge {
        self.origin = point;
        self.edge = ResizeEdge::from_quadrant(initial, point);
        self.last = None;
        self.edge
    }

    pub fn stop(&mut self) {
        self.last = None;
    }

    pub fn edge(&self) -> ResizeEdge {
        self.edge
    }

    /// Resize the target for a cursor at `point`.
    pub fn resize_window<S, D>(
        &mut self,
        point: Point,
        tracker: &mut TargetWindowTracker,
        snap: &mut SnapEngine,
        surface: &S,
        display: &D,
    ) -> Result<Option<Rect>, SurfaceError>
    where
        S: WindowSurface + ?Sized,
        D: DisplayTopology + ?Sized,
    {
        if let Some(restored) = tracker.restore_for_resize(surface, display)? {
            self.last = Some(restored);
            if let Some(target) = tracker.current() {
                snap.refresh_border(target.id, surface);
            }
        }
        let Some(target) = tracker.current() else {
            return Ok(None);
        };

        let rect = self.edge.apply_delta(
            target.initial_placement,
            point.x - self.origin.x,
            point.y - self.origin.y,
        );
        let snapped = snap.snap_resizing_window(rect, self.edge);
        let sized = self.edge.enforce_minimum(snapped, self.minimum_size);
        if self.last == Some(sized) {
            return Ok(None);
        }

        surface.set_rect(target.id, sized)?;
        self.last = Some(sized);
        Ok(Some(sized))
    }
}
