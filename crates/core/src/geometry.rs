//! Integer screen geometry.
//!
//! Rectangles use edge form (`left, top, right, bottom`) in device pixels,
//! matching what the window manager APIs report. Nothing here enforces
//! `right >= left`; callers check [`Rect::is_degenerate`] where it matters.

use serde::{Deserialize, Serialize};

/// A point in screen coordinates (pixels).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Create a new point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A rectangle in screen coordinates (pixels).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// Create a new rectangle from its edges.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from an origin and a size.
    pub const fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// True when an edge pair is inverted.
    pub fn is_degenerate(&self) -> bool {
        self.right < self.left || self.bottom < self.top
    }

    /// Grow the rectangle by `dx` on the left and right and `dy` on the top
    /// and bottom. Negative values shrink it.
    pub fn inflate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(
            self.left.saturating_sub(dx),
            self.top.saturating_sub(dy),
            self.right.saturating_add(dx),
            self.bottom.saturating_add(dy),
        )
    }

    /// Translate the rectangle. Coordinates saturate at the `i32` range.
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(
            self.left.saturating_add(dx),
            self.top.saturating_add(dy),
            self.right.saturating_add(dx),
            self.bottom.saturating_add(dy),
        )
    }

    /// Check if this rectangle overlaps another (shared edges do not count).
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.top < other.bottom
            && self.bottom > other.top
    }

    /// Intersection of two rectangles, or `None` if they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        Some(Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        ))
    }

    /// Check if a point lies inside the rectangle, edges included.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }

    /// Shrink each edge by the matching inset.
    pub fn inset(&self, insets: Insets) -> Rect {
        Rect::new(
            self.left + insets.left,
            self.top + insets.top,
            self.right - insets.right,
            self.bottom - insets.bottom,
        )
    }

    /// Grow each edge by the matching inset. Inverse of [`Rect::inset`].
    pub fn outset(&self, insets: Insets) -> Rect {
        Rect::new(
            self.left - insets.left,
            self.top - insets.top,
            self.right + insets.right,
            self.bottom + insets.bottom,
        )
    }

    /// Translate the rectangle so it lies within `bounds`.
    ///
    /// If the rectangle is larger than `bounds` on an axis, it is aligned to
    /// the bounds' leading edge on that axis. The size never changes.
    pub fn translate_into(&self, bounds: &Rect) -> Rect {
        let dx = if self.width() >= bounds.width() || self.left < bounds.left {
            bounds.left - self.left
        } else if self.right > bounds.right {
            bounds.right - self.right
        } else {
            0
        };
        let dy = if self.height() >= bounds.height() || self.top < bounds.top {
            bounds.top - self.top
        } else if self.bottom > bounds.bottom {
            bounds.bottom - self.bottom
        } else {
            0
        };
        self.offset(dx, dy)
    }
}

/// Per-edge distances between an outer rectangle and a rectangle nested in it.
///
/// Used for the gap between the rectangle the OS reports for a window and
/// its visible frame (the invisible resize border and drop shadow).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insets {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Insets {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Insets that turn `outer` into `inner` via [`Rect::inset`].
    pub fn between(outer: &Rect, inner: &Rect) -> Self {
        Self::new(
            inner.left - outer.left,
            inner.top - outer.top,
            outer.right - inner.right,
            outer.bottom - inner.bottom,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_dimensions() {
        let r = Rect::from_origin_size(10, 20, 300, 200);
        assert_eq!(r, Rect::new(10, 20, 310, 220));
        assert_eq!(r.width(), 300);
        assert_eq!(r.height(), 200);
        assert!(!r.is_degenerate());
    }

    #[test]
    fn test_degenerate_rect() {
        assert!(Rect::new(10, 0, 5, 10).is_degenerate());
        assert!(Rect::new(0, 10, 10, 5).is_degenerate());
        // Zero-sized is still well formed
        assert!(!Rect::new(5, 5, 5, 5).is_degenerate());
    }

    #[test]
    fn test_inflate_and_offset() {
        let r = Rect::new(100, 100, 400, 400);
        assert_eq!(r.inflate(10, 5), Rect::new(90, 95, 410, 405));
        assert_eq!(r.inflate(-10, -10), Rect::new(110, 110, 390, 390));
        assert_eq!(r.offset(-100, 50), Rect::new(0, 150, 300, 450));
    }

    #[test]
    fn test_intersection() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 150, 150);
        let c = Rect::new(100, 0, 200, 100);

        assert!(a.intersects(&b));
        assert_eq!(a.intersection(&b), Some(Rect::new(50, 50, 100, 100)));
        // Touching edges are not an overlap
        assert!(!a.intersects(&c));
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_contains_includes_edges() {
        let r = Rect::new(0, 0, 100, 100);
        assert!(r.contains(Point::new(0, 0)));
        assert!(r.contains(Point::new(100, 100)));
        assert!(!r.contains(Point::new(101, 50)));
    }

    #[test]
    fn test_insets_roundtrip() {
        let outer = Rect::new(93, 100, 1007, 807);
        let inner = Rect::new(100, 100, 1000, 800);
        let insets = Insets::between(&outer, &inner);

        assert_eq!(insets, Insets::new(7, 0, 7, 7));
        assert_eq!(outer.inset(insets), inner);
        assert_eq!(inner.outset(insets), outer);
    }

    #[test]
    fn test_translate_into() {
        let bounds = Rect::new(0, 0, 1920, 1040);

        let overhanging = Rect::new(1800, -50, 2200, 250);
        assert_eq!(overhanging.translate_into(&bounds), Rect::new(1520, 0, 1920, 300));

        let inside = Rect::new(10, 10, 110, 110);
        assert_eq!(inside.translate_into(&bounds), inside);

        // Larger than the bounds: pinned to the leading edge
        let huge = Rect::new(-100, 100, 2400, 300);
        assert_eq!(huge.translate_into(&bounds), Rect::new(0, 100, 2500, 300));
    }
}
