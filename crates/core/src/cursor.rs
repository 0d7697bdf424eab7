//! Cursor glyph shown while an operation is in progress.

use crate::geometry::Point;
use crate::operation::ResizeEdge;
use crate::platform::CursorOverlay;

/// Glyph drawn by the overlay window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorGlyph {
    /// Four-way arrow.
    Move,
    /// Diagonal arrow from top-left to bottom-right.
    ResizeNwse,
    /// Diagonal arrow from top-right to bottom-left.
    ResizeNesw,
    /// Crosshair used while picking a window to exclude.
    Detect,
}

impl From<ResizeEdge> for CursorGlyph {
    fn from(edge: ResizeEdge) -> Self {
        match edge {
            ResizeEdge::TopLeft | ResizeEdge::BottomRight => CursorGlyph::ResizeNwse,
            ResizeEdge::TopRight | ResizeEdge::BottomLeft => CursorGlyph::ResizeNesw,
        }
    }
}

/// Visibility bookkeeping in front of a [`CursorOverlay`].
#[derive(Debug, Default)]
pub struct CursorController {
    visible: Option<CursorGlyph>,
}

impl CursorController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Glyph currently on screen.
    pub fn visible(&self) -> Option<CursorGlyph> {
        self.visible
    }

    /// Show `glyph` centred on `point`. Switching glyphs re-shows; showing the
    /// visible glyph again only moves it.
    pub fn show<O: CursorOverlay + ?Sized>(&mut self, glyph: CursorGlyph, point: Point, overlay: &O) {
        if self.visible == Some(glyph) {
            overlay.move_to(point);
            return;
        }
        overlay.show(glyph, point);
        self.visible = Some(glyph);
    }

    pub fn move_to<O: CursorOverlay + ?Sized>(&self, point: Point, overlay: &O) {
        if self.visible.is_some() {
            overlay.move_to(point);
        }
    }

    pub fn hide<O: CursorOverlay + ?Sized>(&mut self, overlay: &O) {
        if self.visible.take().is_some() {
            overlay.hide();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeOverlay, OverlayCall};

    #[test]
    fn test_glyph_for_resize_edge() {
        assert_eq!(CursorGlyph::from(ResizeEdge::TopLeft), CursorGlyph::ResizeNwse);
        assert_eq!(CursorGlyph::from(ResizeEdge::BottomRight), CursorGlyph::ResizeNwse);
        assert_eq!(CursorGlyph::from(ResizeEdge::TopRight), CursorGlyph::ResizeNesw);
        assert_eq!(CursorGlyph::from(ResizeEdge::BottomLeft), CursorGlyph::ResizeNesw);
    }

    #[test]
    fn test_show_move_hide() {
        let overlay = FakeOverlay::new();
        let mut cursor = CursorController::new();

        cursor.move_to(Point::new(1, 1), &overlay);
        cursor.show(CursorGlyph::Move, Point::new(10, 10), &overlay);
        cursor.move_to(Point::new(20, 20), &overlay);
        cursor.hide(&overlay);
        cursor.hide(&overlay);

        assert_eq!(
            overlay.calls(),
            vec![
                OverlayCall::Show(CursorGlyph::Move, Point::new(10, 10)),
                OverlayCall::MoveTo(Point::new(20, 20)),
                OverlayCall::Hide,
            ]
        );
        assert_eq!(cursor.visible(), None);
    }

    #[test]
    fn test_show_same_glyph_only_moves() {
        let overlay = FakeOverlay::new();
        let mut cursor = CursorController::new();

        cursor.show(CursorGlyph::Detect, Point::new(10, 10), &overlay);
        cursor.show(CursorGlyph::Detect, Point::new(11, 11), &overlay);
        cursor.show(CursorGlyph::Move, Point::new(12, 12), &overlay);

        assert_eq!(
            overlay.calls(),
            vec![
                OverlayCall::Show(CursorGlyph::Detect, Point::new(10, 10)),
                OverlayCall::MoveTo(Point::new(11, 11)),
                OverlayCall::Show(CursorGlyph::Move, Point::new(12, 12)),
            ]
        );
        assert_eq!(cursor.visible(), Some(CursorGlyph::Move));
    }
}
