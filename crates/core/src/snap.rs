//! Edge and corner snapping.
//!
//! [`SnapEngine::start_snap`] freezes a snapshot of candidate rectangles at
//! the start of an operation:
//! - other snappable windows, inflated by the configured padding
//! - monitor work areas, which also accept snapping to their inside
//!
//! Every move/resize tick then runs a pure search over that snapshot. Windows
//! that move during the drag are not re-queried.
//!
//! Each axis is searched independently. For each candidate the four
//! alignments are tested in a fixed priority order and the first one within
//! the axis threshold wins. A match narrows the threshold to its distance,
//! so a later candidate only takes over when it is strictly closer.

use crate::exclusion::ExclusionFilter;
use crate::geometry::{Insets, Rect};
use crate::operation::ResizeEdge;
use crate::platform::{DisplayTopology, WindowId, WindowSurface};
use crate::settings::Settings;
use tracing::debug;

/// A rectangle a dragged edge may align to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapCandidate {
    pub rect: Rect,
    /// Containers (work areas) accept alignment to their inner edges even
    /// when the dragged window sits fully inside them.
    pub snap_inside: bool,
}

impl SnapCandidate {
    /// Another window. Inner alignment only through the perpendicular gate.
    pub fn peer(rect: Rect) -> Self {
        Self {
            rect,
            snap_inside: false,
        }
    }

    /// A monitor work area.
    pub fn container(rect: Rect) -> Self {
        Self {
            rect,
            snap_inside: true,
        }
    }
}

/// Which edge of the dragged span on an axis stuck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// Left or top.
    Near,
    /// Right or bottom.
    Far,
}

/// A one-dimensional view of a rectangle on the axis being searched, plus
/// its extent on the perpendicular axis.
#[derive(Debug, Clone, Copy)]
struct AxisView {
    near: i32,
    far: i32,
    cross_near: i32,
    cross_far: i32,
}

impl AxisView {
    fn horizontal(rect: &Rect) -> Self {
        Self {
            near: rect.left,
            far: rect.right,
            cross_near: rect.top,
            cross_far: rect.bottom,
        }
    }

    fn vertical(rect: &Rect) -> Self {
        Self {
            near: rect.top,
            far: rect.bottom,
            cross_near: rect.left,
            cross_far: rect.right,
        }
    }
}

/// Which sides of the dragged span may move on an axis.
#[derive(Debug, Clone, Copy)]
struct Eligible {
    near: bool,
    far: bool,
}

impl Eligible {
    const BOTH: Eligible = Eligible {
        near: true,
        far: true,
    };
}

fn in_range(x: i32, a: i32, b: i32, tolerance: u32) -> bool {
    let (x, a, b, t) = (x as i64, a as i64, b as i64, tolerance as i64);
    a - t <= x && x <= b + t
}

/// Nearest-match search on one axis.
struct AxisSearch {
    threshold: u32,
    best: Option<u32>,
    found: Option<(Side, i32)>,
}

impl AxisSearch {
    fn new(threshold: u32) -> Self {
        Self {
            threshold,
            best: None,
            found: None,
        }
    }

    fn accepts(&self, distance: u32) -> bool {
        match self.best {
            None => distance <= self.threshold,
            Some(best) => distance < best,
        }
    }

    /// Test one candidate against the dragged span.
    fn consider(&mut self, dragged: AxisView, candidate: AxisView, snap_inside: bool, eligible: Eligible) {
        let t = self.threshold;
        let overlaps = in_range(dragged.cross_near, candidate.cross_near, candidate.cross_far, t)
            || in_range(candidate.cross_near, dragged.cross_near, dragged.cross_far, t);
        if !overlaps {
            return;
        }

        // Dragged window is past the candidate on the perpendicular axis, so
        // lining up inner edges reads as stacking rather than overlapping.
        let inside = snap_inside
            || (dragged.cross_far as i64 - t as i64) < candidate.cross_near as i64
            || (candidate.cross_far as i64) < dragged.cross_near as i64 + t as i64;

        let alignments = [
            (eligible.near, Side::Near, dragged.near, candidate.far),
            (eligible.far && inside, Side::Far, dragged.far, candidate.far),
            (eligible.near && inside, Side::Near, dragged.near, candidate.near),
            (eligible.far, Side::Far, dragged.far, candidate.near),
        ];

        for (allowed, side, edge, target) in alignments {
            if !allowed {
                continue;
            }
            let distance = edge.abs_diff(target);
            if self.accepts(distance) {
                self.best = Some(distance);
                self.found = Some((side, target));
                return;
            }
        }
    }
}

/// Inset between the reported window rect and its visible frame.
fn measure_border<S>(target: WindowId, surface: &S) -> Insets
where
    S: WindowSurface + ?Sized,
{
    match (surface.window_rect(target), surface.frame_bounds(target)) {
        (Ok(rect), Ok(frame)) => Insets::between(&rect, &frame),
        (Err(e), _) | (_, Err(e)) => {
            debug!("No frame bounds for {}, snapping without border offset: {}", target, e);
            Insets::default()
        }
    }
}

/// Snapping engine with a frozen per-operation snapshot.
#[derive(Debug, Clone)]
pub struct SnapEngine {
    enabled: bool,
    threshold: u32,
    padding: i32,
    candidates: Vec<SnapCandidate>,
    border: Insets,
    /// Threshold and on/off state frozen at snapshot time.
    active_threshold: u32,
    active_enabled: bool,
}

impl SnapEngine {
    pub fn new(settings: &Settings) -> Self {
        let mut engine = Self {
            enabled: true,
            threshold: 0,
            padding: 0,
            candidates: Vec::new(),
            border: Insets::default(),
            active_threshold: 0,
            active_enabled: false,
        };
        engine.apply_settings(settings);
        engine
    }

    /// Take new settings. The current snapshot keeps the threshold, padding
    /// and on/off state it was taken with; they apply from the next
    /// [`start_snap`](Self::start_snap).
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.enabled = settings.snapping_enabled;
        self.threshold = settings.snapping_threshold.max(0) as u32;
        self.padding = settings.snapping_padding.max(0);
    }

    /// Snapshot candidates and border offsets for `target`.
    pub fn start_snap<S, D>(
        &mut self,
        target: WindowId,
        surface: &S,
        display: &D,
        exclusions: &ExclusionFilter,
    ) where
        S: WindowSurface + ?Sized,
        D: DisplayTopology + ?Sized,
    {
        if !self.enabled {
            self.clear();
            return;
        }

        let padding = self.padding;
        let mut candidates: Vec<SnapCandidate> = surface
            .snappable_windows(target)
            .into_iter()
            .filter(|w| w.id != target && !exclusions.is_excluded(&w.identity))
            .map(|w| SnapCandidate::peer(w.rect.inflate(padding, padding)))
            .collect();
        candidates.extend(
            display
                .monitors()
                .into_iter()
                .map(|m| SnapCandidate::container(m.work_area)),
        );

        let border = measure_border(target, surface);

        debug!(
            "Snap snapshot for {}: {} candidates, border {:?}",
            target,
            candidates.len(),
            border
        );
        self.start_with(candidates, border);
    }

    /// Install a snapshot directly.
    pub fn start_with(&mut self, candidates: Vec<SnapCandidate>, border: Insets) {
        self.candidates = candidates;
        self.border = border;
        self.active_threshold = self.threshold;
        self.active_enabled = self.enabled;
    }

    /// Re-measure the border offset after the target changed show state,
    /// e.g. when a maximized window is restored mid-operation. The candidate
    /// snapshot is left untouched.
    pub fn refresh_border<S>(&mut self, target: WindowId, surface: &S)
    where
        S: WindowSurface + ?Sized,
    {
        if !self.active_enabled {
            return;
        }
        self.border = measure_border(target, surface);
        debug!("Border for {} is now {:?}", target, self.border);
    }

    pub fn border(&self) -> Insets {
        self.border
    }

    /// Drop the snapshot at the end of an operation.
    pub fn clear(&mut self) {
        self.candidates.clear();
        self.border = Insets::default();
        self.active_enabled = false;
    }

    pub fn candidates(&self) -> &[SnapCandidate] {
        &self.candidates
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Snap a window being moved. Size is preserved.
    pub fn snap_moving_window(&self, rect: Rect) -> Rect {
        let Some((x, y)) = self.search(&rect, Eligible::BOTH, Eligible::BOTH) else {
            return rect;
        };
        let logical = rect.inset(self.border);

        let dx = match x {
            Some((Side::Near, target)) => target.saturating_sub(logical.left),
            Some((Side::Far, target)) => target.saturating_sub(logical.right),
            None => 0,
        };
        let dy = match y {
            Some((Side::Near, target)) => target.saturating_sub(logical.top),
            Some((Side::Far, target)) => target.saturating_sub(logical.bottom),
            None => 0,
        };
        rect.offset(dx, dy)
    }

    /// Snap a window being resized from `edge`. Only the edges that corner
    /// drags can move; the opposite edges stay anchored.
    pub fn snap_resizing_window(&self, rect: Rect, edge: ResizeEdge) -> Rect {
        let horizontal = Eligible {
            near: edge.moves_left(),
            far: !edge.moves_left(),
        };
        let vertical = Eligible {
            near: edge.moves_top(),
            far: !edge.moves_top(),
        };
        let Some((x, y)) = self.search(&rect, horizontal, vertical) else {
            return rect;
        };

        let mut out = rect;
        match x {
            Some((Side::Near, target)) => out.left = target - self.border.left,
            Some((Side::Far, target)) => out.right = target + self.border.right,
            None => {}
        }
        match y {
            Some((Side::Near, target)) => out.top = target - self.border.top,
            Some((Side::Far, target)) => out.bottom = target + self.border.bottom,
            None => {}
        }
        out
    }

    /// Run both axis searches. `None` means pass the rectangle through.
    #[allow(clippy::type_complexity)]
    fn search(
        &self,
        rect: &Rect,
        horizontal: Eligible,
        vertical: Eligible,
    ) -> Option<(Option<(Side, i32)>, Option<(Side, i32)>)> {
        if !self.active_enabled || self.candidates.is_empty() || rect.is_degenerate() {
            return None;
        }

        let logical = rect.inset(self.border);
        let mut x = AxisSearch::new(self.active_threshold);
        let mut y = AxisSearch::new(self.active_threshold);

        for candidate in self.candidates.iter().filter(|c| !c.rect.is_degenerate()) {
            x.consider(
                AxisView::horizontal(&logical),
                AxisView::horizontal(&candidate.rect),
                candidate.snap_inside,
                horizontal,
            );
            y.consider(
                AxisView::vertical(&logical),
                AxisView::vertical(&candidate.rect),
                candidate.snap_inside,
                vertical,
            );
        }

        Some((x.found, y.found))
    }
}
