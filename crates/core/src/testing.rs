//! In-memory collaborators for engine tests.
//!
//! Every fake records the mutations it receives so tests can assert on the
//! exact sequence of OS calls an operation would make, without touching real
//! windows or hooks.
//!
//! # Usage
//!
//! ```rust,ignore
//! let surface = FakeSurface::new();
//! surface.add_window(FakeWindow::new(1, Rect::new(0, 0, 400, 300)));
//! surface.add_window(FakeWindow::new(2, Rect::new(500, 0, 900, 300)).tool());
//!
//! let display = FakeTopology::single(Rect::new(0, 0, 1920, 1080), Rect::new(0, 0, 1920, 1040));
//! assert_eq!(surface.window_at(Point::new(10, 10)), Some(WindowId(1)));
//! ```

#![cfg(test)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::cursor::CursorGlyph;
use crate::geometry::{Insets, Point, Rect};
use crate::hotkey::Modifiers;
use crate::platform::{
    CursorOverlay, DisplayTopology, ExtendedStyle, InputHooks, LayeredAttributes, MonitorId,
    MonitorInfo, Placement, SnappableWindow, SurfaceError, WindowId, WindowIdentity,
    WindowSurface, ZOrder,
};
use crate::rate_limit::Clock;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// Fake Window
// ============================================================================

/// A window as the fake surface sees it.
#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub id: WindowId,
    /// Rectangle reported by `window_rect`.
    pub rect: Rect,
    /// Visible frame; `None` means identical to `rect`.
    pub frame: Option<Rect>,
    pub normal: Rect,
    pub maximized: bool,
    pub identity: WindowIdentity,
    pub style: ExtendedStyle,
    pub alpha: Option<u8>,
    /// Reported by `snappable_windows`.
    pub snappable: bool,
    /// Tool windows are skipped by `windows_at`.
    pub tool: bool,
    pub caption: bool,
}

impl FakeWindow {
    pub fn new(id: u64, rect: Rect) -> Self {
        Self {
            id: WindowId(id),
            rect,
            frame: None,
            normal: rect,
            maximized: false,
            identity: WindowIdentity {
                class: "TestWindow".to_string(),
                title: format!("Window {}", id),
            },
            style: ExtendedStyle(0),
            alpha: None,
            snappable: true,
            tool: false,
            caption: true,
        }
    }

    pub fn maximized(mut self, normal: Rect) -> Self {
        self.maximized = true;
        self.normal = normal;
        self
    }

    pub fn with_identity(mut self, class: &str, title: &str) -> Self {
        self.identity = WindowIdentity {
            class: class.to_string(),
            title: title.to_string(),
        };
        self
    }

    pub fn with_frame(mut self, frame: Rect) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn with_style(mut self, style: u32) -> Self {
        self.style = ExtendedStyle(style);
        self
    }

    pub fn with_alpha(mut self, alpha: Option<u8>) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn tool(mut self) -> Self {
        self.tool = true;
        self.snappable = false;
        self
    }

    pub fn without_caption(mut self) -> Self {
        self.caption = false;
        self.snappable = false;
        self
    }
}

// ============================================================================
// Fake Surface
// ============================================================================

/// Mutating calls received by [`FakeSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceCall {
    SetRect(WindowId, Rect),
    SetZOrder(WindowId, ZOrder),
    SetExtendedStyle(WindowId, ExtendedStyle),
    SetLayeredAlpha(WindowId, u8),
    Redraw(WindowId),
    Restore(WindowId),
}

#[derive(Debug, Default)]
struct SurfaceState {
    /// Z-order, index 0 is topmost.
    windows: Vec<FakeWindow>,
    calls: Vec<SurfaceCall>,
    failing: HashSet<WindowId>,
    foreground: Option<WindowId>,
    fullscreen_exclusive: bool,
    fullscreen_probes: usize,
}

impl SurfaceState {
    fn get(&self, id: WindowId) -> Result<&FakeWindow, SurfaceError> {
        if self.failing.contains(&id) {
            return Err(SurfaceError::CallFailed {
                call: "fake",
                window: id,
                message: "injected failure".to_string(),
            });
        }
        self.windows
            .iter()
            .find(|w| w.id == id)
            .ok_or(SurfaceError::WindowGone(id))
    }

    fn get_mut(&mut self, id: WindowId) -> Result<&mut FakeWindow, SurfaceError> {
        self.get(id)?;
        self.windows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or(SurfaceError::WindowGone(id))
    }
}

/// Shared, recording implementation of [`WindowSurface`].
#[derive(Debug, Clone, Default)]
pub struct FakeSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a window below all existing ones.
    pub fn add_window(&self, window: FakeWindow) {
        lock(&self.state).windows.push(window);
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        lock(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Make every query and mutation on `id` fail.
    pub fn fail_queries(&self, id: WindowId) {
        lock(&self.state).failing.insert(id);
    }

    pub fn set_foreground(&self, id: Option<WindowId>) {
        lock(&self.state).foreground = id;
    }

    pub fn set_fullscreen_exclusive(&self, active: bool) {
        lock(&self.state).fullscreen_exclusive = active;
    }

    /// Current state of a window. Panics if it does not exist.
    pub fn window(&self, id: WindowId) -> FakeWindow {
        lock(&self.state)
            .windows
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .unwrap_or_else(|| panic!("no fake window {}", id))
    }

    /// Window ids from top to bottom.
    pub fn z_order(&self) -> Vec<WindowId> {
        lock(&self.state).windows.iter().map(|w| w.id).collect()
    }

    /// How often `fullscreen_exclusive_active` was queried.
    pub fn fullscreen_probes(&self) -> usize {
        lock(&self.state).fullscreen_probes
    }
}

impl WindowSurface for FakeSurface {
    fn window_at(&self, point: Point) -> Option<WindowId> {
        lock(&self.state)
            .windows
            .iter()
            .find(|w| w.rect.contains(point))
            .map(|w| w.id)
    }

    fn window_rect(&self, id: WindowId) -> Result<Rect, SurfaceError> {
        Ok(lock(&self.state).get(id)?.rect)
    }

    fn frame_bounds(&self, id: WindowId) -> Result<Rect, SurfaceError> {
        let state = lock(&self.state);
        let window = state.get(id)?;
        Ok(window.frame.unwrap_or(window.rect))
    }

    fn placement(&self, id: WindowId) -> Result<Placement, SurfaceError> {
        let state = lock(&self.state);
        let window = state.get(id)?;
        Ok(Placement {
            normal: window.normal,
            maximized: window.maximized,
        })
    }

    fn identity(&self, id: WindowId) -> Result<WindowIdentity, SurfaceError> {
        Ok(lock(&self.state).get(id)?.identity.clone())
    }

    fn extended_style(&self, id: WindowId) -> Result<ExtendedStyle, SurfaceError> {
        Ok(lock(&self.state).get(id)?.style)
    }

    fn set_extended_style(&self, id: WindowId, style: ExtendedStyle) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        state.get_mut(id)?.style = style;
        state.calls.push(SurfaceCall::SetExtendedStyle(id, style));
        Ok(())
    }

    fn layered_attributes(&self, id: WindowId) -> Result<LayeredAttributes, SurfaceError> {
        Ok(LayeredAttributes {
            alpha: lock(&self.state).get(id)?.alpha,
        })
    }

    fn set_layered_alpha(&self, id: WindowId, alpha: u8) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        state.get_mut(id)?.alpha = Some(alpha);
        state.calls.push(SurfaceCall::SetLayeredAlpha(id, alpha));
        Ok(())
    }

    fn redraw(&self, id: WindowId) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        state.get(id)?;
        state.calls.push(SurfaceCall::Redraw(id));
        Ok(())
    }

    fn set_rect(&self, id: WindowId, rect: Rect) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        let window = state.get_mut(id)?;
        // The visible frame keeps its inset from the reported rect
        if let Some(frame) = window.frame {
            window.frame = Some(rect.inset(Insets::between(&window.rect, &frame)));
        }
        window.rect = rect;
        state.calls.push(SurfaceCall::SetRect(id, rect));
        Ok(())
    }

    fn set_z_order(&self, id: WindowId, order: ZOrder) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        state.get(id)?;
        let Some(index) = state.windows.iter().position(|w| w.id == id) else {
            return Err(SurfaceError::WindowGone(id));
        };
        let window = state.windows.remove(index);
        match order {
            ZOrder::Bottom => state.windows.push(window),
            ZOrder::Top | ZOrder::TopMost => state.windows.insert(0, window),
            ZOrder::NoTopMost => state.windows.insert(index, window),
        }
        state.calls.push(SurfaceCall::SetZOrder(id, order));
        Ok(())
    }

    fn restore(&self, id: WindowId) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        let window = state.get_mut(id)?;
        window.maximized = false;
        window.rect = window.normal;
        // Only the maximized overhang is modelled; restored windows have none
        window.frame = None;
        state.calls.push(SurfaceCall::Restore(id));
        Ok(())
    }

    fn snappable_windows(&self, exclude: WindowId) -> Vec<SnappableWindow> {
        lock(&self.state)
            .windows
            .iter()
            .filter(|w| w.snappable && w.id != exclude)
            .map(|w| SnappableWindow {
                id: w.id,
                rect: w.frame.unwrap_or(w.rect),
                identity: w.identity.clone(),
            })
            .collect()
    }

    fn windows_at(&self, point: Point) -> Vec<WindowId> {
        lock(&self.state)
            .windows
            .iter()
            .filter(|w| !w.tool && w.rect.contains(point))
            .map(|w| w.id)
            .collect()
    }

    fn foreground_window(&self) -> Option<WindowId> {
        lock(&self.state).foreground
    }

    fn has_caption(&self, id: WindowId) -> Result<bool, SurfaceError> {
        Ok(lock(&self.state).get(id)?.caption)
    }

    fn fullscreen_exclusive_active(&self) -> bool {
        let mut state = lock(&self.state);
        state.fullscreen_probes += 1;
        state.fullscreen_exclusive
    }
}

// ============================================================================
// Fake Topology
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FakeTopology {
    monitors: Vec<MonitorInfo>,
}

impl FakeTopology {
    /// One monitor with the given bounds and work area.
    pub fn single(bounds: Rect, work_area: Rect) -> Self {
        Self {
            monitors: vec![MonitorInfo {
                id: MonitorId(1),
                bounds,
                work_area,
            }],
        }
    }

    pub fn with_monitor(mut self, bounds: Rect, work_area: Rect) -> Self {
        let id = MonitorId(self.monitors.len() as u64 + 1);
        self.monitors.push(MonitorInfo {
            id,
            bounds,
            work_area,
        });
        self
    }
}

impl DisplayTopology for FakeTopology {
    fn monitors(&self) -> Vec<MonitorInfo> {
        self.monitors.clone()
    }

    fn monitor_for_window(&self, _id: WindowId) -> Option<MonitorInfo> {
        self.monitors.first().copied()
    }
}

// ============================================================================
// Fake Hooks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCall {
    InstallKeyboard,
    UninstallKeyboard,
    InstallMouse,
    UninstallMouse,
    ControlKey,
    SetActivation(Modifiers),
}

#[derive(Debug, Default)]
struct HookState {
    calls: Vec<HookCall>,
    fail_keyboard: bool,
    keyboard: bool,
    mouse: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeHooks {
    state: Arc<Mutex<HookState>>,
}

impl FakeHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_keyboard() -> Self {
        let hooks = Self::default();
        lock(&hooks.state).fail_keyboard = true;
        hooks
    }

    pub fn calls(&self) -> Vec<HookCall> {
        lock(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    pub fn keyboard_installed(&self) -> bool {
        lock(&self.state).keyboard
    }

    pub fn mouse_installed(&self) -> bool {
        lock(&self.state).mouse
    }
}

impl InputHooks for FakeHooks {
    fn install_keyboard_hook(&self) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        if state.fail_keyboard {
            return Err(SurfaceError::HookInstallFailed("keyboard".to_string()));
        }
        state.keyboard = true;
        state.calls.push(HookCall::InstallKeyboard);
        Ok(())
    }

    fn uninstall_keyboard_hook(&self) {
        let mut state = lock(&self.state);
        state.keyboard = false;
        state.calls.push(HookCall::UninstallKeyboard);
    }

    fn install_mouse_hook(&self) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        state.mouse = true;
        state.calls.push(HookCall::InstallMouse);
        Ok(())
    }

    fn uninstall_mouse_hook(&self) {
        let mut state = lock(&self.state);
        state.mouse = false;
        state.calls.push(HookCall::UninstallMouse);
    }

    fn send_control_key(&self) {
        lock(&self.state).calls.push(HookCall::ControlKey);
    }

    fn set_activation(&self, modifiers: Modifiers) {
        lock(&self.state).calls.push(HookCall::SetActivation(modifiers));
    }
}

// ============================================================================
// Fake Overlay
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayCall {
    Show(CursorGlyph, Point),
    MoveTo(Point),
    Hide,
}

#[derive(Debug, Clone, Default)]
pub struct FakeOverlay {
    calls: Arc<Mutex<Vec<OverlayCall>>>,
}

impl FakeOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<OverlayCall> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Whether the last show/hide call was a show.
    pub fn is_visible(&self) -> bool {
        matches!(
            lock(&self.calls)
                .iter()
                .rev()
                .find(|c| !matches!(c, OverlayCall::MoveTo(_))),
            Some(OverlayCall::Show(..))
        )
    }
}

impl CursorOverlay for FakeOverlay {
    fn show(&self, glyph: CursorGlyph, point: Point) {
        lock(&self.calls).push(OverlayCall::Show(glyph, point));
    }

    fn move_to(&self, point: Point) {
        lock(&self.calls).push(OverlayCall::MoveTo(point));
    }

    fn hide(&self) {
        lock(&self.calls).push(OverlayCall::Hide);
    }
}

// ============================================================================
// Manual Clock
// ============================================================================

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *lock(&self.now) += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *lock(&self.now)
    }
}
