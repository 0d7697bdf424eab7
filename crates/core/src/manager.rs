//! Operation state machine.
//!
//! The [`Manager`] consumes [`InputEvent`]s one at a time and drives every
//! controller. It owns the only copy of the current [`Operation`], so at most
//! one move, resize or detect phase can be active. Transparency, the cursor
//! overlay and the target window are armed together in
//! `start_operation` and disarmed together in `end_operation`.
//!
//! ```text
//!            HotKeyPressed              MouseDown(Left)
//!   Idle ─────────────────▶ Armed ─────────────────────▶ Moving
//!    ▲                      │  ▲ ◀────────────────────── │
//!    │     HotKeyReleased   │  │     MouseUp(Left)       │
//!    └──────────────────────┘  │                         │
//!                              │ MouseDown(Right)        │
//!                              └───────────▶ Resizing ◀──┘ (other button: teardown)
//! ```

use crate::cursor::{CursorController, CursorGlyph};
use crate::exclusion::{Exclusion, ExclusionDetector, ExclusionFilter};
use crate::game_mode::GameModeGuard;
use crate::geometry::Point;
use crate::operation::{MoveController, ResizeController};
use crate::platform::{
    CursorOverlay, DisplayTopology, InputEvent, InputHooks, MouseButton, SurfaceError, WindowId,
    WindowSurface,
};
use crate::rate_limit::{Clock, RateLimiter, SystemClock};
use crate::rolodex::RolodexController;
use crate::settings::Settings;
use crate::snap::SnapEngine;
use crate::target::TargetWindowTracker;
use crate::transparency::TransparencyController;
use thiserror::Error;
use tracing::{debug, info, warn};

/// The single active phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operation {
    #[default]
    None,
    Move,
    Resize,
    Detect,
}

impl Operation {
    /// Button that started (and ends) the operation.
    pub fn button(self) -> Option<MouseButton> {
        match self {
            Operation::Move => Some(MouseButton::Left),
            Operation::Resize => Some(MouseButton::Right),
            Operation::None | Operation::Detect => None,
        }
    }
}

/// Externally observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// Hotkey not held.
    Idle,
    /// Hotkey held, no operation.
    Armed,
    Moving,
    Resizing,
    Detecting,
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Failed to install keyboard hook: {0}")]
    KeyboardHook(#[source] SurfaceError),
}

/// Coordinates hooks, controllers and platform collaborators.
pub struct Manager<S, D, H, C, K = SystemClock>
where
    K: Clock + Clone,
{
    surface: S,
    display: D,
    hooks: H,
    overlay: C,
    settings: Settings,

    operation: Operation,
    hotkey_held: bool,
    /// Set once any operation runs during the current activation.
    operation_occurred: bool,
    paused: bool,

    tracker: TargetWindowTracker,
    snap: SnapEngine,
    mover: MoveController,
    resizer: ResizeController,
    transparency: TransparencyController,
    rolodex: RolodexController,
    cursor: CursorController,
    limiter: RateLimiter<K>,
    game_mode: GameModeGuard<K>,
    exclusions: ExclusionFilter,
    detector: ExclusionDetector,
}

impl<S, D, H, C> Manager<S, D, H, C, SystemClock>
where
    S: WindowSurface,
    D: DisplayTopology,
    H: InputHooks,
    C: CursorOverlay,
{
    pub fn new(surface: S, display: D, hooks: H, overlay: C, settings: Settings) -> Self {
        Self::with_clock(surface, display, hooks, overlay, settings, SystemClock)
    }
}

impl<S, D, H, C, K> Manager<S, D, H, C, K>
where
    S: WindowSurface,
    D: DisplayTopology,
    H: InputHooks,
    C: CursorOverlay,
    K: Clock + Clone,
{
    pub fn with_clock(surface: S, display: D, hooks: H, overlay: C, settings: Settings, clock: K) -> Self {
        Self {
            tracker: TargetWindowTracker::new(),
            snap: SnapEngine::new(&settings),
            mover: MoveController::new(),
            resizer: ResizeController::new(settings.minimum_window_size),
            transparency: TransparencyController::new(
                settings.transparency_enabled,
                settings.transparency_opacity,
            ),
            rolodex: RolodexController::new(settings.rolodex_enabled),
            cursor: CursorController::new(),
            limiter: RateLimiter::new(settings.update_interval, clock.clone()),
            game_mode: GameModeGuard::new(settings.disable_in_game_mode, clock),
            exclusions: ExclusionFilter::new(&settings.exclusions),
            detector: ExclusionDetector::new(&settings.exclusions),
            surface,
            display,
            hooks,
            overlay,
            settings,
            operation: Operation::None,
            hotkey_held: false,
            operation_occurred: false,
            paused: false,
        }
    }

    pub fn state(&self) -> ManagerState {
        match self.operation {
            Operation::Move => ManagerState::Moving,
            Operation::Resize => ManagerState::Resizing,
            Operation::Detect => ManagerState::Detecting,
            Operation::None if self.hotkey_held => ManagerState::Armed,
            Operation::None => ManagerState::Idle,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn is_hotkey_held(&self) -> bool {
        self.hotkey_held
    }

    pub fn operation_has_occurred(&self) -> bool {
        self.operation_occurred
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Window currently being moved or resized.
    pub fn target(&self) -> Option<WindowId> {
        self.tracker.current().map(|t| t.id)
    }

    /// Window currently dimmed by the transparency controller.
    pub fn transparent_window(&self) -> Option<WindowId> {
        self.transparency.active_window()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Install the keyboard hook so the activation hotkey is seen.
    pub fn activate(&mut self) -> Result<(), ManagerError> {
        self.hooks.set_activation(self.settings.activation);
        self.hooks
            .install_keyboard_hook()
            .map_err(ManagerError::KeyboardHook)?;
        info!("Keyboard hook installed");
        Ok(())
    }

    /// End any operation and remove both hooks.
    pub fn deactivate(&mut self) {
        if self.operation != Operation::None {
            self.end_operation();
        }
        self.hooks.uninstall_mouse_hook();
        self.hooks.uninstall_keyboard_hook();
        self.hotkey_held = false;
        self.operation_occurred = false;
        info!("Hooks uninstalled");
    }

    /// Pausing drops all hooks; resuming reinstalls the keyboard hook.
    pub fn set_paused(&mut self, paused: bool) -> Result<(), ManagerError> {
        if paused == self.paused {
            return Ok(());
        }
        self.paused = paused;
        if paused {
            self.deactivate();
            info!("Paused");
            Ok(())
        } else {
            info!("Resumed");
            self.activate()
        }
    }

    /// Push new settings to every component. A running operation keeps its
    /// snap snapshot and target.
    pub fn apply_settings(&mut self, settings: Settings) {
        if settings.activation != self.settings.activation {
            self.hooks.set_activation(settings.activation);
        }
        self.snap.apply_settings(&settings);
        self.transparency
            .configure(settings.transparency_enabled, settings.transparency_opacity);
        self.rolodex.set_enabled(settings.rolodex_enabled);
        self.limiter.set_interval(settings.update_interval);
        self.resizer.set_minimum_size(settings.minimum_window_size);
        self.game_mode.set_enabled(settings.disable_in_game_mode);
        self.exclusions = ExclusionFilter::new(&settings.exclusions);
        self.detector.set_known(&settings.exclusions);

        if self.operation == Operation::Detect && !settings.exclusion_detection {
            self.end_operation();
        }
        self.settings = settings;
        debug!("Settings applied");
    }

    /// Exclusions recorded in detect mode since the last call.
    pub fn take_new_exclusions(&mut self) -> Vec<Exclusion> {
        self.detector.take_pending()
    }

    /// Feed one input event through the transition table.
    pub fn handle_event(&mut self, event: InputEvent) {
        if self.paused {
            return;
        }

        match (self.operation, event) {
            (_, InputEvent::HotKeyPressed) => self.on_hotkey_pressed(),
            (_, InputEvent::HotKeyReleased) => self.on_hotkey_released(),

            (Operation::Detect, InputEvent::MouseDown { point, .. }) => self.record_exclusion(point),
            (Operation::None, InputEvent::MouseDown { point, button }) => {
                if self.hotkey_held {
                    self.start_operation(point, button);
                }
            }
            (op @ (Operation::Move | Operation::Resize), InputEvent::MouseDown { point, button }) => {
                self.end_operation();
                if op.button() == Some(button) {
                    // The matching up was lost; treat this as a fresh press
                    debug!("Restarting {:?} after lost button up", op);
                    if self.hotkey_held {
                        self.start_operation(point, button);
                    }
                } else {
                    debug!("{:?} cancelled by {:?} button", op, button);
                }
                if !self.hotkey_held {
                    self.release_mouse_hook();
                }
            }

            (op, InputEvent::MouseUp { button, .. }) if op.button() == Some(button) => {
                self.end_operation();
                if !self.hotkey_held {
                    self.release_mouse_hook();
                }
            }
            (_, InputEvent::MouseUp { .. }) => {}

            (Operation::Move, InputEvent::MouseMove { point }) => self.on_move(point),
            (Operation::Resize, InputEvent::MouseMove { point }) => self.on_resize(point),
            (Operation::Detect, InputEvent::MouseMove { point }) => self.cursor.move_to(point, &self.overlay),
            (Operation::None, InputEvent::MouseMove { point }) => {
                if self.hotkey_held && self.settings.exclusion_detection {
                    self.operation = Operation::Detect;
                    self.operation_occurred = true;
                    self.cursor.show(CursorGlyph::Detect, point, &self.overlay);
                    debug!("Exclusion detection started");
                }
            }

            (Operation::None, InputEvent::MouseWheel { point, delta }) => {
                if self.hotkey_held {
                    self.rolodex.on_wheel(point, delta, &self.surface);
                }
            }
            (_, InputEvent::MouseWheel { .. }) => {}
        }
    }

    fn on_hotkey_pressed(&mut self) {
        if self.hotkey_held {
            return;
        }
        if self.operation != Operation::None {
            // Released and pressed again mid-drag; the hook never went away
            self.hotkey_held = true;
            return;
        }
        if self.game_mode.is_suppressed(&self.surface, &self.display) {
            return;
        }
        if let Err(e) = self.hooks.install_mouse_hook() {
            warn!("Cannot install mouse hook: {}", e);
            return;
        }
        self.hotkey_held = true;
        self.operation_occurred = false;
        debug!("Armed");
    }

    fn on_hotkey_released(&mut self) {
        match self.operation {
            Operation::Move | Operation::Resize => {
                // Teardown waits for the button up
                self.hotkey_held = false;
                self.hooks.send_control_key();
            }
            Operation::Detect | Operation::None => {
                if !self.hotkey_held && self.operation == Operation::None {
                    return;
                }
                if self.operation == Operation::Detect {
                    self.end_operation();
                }
                if self.operation_occurred {
                    self.hooks.send_control_key();
                }
                self.hotkey_held = false;
                self.release_mouse_hook();
            }
        }
    }

    fn release_mouse_hook(&mut self) {
        self.hooks.uninstall_mouse_hook();
        self.operation_occurred = false;
        debug!("Idle");
    }

    fn start_operation(&mut self, point: Point, button: MouseButton) {
        let Some(target) = self.tracker.capture(point, &self.surface, &self.display) else {
            return;
        };
        match self.surface.identity(target.id) {
            Ok(identity) if self.exclusions.is_excluded(&identity) => {
                debug!("Ignoring excluded window {} ({})", target.id, identity.class);
                self.tracker.clear();
                return;
            }
            Ok(_) => {}
            Err(e) => debug!("No identity for {}: {}", target.id, e),
        }

        self.limiter.reset();
        self.transparency.start(target.id, &self.surface);
        self.snap
            .start_snap(target.id, &self.surface, &self.display, &self.exclusions);

        match button {
            MouseButton::Left => {
                self.mover.start(point);
                self.cursor.show(CursorGlyph::Move, point, &self.overlay);
                self.operation = Operation::Move;
            }
            MouseButton::Right => {
                let edge = self.resizer.start(point, &target.initial_placement);
                self.cursor.show(edge.into(), point, &self.overlay);
                self.operation = Operation::Resize;
            }
        }
        self.operation_occurred = true;
        debug!("Started {:?} on {}", self.operation, target.id);
    }

    fn end_operation(&mut self) {
        match self.operation {
            Operation::Move => self.mover.stop(),
            Operation::Resize => self.resizer.stop(),
            Operation::Detect | Operation::None => {}
        }
        self.transparency.end(&self.surface);
        self.cursor.hide(&self.overlay);
        self.tracker.clear();
        self.snap.clear();
        if self.operation != Operation::None {
            debug!("Ended {:?}", self.operation);
        }
        self.operation = Operation::None;
    }

    fn on_move(&mut self, point: Point) {
        if self.limiter.is_limited() {
            return;
        }
        if let Err(e) = self
            .mover
            .move_window(point, &mut self.tracker, &mut self.snap, &self.surface, &self.display)
        {
            debug!("Move step failed: {}", e);
        }
        self.cursor.move_to(point, &self.overlay);
    }

    fn on_resize(&mut self, point: Point) {
        if self.limiter.is_limited() {
            return;
        }
        if let Err(e) = self
            .resizer
            .resize_window(point, &mut self.tracker, &mut self.snap, &self.surface, &self.display)
        {
            debug!("Resize step failed: {}", e);
        }
        self.cursor.move_to(point, &self.overlay);
    }

    fn record_exclusion(&mut self, point: Point) {
        let Some(id) = self.surface.window_at(point) else {
            return;
        };
        let identity = match self.surface.identity(id) {
            Ok(identity) => identity,
            Err(e) => {
                debug!("Cannot identify {}: {}", id, e);
                return;
            }
        };
        if let Some(exclusion) = self.detector.record(&identity) {
            self.exclusions.push(&exclusion);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::platform::{ExtendedStyle, ZOrder};
    use crate::testing::{
        FakeHooks, FakeOverlay, FakeSurface, FakeTopology, FakeWindow, HookCall, ManualClock,
        OverlayCall, SurfaceCall,
    };
    use std::time::Duration;

    type TestManager = Manager<FakeSurface, FakeTopology, FakeHooks, FakeOverlay, ManualClock>;

    struct Harness {
        manager: TestManager,
        surface: FakeSurface,
        hooks: FakeHooks,
        overlay: FakeOverlay,
        clock: ManualClock,
    }

    const WINDOW: Rect = Rect::new(300, 300, 700, 600);

    fn harness_with(settings: Settings, hooks: FakeHooks) -> Harness {
        let surface = FakeSurface::new();
        surface.add_window(FakeWindow::new(1, WINDOW));
        surface.add_window(FakeWindow::new(2, Rect::new(1000, 300, 1400, 600)));
        let display = FakeTopology::single(Rect::new(0, 0, 1920, 1080), Rect::new(0, 0, 1920, 1040));
        let overlay = FakeOverlay::new();
        let clock = ManualClock::new();
        let manager = Manager::with_clock(
            surface.clone(),
            display,
            hooks.clone(),
            overlay.clone(),
            settings,
            clock.clone(),
        );
        Harness {
            manager,
            surface,
            hooks,
            overlay,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with(Settings::default(), FakeHooks::new())
    }

    fn down(x: i32, y: i32, button: MouseButton) -> InputEvent {
        InputEvent::MouseDown {
            point: Point::new(x, y),
            button,
        }
    }

    fn up(x: i32, y: i32, button: MouseButton) -> InputEvent {
        InputEvent::MouseUp {
            point: Point::new(x, y),
            button,
        }
    }

    fn mv(x: i32, y: i32) -> InputEvent {
        InputEvent::MouseMove {
            point: Point::new(x, y),
        }
    }

    fn count(calls: &[HookCall], call: HookCall) -> usize {
        calls.iter().filter(|c| **c == call).count()
    }

    #[test]
    fn test_activate_installs_keyboard_hook() {
        let mut h = harness();
        h.manager.activate().unwrap();
        assert_eq!(
            h.hooks.calls(),
            vec![
                HookCall::SetActivation(Settings::default().activation),
                HookCall::InstallKeyboard
            ]
        );
    }

    #[test]
    fn test_activate_reports_hook_failure() {
        let mut h = harness_with(Settings::default(), FakeHooks::failing_keyboard());
        let err = h.manager.activate().unwrap_err();
        assert!(matches!(err, ManagerError::KeyboardHook(_)));
        assert!(!h.hooks.keyboard_installed());
    }

    #[test]
    fn test_deactivate_uninstalls_both_hooks() {
        let mut h = harness();
        h.manager.activate().unwrap();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.deactivate();

        assert!(!h.hooks.keyboard_installed());
        assert!(!h.hooks.mouse_installed());
        assert_eq!(h.manager.state(), ManagerState::Idle);
    }

    #[test]
    fn test_hotkey_press_arms_once() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(InputEvent::HotKeyPressed);

        assert_eq!(h.manager.state(), ManagerState::Armed);
        assert_eq!(count(&h.hooks.calls(), HookCall::InstallMouse), 1);
    }

    #[test]
    fn test_hotkey_release_without_operation() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(InputEvent::HotKeyReleased);

        assert_eq!(h.manager.state(), ManagerState::Idle);
        assert!(!h.hooks.mouse_installed());
        assert_eq!(count(&h.hooks.calls(), HookCall::ControlKey), 0);
    }

    #[test]
    fn test_stray_release_is_ignored() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyReleased);
        assert!(h.hooks.calls().is_empty());
    }

    #[test]
    fn test_move_cycle() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));

        assert_eq!(h.manager.state(), ManagerState::Moving);
        assert_eq!(h.manager.target(), Some(WindowId(1)));
        assert_eq!(h.manager.transparent_window(), Some(WindowId(1)));

        h.manager.handle_event(mv(450, 440));
        assert_eq!(h.surface.window(WindowId(1)).rect, Rect::new(350, 340, 750, 640));

        h.manager.handle_event(up(450, 440, MouseButton::Left));
        assert_eq!(h.manager.state(), ManagerState::Armed);
        assert_eq!(h.manager.target(), None);
        assert_eq!(h.manager.transparent_window(), None);
        assert!(h.manager.operation_has_occurred());
        assert_eq!(h.surface.window(WindowId(1)).style, ExtendedStyle(0));
        assert_eq!(
            h.overlay.calls(),
            vec![
                OverlayCall::Show(CursorGlyph::Move, Point::new(400, 400)),
                OverlayCall::MoveTo(Point::new(450, 440)),
                OverlayCall::Hide,
            ]
        );

        // Releasing after an operation suppresses the menu bar
        h.manager.handle_event(InputEvent::HotKeyReleased);
        assert_eq!(count(&h.hooks.calls(), HookCall::ControlKey), 1);
        assert!(!h.hooks.mouse_installed());
        assert_eq!(h.manager.state(), ManagerState::Idle);
    }

    #[test]
    fn test_move_snaps_to_peer() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        // Right edge lands at 980, 20px short of window 2
        h.manager.handle_event(mv(680, 400));

        assert_eq!(h.surface.window(WindowId(1)).rect, Rect::new(600, 300, 1000, 600));
    }

    #[test]
    fn test_release_during_operation_defers_teardown() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        h.manager.handle_event(InputEvent::HotKeyReleased);

        assert_eq!(h.manager.state(), ManagerState::Moving);
        assert!(!h.manager.is_hotkey_held());
        assert!(h.hooks.mouse_installed());
        assert_eq!(count(&h.hooks.calls(), HookCall::ControlKey), 1);

        // Dragging continues until the button comes up
        h.manager.handle_event(mv(410, 400));
        assert_eq!(h.surface.window(WindowId(1)).rect, Rect::new(310, 300, 710, 600));

        h.manager.handle_event(up(410, 400, MouseButton::Left));
        assert_eq!(h.manager.state(), ManagerState::Idle);
        assert!(!h.hooks.mouse_installed());
        assert_eq!(count(&h.hooks.calls(), HookCall::ControlKey), 1);
        assert_eq!(h.manager.transparent_window(), None);
    }

    #[test]
    fn test_press_on_empty_desktop_stays_armed() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(50, 50, MouseButton::Left));

        assert_eq!(h.manager.state(), ManagerState::Armed);
        assert!(!h.manager.operation_has_occurred());
        assert!(h.surface.calls().is_empty());
        assert!(h.overlay.calls().is_empty());
    }

    #[test]
    fn test_mouse_without_hotkey_does_nothing() {
        let mut h = harness();
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        h.manager.handle_event(mv(450, 450));
        h.manager.handle_event(up(450, 450, MouseButton::Left));

        assert_eq!(h.manager.state(), ManagerState::Idle);
        assert!(h.surface.calls().is_empty());
    }

    #[test]
    fn test_other_button_cancels_move() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        h.manager.handle_event(down(400, 400, MouseButton::Right));

        assert_eq!(h.manager.state(), ManagerState::Armed);
        assert_eq!(h.manager.target(), None);
        assert_eq!(h.manager.transparent_window(), None);
        assert_eq!(h.overlay.calls().last(), Some(&OverlayCall::Hide));
        assert!(h.hooks.mouse_installed());

        // The right button's up does not start anything either
        h.manager.handle_event(up(400, 400, MouseButton::Right));
        assert_eq!(h.manager.state(), ManagerState::Armed);
    }

    #[test]
    fn test_other_button_cancels_resize() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(650, 550, MouseButton::Right));
        assert_eq!(h.manager.state(), ManagerState::Resizing);

        h.manager.handle_event(down(650, 550, MouseButton::Left));
        assert_eq!(h.manager.state(), ManagerState::Armed);
        assert_eq!(h.manager.transparent_window(), None);
    }

    #[test]
    fn test_other_button_after_release_goes_idle() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        h.manager.handle_event(InputEvent::HotKeyReleased);
        h.manager.handle_event(down(400, 400, MouseButton::Right));

        assert_eq!(h.manager.state(), ManagerState::Idle);
        assert!(!h.hooks.mouse_installed());
    }

    #[test]
    fn test_same_button_restarts_operation() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        h.manager.handle_event(down(1100, 400, MouseButton::Left));

        assert_eq!(h.manager.state(), ManagerState::Moving);
        assert_eq!(h.manager.target(), Some(WindowId(2)));
        assert_eq!(h.manager.transparent_window(), Some(WindowId(2)));
        assert_eq!(h.surface.window(WindowId(1)).style, ExtendedStyle(0));
    }

    #[test]
    fn test_resize_enforces_minimum_size() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(650, 550, MouseButton::Right));
        assert_eq!(
            h.overlay.calls(),
            vec![OverlayCall::Show(CursorGlyph::ResizeNwse, Point::new(650, 550))]
        );

        h.manager.handle_event(mv(350, 350));
        assert_eq!(h.surface.window(WindowId(1)).rect, Rect::new(300, 300, 500, 500));
    }

    #[test]
    fn test_resize_top_right_uses_nesw_glyph() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(650, 350, MouseButton::Right));
        assert_eq!(
            h.overlay.calls(),
            vec![OverlayCall::Show(CursorGlyph::ResizeNesw, Point::new(650, 350))]
        );
    }

    #[test]
    fn test_moves_are_rate_limited() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        h.surface.clear_calls();

        h.manager.handle_event(mv(450, 400));
        h.manager.handle_event(mv(460, 400));
        assert_eq!(h.surface.calls().len(), 1);

        h.clock.advance(Duration::from_millis(32));
        h.manager.handle_event(mv(470, 400));
        assert_eq!(
            h.surface.calls(),
            vec![
                SurfaceCall::SetRect(WindowId(1), Rect::new(350, 300, 750, 600)),
                SurfaceCall::SetRect(WindowId(1), Rect::new(370, 300, 770, 600)),
            ]
        );
    }

    #[test]
    fn test_no_motion_no_platform_move() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        h.surface.clear_calls();

        h.manager.handle_event(mv(450, 400));
        h.clock.advance(Duration::from_millis(100));
        h.manager.handle_event(mv(450, 400));
        assert_eq!(h.surface.calls().len(), 1);
    }

    #[test]
    fn test_rate_limiter_reset_at_operation_start() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        h.manager.handle_event(mv(450, 400));
        h.manager.handle_event(up(450, 400, MouseButton::Left));
        h.surface.clear_calls();

        // Same instant, new operation: the first move still applies
        h.manager.handle_event(down(500, 400, MouseButton::Left));
        h.manager.handle_event(mv(510, 400));
        assert!(h
            .surface
            .calls()
            .iter()
            .any(|c| matches!(c, SurfaceCall::SetRect(..))));
    }

    #[test]
    fn test_wheel_only_when_armed() {
        let mut h = harness();
        let wheel = InputEvent::MouseWheel {
            point: Point::new(400, 400),
            delta: 120,
        };

        h.manager.handle_event(wheel);
        assert!(h.surface.calls().is_empty());

        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        h.surface.clear_calls();
        h.manager.handle_event(wheel);
        assert!(h.surface.calls().is_empty());
        h.manager.handle_event(up(400, 400, MouseButton::Left));

        h.surface.clear_calls();
        h.manager.handle_event(wheel);
        assert_eq!(
            h.surface.calls(),
            vec![SurfaceCall::SetZOrder(WindowId(1), ZOrder::Bottom)]
        );
    }

    #[test]
    fn test_wheel_ignored_when_rolodex_disabled() {
        let mut h = harness_with(
            Settings {
                rolodex_enabled: false,
                ..Settings::default()
            },
            FakeHooks::new(),
        );
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(InputEvent::MouseWheel {
            point: Point::new(400, 400),
            delta: -120,
        });
        assert!(h.surface.calls().is_empty());
    }

    #[test]
    fn test_excluded_window_is_not_moved() {
        let mut h = harness_with(
            Settings {
                exclusions: vec![Exclusion::class("testwindow").with_title("Window 1")],
                ..Settings::default()
            },
            FakeHooks::new(),
        );
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        h.manager.handle_event(mv(450, 450));

        assert_eq!(h.manager.state(), ManagerState::Armed);
        assert!(h.surface.calls().is_empty());

        // Window 2 is not excluded
        h.manager.handle_event(down(1100, 400, MouseButton::Left));
        assert_eq!(h.manager.state(), ManagerState::Moving);
    }

    #[test]
    fn test_detect_mode_records_exclusion() {
        let mut h = harness_with(
            Settings {
                exclusion_detection: true,
                ..Settings::default()
            },
            FakeHooks::new(),
        );
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(mv(400, 400));
        assert_eq!(h.manager.state(), ManagerState::Detecting);

        h.manager.handle_event(mv(410, 400));
        h.manager.handle_event(down(410, 400, MouseButton::Left));
        h.manager.handle_event(up(410, 400, MouseButton::Left));
        assert_eq!(h.manager.state(), ManagerState::Detecting);
        assert!(h.surface.calls().is_empty());

        let recorded = h.manager.take_new_exclusions();
        assert_eq!(recorded, vec![Exclusion::class("TestWindow").with_title("Window 1")]);
        assert!(h.manager.take_new_exclusions().is_empty());

        h.manager.handle_event(InputEvent::HotKeyReleased);
        assert_eq!(h.manager.state(), ManagerState::Idle);
        assert_eq!(count(&h.hooks.calls(), HookCall::ControlKey), 1);
        assert_eq!(
            h.overlay.calls(),
            vec![
                OverlayCall::Show(CursorGlyph::Detect, Point::new(400, 400)),
                OverlayCall::MoveTo(Point::new(410, 400)),
                OverlayCall::Hide,
            ]
        );
    }

    #[test]
    fn test_detected_window_is_excluded_immediately() {
        let detecting = Settings {
            exclusion_detection: true,
            ..Settings::default()
        };
        let mut h = harness_with(detecting.clone(), FakeHooks::new());
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(mv(400, 400));
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        h.manager.handle_event(InputEvent::HotKeyReleased);

        // Pressing without moving goes straight to a move attempt
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        assert_eq!(h.manager.state(), ManagerState::Armed);
        h.manager.handle_event(InputEvent::HotKeyReleased);

        // Settings without the entry drop it again
        h.manager.apply_settings(detecting);
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        assert_eq!(h.manager.state(), ManagerState::Moving);
    }

    #[test]
    fn test_paused_ignores_input() {
        let mut h = harness();
        h.manager.activate().unwrap();
        h.manager.set_paused(true).unwrap();
        h.manager.handle_event(InputEvent::HotKeyPressed);

        assert_eq!(h.manager.state(), ManagerState::Idle);
        assert!(!h.hooks.keyboard_installed());

        h.manager.set_paused(false).unwrap();
        assert!(h.hooks.keyboard_installed());
        h.manager.handle_event(InputEvent::HotKeyPressed);
        assert_eq!(h.manager.state(), ManagerState::Armed);
    }

    #[test]
    fn test_game_mode_suppresses_activation() {
        let mut h = harness();
        h.surface.set_fullscreen_exclusive(true);
        h.manager.handle_event(InputEvent::HotKeyPressed);

        assert_eq!(h.manager.state(), ManagerState::Idle);
        assert!(!h.hooks.mouse_installed());
    }

    #[test]
    fn test_deactivate_mid_operation_restores_window() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        h.manager.deactivate();

        assert_eq!(h.manager.state(), ManagerState::Idle);
        assert_eq!(h.surface.window(WindowId(1)).style, ExtendedStyle(0));
        assert_eq!(h.overlay.calls().last(), Some(&OverlayCall::Hide));
    }

    #[test]
    fn test_apply_settings_keeps_running_operation() {
        let mut h = harness();
        h.manager.handle_event(InputEvent::HotKeyPressed);
        h.manager.handle_event(down(400, 400, MouseButton::Left));
        h.hooks.clear_calls();

        let ctrl = crate::hotkey::Modifiers {
            alt: false,
            ctrl: true,
            shift: false,
            win: false,
        };
        h.manager.apply_settings(Settings {
            activation: ctrl,
            snapping_threshold: 0,
            ..Settings::default()
        });

        assert_eq!(h.hooks.calls(), vec![HookCall::SetActivation(ctrl)]);
        assert_eq!(h.manager.state(), ManagerState::Moving);

        // The snapshot is frozen, so the old threshold still snaps here
        h.manager.handle_event(mv(680, 400));
        assert_eq!(h.surface.window(WindowId(1)).rect, Rect::new(600, 300, 1000, 600));
    }

    /// Every sequence of `SEQUENCE_LEN` events drawn from the gesture
    /// alphabet, checking the armed-together invariants after each event.
    fn assert_invariants_for_all_sequences(settings: Settings) {
        const SEQUENCE_LEN: u32 = 6;
        let alphabet = [
            InputEvent::HotKeyPressed,
            InputEvent::HotKeyReleased,
            down(400, 400, MouseButton::Left),
            up(420, 420, MouseButton::Left),
            down(410, 410, MouseButton::Right),
            up(430, 430, MouseButton::Right),
            mv(450, 440),
        ];
        let base = alphabet.len();

        for n in 0..base.pow(SEQUENCE_LEN) {
            let mut h = harness_with(settings.clone(), FakeHooks::new());
            h.manager.activate().unwrap();
            let mut history = Vec::new();
            let mut code = n;
            for _ in 0..SEQUENCE_LEN {
                let event = alphabet[code % base];
                code /= base;
                history.push(event);
                h.clock.advance(Duration::from_millis(50));
                h.manager.handle_event(event);

                let operation = h.manager.operation();
                let dragging = matches!(operation, Operation::Move | Operation::Resize);
                let active = operation != Operation::None;
                assert_eq!(h.manager.transparent_window().is_some(), dragging, "after {:?}", history);
                assert_eq!(h.manager.target().is_some(), dragging, "after {:?}", history);
                assert_eq!(h.overlay.is_visible(), active, "after {:?}", history);
                assert_eq!(
                    h.hooks.mouse_installed(),
                    h.manager.is_hotkey_held() || active,
                    "after {:?}",
                    history
                );
            }
        }
    }

    #[test]
    fn test_invariants_hold_for_all_event_sequences() {
        assert_invariants_for_all_sequences(Settings::default());
    }

    #[test]
    fn test_invariants_hold_for_all_event_sequences_with_detection() {
        assert_invariants_for_all_sequences(Settings {
            exclusion_detection: true,
            ..Settings::default()
        });
    }
}
