//! Suppression while a full-screen game or presentation is running.

use crate::platform::{DisplayTopology, WindowSurface};
use crate::rate_limit::{Clock, SystemClock};
use std::time::{Duration, Instant};
use tracing::debug;

/// How long a game-mode probe result is reused.
pub const GAME_MODE_CACHE: Duration = Duration::from_secs(5);

/// Decides whether hotkey activation should be ignored.
///
/// Probing the foreground window on every keypress is wasteful, so the
/// result is cached for [`GAME_MODE_CACHE`].
#[derive(Debug)]
pub struct GameModeGuard<C: Clock = SystemClock> {
    enabled: bool,
    clock: C,
    cached: Option<(Instant, bool)>,
}

impl<C: Clock> GameModeGuard<C> {
    pub fn new(enabled: bool, clock: C) -> Self {
        Self {
            enabled,
            clock,
            cached: None,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.cached = None;
    }

    pub fn is_suppressed<S, D>(&mut self, surface: &S, display: &D) -> bool
    where
        S: WindowSurface + ?Sized,
        D: DisplayTopology + ?Sized,
    {
        if !self.enabled {
            return false;
        }

        let now = self.clock.now();
        if let Some((at, result)) = self.cached {
            if now.saturating_duration_since(at) < GAME_MODE_CACHE {
                return result;
            }
        }

        let result = surface.fullscreen_exclusive_active() || foreground_is_fullscreen(surface, display);
        if result {
            debug!("Full-screen application in foreground, hotkey suppressed");
        }
        self.cached = Some((now, result));
        result
    }
}

/// A captionless foreground window covering its whole monitor.
fn foreground_is_fullscreen<S, D>(surface: &S, display: &D) -> bool
where
    S: WindowSurface + ?Sized,
    D: DisplayTopology + ?Sized,
{
    let Some(id) = surface.foreground_window() else {
        return false;
    };
    let Some(monitor) = display.monitor_for_window(id) else {
        return false;
    };
    let (Ok(rect), Ok(caption)) = (surface.window_rect(id), surface.has_caption(id)) else {
        return false;
    };
    !caption && rect.intersection(&monitor.bounds) == Some(monitor.bounds)
}
