//! Temporary opacity for the window being manipulated.

use crate::platform::{ExtendedStyle, WindowId, WindowSurface};
use tracing::debug;

/// Style and alpha captured before dimming a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SavedAppearance {
    id: WindowId,
    style: ExtendedStyle,
    /// `None` when the window was not layered.
    alpha: Option<u8>,
}

/// Dims a window for the duration of an operation and restores it exactly.
#[derive(Debug)]
pub struct TransparencyController {
    enabled: bool,
    opacity: u8,
    saved: Option<SavedAppearance>,
}

impl TransparencyController {
    pub fn new(enabled: bool, opacity: u8) -> Self {
        Self {
            enabled,
            opacity,
            saved: None,
        }
    }

    pub fn configure(&mut self, enabled: bool, opacity: u8) {
        self.enabled = enabled;
        self.opacity = opacity;
    }

    /// Window currently dimmed, if any.
    pub fn active_window(&self) -> Option<WindowId> {
        self.saved.map(|s| s.id)
    }

    /// Make `id` layered at the configured opacity.
    ///
    /// Ends any previous transparency first. If the style cannot be read or
    /// written nothing is captured and the window is left alone.
    pub fn start<S: WindowSurface + ?Sized>(&mut self, id: WindowId, surface: &S) {
        self.end(surface);
        if !self.enabled {
            return;
        }

        let style = match surface.extended_style(id) {
            Ok(style) => style,
            Err(e) => {
                debug!("Skipping transparency for {}: {}", id, e);
                return;
            }
        };

        let alpha = if style.is_layered() {
            let alpha = surface
                .layered_attributes(id)
                .ok()
                .and_then(|attrs| attrs.alpha)
                .unwrap_or(u8::MAX);
            Some(alpha)
        } else {
            None
        };

        if let Err(e) = surface.set_extended_style(id, style.with_layered()) {
            debug!("Cannot make {} layered: {}", id, e);
            return;
        }
        self.saved = Some(SavedAppearance { id, style, alpha });

        if let Err(e) = surface.set_layered_alpha(id, self.opacity) {
            debug!("Cannot set opacity on {}: {}", id, e);
        }
    }

    /// Restore the captured alpha and style. No-op when nothing is saved.
    pub fn end<S: WindowSurface + ?Sized>(&mut self, surface: &S) {
        let Some(saved) = self.saved.take() else {
            return;
        };

        let alpha = saved.alpha.unwrap_or(u8::MAX);
        if let Err(e) = surface.set_layered_alpha(saved.id, alpha) {
            debug!("Cannot restore opacity on {}: {}", saved.id, e);
        }
        if let Err(e) = surface.set_extended_style(saved.id, saved.style) {
            debug!("Cannot restore style on {}: {}", saved.id, e);
        }
        if saved.alpha.is_none() {
            // Leaving layered mode leaves stale pixels until repaint
            if let Err(e) = surface.redraw(saved.id) {
                debug!("Cannot redraw {}: {}", saved.id, e);
            }
        }
    }
}
