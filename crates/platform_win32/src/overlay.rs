//! Cursor glyph window shown during an operation.
//!
//! The low-level mouse hook swallows button presses, so the system cursor
//! never changes shape while a window is dragged. This module draws the
//! matching system cursor into a small click-through window that follows
//! the pointer instead.
//!
//! # Architecture
//!
//! The window runs on a dedicated background thread with its own message
//! loop, so painting never blocks the daemon event loop. The glyph to paint
//! lives in a global mutex-protected [`OverlayState`] shared between the
//! caller and the window procedure.

use crate::{wide, Win32Error};
use grabwin_core::{CursorGlyph, CursorOverlay, Point};
use std::ffi::c_void;
use std::sync::mpsc;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, CreateSolidBrush, DeleteObject, EndPaint, FillRect, InvalidateRect, PAINTSTRUCT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, DrawIconEx, GetMessageW,
    LoadCursorW, PostMessageW, RegisterClassW, SetLayeredWindowAttributes, SetWindowPos,
    ShowWindow, DI_NORMAL, HICON, HWND_TOPMOST, IDC_CROSS, IDC_SIZEALL, IDC_SIZENESW,
    IDC_SIZENWSE, LWA_COLORKEY, MSG, SWP_NOACTIVATE, SWP_NOSIZE, SWP_SHOWWINDOW, SW_HIDE,
    WM_PAINT, WM_USER, WNDCLASSW, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW,
    WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};

/// Custom message to quit the overlay thread.
const WM_QUIT_OVERLAY: u32 = WM_USER + 102;

/// Side of the square glyph window, centred on the pointer.
const GLYPH_SIZE: i32 = 32;

/// Background colour keyed out by the layered window (magenta, BGR).
const KEY_COLOR: u32 = 0x00FF00FF;

/// Global state for the overlay window.
static OVERLAY_STATE: std::sync::Mutex<OverlayState> = std::sync::Mutex::new(OverlayState { glyph: None });

/// Current overlay display state.
struct OverlayState {
    /// Glyph to paint (None = hidden).
    glyph: Option<CursorGlyph>,
}

fn cursor_resource(glyph: CursorGlyph) -> PCWSTR {
    match glyph {
        CursorGlyph::Move => IDC_SIZEALL,
        CursorGlyph::ResizeNwse => IDC_SIZENWSE,
        CursorGlyph::ResizeNesw => IDC_SIZENESW,
        CursorGlyph::Detect => IDC_CROSS,
    }
}

/// Top-left corner of the glyph window for a pointer position.
fn glyph_origin(point: Point) -> (i32, i32) {
    (point.x - GLYPH_SIZE / 2, point.y - GLYPH_SIZE / 2)
}

/// A click-through, always-on-top window that paints the cursor glyph.
///
/// Created hidden. Dropping it signals the overlay thread to exit and
/// destroys the window.
pub struct CursorOverlayWindow {
    /// Raw HWND; kept as an integer so the overlay can move between threads.
    hwnd: isize,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CursorOverlayWindow {
    /// Create the overlay window on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`Win32Error::OverlayCreate`] if the window or its thread
    /// cannot be created.
    pub fn new() -> Result<Self, Win32Error> {
        let (init_tx, init_rx) = mpsc::channel::<Result<isize, Win32Error>>();

        let thread = std::thread::Builder::new()
            .name("cursor-overlay".to_string())
            .spawn(move || unsafe {
                let class_name = wide("GrabwinCursorOverlay");
                let wc = WNDCLASSW {
                    lpfnWndProc: Some(overlay_window_proc),
                    lpszClassName: PCWSTR(class_name.as_ptr()),
                    hbrBackground: CreateSolidBrush(COLORREF(KEY_COLOR)),
                    ..Default::default()
                };
                RegisterClassW(&wc);

                let ex_style = WS_EX_LAYERED
                    | WS_EX_TRANSPARENT
                    | WS_EX_TOPMOST
                    | WS_EX_TOOLWINDOW
                    | WS_EX_NOACTIVATE;

                let hwnd = match CreateWindowExW(
                    ex_style,
                    PCWSTR(class_name.as_ptr()),
                    None,
                    WS_POPUP,
                    0,
                    0,
                    GLYPH_SIZE,
                    GLYPH_SIZE,
                    None,
                    None,
                    None,
                    None,
                ) {
                    Ok(hwnd) => hwnd,
                    Err(e) => {
                        let _ = init_tx.send(Err(Win32Error::OverlayCreate(e.to_string())));
                        return;
                    }
                };

                // Everything painted in the key colour is see-through
                let _ = SetLayeredWindowAttributes(hwnd, COLORREF(KEY_COLOR), 0, LWA_COLORKEY);

                let _ = init_tx.send(Ok(hwnd.0 as isize));

                let mut msg = MSG::default();
                while GetMessageW(&mut msg, None, 0, 0).as_bool() {
                    if msg.message == WM_QUIT_OVERLAY {
                        break;
                    }
                    let _ = DispatchMessageW(&msg);
                }
                let _ = DestroyWindow(hwnd);
            })
            .map_err(|e| Win32Error::ThreadStart {
                name: "cursor-overlay",
                message: e.to_string(),
            })?;

        let hwnd = init_rx
            .recv()
            .map_err(|_| Win32Error::OverlayCreate("overlay thread exited during startup".to_string()))??;

        tracing::debug!("Cursor overlay window created");

        Ok(Self {
            hwnd,
            thread: Some(thread),
        })
    }

    fn hwnd(&self) -> HWND {
        HWND(self.hwnd as *mut c_void)
    }

    /// Whether a glyph is currently shown.
    pub fn is_visible(&self) -> bool {
        OVERLAY_STATE.lock().map(|state| state.glyph.is_some()).unwrap_or(false)
    }
}

impl CursorOverlay for CursorOverlayWindow {
    fn show(&self, glyph: CursorGlyph, point: Point) {
        if let Ok(mut state) = OVERLAY_STATE.lock() {
            state.glyph = Some(glyph);
        }

        let (x, y) = glyph_origin(point);
        unsafe {
            let _ = SetWindowPos(
                self.hwnd(),
                Some(HWND_TOPMOST),
                x,
                y,
                GLYPH_SIZE,
                GLYPH_SIZE,
                SWP_NOACTIVATE | SWP_SHOWWINDOW,
            );
            let _ = InvalidateRect(Some(self.hwnd()), None, true);
        }
    }

    fn move_to(&self, point: Point) {
        let (x, y) = glyph_origin(point);
        unsafe {
            let _ = SetWindowPos(
                self.hwnd(),
                Some(HWND_TOPMOST),
                x,
                y,
                0,
                0,
                SWP_NOACTIVATE | SWP_NOSIZE,
            );
        }
    }

    fn hide(&self) {
        if let Ok(mut state) = OVERLAY_STATE.lock() {
            state.glyph = None;
        }

        unsafe {
            let _ = ShowWindow(self.hwnd(), SW_HIDE);
        }
    }
}

impl Drop for CursorOverlayWindow {
    fn drop(&mut self) {
        unsafe {
            let _ = PostMessageW(Some(self.hwnd()), WM_QUIT_OVERLAY, WPARAM(0), LPARAM(0));
        }

        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }

        tracing::debug!("Cursor overlay window destroyed");
    }
}

/// Window procedure for the overlay window.
///
/// Wrapped with catch_unwind so a panic never unwinds into user32.
unsafe extern "system" fn overlay_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        overlay_window_proc_inner(hwnd, msg, wparam, lparam)
    }));

    match result {
        Ok(lresult) => lresult,
        Err(e) => {
            tracing::error!("Panic in overlay_window_proc: {:?}", e);
            DefWindowProcW(hwnd, msg, wparam, lparam)
        }
    }
}

fn overlay_window_proc_inner(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    match msg {
        WM_PAINT => {
            let mut ps = PAINTSTRUCT::default();
            let hdc = unsafe { BeginPaint(hwnd, &mut ps) };

            let brush = unsafe { CreateSolidBrush(COLORREF(KEY_COLOR)) };
            unsafe {
                FillRect(hdc, &ps.rcPaint, brush);
                let _ = DeleteObject(brush.into());
            }

            let glyph = OVERLAY_STATE.lock().ok().and_then(|state| state.glyph);
            if let Some(glyph) = glyph {
                if let Ok(cursor) = unsafe { LoadCursorW(None, cursor_resource(glyph)) } {
                    unsafe {
                        let _ = DrawIconEx(hdc, 0, 0, HICON(cursor.0), GLYPH_SIZE, GLYPH_SIZE, 0, None, DI_NORMAL);
                    }
                }
            }

            let _ = unsafe { EndPaint(hwnd, &ps) };
            LRESULT(0)
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_centred_on_pointer() {
        assert_eq!(glyph_origin(Point::new(100, 200)), (84, 184));
        assert_eq!(glyph_origin(Point::new(0, 0)), (-16, -16));
    }

    #[test]
    fn test_overlay_state_starts_hidden() {
        if let Ok(state) = OVERLAY_STATE.lock() {
            assert!(state.glyph.is_none());
        }
    }
}
