//! grabwin Platform Win32
//!
//! Windows implementations of the collaborator traits in
//! `grabwin_core::platform`.
//!
//! This crate handles:
//! - Window queries and mutation via user32 and DWM ([`Win32Surface`])
//! - Monitor enumeration ([`Win32Surface`] as `DisplayTopology`)
//! - Low-level keyboard and mouse hooks on a dedicated thread ([`InputHookService`])
//! - The cursor glyph window shown during an operation ([`CursorOverlayWindow`])

#![cfg(windows)]

pub mod hooks;
pub mod overlay;
mod surface;

pub use hooks::InputHookService;
pub use overlay::CursorOverlayWindow;
pub use surface::Win32Surface;

use grabwin_core::WindowId;
use std::ffi::c_void;
use thiserror::Error;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::HiDpi::{
    SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, MessageBoxW, PostThreadMessageW, TranslateMessage,
    MB_ICONERROR, MB_OK, MSG, WM_QUIT,
};

/// Errors that can occur while setting up the platform layer.
#[derive(Debug, Error)]
pub enum Win32Error {
    #[error("Failed to start {name} thread: {message}")]
    ThreadStart { name: &'static str, message: String },

    #[error("Failed to create overlay window: {0}")]
    OverlayCreate(String),

    #[error("Hook thread is not running")]
    HookThreadGone,
}

pub(crate) fn to_hwnd(id: WindowId) -> HWND {
    HWND(id.0 as usize as *mut c_void)
}

pub(crate) fn to_window_id(hwnd: HWND) -> WindowId {
    WindowId(hwnd.0 as usize as u64)
}

/// Null-terminated UTF-16 copy of `text`.
pub(crate) fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Opt into per-monitor DPI awareness so every rectangle is in physical
/// pixels. Returns `false` if the process already had a context set.
pub fn set_dpi_awareness() -> bool {
    unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) }.is_ok()
}

/// Show a blocking error box. Used for failures the user must see before
/// the process exits.
pub fn show_error_dialog(title: &str, message: &str) {
    let title = wide(title);
    let message = wide(message);
    unsafe {
        MessageBoxW(
            None,
            PCWSTR(message.as_ptr()),
            PCWSTR(title.as_ptr()),
            MB_OK | MB_ICONERROR,
        );
    }
}

/// Id of the calling thread, for [`quit_message_loop`].
pub fn current_thread_id() -> u32 {
    unsafe { GetCurrentThreadId() }
}

/// Pump messages for the windows owned by the calling thread until
/// [`quit_message_loop`] is called for it.
pub fn run_message_loop() {
    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// Ask the message loop running on `thread_id` to return.
pub fn quit_message_loop(thread_id: u32) {
    unsafe {
        let _ = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_id_round_trip() {
        let id = WindowId(0x0001_02f4);
        assert_eq!(to_window_id(to_hwnd(id)), id);
    }

    #[test]
    fn test_wide_is_null_terminated() {
        assert_eq!(wide("ok"), vec![b'o' as u16, b'k' as u16, 0]);
        assert_eq!(wide(""), vec![0]);
    }
}
