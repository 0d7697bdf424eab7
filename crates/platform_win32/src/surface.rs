//! Window queries, mutations and monitor enumeration through user32/dwmapi.

use crate::{to_hwnd, to_window_id};
use grabwin_core::{
    DisplayTopology, ExtendedStyle, LayeredAttributes, MonitorId, MonitorInfo, Placement, Point,
    Rect, SnappableWindow, SurfaceError, WindowId, WindowIdentity, WindowSurface, ZOrder,
};
use std::ffi::c_void;
use std::mem::size_of;
use tracing::debug;
use windows::Win32::Foundation::{
    SetLastError, BOOL, COLORREF, HWND, LPARAM, POINT, RECT, TRUE, WIN32_ERROR,
};
use windows::Win32::Graphics::Dwm::{
    DwmGetWindowAttribute, DWMWA_CLOAKED, DWMWA_EXTENDED_FRAME_BOUNDS,
};
use windows::Win32::Graphics::Gdi::{
    EnumDisplayMonitors, GetMonitorInfoW, MonitorFromWindow, RedrawWindow, HDC, HMONITOR,
    MONITORINFO, MONITOR_DEFAULTTONEAREST, RDW_ALLCHILDREN, RDW_ERASE, RDW_FRAME, RDW_INVALIDATE,
};
use windows::Win32::UI::Shell::{SHQueryUserNotificationState, QUNS_RUNNING_D3D_FULL_SCREEN};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetAncestor, GetClassNameW, GetForegroundWindow, GetLayeredWindowAttributes,
    GetWindowLongW, GetWindowPlacement, GetWindowRect, GetWindowTextW, IsIconic, IsWindow,
    IsWindowVisible, SetLayeredWindowAttributes, SetWindowLongW, SetWindowPos, ShowWindow,
    WindowFromPoint, GA_ROOT, GWL_EXSTYLE, GWL_STYLE, HWND_BOTTOM, HWND_NOTOPMOST, HWND_TOP,
    HWND_TOPMOST, LAYERED_WINDOW_ATTRIBUTES_FLAGS, LWA_ALPHA, SWP_NOACTIVATE, SWP_NOMOVE,
    SWP_NOOWNERZORDER, SWP_NOSIZE, SWP_NOZORDER, SW_RESTORE, SW_SHOWMAXIMIZED, WINDOWPLACEMENT,
    WS_CAPTION, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TRANSPARENT, WS_THICKFRAME,
};

/// The live desktop.
///
/// Stateless; every call goes straight to the OS, so copies are free and
/// can be shared with the panic hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Surface;

impl Win32Surface {
    pub fn new() -> Self {
        Self
    }
}

fn rect_from(rect: RECT) -> Rect {
    Rect::new(rect.left, rect.top, rect.right, rect.bottom)
}

/// Map a failed call to [`SurfaceError`], reporting a destroyed window as such.
fn call_failed(call: &'static str, id: WindowId, error: windows::core::Error) -> SurfaceError {
    if !unsafe { IsWindow(Some(to_hwnd(id))) }.as_bool() {
        return SurfaceError::WindowGone(id);
    }
    SurfaceError::CallFailed {
        call,
        window: id,
        message: error.to_string(),
    }
}

fn style(hwnd: HWND) -> u32 {
    unsafe { GetWindowLongW(hwnd, GWL_STYLE) as u32 }
}

fn ex_style(hwnd: HWND) -> u32 {
    unsafe { GetWindowLongW(hwnd, GWL_EXSTYLE) as u32 }
}

fn is_cloaked(hwnd: HWND) -> bool {
    let mut cloaked: u32 = 0;
    let result = unsafe {
        DwmGetWindowAttribute(
            hwnd,
            DWMWA_CLOAKED,
            &mut cloaked as *mut u32 as *mut c_void,
            size_of::<u32>() as u32,
        )
    };
    result.is_ok() && cloaked != 0
}

/// Shown, not cloaked by the shell and not minimized.
fn is_really_visible(hwnd: HWND) -> bool {
    unsafe { IsWindowVisible(hwnd).as_bool() && !IsIconic(hwnd).as_bool() } && !is_cloaked(hwnd)
}

fn extended_frame_bounds(hwnd: HWND) -> Option<Rect> {
    let mut rect = RECT::default();
    let result = unsafe {
        DwmGetWindowAttribute(
            hwnd,
            DWMWA_EXTENDED_FRAME_BOUNDS,
            &mut rect as *mut RECT as *mut c_void,
            size_of::<RECT>() as u32,
        )
    };
    result.ok().map(|()| rect_from(rect))
}

fn utf16(buffer: &[u16], len: i32) -> String {
    String::from_utf16_lossy(&buffer[..len.max(0) as usize])
}

/// All top-level windows, topmost first.
fn top_level_windows() -> Vec<HWND> {
    let mut handles: Vec<HWND> = Vec::new();
    let result = unsafe { EnumWindows(Some(collect_window), LPARAM(&mut handles as *mut Vec<HWND> as isize)) };
    if let Err(e) = result {
        debug!("EnumWindows failed: {}", e);
    }
    handles
}

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let handles = &mut *(lparam.0 as *mut Vec<HWND>);
    handles.push(hwnd);
    TRUE
}

unsafe extern "system" fn collect_monitor(monitor: HMONITOR, _hdc: HDC, _clip: *mut RECT, lparam: LPARAM) -> BOOL {
    let monitors = &mut *(lparam.0 as *mut Vec<HMONITOR>);
    monitors.push(monitor);
    TRUE
}

fn monitor_info(monitor: HMONITOR) -> Option<MonitorInfo> {
    let mut info = MONITORINFO {
        cbSize: size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    if !unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
        return None;
    }
    Some(MonitorInfo {
        id: MonitorId(monitor.0 as usize as u64),
        bounds: rect_from(info.rcMonitor),
        work_area: rect_from(info.rcWork),
    })
}

/// Sizable, captioned, activatable and not a tool window.
fn is_snappable_style(style: u32, ex_style: u32) -> bool {
    ex_style & (WS_EX_NOACTIVATE.0 | WS_EX_TOOLWINDOW.0) == 0
        && style & WS_CAPTION.0 == WS_CAPTION.0
        && style & WS_THICKFRAME.0 != 0
}

impl WindowSurface for Win32Surface {
    fn window_at(&self, point: Point) -> Option<WindowId> {
        let hwnd = unsafe { WindowFromPoint(POINT { x: point.x, y: point.y }) };
        if hwnd.is_invalid() {
            return None;
        }
        let root = unsafe { GetAncestor(hwnd, GA_ROOT) };
        if root.is_invalid() {
            debug!("No root window above {:?}", hwnd);
            return None;
        }
        Some(to_window_id(root))
    }

    fn window_rect(&self, id: WindowId) -> Result<Rect, SurfaceError> {
        let mut rect = RECT::default();
        unsafe { GetWindowRect(to_hwnd(id), &mut rect) }.map_err(|e| call_failed("GetWindowRect", id, e))?;
        Ok(rect_from(rect))
    }

    fn frame_bounds(&self, id: WindowId) -> Result<Rect, SurfaceError> {
        match extended_frame_bounds(to_hwnd(id)) {
            Some(rect) => Ok(rect),
            // Composition off: the window rect is what is drawn
            None => self.window_rect(id),
        }
    }

    fn placement(&self, id: WindowId) -> Result<Placement, SurfaceError> {
        let hwnd = to_hwnd(id);
        let mut placement = WINDOWPLACEMENT {
            length: size_of::<WINDOWPLACEMENT>() as u32,
            ..Default::default()
        };
        unsafe { GetWindowPlacement(hwnd, &mut placement) }.map_err(|e| call_failed("GetWindowPlacement", id, e))?;

        // Normal position is in workspace coordinates unless the window is a tool window
        let mut normal = rect_from(placement.rcNormalPosition);
        if ex_style(hwnd) & WS_EX_TOOLWINDOW.0 == 0 {
            if let Some(monitor) = self.monitor_for_window(id) {
                normal = normal.offset(
                    monitor.work_area.left - monitor.bounds.left,
                    monitor.work_area.top - monitor.bounds.top,
                );
            }
        }

        Ok(Placement {
            normal,
            maximized: placement.showCmd == SW_SHOWMAXIMIZED.0 as u32,
        })
    }

    fn identity(&self, id: WindowId) -> Result<WindowIdentity, SurfaceError> {
        let hwnd = to_hwnd(id);
        let mut class = [0u16; 256];
        let class_len = unsafe { GetClassNameW(hwnd, &mut class) };
        if class_len == 0 {
            return Err(call_failed("GetClassNameW", id, windows::core::Error::from_win32()));
        }
        let mut title = [0u16; 512];
        let title_len = unsafe { GetWindowTextW(hwnd, &mut title) };
        Ok(WindowIdentity {
            class: utf16(&class, class_len),
            title: utf16(&title, title_len),
        })
    }

    fn extended_style(&self, id: WindowId) -> Result<ExtendedStyle, SurfaceError> {
        let hwnd = to_hwnd(id);
        unsafe { SetLastError(WIN32_ERROR(0)) };
        let style = ex_style(hwnd);
        if style == 0 {
            let error = windows::core::Error::from_win32();
            if error.code().is_err() {
                return Err(call_failed("GetWindowLongW", id, error));
            }
        }
        Ok(ExtendedStyle(style))
    }

    fn set_extended_style(&self, id: WindowId, style: ExtendedStyle) -> Result<(), SurfaceError> {
        unsafe { SetLastError(WIN32_ERROR(0)) };
        let previous = unsafe { SetWindowLongW(to_hwnd(id), GWL_EXSTYLE, style.0 as i32) };
        if previous == 0 {
            let error = windows::core::Error::from_win32();
            if error.code().is_err() {
                return Err(call_failed("SetWindowLongW", id, error));
            }
        }
        Ok(())
    }

    fn layered_attributes(&self, id: WindowId) -> Result<LayeredAttributes, SurfaceError> {
        let mut alpha = 0u8;
        let mut flags = LAYERED_WINDOW_ATTRIBUTES_FLAGS(0);
        unsafe { GetLayeredWindowAttributes(to_hwnd(id), None, Some(&mut alpha), Some(&mut flags)) }
            .map_err(|e| call_failed("GetLayeredWindowAttributes", id, e))?;
        Ok(LayeredAttributes {
            alpha: (flags.0 & LWA_ALPHA.0 != 0).then_some(alpha),
        })
    }

    fn set_layered_alpha(&self, id: WindowId, alpha: u8) -> Result<(), SurfaceError> {
        unsafe { SetLayeredWindowAttributes(to_hwnd(id), COLORREF(0), alpha, LWA_ALPHA) }
            .map_err(|e| call_failed("SetLayeredWindowAttributes", id, e))
    }

    fn redraw(&self, id: WindowId) -> Result<(), SurfaceError> {
        let flags = RDW_ERASE | RDW_INVALIDATE | RDW_FRAME | RDW_ALLCHILDREN;
        if !unsafe { RedrawWindow(Some(to_hwnd(id)), None, None, flags) }.as_bool() {
            return Err(call_failed("RedrawWindow", id, windows::core::Error::from_win32()));
        }
        Ok(())
    }

    fn set_rect(&self, id: WindowId, rect: Rect) -> Result<(), SurfaceError> {
        unsafe {
            SetWindowPos(
                to_hwnd(id),
                None,
                rect.left,
                rect.top,
                rect.width(),
                rect.height(),
                SWP_NOZORDER | SWP_NOOWNERZORDER | SWP_NOACTIVATE,
            )
        }
        .map_err(|e| call_failed("SetWindowPos", id, e))
    }

    fn set_z_order(&self, id: WindowId, order: ZOrder) -> Result<(), SurfaceError> {
        let insert_after = match order {
            ZOrder::Top => HWND_TOP,
            ZOrder::Bottom => HWND_BOTTOM,
            ZOrder::TopMost => HWND_TOPMOST,
            ZOrder::NoTopMost => HWND_NOTOPMOST,
        };
        unsafe {
            SetWindowPos(
                to_hwnd(id),
                Some(insert_after),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            )
        }
        .map_err(|e| call_failed("SetWindowPos", id, e))
    }

    fn restore(&self, id: WindowId) -> Result<(), SurfaceError> {
        // Return value is the previous visibility, not success
        let _ = unsafe { ShowWindow(to_hwnd(id), SW_RESTORE) };
        if !unsafe { IsWindow(Some(to_hwnd(id))) }.as_bool() {
            return Err(SurfaceError::WindowGone(id));
        }
        Ok(())
    }

    fn snappable_windows(&self, exclude: WindowId) -> Vec<SnappableWindow> {
        let exclude = to_hwnd(exclude);
        top_level_windows()
            .into_iter()
            .filter(|&hwnd| hwnd != exclude && is_really_visible(hwnd))
            .filter(|&hwnd| is_snappable_style(style(hwnd), ex_style(hwnd)))
            .filter_map(|hwnd| {
                let id = to_window_id(hwnd);
                let rect = self.frame_bounds(id).ok()?;
                Some(SnappableWindow {
                    id,
                    rect,
                    identity: self.identity(id).unwrap_or_default(),
                })
            })
            .collect()
    }

    fn windows_at(&self, point: Point) -> Vec<WindowId> {
        top_level_windows()
            .into_iter()
            .filter(|&hwnd| {
                ex_style(hwnd) & (WS_EX_TOOLWINDOW.0 | WS_EX_TRANSPARENT.0) == 0 && is_really_visible(hwnd)
            })
            .map(to_window_id)
            .filter(|&id| self.window_rect(id).map_or(false, |rect| rect.contains(point)))
            .collect()
    }

    fn foreground_window(&self) -> Option<WindowId> {
        let hwnd = unsafe { GetForegroundWindow() };
        (!hwnd.is_invalid()).then(|| to_window_id(hwnd))
    }

    fn has_caption(&self, id: WindowId) -> Result<bool, SurfaceError> {
        if !unsafe { IsWindow(Some(to_hwnd(id))) }.as_bool() {
            return Err(SurfaceError::WindowGone(id));
        }
        Ok(style(to_hwnd(id)) & WS_CAPTION.0 == WS_CAPTION.0)
    }

    fn fullscreen_exclusive_active(&self) -> bool {
        match unsafe { SHQueryUserNotificationState() } {
            Ok(state) => state == QUNS_RUNNING_D3D_FULL_SCREEN,
            Err(e) => {
                debug!("SHQueryUserNotificationState failed: {}", e);
                false
            }
        }
    }
}

impl DisplayTopology for Win32Surface {
    fn monitors(&self) -> Vec<MonitorInfo> {
        let mut handles: Vec<HMONITOR> = Vec::new();
        let ok = unsafe {
            EnumDisplayMonitors(
                None,
                None,
                Some(collect_monitor),
                LPARAM(&mut handles as *mut Vec<HMONITOR> as isize),
            )
        };
        if !ok.as_bool() {
            debug!("EnumDisplayMonitors failed");
        }
        handles.into_iter().filter_map(monitor_info).collect()
    }

    fn monitor_for_window(&self, id: WindowId) -> Option<MonitorInfo> {
        let monitor = unsafe { MonitorFromWindow(to_hwnd(id), MONITOR_DEFAULTTONEAREST) };
        if monitor.is_invalid() {
            return None;
        }
        monitor_info(monitor)
    }
}
