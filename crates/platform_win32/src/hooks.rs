//! Low-level keyboard and mouse hooks.
//!
//! Low-level hook procedures run on the thread that installed them, inside
//! that thread's message loop. The service therefore owns one dedicated
//! thread: install and uninstall requests are posted to it as thread
//! messages, and translated [`InputEvent`]s leave it over a
//! `std::sync::mpsc` channel.
//!
//! While the mouse hook is installed, button presses and wheel turns are
//! swallowed so the window under the cursor never sees them. Pointer moves
//! pass through. Injected input (including our own control-key tap) is
//! ignored by both hooks.

use crate::Win32Error;
use grabwin_core::{
    HotkeyTracker, InputEvent, InputHooks, ModifierKey, Modifiers, MouseButton, Point, SurfaceError,
};
use std::mem::size_of;
use std::sync::{mpsc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use windows::Win32::Foundation::{HINSTANCE, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    VIRTUAL_KEY, VK_CONTROL, VK_LCONTROL, VK_LMENU, VK_LSHIFT, VK_LWIN, VK_RCONTROL, VK_RMENU,
    VK_RSHIFT, VK_RWIN,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, PeekMessageW, PostThreadMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT, LLKHF_INJECTED, LLMHF_INJECTED, MSG,
    MSLLHOOKSTRUCT, PM_NOREMOVE, WH_KEYBOARD_LL, WH_MOUSE_LL, WINDOWS_HOOK_ID, WM_KEYDOWN,
    WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_QUIT, WM_RBUTTONDOWN,
    WM_RBUTTONUP, WM_SYSKEYDOWN, WM_USER,
};

/// Thread message carrying a [`HookRequest`] in `wParam`.
const WM_HOOK_REQUEST: u32 = WM_USER + 110;

/// How long an install request may take before it is reported as failed.
const INSTALL_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HookRequest {
    InstallKeyboard,
    UninstallKeyboard,
    InstallMouse,
    UninstallMouse,
}

impl HookRequest {
    fn to_wparam(self) -> WPARAM {
        WPARAM(self as usize)
    }

    fn from_wparam(wparam: WPARAM) -> Option<Self> {
        [
            HookRequest::InstallKeyboard,
            HookRequest::UninstallKeyboard,
            HookRequest::InstallMouse,
            HookRequest::UninstallMouse,
        ]
        .into_iter()
        .find(|r| *r as usize == wparam.0)
    }
}

/// State shared between the service handle and the hook procedures.
struct HookState {
    events: mpsc::Sender<InputEvent>,
    tracker: HotkeyTracker,
}

/// Hook procedures are plain functions, so their state is process-wide.
static HOOK_STATE: Mutex<Option<HookState>> = Mutex::new(None);

/// Run `f` against the shared state and forward the event it produces.
fn dispatch(f: impl FnOnce(&mut HookState) -> Option<InputEvent>) {
    let Ok(mut guard) = HOOK_STATE.lock() else {
        return;
    };
    if let Some(state) = guard.as_mut() {
        if let Some(event) = f(state) {
            // Receiver gone means the daemon is shutting down
            let _ = state.events.send(event);
        }
    }
}

const MODIFIER_KEYS: [(VIRTUAL_KEY, ModifierKey); 8] = [
    (VK_LMENU, ModifierKey::LeftAlt),
    (VK_RMENU, ModifierKey::RightAlt),
    (VK_LCONTROL, ModifierKey::LeftCtrl),
    (VK_RCONTROL, ModifierKey::RightCtrl),
    (VK_LSHIFT, ModifierKey::LeftShift),
    (VK_RSHIFT, ModifierKey::RightShift),
    (VK_LWIN, ModifierKey::LeftWin),
    (VK_RWIN, ModifierKey::RightWin),
];

/// Low-level keyboard hooks report left/right specific virtual keys.
fn modifier_key(vk: u32) -> Option<ModifierKey> {
    MODIFIER_KEYS
        .iter()
        .find(|(code, _)| u32::from(code.0) == vk)
        .map(|&(_, key)| key)
}

/// Translate a mouse hook message. The flag says whether to swallow it.
fn mouse_event(message: u32, point: Point, mouse_data: u32) -> Option<(InputEvent, bool)> {
    let event = match message {
        WM_MOUSEMOVE => return Some((InputEvent::MouseMove { point }, false)),
        WM_LBUTTONDOWN => InputEvent::MouseDown {
            point,
            button: MouseButton::Left,
        },
        WM_RBUTTONDOWN => InputEvent::MouseDown {
            point,
            button: MouseButton::Right,
        },
        WM_LBUTTONUP => InputEvent::MouseUp {
            point,
            button: MouseButton::Left,
        },
        WM_RBUTTONUP => InputEvent::MouseUp {
            point,
            button: MouseButton::Right,
        },
        WM_MOUSEWHEEL => InputEvent::MouseWheel {
            point,
            // High word, signed
            delta: i32::from((mouse_data >> 16) as u16 as i16),
        },
        _ => return None,
    };
    Some((event, true))
}

unsafe extern "system" fn keyboard_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 {
        let result = std::panic::catch_unwind(|| {
            let info = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
            if info.flags.0 & LLKHF_INJECTED.0 != 0 {
                return;
            }
            if let Some(key) = modifier_key(info.vkCode) {
                let down = matches!(wparam.0 as u32, WM_KEYDOWN | WM_SYSKEYDOWN);
                dispatch(|state| state.tracker.key(key, down));
            }
        });
        if result.is_err() {
            error!("Panic in keyboard hook");
        }
    }
    CallNextHookEx(None, code, wparam, lparam)
}

unsafe extern "system" fn mouse_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 {
        let result = std::panic::catch_unwind(|| {
            let info = &*(lparam.0 as *const MSLLHOOKSTRUCT);
            if info.flags & LLMHF_INJECTED != 0 {
                return false;
            }
            let point = Point::new(info.pt.x, info.pt.y);
            match mouse_event(wparam.0 as u32, point, info.mouseData) {
                Some((event, swallow)) => {
                    dispatch(|_| Some(event));
                    swallow
                }
                None => false,
            }
        });
        match result {
            Ok(true) => return LRESULT(1),
            Ok(false) => {}
            Err(_) => error!("Panic in mouse hook"),
        }
    }
    CallNextHookEx(None, code, wparam, lparam)
}

type HookProc = unsafe extern "system" fn(i32, WPARAM, LPARAM) -> LRESULT;

fn install(
    slot: &mut Option<HHOOK>,
    id: WINDOWS_HOOK_ID,
    proc: HookProc,
    instance: Option<HINSTANCE>,
) -> Result<(), String> {
    if slot.is_some() {
        return Ok(());
    }
    let hook = unsafe { SetWindowsHookExW(id, Some(proc), instance, 0) }.map_err(|e| e.to_string())?;
    *slot = Some(hook);
    Ok(())
}

fn uninstall(slot: &mut Option<HHOOK>) {
    if let Some(hook) = slot.take() {
        if let Err(e) = unsafe { UnhookWindowsHookEx(hook) } {
            warn!("UnhookWindowsHookEx failed: {}", e);
        }
    }
}

/// Body of the hook thread. Returns when `WM_QUIT` is posted.
fn run_hook_thread(ready: mpsc::Sender<u32>, replies: mpsc::Sender<Result<(), String>>) {
    let mut msg = MSG::default();
    unsafe {
        // Create the message queue before anyone posts to it
        let _ = PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);
    }
    if ready.send(unsafe { GetCurrentThreadId() }).is_err() {
        return;
    }

    let instance: Option<HINSTANCE> = unsafe { GetModuleHandleW(None) }.ok().map(Into::into);
    let mut keyboard: Option<HHOOK> = None;
    let mut mouse: Option<HHOOK> = None;

    while unsafe { GetMessageW(&mut msg, None, 0, 0) }.as_bool() {
        if msg.message != WM_HOOK_REQUEST {
            continue;
        }
        match HookRequest::from_wparam(msg.wParam) {
            Some(HookRequest::InstallKeyboard) => {
                let _ = replies.send(install(&mut keyboard, WH_KEYBOARD_LL, keyboard_proc, instance));
            }
            Some(HookRequest::InstallMouse) => {
                let _ = replies.send(install(&mut mouse, WH_MOUSE_LL, mouse_proc, instance));
            }
            Some(HookRequest::UninstallKeyboard) => uninstall(&mut keyboard),
            Some(HookRequest::UninstallMouse) => uninstall(&mut mouse),
            None => debug!("Unknown hook request {}", msg.wParam.0),
        }
    }

    uninstall(&mut mouse);
    uninstall(&mut keyboard);
    debug!("Hook thread exiting");
}

/// Owns the hook thread. Only one may exist per process.
///
/// Dropping the service unhooks everything and joins the thread.
pub struct InputHookService {
    thread_id: u32,
    thread: Option<JoinHandle<()>>,
    replies: mpsc::Receiver<Result<(), String>>,
}

impl InputHookService {
    /// Start the hook thread. No hook is installed yet; events arrive on
    /// the returned receiver once [`InputHooks::install_keyboard_hook`] has
    /// been called.
    pub fn start(activation: Modifiers) -> Result<(Self, mpsc::Receiver<InputEvent>), Win32Error> {
        let (event_tx, event_rx) = mpsc::channel();
        {
            let mut state = HOOK_STATE.lock().map_err(|_| Win32Error::HookThreadGone)?;
            if state.is_some() {
                return Err(Win32Error::ThreadStart {
                    name: "input-hooks",
                    message: "already running".to_string(),
                });
            }
            *state = Some(HookState {
                events: event_tx,
                tracker: HotkeyTracker::new(activation),
            });
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("input-hooks".to_string())
            .spawn(move || run_hook_thread(ready_tx, reply_tx));

        let startup = spawned
            .map_err(|e| e.to_string())
            .and_then(|thread| match ready_rx.recv() {
                Ok(thread_id) => Ok((thread, thread_id)),
                Err(_) => Err("thread exited during startup".to_string()),
            });
        let (thread, thread_id) = match startup {
            Ok(started) => started,
            Err(message) => {
                clear_state();
                return Err(Win32Error::ThreadStart {
                    name: "input-hooks",
                    message,
                });
            }
        };

        info!("Input hook thread started");
        Ok((
            Self {
                thread_id,
                thread: Some(thread),
                replies: reply_rx,
            },
            event_rx,
        ))
    }

    fn post(&self, request: HookRequest) -> Result<(), Win32Error> {
        unsafe { PostThreadMessageW(self.thread_id, WM_HOOK_REQUEST, request.to_wparam(), LPARAM(0)) }
            .map_err(|_| Win32Error::HookThreadGone)
    }

    /// Post an install request and wait for the hook thread's answer.
    fn request_install(&self, request: HookRequest) -> Result<(), SurfaceError> {
        // Drop answers to requests that timed out earlier
        while self.replies.try_recv().is_ok() {}

        self.post(request)
            .map_err(|e| SurfaceError::HookInstallFailed(e.to_string()))?;
        match self.replies.recv_timeout(INSTALL_TIMEOUT) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(SurfaceError::HookInstallFailed(message)),
            Err(_) => Err(SurfaceError::HookInstallFailed(format!(
                "no answer from hook thread for {:?}",
                request
            ))),
        }
    }

    fn request_uninstall(&self, request: HookRequest) {
        if let Err(e) = self.post(request) {
            warn!("Cannot post {:?}: {}", request, e);
        }
    }
}

fn clear_state() {
    if let Ok(mut state) = HOOK_STATE.lock() {
        *state = None;
    }
}

impl InputHooks for InputHookService {
    fn install_keyboard_hook(&self) -> Result<(), SurfaceError> {
        self.request_install(HookRequest::InstallKeyboard)
    }

    fn uninstall_keyboard_hook(&self) {
        self.request_uninstall(HookRequest::UninstallKeyboard);
    }

    fn install_mouse_hook(&self) -> Result<(), SurfaceError> {
        self.request_install(HookRequest::InstallMouse)
    }

    fn uninstall_mouse_hook(&self) {
        self.request_uninstall(HookRequest::UninstallMouse);
    }

    fn send_control_key(&self) {
        let key = |flags: KEYBD_EVENT_FLAGS| INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VK_CONTROL,
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        let inputs = [key(KEYBD_EVENT_FLAGS(0)), key(KEYEVENTF_KEYUP)];
        let sent = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            debug!("SendInput delivered {} of {} control key events", sent, inputs.len());
        }
    }

    fn set_activation(&self, modifiers: Modifiers) {
        dispatch(|state| state.tracker.set_required(modifiers));
    }
}

impl Drop for InputHookService {
    fn drop(&mut self) {
        unsafe {
            let _ = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        clear_state();
        debug!("Input hook service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_key_mapping() {
        assert_eq!(modifier_key(u32::from(VK_LMENU.0)), Some(ModifierKey::LeftAlt));
        assert_eq!(modifier_key(u32::from(VK_RWIN.0)), Some(ModifierKey::RightWin));
        // Generic VK_CONTROL never reaches a low-level hook
        assert_eq!(modifier_key(u32::from(VK_CONTROL.0)), None);
        assert_eq!(modifier_key(0x41), None);
    }

    #[test]
    fn test_buttons_and_wheel_are_swallowed() {
        let point = Point::new(10, 20);

        assert_eq!(
            mouse_event(WM_LBUTTONDOWN, point, 0),
            Some((
                InputEvent::MouseDown {
                    point,
                    button: MouseButton::Left
                },
                true
            ))
        );
        assert_eq!(
            mouse_event(WM_MOUSEMOVE, point, 0),
            Some((InputEvent::MouseMove { point }, false))
        );
        assert_eq!(mouse_event(WM_USER, point, 0), None);
    }

    #[test]
    fn test_wheel_delta_sign() {
        let point = Point::new(0, 0);
        let up = mouse_event(WM_MOUSEWHEEL, point, 120 << 16);
        let down = mouse_event(WM_MOUSEWHEEL, point, 0xFF88_0000);

        assert_eq!(up, Some((InputEvent::MouseWheel { point, delta: 120 }, true)));
        assert_eq!(down, Some((InputEvent::MouseWheel { point, delta: -120 }, true)));
    }

    #[test]
    fn test_hook_request_wparam_round_trip() {
        for request in [
            HookRequest::InstallKeyboard,
            HookRequest::UninstallKeyboard,
            HookRequest::InstallMouse,
            HookRequest::UninstallMouse,
        ] {
            assert_eq!(HookRequest::from_wparam(request.to_wparam()), Some(request));
        }
        assert_eq!(HookRequest::from_wparam(WPARAM(99)), None);
    }
}
