//! System tray icon management for the grabwin daemon.
//!
//! Provides a system tray icon with a context menu for common operations:
//! - Pause / resume window grabbing
//! - Reload or open the configuration file
//! - Exit daemon

use grabwin_platform_win32::{current_thread_id, quit_message_loop, run_message_loop};
use std::sync::mpsc;
use thiserror::Error;
use tracing::{debug, info};
use tray_icon::{
    menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem},
    TrayIconBuilder,
};

/// Menu item IDs for tray context menu.
mod menu_ids {
    pub const TOGGLE_PAUSE: &str = "toggle_pause";
    pub const RELOAD: &str = "reload";
    pub const OPEN_CONFIG: &str = "open_config";
    pub const EXIT: &str = "exit";
}

/// Events emitted by the tray icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayEvent {
    /// User clicked "Pause / Resume".
    TogglePause,
    /// User clicked "Reload Config".
    Reload,
    /// User clicked "Open Config".
    OpenConfig,
    /// User clicked "Exit".
    Exit,
}

fn event_for_id(id: &str) -> Option<TrayEvent> {
    match id {
        menu_ids::TOGGLE_PAUSE => Some(TrayEvent::TogglePause),
        menu_ids::RELOAD => Some(TrayEvent::Reload),
        menu_ids::OPEN_CONFIG => Some(TrayEvent::OpenConfig),
        menu_ids::EXIT => Some(TrayEvent::Exit),
        _ => None,
    }
}

/// Owns the thread that hosts the tray icon.
///
/// The icon's hidden window lives on that thread, which pumps messages
/// until the manager is dropped.
pub struct TrayManager {
    thread_id: u32,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl TrayManager {
    /// Create the tray icon and context menu.
    ///
    /// Menu clicks are delivered to `event_sender` as [`TrayEvent`]s.
    pub fn new(event_sender: mpsc::Sender<TrayEvent>) -> Result<Self, TrayError> {
        let (init_tx, init_rx) = mpsc::channel::<Result<u32, TrayError>>();

        let thread = std::thread::Builder::new()
            .name("tray".to_string())
            .spawn(move || {
                let tray = match build_menu().and_then(|menu| {
                    TrayIconBuilder::new()
                        .with_menu(Box::new(menu))
                        .with_tooltip("grabwin - move and resize windows with the mouse")
                        .with_icon(create_default_icon()?)
                        .build()
                        .map_err(|e| TrayError::Build(e.to_string()))
                }) {
                    Ok(tray) => tray,
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(current_thread_id()));

                run_message_loop();
                drop(tray);
            })
            .map_err(|e| TrayError::Thread(e.to_string()))?;

        let thread_id = init_rx
            .recv()
            .map_err(|_| TrayError::Thread("tray thread exited during startup".to_string()))??;

        info!("System tray icon created");

        // Spawn thread to handle menu events and forward them
        std::thread::Builder::new()
            .name("tray-menu".to_string())
            .spawn(move || {
                let menu_channel = MenuEvent::receiver();
                while let Ok(event) = menu_channel.recv() {
                    let Some(tray_event) = event_for_id(event.id.0.as_str()) else {
                        debug!("Unknown menu item clicked: {}", event.id.0);
                        continue;
                    };

                    if event_sender.send(tray_event).is_err() {
                        // Receiver dropped, exit thread
                        break;
                    }
                }
            })
            .map_err(|e| TrayError::Thread(e.to_string()))?;

        Ok(Self {
            thread_id,
            thread: Some(thread),
        })
    }
}

impl Drop for TrayManager {
    fn drop(&mut self) {
        quit_message_loop(self.thread_id);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        debug!("System tray icon removed");
    }
}

fn build_menu() -> Result<Menu, TrayError> {
    let menu = Menu::new();

    // Title item (disabled)
    let title = MenuItem::new("grabwin", false, None);
    menu.append(&title).map_err(|e| TrayError::Menu(e.to_string()))?;

    menu.append(&PredefinedMenuItem::separator())
        .map_err(|e| TrayError::Menu(e.to_string()))?;

    let items = [
        (menu_ids::TOGGLE_PAUSE, "Pause / Resume"),
        (menu_ids::RELOAD, "Reload Config"),
        (menu_ids::OPEN_CONFIG, "Open Config"),
    ];
    for (id, label) in items {
        let item = MenuItem::with_id(id, label, true, None);
        menu.append(&item).map_err(|e| TrayError::Menu(e.to_string()))?;
    }

    menu.append(&PredefinedMenuItem::separator())
        .map_err(|e| TrayError::Menu(e.to_string()))?;

    let exit = MenuItem::with_id(menu_ids::EXIT, "Exit", true, None);
    menu.append(&exit).map_err(|e| TrayError::Menu(e.to_string()))?;

    Ok(menu)
}

const ICON_SIZE: usize = 32;

/// Colour of one icon pixel: a small window with a title bar and a
/// resize grip in its lower right corner.
fn icon_pixel(x: usize, y: usize) -> [u8; 4] {
    const FRAME: [u8; 4] = [38, 50, 56, 255];
    const TITLE: [u8; 4] = [0, 137, 123, 255];
    const BODY: [u8; 4] = [236, 239, 241, 255];
    const CLEAR: [u8; 4] = [0, 0, 0, 0];

    let (left, top, right, bottom) = (3, 5, ICON_SIZE - 4, ICON_SIZE - 5);
    if x < left || x > right || y < top || y > bottom {
        return CLEAR;
    }
    if x == left || x == right || y == top || y == bottom {
        return FRAME;
    }
    if y < top + 6 {
        return TITLE;
    }
    // Grip: three diagonal strokes towards the bottom right corner
    let from_corner = (right - x) + (bottom - y);
    if from_corner < 10 && from_corner % 3 == 1 {
        return FRAME;
    }
    BODY
}

/// Create a default icon for the tray.
fn create_default_icon() -> Result<tray_icon::Icon, TrayError> {
    let mut rgba = Vec::with_capacity(ICON_SIZE * ICON_SIZE * 4);
    for y in 0..ICON_SIZE {
        for x in 0..ICON_SIZE {
            rgba.extend_from_slice(&icon_pixel(x, y));
        }
    }

    tray_icon::Icon::from_rgba(rgba, ICON_SIZE as u32, ICON_SIZE as u32)
        .map_err(|e| TrayError::Icon(e.to_string()))
}

/// Errors that can occur during tray operations.
#[derive(Debug, Error)]
pub enum TrayError {
    #[error("Failed to create menu: {0}")]
    Menu(String),

    #[error("Failed to build tray icon: {0}")]
    Build(String),

    #[error("Failed to create icon: {0}")]
    Icon(String),

    #[error("Tray thread failed: {0}")]
    Thread(String),
}
