//! grabwin daemon
//!
//! Background process that lets the user move, resize, snap and cycle
//! windows by holding a modifier and using the mouse anywhere in a window.
//!
//! Responsibilities:
//! - Load and validate configuration
//! - Own the low-level input hooks and the cursor overlay
//! - Feed input events through the window manager state machine
//! - Persist exclusions recorded in detect mode
//! - System tray icon and menu

mod config;
#[cfg(windows)]
mod tray;

use anyhow::Result;
use config::Config;
use grabwin_core::InputEvent;
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Events that the daemon event loop processes.
#[derive(Debug)]
#[cfg_attr(not(windows), allow(dead_code))]
enum DaemonEvent {
    /// Keyboard or mouse input from the hook thread.
    Input(InputEvent),
    /// A tray menu event.
    #[cfg(windows)]
    Tray(tray::TrayEvent),
    /// Shutdown signal.
    Shutdown,
}

/// Spawn a thread that forwards events from a std channel into the daemon
/// event loop. The thread ends when either side is closed.
#[cfg_attr(not(windows), allow(dead_code))]
fn spawn_forwarding_thread<T: Send + 'static>(
    name: &str,
    receiver: std::sync::mpsc::Receiver<T>,
    sender: mpsc::Sender<DaemonEvent>,
    map_fn: impl Fn(T) -> DaemonEvent + Send + 'static,
) -> Result<std::thread::JoinHandle<()>> {
    let thread_name = name.to_string();
    std::thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            while let Ok(event) = receiver.recv() {
                if sender.blocking_send(map_fn(event)).is_err() {
                    break; // Channel closed, daemon shutting down
                }
            }
        })
        .map_err(|e| anyhow::anyhow!("Failed to spawn {} thread: {}", thread_name, e))
}

/// Filter from `RUST_LOG` when set, otherwise from the configured level.
fn log_filter(configured_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured_level))
}

/// Load, validate and log configuration, then install the global subscriber.
fn load_config_and_init_logging() -> Result<Config> {
    // Load configuration first (needed for log level)
    let mut config = Config::load().unwrap_or_else(|e| {
        // Can't use tracing yet, fall back to eprintln
        eprintln!("Failed to load configuration: {:#}. Using defaults.", e);
        Config::default()
    });

    // Clamp before the level is used so a bad level never reaches EnvFilter
    let config_warnings = config.validate();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(&config.behavior.log_level))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    for w in &config_warnings {
        warn!("Config: {} - {}", w.field, w.message);
    }

    Ok(config)
}

#[cfg(not(windows))]
fn main() -> Result<()> {
    let _config = load_config_and_init_logging()?;
    tracing::error!("grabwin only runs on Windows");
    anyhow::bail!("unsupported platform")
}

/// Run a manager call that may wait on the hook thread.
///
/// Installing or removing the mouse hook waits for the hook thread's
/// reply, so the worker is handed off while the call blocks.
#[cfg_attr(not(windows), allow(dead_code))]
fn blocking<R>(f: impl FnOnce() -> R) -> R {
    tokio::task::block_in_place(f)
}

#[cfg(windows)]
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config_and_init_logging()?;
    app::run(config).await
}

#[cfg(windows)]
mod app {
    use crate::config::{self, Config};
    use crate::tray::{self, TrayEvent};
    use crate::{blocking, spawn_forwarding_thread, DaemonEvent};
    use anyhow::Result;
    use grabwin_core::{Exclusion, Manager, WindowId, WindowSurface};
    use grabwin_platform_win32::{
        set_dpi_awareness, show_error_dialog, CursorOverlayWindow, InputHookService, Win32Surface,
    };
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use tracing::{debug, error, info, warn};

    type Grabber = Manager<Win32Surface, Win32Surface, InputHookService, CursorOverlayWindow>;

    /// Window currently dimmed by an operation, restored by the panic hook.
    static DIMMED_WINDOW: Mutex<Option<WindowId>> = Mutex::new(None);

    fn remember_dimmed(window: Option<WindowId>) {
        if let Ok(mut dimmed) = DIMMED_WINDOW.lock() {
            *dimmed = window;
        }
    }

    fn install_panic_hook() {
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let dimmed = DIMMED_WINDOW.try_lock().ok().and_then(|guard| *guard);
            if let Some(id) = dimmed {
                eprintln!("[grabwin] PANIC detected, restoring opacity of window {}", id);
                let _ = Win32Surface::new().set_layered_alpha(id, u8::MAX);
            }
            default_hook(info);
        }));
    }

    pub async fn run(mut config: Config) -> Result<()> {
        // Set DPI awareness before any window/GDI operations
        if set_dpi_awareness() {
            debug!("DPI awareness set to Per-Monitor Aware V2");
        } else {
            warn!("Failed to set DPI awareness (may already be set)");
        }

        install_panic_hook();

        info!("grabwin daemon starting...");
        info!("Version: {}", env!("CARGO_PKG_VERSION"));
        info!(
            "Configuration loaded: activation={}, snapping={} (threshold={}, padding={}), log_level={}",
            config.activation,
            config.snapping.enabled,
            config.snapping.threshold,
            config.snapping.padding,
            config.behavior.log_level
        );

        // Event channel for the main loop
        let (event_tx, mut event_rx) = mpsc::channel::<DaemonEvent>(100);
        let mut thread_handles: Vec<std::thread::JoinHandle<()>> = Vec::new();

        let (hooks, input_rx) = match InputHookService::start(config.activation) {
            Ok(started) => started,
            Err(e) => return Err(fatal("Failed to start the input hook thread", e.into())),
        };
        thread_handles.push(spawn_forwarding_thread(
            "input-fwd",
            input_rx,
            event_tx.clone(),
            DaemonEvent::Input,
        )?);

        let overlay = match CursorOverlayWindow::new() {
            Ok(overlay) => overlay,
            Err(e) => return Err(fatal("Failed to create the cursor overlay", e.into())),
        };

        let surface = Win32Surface::new();
        let mut manager: Grabber = Manager::new(surface, surface, hooks, overlay, config.to_settings());
        if let Err(e) = manager.activate() {
            return Err(fatal("Failed to install the keyboard hook", e.into()));
        }

        // Initialize system tray icon
        // Create an intermediate sync channel that bridges tray events to the async event loop
        let _tray_manager = {
            let (tray_sync_tx, tray_sync_rx) = std::sync::mpsc::channel();

            // The menu thread never closes its sender, so this one is not joined
            if let Err(e) = spawn_forwarding_thread("tray-fwd", tray_sync_rx, event_tx.clone(), DaemonEvent::Tray) {
                warn!("{}", e);
            }

            match tray::TrayManager::new(tray_sync_tx) {
                Ok(manager) => {
                    info!("System tray icon initialized");
                    Some(manager)
                }
                Err(e) => {
                    warn!("Failed to create system tray icon: {}. Tray disabled.", e);
                    None
                }
            }
        };

        // Install Ctrl+C handler so terminal kill triggers graceful shutdown
        {
            let shutdown_tx = event_tx.clone();
            tokio::spawn(async move {
                if let Ok(()) = tokio::signal::ctrl_c().await {
                    info!("Ctrl+C received, initiating shutdown...");
                    let _ = shutdown_tx.send(DaemonEvent::Shutdown).await;
                }
            });
        }

        info!("Ready. Hold {} and drag a window.", config.activation);

        while let Some(event) = event_rx.recv().await {
            match event {
                DaemonEvent::Input(input) => {
                    blocking(|| manager.handle_event(input));
                    remember_dimmed(manager.transparent_window());

                    let found = manager.take_new_exclusions();
                    if !found.is_empty() {
                        blocking(|| persist_exclusions(&mut config, &mut manager, found));
                    }
                }
                DaemonEvent::Tray(tray_event) => match tray_event {
                    TrayEvent::TogglePause => {
                        let paused = !manager.is_paused();
                        if let Err(e) = blocking(|| manager.set_paused(paused)) {
                            error!("Failed to resume: {}", e);
                        }
                        remember_dimmed(manager.transparent_window());
                        info!("Tray: Grabbing {}", if manager.is_paused() { "paused" } else { "resumed" });
                    }
                    TrayEvent::Reload => {
                        info!("Tray: Reload config requested");
                        match Config::load() {
                            Ok(mut new_config) => {
                                for w in new_config.validate() {
                                    warn!("Config: {} - {}", w.field, w.message);
                                }
                                blocking(|| manager.apply_settings(new_config.to_settings()));
                                remember_dimmed(manager.transparent_window());
                                config = new_config;
                                info!("Configuration reloaded");
                            }
                            Err(e) => warn!("Reload failed: {:#}", e),
                        }
                    }
                    TrayEvent::OpenConfig => {
                        info!("Tray: Open config requested");
                        open_config_file(&config);
                    }
                    TrayEvent::Exit => {
                        info!("Tray: Exit requested");
                        // Route tray exit through the unified shutdown path
                        let _ = event_tx.send(DaemonEvent::Shutdown).await;
                    }
                },
                DaemonEvent::Shutdown => {
                    info!("Shutting down...");
                    break;
                }
            }
        }

        blocking(|| manager.deactivate());
        remember_dimmed(None);
        // Dropping the manager stops the hook thread, which closes the input channel
        drop(manager);
        drop(event_rx);

        for handle in thread_handles {
            let _ = handle.join();
        }

        info!("grabwin daemon stopped");
        Ok(())
    }

    /// Log a startup failure, tell the user, and hand the error back.
    fn fatal(context: &str, err: anyhow::Error) -> anyhow::Error {
        error!("{}: {:#}", context, err);
        show_error_dialog("grabwin", &format!("{}.\n\n{:#}", context, err));
        err.context(context.to_string())
    }

    /// Append exclusions recorded in detect mode to the config file and
    /// push the updated list to the manager.
    fn persist_exclusions(config: &mut Config, manager: &mut Grabber, found: Vec<Exclusion>) {
        for exclusion in &found {
            info!(
                "Excluding class {:?}{}",
                exclusion.class,
                exclusion
                    .title
                    .as_ref()
                    .map(|t| format!(" with title {:?}", t))
                    .unwrap_or_default()
            );
        }

        if config.add_exclusions(found) == 0 {
            return;
        }
        if let Err(e) = config.save() {
            error!("Failed to save exclusions: {:#}", e);
        }
        manager.apply_settings(config.to_settings());
    }

    /// Open the config file in the default editor, writing defaults first
    /// when no file exists yet.
    fn open_config_file(config: &Config) {
        let path = match config::existing_config_path() {
            Some(path) => path,
            None => match config.save() {
                Ok(path) => path,
                Err(e) => {
                    warn!("Failed to create config file: {:#}", e);
                    return;
                }
            },
        };

        if let Err(e) = std::process::Command::new("cmd")
            .args(["/c", "start", "", &path.to_string_lossy()])
            .spawn()
        {
            warn!("Failed to open {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grabwin_core::{MouseButton, Point};

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_blocking_call_lets_other_tasks_run() {
        let (reply_tx, reply_rx) = std::sync::mpsc::channel();
        tokio::spawn(async move {
            let _ = reply_tx.send(7);
        });

        // Without handing off the only worker, the reply would never arrive
        let reply = blocking(|| reply_rx.recv_timeout(std::time::Duration::from_secs(2)));
        assert_eq!(reply, Ok(7));
    }

    #[test]
    fn test_forwarding_thread_maps_and_forwards() {
        let (std_tx, std_rx) = std::sync::mpsc::channel();
        let (tokio_tx, mut tokio_rx) = mpsc::channel(8);

        let handle = spawn_forwarding_thread("test-fwd", std_rx, tokio_tx, |point: Point| {
            DaemonEvent::Input(InputEvent::MouseDown {
                point,
                button: MouseButton::Left,
            })
        })
        .unwrap();

        std_tx.send(Point::new(10, 20)).unwrap();
        drop(std_tx);
        handle.join().unwrap();

        match tokio_rx.try_recv() {
            Ok(DaemonEvent::Input(InputEvent::MouseDown { point, button })) => {
                assert_eq!(point, Point::new(10, 20));
                assert_eq!(button, MouseButton::Left);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(tokio_rx.try_recv().is_err());
    }

    #[test]
    fn test_forwarding_thread_stops_when_loop_is_gone() {
        let (std_tx, std_rx) = std::sync::mpsc::channel();
        let (tokio_tx, tokio_rx) = mpsc::channel(1);
        drop(tokio_rx);

        let handle = spawn_forwarding_thread("test-fwd", std_rx, tokio_tx, |_: ()| DaemonEvent::Shutdown).unwrap();
        std_tx.send(()).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_log_filter_uses_configured_level() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(log_filter("debug").to_string(), "debug");
        }
    }
}
