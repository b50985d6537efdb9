//! Hidden admin panel.
//!
//! Tapping the top-left corner five times in quick succession opens it. The
//! panel shows app info and update status and exposes the host operations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use kioskit_bridge::{AppInfo, Listener, UiBridge, UpdateStatusPayload};
use kioskit_core::StatusTag;
use log::debug;

use crate::input::{InputEvent, InputEvents};

/// Side of the square activation region in the top-left corner.
pub const ACTIVATION_REGION: f64 = 100.0;
pub const ACTIVATION_CLICKS: u32 = 5;
/// Longest gap allowed between two activation clicks.
pub const ACTIVATION_INTERVAL: Duration = Duration::from_millis(500);

const INITIAL_STATUS: &str = "WARNING: For devs only";
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub struct DebugOverlay {
    bridge: UiBridge,
    active: bool,
    activation_count: u32,
    last_click: Option<Instant>,
    app_info: Option<AppInfo>,
    debug_enabled: bool,
    update_ready: bool,
    status_text: String,
}

impl DebugOverlay {
    #[must_use]
    pub fn new(bridge: UiBridge) -> Self {
        Self {
            bridge,
            active: false,
            activation_count: 0,
            last_click: None,
            app_info: None,
            debug_enabled: false,
            update_ready: false,
            status_text: INITIAL_STATUS.to_string(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn app_info(&self) -> Option<&AppInfo> {
        self.app_info.as_ref()
    }

    #[must_use]
    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    #[must_use]
    pub fn update_ready(&self) -> bool {
        self.update_ready
    }

    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Feed a pointer release. Returns whether this click opened the panel.
    pub fn handle_pointer_up(&mut self, x: f64, y: f64, now: Instant) -> bool {
        if self.active {
            return false;
        }

        let in_region = (0.0..=ACTIVATION_REGION).contains(&x) && (0.0..=ACTIVATION_REGION).contains(&y);
        if !in_region {
            self.reset_activation();
            return false;
        }

        let expired = self
            .last_click
            .is_some_and(|last| now.saturating_duration_since(last) > ACTIVATION_INTERVAL);
        if expired {
            self.activation_count = 0;
        }

        self.activation_count += 1;
        self.last_click = Some(now);

        if self.activation_count >= ACTIVATION_CLICKS {
            self.reset_activation();
            self.active = true;
            debug!("Debug overlay opened");
            return true;
        }
        false
    }

    fn reset_activation(&mut self) {
        self.activation_count = 0;
        self.last_click = None;
    }

    pub fn close(&mut self) {
        self.active = false;
    }

    pub fn set_app_info(&mut self, info: AppInfo) {
        self.app_info = Some(info);
    }

    pub fn set_debug_enabled(&mut self, enabled: bool) {
        self.debug_enabled = enabled;
    }

    pub fn apply_update_status(&mut self, payload: &UpdateStatusPayload) {
        let text = match payload.status {
            StatusTag::Idle => return,
            StatusTag::Checking => "Checking for updates...".to_string(),
            StatusTag::Available => "Update is available".to_string(),
            StatusTag::Unavailable => "App is up-to-date".to_string(),
            StatusTag::Downloaded => "Update is ready to be installed".to_string(),
            StatusTag::Error => payload
                .error
                .clone()
                .unwrap_or_else(|| "Unknown update error".to_string()),
            StatusTag::Downloading => match payload.progress {
                Some(progress) => format!(
                    "Downloading... ({:.0}% of {:.2}MB at {:.2}MB/s)",
                    (progress.percent * 100.0).floor(),
                    to_megabytes(progress.bytes_total),
                    progress.bytes_per_second / BYTES_PER_MB,
                ),
                None => "Downloading...".to_string(),
            },
        };

        self.update_ready = payload.status == StatusTag::Downloaded;
        self.status_text = text;
    }

    pub fn toggle_debug_mode(&self) {
        self.bridge.toggle_debug_mode();
    }

    pub fn check_updates(&self) {
        self.bridge.check_updates();
    }

    /// Ask the host to install. Does nothing until an update is staged.
    pub fn install_updates(&self) -> bool {
        if !self.update_ready {
            return false;
        }
        self.bridge.install_updates();
        true
    }

    pub fn reload_window(&self) {
        self.bridge.reload_window();
    }

    pub fn quit_app(&self) {
        self.bridge.quit_app();
    }

    /// Subscribe the overlay to the bridge and input stream.
    #[must_use]
    pub fn mount(bridge: &UiBridge, input: Arc<InputEvents>) -> MountedOverlay {
        let overlay = Arc::new(Mutex::new(Self::new(bridge.clone())));

        let app_info: Listener<AppInfo> = {
            let overlay = Arc::clone(&overlay);
            Arc::new(move |info: &AppInfo| lock(&overlay).set_app_info(info.clone()))
        };
        let debug_mode: Listener<bool> = {
            let overlay = Arc::clone(&overlay);
            Arc::new(move |enabled: &bool| lock(&overlay).set_debug_enabled(*enabled))
        };
        let update_status: Listener<UpdateStatusPayload> = {
            let overlay = Arc::clone(&overlay);
            Arc::new(move |payload: &UpdateStatusPayload| {
                lock(&overlay).apply_update_status(payload);
            })
        };
        let pointer: Listener<InputEvent> = {
            let overlay = Arc::clone(&overlay);
            Arc::new(move |event: &InputEvent| {
                if let InputEvent::PointerUp { x, y } = *event {
                    lock(&overlay).handle_pointer_up(x, y, Instant::now());
                }
            })
        };

        bridge.app_info_ready().on(Arc::clone(&app_info));
        bridge.debug_mode_changed().on(Arc::clone(&debug_mode));
        bridge.update_status_changed().on(Arc::clone(&update_status));
        input.on(Arc::clone(&pointer));

        MountedOverlay {
            overlay,
            bridge: bridge.clone(),
            input,
            app_info,
            debug_mode,
            update_status,
            pointer,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

fn lock(overlay: &Mutex<DebugOverlay>) -> MutexGuard<'_, DebugOverlay> {
    overlay.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A [`DebugOverlay`] wired to live listeners. Dropping it unsubscribes.
pub struct MountedOverlay {
    overlay: Arc<Mutex<DebugOverlay>>,
    bridge: UiBridge,
    input: Arc<InputEvents>,
    app_info: Listener<AppInfo>,
    debug_mode: Listener<bool>,
    update_status: Listener<UpdateStatusPayload>,
    pointer: Listener<InputEvent>,
}

impl MountedOverlay {
    pub fn with<R>(&self, f: impl FnOnce(&mut DebugOverlay) -> R) -> R {
        f(&mut lock(&self.overlay))
    }
}

impl Drop for MountedOverlay {
    fn drop(&mut self) {
        self.bridge.app_info_ready().off(&self.app_info);
        self.bridge.debug_mode_changed().off(&self.debug_mode);
        self.bridge.update_status_changed().off(&self.update_status);
        self.input.off(&self.pointer);
    }
}
