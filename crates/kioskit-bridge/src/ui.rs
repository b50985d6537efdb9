use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc;

use crate::channel::HostChannel;
use crate::listeners::ListenerSet;
use crate::message::{AppInfo, UiMessage, UpdateStatusPayload};

#[derive(Default)]
struct Subscriptions {
    app_info_ready: ListenerSet<AppInfo>,
    debug_mode_changed: ListenerSet<bool>,
    update_status_changed: ListenerSet<UpdateStatusPayload>,
}

/// The capability surface handed to UI code.
///
/// UI code can trigger exactly the host operations below and subscribe to the
/// three UI-bound channels. There is no way to send on an arbitrary channel.
#[derive(Clone)]
pub struct UiBridge {
    outgoing: mpsc::UnboundedSender<HostChannel>,
    subscriptions: Arc<Subscriptions>,
}

impl UiBridge {
    #[must_use]
    pub fn new(outgoing: mpsc::UnboundedSender<HostChannel>) -> Self {
        Self {
            outgoing,
            subscriptions: Arc::new(Subscriptions::default()),
        }
    }

    fn send(&self, channel: HostChannel) {
        if self.outgoing.send(channel).is_err() {
            debug!("Host connection closed, dropping {}", channel.as_str());
        }
    }

    pub fn enter_idle_mode(&self) {
        self.send(HostChannel::EnterIdleMode);
    }

    pub fn exit_idle_mode(&self) {
        self.send(HostChannel::ExitIdleMode);
    }

    pub fn check_updates(&self) {
        self.send(HostChannel::CheckForUpdates);
    }

    pub fn install_updates(&self) {
        self.send(HostChannel::InstallUpdates);
    }

    pub fn reload_window(&self) {
        self.send(HostChannel::ReloadWindow);
    }

    pub fn quit_app(&self) {
        self.send(HostChannel::QuitApp);
    }

    pub fn toggle_debug_mode(&self) {
        self.send(HostChannel::ToggleDebugMode);
    }

    #[must_use]
    pub fn app_info_ready(&self) -> &ListenerSet<AppInfo> {
        &self.subscriptions.app_info_ready
    }

    #[must_use]
    pub fn debug_mode_changed(&self) -> &ListenerSet<bool> {
        &self.subscriptions.debug_mode_changed
    }

    #[must_use]
    pub fn update_status_changed(&self) -> &ListenerSet<UpdateStatusPayload> {
        &self.subscriptions.update_status_changed
    }

    /// Dispatch a host message to the listeners of its channel.
    pub fn deliver(&self, message: &UiMessage) {
        match message {
            UiMessage::AppInfoReady(info) => self.subscriptions.app_info_ready.emit(info),
            UiMessage::DebugModeChanged(enabled) => {
                self.subscriptions.debug_mode_changed.emit(enabled);
            }
            UiMessage::UpdateStatusChanged(payload) => {
                self.subscriptions.update_status_changed.emit(payload);
            }
        }
    }

    /// Decode and dispatch one wire line. Lines that do not decode are dropped.
    pub fn deliver_line(&self, line: &str) {
        match UiMessage::decode(line) {
            Ok(message) => self.deliver(&message),
            Err(error) => debug!("Dropping host message: {error}"),
        }
    }
}
