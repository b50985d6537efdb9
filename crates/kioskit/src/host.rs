use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::time::Duration;

use kioskit_bridge::{AppInfo, HostChannel, UiMessage};
use kioskit_core::{StatusNotifier, UpdateCoordinator, UpdateStatus};
use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::logging;
use crate::policy::IdleUpdatePolicy;
use crate::window::{LoadTarget, WindowHost};

/// Forwards coordinator status changes into the host loop.
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<UpdateStatus>,
}

impl ChannelNotifier {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UpdateStatus>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl StatusNotifier for ChannelNotifier {
    fn status_changed(&self, status: &UpdateStatus) {
        if self.sender.send(status.clone()).is_err() {
            debug!("Host loop gone, dropping status {:?}", status.tag());
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostSettings {
    pub app_name: String,
    pub app_version: String,
    pub poll_interval: Duration,
    pub debug_enabled: bool,
}

/// The host process: one window, one coordinator, and the idle policy between them.
pub struct HostApp<W: WindowHost> {
    window: W,
    coordinator: UpdateCoordinator,
    policy: IdleUpdatePolicy<UpdateCoordinator>,
    settings: HostSettings,
    debug_enabled: bool,
    shutdown: CancellationToken,
    set_verbose: fn(bool),
}

impl<W: WindowHost> HostApp<W> {
    pub fn new(
        window: W,
        coordinator: UpdateCoordinator,
        settings: HostSettings,
        shutdown: CancellationToken,
    ) -> Self {
        let policy = IdleUpdatePolicy::new(coordinator.clone(), settings.poll_interval);
        Self {
            window,
            coordinator,
            policy,
            debug_enabled: settings.debug_enabled,
            settings,
            shutdown,
            set_verbose: logging::set_verbose_logging,
        }
    }

    #[must_use]
    pub fn window(&self) -> &W {
        &self.window
    }

    #[must_use]
    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.policy.is_idle()
    }

    /// Load the UI and run the startup update check.
    pub fn start(&mut self, target: &LoadTarget) {
        self.window.load(target);
        self.window.set_dev_tools(self.debug_enabled);
        self.on_window_loaded();

        if self.coordinator.can_poll() {
            self.coordinator.check_now();
        }
    }

    /// Seed a freshly loaded UI with the debug flag and app info.
    pub fn on_window_loaded(&mut self) {
        self.window
            .send(&UiMessage::DebugModeChanged(self.debug_enabled));
        self.window.send(&UiMessage::AppInfoReady(AppInfo {
            name: self.settings.app_name.clone(),
            version: self.settings.app_version.clone(),
            ip: local_ipv4().to_string(),
        }));
    }

    pub fn handle(&mut self, channel: HostChannel) {
        debug!("Received {}", channel.as_str());
        match channel {
            HostChannel::ToggleDebugMode => self.toggle_debug_mode(),
            HostChannel::EnterIdleMode => {
                self.policy.on_idle_enter();
            }
            HostChannel::ExitIdleMode => self.policy.on_idle_exit(),
            HostChannel::CheckForUpdates => self.coordinator.check_now(),
            HostChannel::InstallUpdates => {
                self.coordinator.install_staged_update();
            }
            HostChannel::ReloadWindow => {
                self.window.reload();
                self.on_window_loaded();
            }
            HostChannel::QuitApp => {
                info!("Quitting app");
                self.shutdown.cancel();
            }
        }
    }

    pub fn on_status_changed(&mut self, status: &UpdateStatus) {
        self.window.send(&UiMessage::update_status(status));
        self.policy.on_status(status);
    }

    fn toggle_debug_mode(&mut self) {
        self.debug_enabled = !self.debug_enabled;
        info!(
            "Debug mode {}",
            if self.debug_enabled { "enabled" } else { "disabled" }
        );
        (self.set_verbose)(self.debug_enabled);
        self.window.set_dev_tools(self.debug_enabled);
        self.window
            .send(&UiMessage::DebugModeChanged(self.debug_enabled));
    }

    /// Serve host-bound messages and status changes until shutdown.
    pub async fn run(
        &mut self,
        mut incoming: mpsc::UnboundedReceiver<HostChannel>,
        mut statuses: mpsc::UnboundedReceiver<UpdateStatus>,
    ) {
        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                Some(channel) = incoming.recv() => self.handle(channel),
                Some(status) = statuses.recv() => self.on_status_changed(&status),
                else => break,
            }
        }

        self.coordinator.stop_periodic_check();
        self.window.close();
    }
}

/// Decode host-bound lines until the UI closes the stream, then request shutdown.
pub async fn read_host_messages<R: AsyncBufRead + Unpin>(
    reader: R,
    sender: mpsc::UnboundedSender<HostChannel>,
    shutdown: CancellationToken,
) {
    let mut lines = reader.lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match HostChannel::decode(&line) {
                    Ok(channel) => {
                        if sender.send(channel).is_err() {
                            break;
                        }
                    }
                    Err(error) => debug!("Dropping UI message: {error}"),
                }
            }
            Ok(None) => {
                info!("UI closed the bridge");
                break;
            }
            Err(error) => {
                warn!("Failed to read UI message: {error}");
                break;
            }
        }
    }

    shutdown.cancel();
}

/// First non-loopback IPv4 address, or loopback when there is none.
#[must_use]
pub fn local_ipv4() -> Ipv4Addr {
    let routed = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9))?;
            socket.local_addr()
        })
        .ok()
        .map(|addr| addr.ip());

    match routed {
        Some(IpAddr::V4(ip)) if !ip.is_loopback() && !ip.is_unspecified() => ip,
        _ => Ipv4Addr::LOCALHOST,
    }
}
