/// Channels handled by the host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostChannel {
    ToggleDebugMode,
    EnterIdleMode,
    ExitIdleMode,
    CheckForUpdates,
    InstallUpdates,
    ReloadWindow,
    QuitApp,
}

impl HostChannel {
    pub const ALL: [Self; 7] = [
        Self::ToggleDebugMode,
        Self::EnterIdleMode,
        Self::ExitIdleMode,
        Self::CheckForUpdates,
        Self::InstallUpdates,
        Self::ReloadWindow,
        Self::QuitApp,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToggleDebugMode => "toggle-debug-mode",
            Self::EnterIdleMode => "enter-idle-mode",
            Self::ExitIdleMode => "exit-idle-mode",
            Self::CheckForUpdates => "check-for-updates",
            Self::InstallUpdates => "install-updates",
            Self::ReloadWindow => "reload-window",
            Self::QuitApp => "quit-app",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.as_str() == name)
    }
}

/// Channels handled by the UI process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiChannel {
    AppInfoReady,
    DebugModeChanged,
    UpdateStatusChanged,
}

impl UiChannel {
    pub const ALL: [Self; 3] = [
        Self::AppInfoReady,
        Self::DebugModeChanged,
        Self::UpdateStatusChanged,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AppInfoReady => "app-info-ready",
            Self::DebugModeChanged => "debug-mode-changed",
            Self::UpdateStatusChanged => "update-status-changed",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.as_str() == name)
    }
}
