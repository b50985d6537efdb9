use serde::{Deserialize, Serialize};

/// Snapshot of an in-progress update download.
///
/// `percent` is a fraction in `0.0..=1.0`, not a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    pub percent: f64,
    pub bytes_transferred: u64,
    pub bytes_total: u64,
    pub bytes_per_second: f64,
}

impl DownloadProgress {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(bytes_transferred: u64, bytes_total: u64, bytes_per_second: f64) -> Self {
        let percent = if bytes_total == 0 {
            0.0
        } else {
            (bytes_transferred as f64 / bytes_total as f64).clamp(0.0, 1.0)
        };

        Self {
            percent,
            bytes_transferred,
            bytes_total,
            bytes_per_second,
        }
    }
}

/// Lifecycle events reported by an [`crate::UpdateBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    Error(String),
    CheckingForUpdate,
    UpdateAvailable { version: String },
    UpdateNotAvailable,
    DownloadProgress(DownloadProgress),
    UpdateDownloaded { version: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    Idle,
    Checking,
    Available,
    Unavailable,
    Downloading,
    Downloaded,
    Error,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum UpdateStatus {
    #[default]
    Idle,
    Checking,
    Available,
    Unavailable,
    Downloading(DownloadProgress),
    Downloaded,
    Error(String),
}

impl UpdateStatus {
    #[must_use]
    pub fn tag(&self) -> StatusTag {
        match self {
            Self::Idle => StatusTag::Idle,
            Self::Checking => StatusTag::Checking,
            Self::Available => StatusTag::Available,
            Self::Unavailable => StatusTag::Unavailable,
            Self::Downloading(_) => StatusTag::Downloading,
            Self::Downloaded => StatusTag::Downloaded,
            Self::Error(_) => StatusTag::Error,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Option<&DownloadProgress> {
        match self {
            Self::Downloading(progress) => Some(progress),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_downloaded(&self) -> bool {
        matches!(self, Self::Downloaded)
    }

    /// Whether a backend event is a legal transition out of this status.
    ///
    /// Errors are accepted from anywhere. A check can only start when nothing is
    /// being downloaded or staged, and download events require an available update.
    #[must_use]
    pub fn accepts(&self, event: &UpdateEvent) -> bool {
        match event {
            UpdateEvent::Error(_) => true,
            UpdateEvent::CheckingForUpdate => matches!(
                self,
                Self::Idle | Self::Checking | Self::Available | Self::Unavailable | Self::Error(_)
            ),
            UpdateEvent::UpdateAvailable { .. } | UpdateEvent::UpdateNotAvailable => {
                matches!(self, Self::Checking)
            }
            UpdateEvent::DownloadProgress(_) | UpdateEvent::UpdateDownloaded { .. } => {
                matches!(self, Self::Available | Self::Downloading(_))
            }
        }
    }
}
