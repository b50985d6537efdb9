use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc;

use crate::error::UpdateError;
use crate::status::UpdateEvent;

/// A platform auto-update mechanism.
///
/// Backends report progress through the [`UpdateEvents`] handle they were
/// built with; the returned `Result` only covers failures of the call itself.
#[async_trait]
pub trait UpdateBackend: Send + Sync {
    /// Whether an update feed is configured at all.
    fn is_configured(&self) -> bool;

    /// Whether an `UpdateAvailable` event is immediately followed by a download.
    fn downloads_automatically(&self) -> bool {
        true
    }

    /// Run one check cycle, downloading and staging any newer release.
    async fn check(&self) -> Result<(), UpdateError>;

    /// Apply the staged update and relaunch the application.
    async fn quit_and_install(&self) -> Result<(), UpdateError>;
}

/// Sending half of the backend event channel.
#[derive(Debug, Clone)]
pub struct UpdateEvents {
    sender: mpsc::UnboundedSender<UpdateEvent>,
}

pub type UpdateEventStream = mpsc::UnboundedReceiver<UpdateEvent>;

impl UpdateEvents {
    #[must_use]
    pub fn channel() -> (Self, UpdateEventStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: UpdateEvent) {
        if self.sender.send(event).is_err() {
            debug!("Update event dropped, coordinator is gone");
        }
    }
}
