use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use log::info;
use tempfile::TempDir;

use crate::backend::{UpdateBackend, UpdateEvents};
use crate::download;
use crate::error::UpdateError;
use crate::release::{self, ReleaseFeed};
use crate::status::UpdateEvent;

struct StagedUpdate {
    version: String,
    archive: PathBuf,
    // Keeps the staging directory alive until the update is applied.
    dir: TempDir,
}

/// Auto-update backend that downloads release assets from GitHub.
///
/// A check that finds a newer release downloads it right away; the verified
/// archive stays staged in the cache directory until `quit_and_install`.
pub struct GithubReleaseBackend {
    client: reqwest::Client,
    feed: Option<ReleaseFeed>,
    cache_dir: PathBuf,
    events: UpdateEvents,
    staged: Mutex<Option<StagedUpdate>>,
}

impl GithubReleaseBackend {
    /// Build the backend and clear staging leftovers from previous runs.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        feed: Option<ReleaseFeed>,
        cache_dir: PathBuf,
        events: UpdateEvents,
    ) -> Self {
        download::cleanup_stale_staging(&cache_dir);
        Self {
            client,
            feed,
            cache_dir,
            events,
            staged: Mutex::new(None),
        }
    }

    fn feed(&self) -> Result<&ReleaseFeed, UpdateError> {
        self.feed.as_ref().ok_or(UpdateError::NotConfigured)
    }
}

#[async_trait]
impl UpdateBackend for GithubReleaseBackend {
    fn is_configured(&self) -> bool {
        self.feed.is_some()
    }

    async fn check(&self) -> Result<(), UpdateError> {
        let feed = self.feed()?;
        self.events.emit(UpdateEvent::CheckingForUpdate);

        let Some(update) = release::fetch_latest_release(&self.client, feed).await? else {
            self.events.emit(UpdateEvent::UpdateNotAvailable);
            return Ok(());
        };

        let asset = update.asset.ok_or_else(|| {
            UpdateError::Invalid(format!(
                "Release {} has no verifiable asset for this platform",
                update.version
            ))
        })?;

        self.events.emit(UpdateEvent::UpdateAvailable {
            version: update.version.clone(),
        });

        std::fs::create_dir_all(&self.cache_dir)
            .map_err(|error| UpdateError::io("failed to create cache directory", error))?;
        let dir = tempfile::tempdir_in(&self.cache_dir)
            .map_err(|error| UpdateError::io("failed to create staging directory", error))?;
        let archive = dir.path().join(&asset.name);

        info!("Downloading update from {}", asset.download_url);
        download::download_file(&self.client, &asset.download_url, &archive, |progress| {
            self.events.emit(UpdateEvent::DownloadProgress(progress));
        })
        .await?;
        download::verify_sha256(&archive, &asset.sha256)?;

        *self.staged.lock().unwrap_or_else(PoisonError::into_inner) = Some(StagedUpdate {
            version: update.version.clone(),
            archive,
            dir,
        });

        self.events.emit(UpdateEvent::UpdateDownloaded {
            version: update.version,
        });
        Ok(())
    }

    async fn quit_and_install(&self) -> Result<(), UpdateError> {
        let feed = self.feed()?;
        let staged = self
            .staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| UpdateError::Invalid("No staged update to install".to_string()))?;

        info!("Installing staged update {}", staged.version);
        let extract_dir = staged.dir.path().join("extracted");
        std::fs::create_dir_all(&extract_dir)
            .map_err(|error| UpdateError::io("failed to create extraction directory", error))?;
        download::extract_zip(&staged.archive, &extract_dir)?;
        download::apply_update(&extract_dir, &feed.app_name)?;
        download::restart_app()
    }
}

#[cfg(test)]
mod tests {
    use super::GithubReleaseBackend;
    use crate::backend::{UpdateBackend, UpdateEvents};
    use crate::error::UpdateError;

    fn backend_without_feed(cache_dir: &std::path::Path) -> (GithubReleaseBackend, crate::UpdateEventStream) {
        let (events, stream) = UpdateEvents::channel();
        let backend = GithubReleaseBackend::new(
            reqwest::Client::new(),
            None,
            cache_dir.to_path_buf(),
            events,
        );
        (backend, stream)
    }

    #[tokio::test]
    async fn check_without_feed_is_not_configured_and_silent() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let (backend, mut stream) = backend_without_feed(temp.path());

        assert!(!backend.is_configured());
        let result = backend.check().await;

        assert!(matches!(result, Err(UpdateError::NotConfigured)));
        assert!(stream.try_recv().is_err());
    }

    #[tokio::test]
    async fn install_without_feed_fails() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let (backend, _stream) = backend_without_feed(temp.path());

        let result = backend.quit_and_install().await;
        assert!(matches!(result, Err(UpdateError::NotConfigured)));
    }

    #[test]
    fn new_clears_stale_staging_dirs() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        std::fs::create_dir_all(temp.path().join(".tmpOLD")).expect("stale dir should be created");

        let (_backend, _stream) = backend_without_feed(temp.path());

        assert!(!temp.path().join(".tmpOLD").exists());
    }
}
