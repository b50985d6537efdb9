//! Update coordination for kioskit hosts.
//!
//! This crate owns everything about the auto-update lifecycle that does not
//! depend on a window or a UI framework:
//! - The update status model and the events a backend may emit.
//! - The [`UpdateBackend`] seam and a GitHub-releases implementation of it.
//! - The [`UpdateCoordinator`], which decides when to poll and guards installs.

mod backend;
mod coordinator;
mod download;
mod error;
mod github;
mod release;
mod status;

/// Backend seam and the event channel backends report through.
pub use backend::{UpdateBackend, UpdateEventStream, UpdateEvents};
/// Poll timer ownership, status tracking, and install guarding.
pub use coordinator::{CoordinatorSettings, StatusNotifier, UpdateCoordinator};
pub use error::UpdateError;
/// Auto-update backend backed by GitHub release assets.
pub use github::GithubReleaseBackend;
/// Release lookup and version comparison helpers.
pub use release::{ReleaseAsset, ReleaseFeed, UpdateRelease, is_newer_version};
pub use status::{DownloadProgress, StatusTag, UpdateEvent, UpdateStatus};
