//! Decides when to ask the backend for updates and when installing is allowed.
//!
//! Invariants held here:
//! - at most one poll timer is armed;
//! - no poll timer is armed while an update is staged;
//! - only one backend check and one install are in flight at a time.
//!
//! Failures returned by the backend are queued behind the events it already
//! emitted, so an `Error` is never overtaken by a stale `CheckingForUpdate`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::backend::{UpdateBackend, UpdateEventStream, UpdateEvents};
use crate::status::{UpdateEvent, UpdateStatus};

/// Receives every status change the coordinator makes.
pub trait StatusNotifier: Send + Sync {
    fn status_changed(&self, status: &UpdateStatus);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinatorSettings {
    /// Development builds never poll.
    pub dev_mode: bool,
}

#[derive(Default)]
struct CoordinatorState {
    status: UpdateStatus,
    check_in_flight: bool,
    install_pending: bool,
    poll_timer: Option<JoinHandle<()>>,
    /// Set once an event pump is attached.
    failures: Option<UpdateEvents>,
}

impl CoordinatorState {
    fn cancel_poll_timer(&mut self) -> bool {
        match self.poll_timer.take() {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }
}

struct Inner {
    backend: Arc<dyn UpdateBackend>,
    notifier: Arc<dyn StatusNotifier>,
    settings: CoordinatorSettings,
    shutdown: CancellationToken,
    state: Mutex<CoordinatorState>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        state.cancel_poll_timer();
    }
}

/// Cloneable handle to the host's single update coordinator.
#[derive(Clone)]
pub struct UpdateCoordinator {
    inner: Arc<Inner>,
}

impl UpdateCoordinator {
    #[must_use]
    pub fn new(
        backend: Arc<dyn UpdateBackend>,
        notifier: Arc<dyn StatusNotifier>,
        settings: CoordinatorSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                notifier,
                settings,
                shutdown,
                state: Mutex::new(CoordinatorState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn status(&self) -> UpdateStatus {
        self.state().status.clone()
    }

    #[must_use]
    pub fn has_staged_update(&self) -> bool {
        self.state().status.is_downloaded()
    }

    #[must_use]
    pub fn has_poll_timer(&self) -> bool {
        self.state().poll_timer.is_some()
    }

    #[must_use]
    pub fn is_install_pending(&self) -> bool {
        self.state().install_pending
    }

    /// Whether `start_periodic_check` would actually arm a timer.
    #[must_use]
    pub fn can_poll(&self) -> bool {
        !self.inner.settings.dev_mode && self.inner.backend.is_configured()
    }

    /// Ask the backend for an update unless one is staged or a check is running.
    ///
    /// With an update already staged this re-announces it and disarms polling.
    pub fn check_now(&self) {
        let mut state = self.state();

        if state.status.is_downloaded() {
            let status = state.status.clone();
            state.cancel_poll_timer();
            drop(state);
            debug!("Update already staged, skipping check");
            self.inner.notifier.status_changed(&status);
            return;
        }

        if state.check_in_flight {
            debug!("Update check already in flight, skipping");
            return;
        }
        state.check_in_flight = true;
        drop(state);

        let coordinator = self.clone();
        tokio::spawn(async move {
            match coordinator.inner.backend.check().await {
                Ok(()) => {
                    coordinator.state().check_in_flight = false;
                }
                // `Error` clears the in-flight flag once it is applied.
                Err(error) => coordinator.report_failure(error.to_string()),
            }
        });
    }

    /// Check now, then every `interval`, replacing any running poll timer.
    pub fn start_periodic_check(&self, interval: Duration) {
        if interval.is_zero() {
            debug!("Periodic update check disabled by zero interval");
            return;
        }
        if self.inner.settings.dev_mode {
            debug!("Periodic update check disabled in development");
            return;
        }
        if !self.inner.backend.is_configured() {
            debug!("Periodic update check disabled, no update feed configured");
            return;
        }

        info!("Starting periodic update check... OK");

        let weak = Arc::downgrade(&self.inner);
        let timer = tokio::spawn(poll_loop(weak, interval));
        if let Some(previous) = self.state().poll_timer.replace(timer) {
            previous.abort();
        }

        self.check_now();
    }

    pub fn stop_periodic_check(&self) {
        if self.state().cancel_poll_timer() {
            info!("Stopping periodic update check... OK");
        }
    }

    /// Quit and apply the staged update. Returns whether an install was started.
    ///
    /// Success cancels the shutdown token; failure is reported as an `Error` status.
    pub fn install_staged_update(&self) -> bool {
        {
            let mut state = self.state();
            if !state.status.is_downloaded() {
                debug!("No staged update to install");
                return false;
            }
            if state.install_pending {
                debug!("Install already pending");
                return false;
            }
            state.install_pending = true;
        }

        info!("Update is available, quitting app and applying update now... OK");

        let coordinator = self.clone();
        tokio::spawn(async move {
            match coordinator.inner.backend.quit_and_install().await {
                Ok(()) => {
                    info!("Staged update applied, shutting down");
                    coordinator.inner.shutdown.cancel();
                }
                Err(error) => coordinator.report_failure(error.to_string()),
            }
        });

        true
    }

    /// Queue a backend failure behind the events the backend already emitted.
    fn report_failure(&self, message: String) {
        let failures = self.state().failures.clone();
        match failures {
            Some(failures) => failures.emit(UpdateEvent::Error(message)),
            None => self.handle_event(UpdateEvent::Error(message)),
        }
    }

    /// Apply one backend event. Events that would skip a lifecycle step are dropped.
    pub fn handle_event(&self, event: UpdateEvent) {
        let mut state = self.state();

        if !state.status.accepts(&event) {
            warn!(
                "Ignoring update event {event:?} while {:?}",
                state.status.tag()
            );
            return;
        }

        let next = match event {
            UpdateEvent::Error(message) => {
                error!("Checking for updates... ERR: {message}");
                state.check_in_flight = false;
                state.install_pending = false;
                UpdateStatus::Error(message)
            }
            UpdateEvent::CheckingForUpdate => {
                info!("Checking for updates...");
                UpdateStatus::Checking
            }
            UpdateEvent::UpdateAvailable { version } => {
                info!("Checking for updates... OK: {version} is available");
                if self.inner.backend.downloads_automatically() {
                    state.cancel_poll_timer();
                }
                UpdateStatus::Available
            }
            UpdateEvent::UpdateNotAvailable => {
                info!("Checking for updates... SKIP: already up to date");
                state.check_in_flight = false;
                UpdateStatus::Unavailable
            }
            UpdateEvent::DownloadProgress(progress) => {
                debug!("Downloading update... {progress:?}");
                state.cancel_poll_timer();
                UpdateStatus::Downloading(progress)
            }
            UpdateEvent::UpdateDownloaded { version } => {
                info!("Downloading update {version}... OK");
                state.cancel_poll_timer();
                state.check_in_flight = false;
                UpdateStatus::Downloaded
            }
        };

        state.status = next.clone();
        drop(state);

        self.inner.notifier.status_changed(&next);
    }

    /// Feed backend events into this coordinator until the backend side closes.
    ///
    /// `events` must be the sender half of `stream`; the coordinator posts its
    /// own failure reports through it to keep them in order.
    #[must_use]
    pub fn spawn_event_pump(
        &self,
        events: &UpdateEvents,
        mut stream: UpdateEventStream,
    ) -> JoinHandle<()> {
        self.state().failures = Some(events.clone());
        let coordinator = self.clone();
        tokio::spawn(async move {
            while let Some(event) = stream.recv().await {
                coordinator.handle_event(event);
            }
        })
    }
}

async fn poll_loop(inner: Weak<Inner>, interval: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        UpdateCoordinator { inner }.check_now();
    }
}
