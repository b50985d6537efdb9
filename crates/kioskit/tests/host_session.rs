use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kioskit::{ChannelNotifier, HostApp, HostSettings, LoadTarget, WindowHost};
use kioskit_bridge::{HostChannel, UiMessage};
use kioskit_core::{
    CoordinatorSettings, DownloadProgress, StatusTag, UpdateBackend, UpdateCoordinator,
    UpdateError, UpdateEvent, UpdateEvents,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Finds, downloads, and stages an update on every check.
struct StagingBackend {
    events: UpdateEvents,
    checks: AtomicUsize,
    installs: AtomicUsize,
}

#[async_trait]
impl UpdateBackend for StagingBackend {
    fn is_configured(&self) -> bool {
        true
    }

    async fn check(&self) -> Result<(), UpdateError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.events.emit(UpdateEvent::CheckingForUpdate);
        self.events.emit(UpdateEvent::UpdateAvailable {
            version: "0.2.0".to_string(),
        });
        self.events.emit(UpdateEvent::DownloadProgress(DownloadProgress::new(
            512_000, 1_024_000, 256_000.0,
        )));
        self.events.emit(UpdateEvent::UpdateDownloaded {
            version: "0.2.0".to_string(),
        });
        Ok(())
    }

    async fn quit_and_install(&self) -> Result<(), UpdateError> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct SharedWindow {
    sent: Arc<Mutex<Vec<UiMessage>>>,
    closed: Arc<Mutex<bool>>,
}

impl WindowHost for SharedWindow {
    fn load(&mut self, _target: &LoadTarget) {}

    fn reload(&mut self) {}

    fn close(&mut self) {
        *self.closed.lock().expect("closed lock should not be poisoned") = true;
    }

    fn set_dev_tools(&mut self, _open: bool) {}

    fn send(&mut self, message: &UiMessage) {
        self.sent
            .lock()
            .expect("sent lock should not be poisoned")
            .push(message.clone());
    }
}

fn statuses(window: &SharedWindow) -> Vec<StatusTag> {
    window
        .sent
        .lock()
        .expect("sent lock should not be poisoned")
        .iter()
        .filter_map(|message| match message {
            UiMessage::UpdateStatusChanged(payload) => Some(payload.status),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn staged_update_is_installed_once_the_ui_goes_idle() {
    let (events, event_stream) = UpdateEvents::channel();
    let backend = Arc::new(StagingBackend {
        events: events.clone(),
        checks: AtomicUsize::new(0),
        installs: AtomicUsize::new(0),
    });
    let (notifier, status_rx) = ChannelNotifier::channel();
    let shutdown = CancellationToken::new();
    let coordinator = UpdateCoordinator::new(
        Arc::clone(&backend) as Arc<dyn UpdateBackend>,
        Arc::new(notifier),
        CoordinatorSettings { dev_mode: false },
        shutdown.clone(),
    );
    let _pump = coordinator.spawn_event_pump(&events, event_stream);

    let window = SharedWindow::default();
    let mut app = HostApp::new(
        window.clone(),
        coordinator.clone(),
        HostSettings {
            app_name: "kioskit".to_string(),
            app_version: "0.1.0".to_string(),
            poll_interval: Duration::from_secs(5),
            debug_enabled: false,
        },
        shutdown.clone(),
    );
    app.start(&LoadTarget::DevServer("http://localhost:8080".to_string()));

    let (ui_tx, ui_rx) = mpsc::unbounded_channel();
    let session = async {
        // Let the startup check stage the update before the user walks away.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(coordinator.has_staged_update());
        ui_tx
            .send(HostChannel::EnterIdleMode)
            .expect("host should be listening");
    };

    let ((), ()) = tokio::time::timeout(Duration::from_secs(30), async {
        tokio::join!(app.run(ui_rx, status_rx), session)
    })
    .await
    .expect("host should shut down after installing");

    assert!(shutdown.is_cancelled());
    assert_eq!(backend.checks.load(Ordering::SeqCst), 1);
    assert_eq!(backend.installs.load(Ordering::SeqCst), 1);
    assert!(*window.closed.lock().expect("closed lock should not be poisoned"));
    assert_eq!(
        statuses(&window),
        vec![
            StatusTag::Checking,
            StatusTag::Available,
            StatusTag::Downloading,
            StatusTag::Downloaded,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn quit_message_ends_the_session_without_installing() {
    let (events, event_stream) = UpdateEvents::channel();
    let backend = Arc::new(StagingBackend {
        events: events.clone(),
        checks: AtomicUsize::new(0),
        installs: AtomicUsize::new(0),
    });
    let (notifier, status_rx) = ChannelNotifier::channel();
    let shutdown = CancellationToken::new();
    let coordinator = UpdateCoordinator::new(
        Arc::clone(&backend) as Arc<dyn UpdateBackend>,
        Arc::new(notifier),
        CoordinatorSettings { dev_mode: true },
        shutdown.clone(),
    );
    let _pump = coordinator.spawn_event_pump(&events, event_stream);

    let window = SharedWindow::default();
    let mut app = HostApp::new(
        window.clone(),
        coordinator.clone(),
        HostSettings {
            app_name: "kioskit".to_string(),
            app_version: "0.1.0".to_string(),
            poll_interval: Duration::from_secs(5),
            debug_enabled: true,
        },
        shutdown.clone(),
    );
    app.start(&LoadTarget::DevServer("http://localhost:8080".to_string()));

    let (ui_tx, ui_rx) = mpsc::unbounded_channel();
    ui_tx
        .send(HostChannel::EnterIdleMode)
        .expect("channel should be open");
    ui_tx
        .send(HostChannel::QuitApp)
        .expect("channel should be open");

    tokio::time::timeout(Duration::from_secs(30), app.run(ui_rx, status_rx))
        .await
        .expect("quit should stop the host loop");

    assert_eq!(backend.checks.load(Ordering::SeqCst), 0);
    assert_eq!(backend.installs.load(Ordering::SeqCst), 0);
    assert!(!coordinator.has_poll_timer());
    assert!(*window.closed.lock().expect("closed lock should not be poisoned"));

    let sent = window.sent.lock().expect("sent lock should not be poisoned");
    assert_eq!(sent[0], UiMessage::DebugModeChanged(true));
    assert!(matches!(sent[1], UiMessage::AppInfoReady(_)));
}
