use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kioskit::{
    ChannelNotifier, HostApp, HostSettings, LoadTarget, StdioWindow, WindowOptions,
    read_host_messages,
};
use kioskit_bridge::UiBridge;
use kioskit_core::{
    CoordinatorSettings, UpdateBackend, UpdateCoordinator, UpdateError, UpdateEvent, UpdateEvents,
};
use kioskit_ui::{UiSession, UiSettings, serve};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Stages an update on every check.
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

/// The host window's output stream, handed to the UI side chunk by chunk.
struct PipeWriter(mpsc::UnboundedSender<Vec<u8>>);

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .send(buf.to_vec())
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn ui_idle_timeout_installs_staged_update_over_the_wire() {
    let temp = tempfile::tempdir().expect("tempdir should be created");

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

    // Host stdout -> UI stdin.
    let (chunk_tx, mut chunk_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let (mut ui_stdin, ui_stdin_reader) = tokio::io::duplex(4096);
    let _forward = tokio::spawn(async move {
        while let Some(chunk) = chunk_rx.recv().await {
            if ui_stdin.write_all(&chunk).await.is_err() {
                break;
            }
        }
    });

    // UI stdout -> host stdin.
    let (ui_stdout, host_stdin) = tokio::io::duplex(4096);
    let (host_tx, host_rx) = mpsc::unbounded_channel();
    let _reader = tokio::spawn(read_host_messages(
        BufReader::new(host_stdin),
        host_tx,
        shutdown.clone(),
    ));

    let (bridge_tx, bridge_rx) = mpsc::unbounded_channel();
    let session = UiSession::mount(
        UiBridge::new(bridge_tx),
        UiSettings {
            idle_timeout: IDLE_TIMEOUT,
            locales: vec!["en".to_string()],
            counter_file: temp.path().join("counter.json"),
        },
    )
    .expect("session should mount");

    let mut app = HostApp::new(
        StdioWindow::new(PipeWriter(chunk_tx), WindowOptions::default()),
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

    let host = async move {
        app.run(host_rx, status_rx).await;
        // Dropping the host closes the UI's input.
    };
    let ui = serve(
        &session,
        bridge_rx,
        BufReader::new(ui_stdin_reader),
        ui_stdout,
    );

    let ((), served) = tokio::time::timeout(IDLE_TIMEOUT * 4, async { tokio::join!(host, ui) })
        .await
        .expect("host and UI should both stop after the install");
    served.expect("UI should stop cleanly when the host goes away");

    assert!(shutdown.is_cancelled());
    assert_eq!(backend.checks.load(Ordering::SeqCst), 1);
    assert_eq!(backend.installs.load(Ordering::SeqCst), 1);
    assert!(session.is_idle());

    let overlay = session.overlay().expect("overlay should be mounted");
    assert!(overlay.with(|overlay| overlay.update_ready()));
    assert!(overlay.with(|overlay| overlay.app_info().is_some()));
}
