use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use kioskit_bridge::UiBridge;
use log::debug;

use crate::counter::CounterStore;
use crate::idle::IdleDetector;
use crate::input::InputEvents;
use crate::locale::{LocaleError, LocaleState};
use crate::overlay::{DebugOverlay, MountedOverlay};

#[derive(Debug, Clone)]
pub struct UiSettings {
    pub idle_timeout: Duration,
    pub locales: Vec<String>,
    pub counter_file: PathBuf,
}

/// Everything one UI surface owns while it is mounted.
pub struct UiSession {
    bridge: UiBridge,
    input: Arc<InputEvents>,
    idle: IdleDetector,
    showing_idle: Arc<AtomicBool>,
    overlay: Option<MountedOverlay>,
    counter: CounterStore,
    locale: LocaleState,
}

impl UiSession {
    /// Mount the overlay and start idle monitoring. Needs a tokio runtime.
    ///
    /// # Errors
    /// Returns an error when no locales are configured.
    pub fn mount(bridge: UiBridge, settings: UiSettings) -> Result<Self, LocaleError> {
        let locale = LocaleState::new(settings.locales)?;
        let input = Arc::new(InputEvents::new());
        let overlay = DebugOverlay::mount(&bridge, Arc::clone(&input));
        let idle = IdleDetector::new(Arc::clone(&input), bridge.clone(), settings.idle_timeout);

        let showing_idle = Arc::new(AtomicBool::new(false));
        {
            let on_enter = Arc::clone(&showing_idle);
            let on_exit = Arc::clone(&showing_idle);
            idle.start(
                move || on_enter.store(true, Ordering::SeqCst),
                move || on_exit.store(false, Ordering::SeqCst),
            );
        }

        debug!("UI session mounted with locale {}", locale.current());

        Ok(Self {
            bridge,
            input,
            idle,
            showing_idle,
            overlay: Some(overlay),
            counter: CounterStore::load(settings.counter_file),
            locale,
        })
    }

    #[must_use]
    pub fn bridge(&self) -> &UiBridge {
        &self.bridge
    }

    /// Where the surface reports pointer and key input.
    #[must_use]
    pub fn input(&self) -> &InputEvents {
        &self.input
    }

    /// Whether the idle screen should be shown.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.showing_idle.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn idle_detector(&self) -> &IdleDetector {
        &self.idle
    }

    #[must_use]
    pub fn overlay(&self) -> Option<&MountedOverlay> {
        self.overlay.as_ref()
    }

    pub fn counter_mut(&mut self) -> &mut CounterStore {
        &mut self.counter
    }

    pub fn locale_mut(&mut self) -> &mut LocaleState {
        &mut self.locale
    }

    /// Stop idle monitoring and drop every listener this session registered.
    pub fn unmount(&mut self) {
        self.idle.stop();
        self.overlay = None;
        self.showing_idle.store(false, Ordering::SeqCst);
    }
}

impl Drop for UiSession {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use kioskit_bridge::{HostChannel, UiBridge};
    use tokio::sync::mpsc;

    use super::{UiSession, UiSettings};
    use crate::input::InputEvent;

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn settings(dir: &std::path::Path) -> UiSettings {
        UiSettings {
            idle_timeout: TIMEOUT,
            locales: vec!["en".to_string(), "ja".to_string()],
            counter_file: dir.join("counter.json"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn session_tracks_idle_and_reports_to_host() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = UiSession::mount(UiBridge::new(tx), settings(temp.path()))
            .expect("session should mount");

        tokio::time::sleep(TIMEOUT + Duration::from_secs(1)).await;
        assert!(session.is_idle());

        session.input().emit(&InputEvent::KeyUp);
        assert!(!session.is_idle());

        assert_eq!(rx.try_recv().ok(), Some(HostChannel::EnterIdleMode));
        assert_eq!(rx.try_recv().ok(), Some(HostChannel::ExitIdleMode));
    }

    #[tokio::test(start_paused = true)]
    async fn overlay_receives_host_messages() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = UiSession::mount(UiBridge::new(tx), settings(temp.path()))
            .expect("session should mount");

        session
            .bridge()
            .deliver_line(r#"{"channel":"debug-mode-changed","payload":true}"#);

        let overlay = session.overlay().expect("overlay should be mounted");
        assert!(overlay.with(|overlay| overlay.debug_enabled()));
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_detaches_everything() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = UiSession::mount(UiBridge::new(tx), settings(temp.path()))
            .expect("session should mount");

        session.unmount();
        assert!(session.input().is_empty());
        assert!(session.bridge().update_status_changed().is_empty());

        tokio::time::sleep(TIMEOUT * 2).await;
        assert!(!session.is_idle());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn counter_and_locale_are_available() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = UiSession::mount(UiBridge::new(tx), settings(temp.path()))
            .expect("session should mount");

        session
            .counter_mut()
            .increment()
            .expect("increment should persist");
        session
            .locale_mut()
            .change_locale("ja")
            .expect("ja should be supported");

        assert_eq!(session.counter_mut().count(), 1);
        assert_eq!(session.locale_mut().current(), "ja");
        drop(session);

        let (tx, _rx) = mpsc::unbounded_channel();
        let session = UiSession::mount(UiBridge::new(tx), settings(temp.path()))
            .expect("session should remount");
        assert_eq!(session.counter.count(), 1);
    }

    #[test]
    fn empty_locale_list_fails_to_mount() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut settings = settings(temp.path());
        settings.locales.clear();

        assert!(UiSession::mount(UiBridge::new(tx), settings).is_err());
    }
}
