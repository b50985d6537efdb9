//! Inactivity tracking for the UI surface.
//!
//! `Active --(timeout)--> Idle --(any input)--> Active`. The detector starts
//! active and only re-arms its timeout on input, so entering idle happens at
//! most once per quiet period.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use kioskit_bridge::{Listener, UiBridge};
use log::info;
use tokio::task::JoinHandle;

use crate::input::{InputEvent, InputEvents};

type Handler = Arc<dyn Fn() + Send + Sync>;

struct Handlers {
    on_enter: Handler,
    on_exit: Handler,
}

#[derive(Default)]
struct IdleState {
    idle: bool,
    timer: Option<JoinHandle<()>>,
    handlers: Option<Handlers>,
    listener: Option<Listener<InputEvent>>,
}

struct Inner {
    input: Arc<InputEvents>,
    bridge: UiBridge,
    timeout: Duration,
    state: Mutex<IdleState>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        if let Some(listener) = state.listener.take() {
            self.input.off(&listener);
        }
    }
}

#[derive(Clone)]
pub struct IdleDetector {
    inner: Arc<Inner>,
}

impl IdleDetector {
    #[must_use]
    pub fn new(input: Arc<InputEvents>, bridge: UiBridge, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                input,
                bridge,
                timeout,
                state: Mutex::new(IdleState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, IdleState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn from_weak(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Begin monitoring input. Calling again replaces the previous handlers.
    pub fn start(
        &self,
        on_enter: impl Fn() + Send + Sync + 'static,
        on_exit: impl Fn() + Send + Sync + 'static,
    ) {
        self.stop();

        let weak = Arc::downgrade(&self.inner);
        let listener: Listener<InputEvent> = Arc::new(move |_: &InputEvent| {
            if let Some(detector) = Self::from_weak(&weak) {
                detector.restart_timeout();
            }
        });

        {
            let mut state = self.state();
            state.handlers = Some(Handlers {
                on_enter: Arc::new(on_enter),
                on_exit: Arc::new(on_exit),
            });
            state.listener = Some(Arc::clone(&listener));
        }
        self.inner.input.on(listener);

        self.restart_timeout();
    }

    /// Detach from input, cancel the timeout, and drop the handlers.
    pub fn stop(&self) {
        let (listener, timer) = {
            let mut state = self.state();
            state.handlers = None;
            state.idle = false;
            (state.listener.take(), state.timer.take())
        };

        if let Some(listener) = listener {
            self.inner.input.off(&listener);
        }
        if let Some(timer) = timer {
            timer.abort();
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state().idle
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state().listener.is_some()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    fn restart_timeout(&self) {
        self.exit_idle_mode();

        let weak = Arc::downgrade(&self.inner);
        let timeout = self.inner.timeout;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(detector) = Self::from_weak(&weak) {
                detector.enter_idle_mode();
            }
        });

        if let Some(previous) = self.state().timer.replace(timer) {
            previous.abort();
        }
    }

    fn enter_idle_mode(&self) {
        let on_enter = {
            let mut state = self.state();
            // Only the timer that fired may clear its own slot.
            if state
                .timer
                .as_ref()
                .is_some_and(|timer| tokio::task::try_id() == Some(timer.id()))
            {
                state.timer = None;
            }
            if state.idle {
                return;
            }
            let Some(handlers) = state.handlers.as_ref() else {
                return;
            };
            let on_enter = Arc::clone(&handlers.on_enter);
            state.idle = true;
            on_enter
        };

        info!("Entering idle mode... OK");
        on_enter();
        self.inner.bridge.enter_idle_mode();
    }

    fn exit_idle_mode(&self) {
        let on_exit = {
            let mut state = self.state();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            if !state.idle {
                return;
            }
            state.idle = false;
            state.handlers.as_ref().map(|handlers| Arc::clone(&handlers.on_exit))
        };

        info!("Exiting idle mode... OK");
        if let Some(on_exit) = on_exit {
            on_exit();
        }
        self.inner.bridge.exit_idle_mode();
    }
}
