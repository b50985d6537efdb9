//! Ties UI idle transitions to update polling and installation.
//!
//! Installing only ever happens while the UI reports idle. Polling only runs
//! while idle and nothing is staged; the coordinator cancels its own timer
//! when a download starts, and the policy never re-arms it in that case.

use std::time::Duration;

use kioskit_core::{UpdateCoordinator, UpdateStatus};
use log::{debug, info};

/// The coordinator operations the policy drives.
pub trait UpdateControl {
    fn has_staged_update(&self) -> bool;
    fn is_install_pending(&self) -> bool;
    fn install_staged_update(&self) -> bool;
    fn start_periodic_check(&self, interval: Duration);
    fn stop_periodic_check(&self);
}

impl UpdateControl for UpdateCoordinator {
    fn has_staged_update(&self) -> bool {
        UpdateCoordinator::has_staged_update(self)
    }

    fn is_install_pending(&self) -> bool {
        UpdateCoordinator::is_install_pending(self)
    }

    fn install_staged_update(&self) -> bool {
        UpdateCoordinator::install_staged_update(self)
    }

    fn start_periodic_check(&self, interval: Duration) {
        UpdateCoordinator::start_periodic_check(self, interval);
    }

    fn stop_periodic_check(&self) {
        UpdateCoordinator::stop_periodic_check(self);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleAction {
    Install,
    StartPolling,
    Ignored,
}

pub struct IdleUpdatePolicy<C> {
    control: C,
    poll_interval: Duration,
    idle: bool,
}

impl<C: UpdateControl> IdleUpdatePolicy<C> {
    pub fn new(control: C, poll_interval: Duration) -> Self {
        Self {
            control,
            poll_interval,
            idle: false,
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn on_idle_enter(&mut self) -> IdleAction {
        self.idle = true;

        if self.control.is_install_pending() {
            debug!("Ignoring idle entry, install already pending");
            return IdleAction::Ignored;
        }

        info!("Entering idle mode... OK");

        if self.control.has_staged_update() {
            self.control.install_staged_update();
            IdleAction::Install
        } else {
            self.control.start_periodic_check(self.poll_interval);
            IdleAction::StartPolling
        }
    }

    pub fn on_idle_exit(&mut self) {
        if self.idle {
            info!("Exiting idle mode... OK");
        }
        self.idle = false;
        self.control.stop_periodic_check();
    }

    /// React to a status change. Returns whether an install was started.
    pub fn on_status(&mut self, status: &UpdateStatus) -> bool {
        if !status.is_downloaded() || !self.idle || self.control.is_install_pending() {
            return false;
        }
        debug!("Update staged while idle");
        self.control.install_staged_update()
    }
}
