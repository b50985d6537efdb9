//! The fixed message surface between the kioskit host and UI processes.
//!
//! Channel names are stable strings and each channel carries one payload shape.
//! Only the statically enumerated operations can cross the boundary; anything
//! else is dropped at decode time.

mod channel;
mod listeners;
mod message;
mod ui;

pub use channel::{HostChannel, UiChannel};
pub use listeners::{Listener, ListenerSet};
pub use message::{AppInfo, DecodeError, UiMessage, UpdateStatusPayload};
pub use ui::UiBridge;
