//! kioskit host process.
//!
//! Owns the window, the update coordinator, and the policy that installs
//! staged updates once the UI reports idle. The `kioskit-ui` binary runs the
//! UI side of the bridge against the same settings file.

mod config;
mod host;
pub mod logging;
mod policy;
mod window;

pub use config::{AppConfig, DEFAULT_DEV_SERVER_PORT, Environment, WindowPosition, WindowSize};
pub use host::{ChannelNotifier, HostApp, HostSettings, local_ipv4, read_host_messages};
pub use policy::{IdleAction, IdleUpdatePolicy, UpdateControl};
pub use window::{LoadTarget, StdioWindow, WindowHost, WindowOptions};
