//! Logic that runs inside the kioskit UI process.
//!
//! - [`IdleDetector`] watches the surface's input stream and tells the host
//!   when the user goes idle or comes back.
//! - [`DebugOverlay`] is the hidden admin panel's state and actions.
//! - [`CounterStore`] and [`LocaleState`] back the example UI.
//! - [`UiSession`] owns all of the above for one mounted surface, and [`serve`]
//!   runs it over a JSON-lines stream.

mod counter;
mod idle;
mod input;
mod locale;
mod overlay;
mod session;
mod stdio;

pub use counter::{CounterStore, StoreError};
pub use idle::IdleDetector;
pub use input::{InputEvent, InputEvents};
pub use locale::{LocaleError, LocaleState};
pub use overlay::{DebugOverlay, MountedOverlay};
pub use session::{UiSession, UiSettings};
pub use stdio::serve;
