use kioskit_bridge::ListenerSet;
use serde::Deserialize;

/// User input the surface forwards to interested modules.
///
/// On the wire: `{"input":"pointer-up","x":12.0,"y":40.5}` or `{"input":"key-up"}`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "input", rename_all = "kebab-case")]
pub enum InputEvent {
    /// Pointer released at window coordinates.
    PointerUp { x: f64, y: f64 },
    KeyUp,
}

impl InputEvent {
    /// Decode one input line, or `None` if the line is not an input event.
    #[must_use]
    pub fn decode(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }
}

/// The surface's input stream. Idle tracking and the overlay subscribe here.
pub type InputEvents = ListenerSet<InputEvent>;
