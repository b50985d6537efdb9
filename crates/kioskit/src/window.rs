use std::io::{self, Write};
use std::path::{Path, PathBuf};

use kioskit_bridge::UiMessage;
use log::{debug, info, warn};

use crate::config::{AppConfig, Environment};

/// What the window shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTarget {
    DevServer(String),
    File(PathBuf),
}

impl LoadTarget {
    /// Dev builds load the local dev server, packaged builds load `index.html`.
    #[must_use]
    pub fn for_environment(environment: &Environment, resources_dir: &Path) -> Self {
        if environment.dev_mode {
            Self::DevServer(format!("http://localhost:{}", environment.dev_server_port))
        } else {
            Self::File(resources_dir.join("index.html"))
        }
    }
}

impl std::fmt::Display for LoadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DevServer(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowOptions {
    pub fullscreen: bool,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl From<&AppConfig> for WindowOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            fullscreen: config.auto_fullscreen,
            x: config.window_position.x,
            y: config.window_position.y,
            width: config.window_size.width,
            height: config.window_size.height,
        }
    }
}

/// The windowing side of the host.
pub trait WindowHost {
    fn load(&mut self, target: &LoadTarget);
    fn reload(&mut self);
    fn close(&mut self);
    fn set_dev_tools(&mut self, open: bool);
    fn send(&mut self, message: &UiMessage);
}

/// Headless window that speaks the bridge protocol as JSON lines.
///
/// UI-bound messages go to `out`; the host loop reads host-bound lines from stdin.
pub struct StdioWindow<W: Write> {
    out: W,
    options: WindowOptions,
    target: Option<LoadTarget>,
    dev_tools: bool,
}

impl StdioWindow<io::Stdout> {
    #[must_use]
    pub fn stdout(options: WindowOptions) -> Self {
        Self::new(io::stdout(), options)
    }
}

impl<W: Write> StdioWindow<W> {
    pub fn new(out: W, options: WindowOptions) -> Self {
        Self {
            out,
            options,
            target: None,
            dev_tools: false,
        }
    }

    #[must_use]
    pub fn target(&self) -> Option<&LoadTarget> {
        self.target.as_ref()
    }

    #[must_use]
    pub fn dev_tools_open(&self) -> bool {
        self.dev_tools
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl<W: Write> WindowHost for StdioWindow<W> {
    fn load(&mut self, target: &LoadTarget) {
        info!("Loading {target} with {:?}", self.options);
        self.target = Some(target.clone());
    }

    fn reload(&mut self) {
        match &self.target {
            Some(target) => info!("Reloading {target}"),
            None => debug!("Reload requested before anything was loaded"),
        }
    }

    fn close(&mut self) {
        info!("Closing window");
        self.target = None;
    }

    fn set_dev_tools(&mut self, open: bool) {
        self.dev_tools = open;
    }

    fn send(&mut self, message: &UiMessage) {
        let line = match message.encode() {
            Ok(line) => line,
            Err(error) => {
                warn!("Failed to encode {} message: {error}", message.channel().as_str());
                return;
            }
        };
        if let Err(error) = self.write_line(&line) {
            warn!("Failed to deliver {} message: {error}", message.channel().as_str());
        }
    }
}
