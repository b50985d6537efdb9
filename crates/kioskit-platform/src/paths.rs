use std::path::{Path, PathBuf};
use thiserror::Error;

pub const APP_DIR_NAME: &str = "kioskit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,
    #[error("Could not determine config directory")]
    ConfigDirUnavailable,
    #[error("Could not determine cache directory")]
    CacheDirUnavailable,
    #[error("Could not determine data directory")]
    DataDirUnavailable,
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Resolve the per-user directories for the current platform.
    ///
    /// On macOS the data directory lives under `~/Library/Logs`.
    ///
    /// # Errors
    /// Returns an error when one of the base directories cannot be determined.
    pub fn new() -> Result<Self, AppPathsError> {
        if cfg!(target_os = "macos") {
            let home = resolve(dirs::home_dir(), AppPathsError::HomeDirUnavailable)?;
            let library = home.join("Library");
            return Ok(Self {
                config_dir: library.join("Application Support").join(APP_DIR_NAME),
                cache_dir: library.join("Caches").join(APP_DIR_NAME),
                data_dir: library.join("Logs").join(APP_DIR_NAME),
            });
        }

        Ok(Self {
            config_dir: resolve(dirs::config_dir(), AppPathsError::ConfigDirUnavailable)?
                .join(APP_DIR_NAME),
            cache_dir: resolve(dirs::cache_dir(), AppPathsError::CacheDirUnavailable)?
                .join(APP_DIR_NAME),
            data_dir: resolve(dirs::data_dir(), AppPathsError::DataDirUnavailable)?
                .join(APP_DIR_NAME),
        })
    }

    /// Lay out all directories under a single root. Used by tests and portable installs.
    #[must_use]
    pub fn under(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            cache_dir: root.join("cache"),
            data_dir: root.join("data"),
        }
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    #[must_use]
    pub fn counter_file(&self) -> PathBuf {
        self.data_dir.join("counter.json")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("debug.log")
    }

    /// The UI process keeps its own log next to the host's.
    #[must_use]
    pub fn ui_log_file(&self) -> PathBuf {
        self.data_dir.join("ui.log")
    }

    /// Ensure all application directories exist on disk.
    ///
    /// # Errors
    /// Returns an error if any directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        [&self.config_dir, &self.cache_dir, &self.data_dir]
            .into_iter()
            .try_for_each(std::fs::create_dir_all)
    }
}

fn resolve(dir: Option<PathBuf>, missing: AppPathsError) -> Result<PathBuf, AppPathsError> {
    dir.ok_or(missing)
}
