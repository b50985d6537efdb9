//! Platform-specific locations used by both kioskit processes.

mod paths;

pub use paths::{APP_DIR_NAME, AppPaths, AppPathsError};
