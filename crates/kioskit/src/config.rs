use std::time::Duration;

use kioskit_platform::AppPaths;
use kioskit_ui::UiSettings;
use log::warn;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DEV_SERVER_PORT: u16 = 8080;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,

    #[serde(default = "default_check_interval_ms")]
    pub check_for_updates_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// GitHub repository (`owner/name`) that publishes releases.
    #[serde(default)]
    pub update_repository: Option<String>,

    #[serde(default)]
    pub auto_fullscreen: bool,

    #[serde(default)]
    pub window_position: WindowPosition,

    #[serde(default)]
    pub window_size: WindowSize,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,

    #[serde(default)]
    pub debug_logging: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPosition {
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

fn default_locales() -> Vec<String> {
    vec!["en".to_string(), "ja".to_string()]
}

fn default_check_interval_ms() -> u64 {
    60_000
}

fn default_idle_timeout_ms() -> u64 {
    60 * 60 * 1000
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            locales: default_locales(),
            check_for_updates_interval_ms: default_check_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            update_repository: None,
            auto_fullscreen: false,
            window_position: WindowPosition::default(),
            window_size: WindowSize::default(),
            max_log_size_bytes: default_max_log_size_bytes(),
            debug_logging: None,
        }
    }
}

impl AppConfig {
    /// Read `settings.json`, falling back to defaults when it is missing or invalid.
    #[must_use]
    pub fn load(paths: &AppPaths) -> Self {
        let settings_path = paths.settings_file();
        if !settings_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&settings_path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|error| {
                warn!(
                    "Ignoring invalid settings file {}: {error}",
                    settings_path.display()
                );
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Apply `APP_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if lookup("APP_FULLSCREEN").is_some_and(|value| value == "true") {
            self.auto_fullscreen = true;
        }
        let number = |key: &str| -> Option<i32> {
            lookup(key).and_then(|value| value.trim().parse().ok())
        };
        let size = |key: &str| number(key).and_then(|value| u32::try_from(value).ok());

        if let Some(x) = number("APP_WINDOW_X") {
            self.window_position.x = Some(x);
        }
        if let Some(y) = number("APP_WINDOW_Y") {
            self.window_position.y = Some(y);
        }
        if let Some(width) = size("APP_WINDOW_WIDTH") {
            self.window_size.width = Some(width);
        }
        if let Some(height) = size("APP_WINDOW_HEIGHT") {
            self.window_size.height = Some(height);
        }
    }

    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_for_updates_interval_ms)
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// What the UI process needs to mount its session.
    #[must_use]
    pub fn ui_settings(&self, paths: &AppPaths) -> UiSettings {
        UiSettings {
            idle_timeout: self.idle_timeout(),
            locales: self.locales.clone(),
            counter_file: paths.counter_file(),
        }
    }

    /// Verbose logging at startup. Follows the build mode unless set explicitly.
    #[must_use]
    pub fn verbose_logging(&self, environment: &Environment) -> bool {
        self.debug_logging.unwrap_or(environment.dev_mode)
    }
}

/// Process-level settings that only come from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub dev_mode: bool,
    pub dev_server_port: u16,
}

impl Environment {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let dev_mode = match lookup("KIOSKIT_ENV").as_deref() {
            Some("development") => true,
            Some("production") => false,
            _ => cfg!(debug_assertions),
        };
        let dev_server_port = lookup("PORT")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(DEFAULT_DEV_SERVER_PORT);

        Self {
            dev_mode,
            dev_server_port,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use kioskit_platform::AppPaths;
    use serde_json::json;

    use super::{AppConfig, Environment};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_template_values() {
        let config = AppConfig::default();

        assert_eq!(config.locales, vec!["en", "ja"]);
        assert_eq!(config.check_interval(), Duration::from_secs(60));
        assert_eq!(config.idle_timeout(), Duration::from_secs(3600));
        assert_eq!(config.max_log_size_bytes, 5 * 1024 * 1024);
        assert!(config.update_repository.is_none());
        assert!(!config.auto_fullscreen);
    }

    #[test]
    fn partial_settings_keep_defaults_for_missing_fields() {
        let config: AppConfig = serde_json::from_value(json!({
            "idle_timeout_ms": 30_000,
            "update_repository": "kioskit/kioskit",
            "window_size": { "width": 1280 }
        }))
        .expect("settings JSON should deserialize");

        assert_eq!(config.idle_timeout(), Duration::from_secs(30));
        assert_eq!(config.check_for_updates_interval_ms, 60_000);
        assert_eq!(config.update_repository.as_deref(), Some("kioskit/kioskit"));
        assert_eq!(config.window_size.width, Some(1280));
        assert_eq!(config.window_size.height, None);
    }

    #[test]
    fn load_falls_back_to_defaults_for_invalid_file() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let paths = AppPaths::under(temp.path());
        paths.ensure_dirs().expect("dirs should be created");
        std::fs::write(paths.settings_file(), "{ broken").expect("settings should be written");

        let config = AppConfig::load(&paths);
        assert_eq!(config.check_for_updates_interval_ms, 60_000);
    }

    #[test]
    fn load_reads_settings_file() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let paths = AppPaths::under(temp.path());
        paths.ensure_dirs().expect("dirs should be created");
        std::fs::write(
            paths.settings_file(),
            r#"{ "check_for_updates_interval_ms": 5000, "locales": ["ja"] }"#,
        )
        .expect("settings should be written");

        let config = AppConfig::load(&paths);
        assert_eq!(config.check_interval(), Duration::from_secs(5));
        assert_eq!(config.locales, vec!["ja"]);
    }

    #[test]
    fn ui_settings_carry_idle_timeout_locales_and_counter_path() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let paths = AppPaths::under(temp.path());
        let config: AppConfig = serde_json::from_value(json!({
            "idle_timeout_ms": 45_000,
            "locales": ["ja", "en"]
        }))
        .expect("settings JSON should deserialize");

        let settings = config.ui_settings(&paths);
        assert_eq!(settings.idle_timeout, Duration::from_secs(45));
        assert_eq!(settings.locales, vec!["ja", "en"]);
        assert_eq!(settings.counter_file, paths.counter_file());
    }

    #[test]
    fn env_overrides_window_geometry() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[
            ("APP_FULLSCREEN", "true"),
            ("APP_WINDOW_X", "-20"),
            ("APP_WINDOW_Y", "40"),
            ("APP_WINDOW_WIDTH", "1920"),
            ("APP_WINDOW_HEIGHT", "not-a-number"),
        ]));

        assert!(config.auto_fullscreen);
        assert_eq!(config.window_position.x, Some(-20));
        assert_eq!(config.window_position.y, Some(40));
        assert_eq!(config.window_size.width, Some(1920));
        assert_eq!(config.window_size.height, None);
    }

    #[test]
    fn negative_window_size_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[("APP_WINDOW_WIDTH", "-5")]));
        assert_eq!(config.window_size.width, None);
    }

    #[test]
    fn environment_reads_mode_and_port() {
        let env = Environment::from_lookup(lookup(&[("KIOSKIT_ENV", "production"), ("PORT", "3000")]));
        assert!(!env.dev_mode);
        assert_eq!(env.dev_server_port, 3000);

        let env = Environment::from_lookup(lookup(&[("KIOSKIT_ENV", "development")]));
        assert!(env.dev_mode);
        assert_eq!(env.dev_server_port, 8080);
    }

    #[test]
    fn verbose_logging_follows_dev_mode_unless_set() {
        let dev = Environment {
            dev_mode: true,
            dev_server_port: 8080,
        };
        let mut config = AppConfig::default();
        assert!(config.verbose_logging(&dev));

        config.debug_logging = Some(false);
        assert!(!config.verbose_logging(&dev));
    }
}
