//! Application-level configuration loading, including access passwords and
//! the late-submission policy.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LIVEROOM_BACK_CONFIG_PATH";

const DEFAULT_SESSION_TITLE: &str = "Interactive Training";
const DEFAULT_HOST_PASSWORD: &str = "admin123";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_COUNTDOWN_SECONDS: u64 = 10;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Title used when a session is created lazily or reset.
    pub session_title: String,
    /// Password presented by clients signing in as host.
    pub host_password: String,
    /// Password presented by clients signing in as admin.
    pub admin_password: String,
    /// Whether submissions are still accepted once the phase moved to results.
    pub allow_late_submissions: bool,
    /// Countdown duration used when the host does not provide one.
    pub default_countdown_seconds: u64,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session_title: DEFAULT_SESSION_TITLE.into(),
            host_password: DEFAULT_HOST_PASSWORD.into(),
            admin_password: DEFAULT_ADMIN_PASSWORD.into(),
            allow_late_submissions: false,
            default_countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    session_title: Option<String>,
    host_password: Option<String>,
    admin_password: Option<String>,
    allow_late_submissions: Option<bool>,
    default_countdown_seconds: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            session_title: value.session_title.unwrap_or(defaults.session_title),
            host_password: value.host_password.unwrap_or(defaults.host_password),
            admin_password: value.admin_password.unwrap_or(defaults.admin_password),
            allow_late_submissions: value
                .allow_late_submissions
                .unwrap_or(defaults.allow_late_submissions),
            default_countdown_seconds: value
                .default_countdown_seconds
                .unwrap_or(defaults.default_countdown_seconds),
        }
    }
}

fn resolve_config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}
