//! Application-level configuration loading: leaderboard size, snapshot expiry, and backend limits.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PROGRESS_BOARD_CONFIG_PATH";

const DEFAULT_LEADERBOARD_CAPACITY: usize = 5;
/// Seven days.
const DEFAULT_SNAPSHOT_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_CACHE_MAX_AGE_MS: u64 = 5_000;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Number of entries kept on the leaderboard and shown in the live view.
    pub leaderboard_capacity: usize,
    /// Lifetime of an unconsumed snapshot. `None` keeps snapshots until loaded or retired.
    pub snapshot_ttl: Option<Duration>,
    /// Upper bound for every individual backend call.
    pub backend_timeout: Duration,
    /// How long the write-through cache trusts a value. `None` disables the cache.
    pub cache_max_age: Option<Duration>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        capacity = app_config.leaderboard_capacity,
                        "loaded configuration"
                    );
                    app_config
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
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    leaderboard_capacity: usize,
    /// `0` disables expiry.
    snapshot_ttl_secs: u64,
    backend_timeout_ms: u64,
    cache_enabled: bool,
    cache_max_age_ms: u64,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            leaderboard_capacity: DEFAULT_LEADERBOARD_CAPACITY,
            snapshot_ttl_secs: DEFAULT_SNAPSHOT_TTL_SECS,
            backend_timeout_ms: DEFAULT_BACKEND_TIMEOUT_MS,
            cache_enabled: true,
            cache_max_age_ms: DEFAULT_CACHE_MAX_AGE_MS,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            leaderboard_capacity: value.leaderboard_capacity.max(1),
            snapshot_ttl: (value.snapshot_ttl_secs > 0)
                .then(|| Duration::from_secs(value.snapshot_ttl_secs)),
            backend_timeout: Duration::from_millis(value.backend_timeout_ms.max(1)),
            cache_max_age: value
                .cache_enabled
                .then(|| Duration::from_millis(value.cache_max_age_ms)),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
