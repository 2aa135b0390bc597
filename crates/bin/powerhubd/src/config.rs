//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `powerhub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use powerhub_adapter_virtual::{Lag, VirtualSettings};
use powerhub_app::notification_bus::DEFAULT_OBSERVER_BUFFER;
use powerhub_app::schedule_engine::SchedulerSettings;
use powerhub_domain::device::{Category, Credentials, Device};
use powerhub_domain::profile::{CategoryProfile, CategoryProfiles, VerifyDelays};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Live update channel settings.
    pub notifications: NotificationsConfig,
    /// Schedule trigger engine settings.
    pub scheduler: SchedulerConfig,
    /// Reconciliation loop settings.
    pub reconciliation: ReconciliationConfig,
    /// Per-category overrides of the built-in profiles.
    pub categories: CategoriesConfig,
    /// Devices registered at startup.
    pub devices: Vec<DeviceConfig>,
    /// Simulated drivers.
    #[serde(rename = "virtual")]
    pub virtual_drivers: VirtualConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Messages buffered per observer before new ones are dropped.
    pub observer_buffer: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub lookback_minutes: u32,
    pub duplicate_guard_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub enabled: bool,
}

/// Optional overrides, one table per category.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CategoriesConfig {
    pub display: CategoryOverrides,
    pub computer: CategoryOverrides,
    pub light: CategoryOverrides,
    pub projector: CategoryOverrides,
}

/// Fields left out keep the built-in default of the category.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CategoryOverrides {
    pub lock_secs: Option<u64>,
    pub reconcile_interval_secs: Option<u64>,
    pub pending_timeout_secs: Option<u64>,
    pub command_timeout_secs: Option<u64>,
    pub status_timeout_secs: Option<u64>,
    pub verify_on_secs: Option<u64>,
    pub verify_on_retry_secs: Option<u64>,
    pub verify_off_secs: Option<u64>,
    pub verify_off_retry_secs: Option<u64>,
    pub unreachable_is_off: Option<bool>,
}

impl CategoryOverrides {
    fn apply(&self, mut profile: CategoryProfile) -> CategoryProfile {
        let secs = |value: Option<u64>, current: Duration| value.map_or(current, Duration::from_secs);
        profile.lock_duration = secs(self.lock_secs, profile.lock_duration);
        profile.reconcile_interval = secs(self.reconcile_interval_secs, profile.reconcile_interval);
        profile.pending_timeout = secs(self.pending_timeout_secs, profile.pending_timeout);
        profile.command_timeout = secs(self.command_timeout_secs, profile.command_timeout);
        profile.status_timeout = secs(self.status_timeout_secs, profile.status_timeout);
        profile.verify_on = VerifyDelays {
            first: secs(self.verify_on_secs, profile.verify_on.first),
            retry: secs(self.verify_on_retry_secs, profile.verify_on.retry),
        };
        profile.verify_off = VerifyDelays {
            first: secs(self.verify_off_secs, profile.verify_off.first),
            retry: secs(self.verify_off_retry_secs, profile.verify_off.retry),
        };
        if let Some(value) = self.unreachable_is_off {
            profile.unreachable_is_off = value;
        }
        profile
    }
}

/// A device declared in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    pub category: String,
    pub address: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub mac: Option<String>,
}

impl DeviceConfig {
    fn to_device(&self) -> Result<Device, ConfigError> {
        let invalid = |err: &dyn std::fmt::Display| {
            ConfigError::Validation(format!("device {:?}: {err}", self.name))
        };
        let category = Category::from_str(&self.category).map_err(|err| invalid(&err))?;
        Device::builder()
            .name(&self.name)
            .category(category)
            .address(&self.address)
            .credentials(Credentials {
                username: self.username.clone(),
                password: self.password.clone(),
                mac: self.mac.clone(),
            })
            .build()
            .map_err(|err| invalid(&err.detail()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct VirtualConfig {
    /// Route every category to a simulated driver.
    pub enabled: bool,
    pub warm_up_secs: u64,
    pub cool_down_secs: u64,
}

impl Config {
    /// Load configuration from `powerhub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("powerhub.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("POWERHUB_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("POWERHUB_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("POWERHUB_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("POWERHUB_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("POWERHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.notifications.observer_buffer == 0 {
            return Err(ConfigError::Validation(
                "notifications.observer_buffer must be non-zero".to_string(),
            ));
        }
        for (category, profile) in self.profiles().iter() {
            let durations = [
                ("lock_secs", profile.lock_duration),
                ("reconcile_interval_secs", profile.reconcile_interval),
                ("pending_timeout_secs", profile.pending_timeout),
                ("command_timeout_secs", profile.command_timeout),
                ("status_timeout_secs", profile.status_timeout),
                ("verify_on_secs", profile.verify_on.first),
                ("verify_on_retry_secs", profile.verify_on.retry),
                ("verify_off_secs", profile.verify_off.first),
                ("verify_off_retry_secs", profile.verify_off.retry),
            ];
            if let Some((field, _)) = durations.iter().find(|(_, d)| d.is_zero()) {
                return Err(ConfigError::Validation(format!(
                    "categories.{category}.{field} must be non-zero"
                )));
            }
        }
        self.seed_devices().map(|_| ())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Built-in profiles with the configured overrides applied.
    #[must_use]
    pub fn profiles(&self) -> CategoryProfiles {
        let mut profiles = CategoryProfiles::default();
        for category in Category::ALL {
            let overrides = match category {
                Category::Display => &self.categories.display,
                Category::Computer => &self.categories.computer,
                Category::Light => &self.categories.light,
                Category::Projector => &self.categories.projector,
            };
            let profile = overrides.apply(profiles.get(category).clone());
            profiles.set(category, profile);
        }
        profiles
    }

    #[must_use]
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            lookback_minutes: self.scheduler.lookback_minutes,
            duplicate_guard: Duration::from_secs(self.scheduler.duplicate_guard_secs),
        }
    }

    #[must_use]
    pub fn virtual_settings(&self) -> VirtualSettings {
        VirtualSettings {
            lag: Lag {
                warm_up: Duration::from_secs(self.virtual_drivers.warm_up_secs),
                cool_down: Duration::from_secs(self.virtual_drivers.cool_down_secs),
            },
            ..VirtualSettings::default()
        }
    }

    /// The `[[devices]]` entries as domain devices.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an unknown category or a
    /// blank name or address.
    pub fn seed_devices(&self) -> Result<Vec<Device>, ConfigError> {
        self.devices.iter().map(DeviceConfig::to_device).collect()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:powerhub.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "powerhubd=info,powerhub=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            observer_buffer: DEFAULT_OBSERVER_BUFFER,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let defaults = SchedulerSettings::default();
        Self {
            enabled: true,
            lookback_minutes: defaults.lookback_minutes,
            duplicate_guard_secs: defaults.duplicate_guard.as_secs(),
        }
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for VirtualConfig {
    fn default() -> Self {
        let defaults = VirtualSettings::default();
        Self {
            enabled: true,
            warm_up_secs: defaults.lag.warm_up.as_secs(),
            cool_down_secs: defaults.lag.cool_down.as_secs(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
