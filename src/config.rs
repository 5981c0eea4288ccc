use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::LivePulseError;

const ENV_PREFIX: &str = "LIVEPULSE_";
const ENV_SPLIT: &str = "__";
const CONFIG_FILENAME: &str = "config.toml";
const DB_FILENAME: &str = "livepulse.db";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub livepulse: String,
    pub http: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const LIVEPULSE_LEVEL: &str = "info";
    const HTTP_LEVEL: &str = "warn";

    /// flexi_logger spec string. `http` covers the client stack under the prober.
    pub fn log_spec(&self) -> String {
        format!(
            "warn, livepulse={}, reqwest={}, hyper={}",
            self.livepulse, self.http, self.http
        )
    }

    fn ensure_valid(&mut self) {
        self.livepulse = Self::valid_level("livepulse", &self.livepulse, Self::LIVEPULSE_LEVEL);
        self.http = Self::valid_level("http", &self.http, Self::HTTP_LEVEL);
    }

    fn valid_level(name: &str, level: &str, default: &str) -> String {
        let normalized = level.trim().to_ascii_lowercase();
        if Self::LOG_LEVELS.contains(&normalized.as_str()) {
            normalized
        } else {
            eprintln!(
                "Config error: {} log level of '{}' is invalid - using default of '{}'",
                name, level, default
            );
            default.to_owned()
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            livepulse: Self::LIVEPULSE_LEVEL.to_string(),
            http: Self::HTTP_LEVEL.to_string(),
        }
    }
}

/// Polling cadence as written by the user. Use [`PollingConfig::intervals`]
/// for the effective values.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PollingConfig {
    pub interval_hours: f64,
    pub interval_seconds: i64,
    pub jitter_seconds: i64,
}

impl PollingConfig {
    const DEFAULT_INTERVAL_SECONDS: i64 = 30;

    /// Hours win over seconds when positive; non-positive values fall back to
    /// the 30 second default. Base is at least one second.
    pub fn intervals(&self) -> PollInterval {
        let base = if self.interval_hours > 0.0 {
            (self.interval_hours * 3600.0) as i64
        } else if self.interval_seconds > 0 {
            self.interval_seconds
        } else {
            Self::DEFAULT_INTERVAL_SECONDS
        };

        PollInterval {
            base_seconds: base.max(1) as u64,
            jitter_seconds: self.jitter_seconds.max(0) as u64,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            interval_hours: 0.0,
            interval_seconds: Self::DEFAULT_INTERVAL_SECONDS,
            jitter_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollInterval {
    pub base_seconds: u64,
    pub jitter_seconds: u64,
}

impl PollInterval {
    pub fn sample_sleep(&self) -> Duration {
        self.sample_sleep_with(&mut rand::thread_rng())
    }

    pub fn sample_sleep_with<R: Rng>(&self, rng: &mut R) -> Duration {
        let jitter = if self.jitter_seconds > 0 {
            rng.gen_range(0..=self.jitter_seconds)
        } else {
            0
        };
        Duration::from_secs(self.base_seconds + jitter)
    }
}

impl fmt::Display for PollInterval {
    /// Base interval only, e.g. `1d 2h 3m 4s`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.base_seconds;
        let parts = [
            (secs / 86_400, "d"),
            ((secs % 86_400) / 3_600, "h"),
            ((secs % 3_600) / 60, "m"),
            (secs % 60, "s"),
        ];

        let text: Vec<String> = parts
            .iter()
            .filter(|(value, _)| *value > 0)
            .map(|(value, unit)| format!("{}{}", value, unit))
            .collect();

        if text.is_empty() {
            write!(f, "0s")
        } else {
            write!(f, "{}", text.join(" "))
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl ProbeConfig {
    const DEFAULT_BASE_URL: &str = "https://www.youtube.com";
    const DEFAULT_TIMEOUT_SECONDS: u64 = 15;

    fn ensure_valid(&mut self) {
        if self.timeout_seconds == 0 {
            eprintln!(
                "Config error: probe timeout of 0 is invalid - using default of {}",
                Self::DEFAULT_TIMEOUT_SECONDS
            );
            self.timeout_seconds = Self::DEFAULT_TIMEOUT_SECONDS;
        }
        if self.base_url.trim().is_empty() {
            self.base_url = Self::DEFAULT_BASE_URL.to_owned();
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout_seconds: Self::DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub logging: LoggingConfig,
    pub polling: PollingConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub probe: ProbeConfig,
}

impl Config {
    pub fn defaults_for(data_dir: &Path) -> Self {
        Config {
            logging: LoggingConfig::default(),
            polling: PollingConfig::default(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                path: data_dir.join(DB_FILENAME).to_string_lossy().into_owned(),
            },
            probe: ProbeConfig::default(),
        }
    }

    /// Loads the configuration from a TOML file, layered over defaults and
    /// under `LIVEPULSE_*` environment overrides (`LIVEPULSE_POLLING__JITTER_SECONDS=5`).
    /// If the file is missing or fails to parse, defaults are used.
    /// Additionally, writes the default config to disk if no file exists.
    pub fn load_config(config_path: &Path, data_dir: &Path) -> Self {
        let default_config = Self::defaults_for(data_dir);

        if !config_path.exists() {
            write_default_config(config_path, &default_config);
        }

        let figment = Figment::from(Serialized::defaults(default_config.clone()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX).split(ENV_SPLIT));

        // Attempt to extract the configuration; on error, log a message and fall back to defaults.
        let mut config = figment.extract().unwrap_or_else(|err| {
            eprintln!(
                "Could not load config file {}: {}. Using default configuration.",
                config_path.display(),
                err
            );
            default_config
        });

        config.ensure_valid();

        config
    }

    fn ensure_valid(&mut self) {
        self.logging.ensure_valid();
        self.probe.ensure_valid();
    }
}

fn write_default_config(config_path: &Path, config: &Config) {
    if let Some(parent) = config_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!(
                "Failed to create configuration directory {}: {}",
                parent.display(),
                e
            );
        }
    }
    match toml::to_string_pretty(config) {
        Ok(toml_string) => {
            if let Err(e) = fs::write(config_path, toml_string) {
                eprintln!(
                    "Failed to write default config to {}: {}",
                    config_path.display(),
                    e
                );
            }
        }
        Err(_) => eprintln!("Failed to serialize default config."),
    }
}

pub fn project_dirs() -> Result<ProjectDirs, LivePulseError> {
    ProjectDirs::from("", "", "livepulse")
        .ok_or_else(|| LivePulseError::Error("Failed to determine data directory".into()))
}

pub fn get_config_path(project_dirs: &ProjectDirs) -> PathBuf {
    project_dirs.data_local_dir().join(CONFIG_FILENAME)
}

/// Supplies the polling cadence. Consulted once at the top of every cycle.
pub trait PollingSource: Send + Sync {
    fn polling(&self) -> PollingConfig;
}

/// Fixed cadence, for one-shot runs and tests.
impl PollingSource for PollingConfig {
    fn polling(&self) -> PollingConfig {
        self.clone()
    }
}

/// Re-reads the `[polling]` section from disk (and the environment) on each
/// call, so edits take effect on the next cycle without a restart.
pub struct FilePollingSource {
    config_path: PathBuf,
}

impl FilePollingSource {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }
}

impl PollingSource for FilePollingSource {
    fn polling(&self) -> PollingConfig {
        Figment::from(Serialized::default("polling", PollingConfig::default()))
            .merge(Toml::file(&self.config_path))
            .merge(Env::prefixed(ENV_PREFIX).split(ENV_SPLIT))
            .extract_inner("polling")
            .unwrap_or_else(|err| {
                warn!(
                    "Could not read polling settings from {}: {}. Using defaults.",
                    self.config_path.display(),
                    err
                );
                PollingConfig::default()
            })
    }
}
