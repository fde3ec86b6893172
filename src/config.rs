use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Updates never run more often than this, whatever the configuration says.
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Environment(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
}

#[derive(Deserialize, Debug, Clone)]
pub struct MonitorConfig {
    pub discord_token: String,
    pub api_token: String,

    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_status_update_seconds")]
    pub status_update_seconds: u64,

    #[serde(default = "default_monitors_file")]
    pub monitors_file: String,

    #[serde(default = "default_probe_helper_programs")]
    pub probe_helper_programs: Vec<String>,

    #[serde(default = "default_probe_helper_script")]
    pub probe_helper_script: Option<String>,

    #[serde(default = "default_probe_helper_timeout_seconds")]
    pub probe_helper_timeout_seconds: u64,

    #[serde(default = "default_status_api_url")]
    pub status_api_url: String,

    #[serde(default = "default_status_api_timeout_seconds")]
    pub status_api_timeout_seconds: u64,

    #[serde(default = "default_discord_api_url")]
    pub discord_api_url: String,

    #[serde(default = "default_discord_timeout_seconds")]
    pub discord_timeout_seconds: u64,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_locale")]
    pub locale: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialMonitorConfig {
    discord_token: Option<String>,
    api_token: Option<String>,
    listen_address: Option<String>,
    status_update_seconds: Option<u64>,
    monitors_file: Option<String>,
    probe_helper_programs: Option<Vec<String>>,
    probe_helper_script: Option<String>,
    probe_helper_timeout_seconds: Option<u64>,
    status_api_url: Option<String>,
    status_api_timeout_seconds: Option<u64>,
    discord_api_url: Option<String>,
    discord_timeout_seconds: Option<u64>,
    log_dir: Option<String>,
    locale: Option<String>,
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_status_update_seconds() -> u64 {
    10
}

fn default_monitors_file() -> String {
    "monitors.json".to_string()
}

fn default_probe_helper_programs() -> Vec<String> {
    vec!["python3".to_string(), "python".to_string()]
}

fn default_probe_helper_script() -> Option<String> {
    Some("mcstatus_query.py".to_string())
}

fn default_probe_helper_timeout_seconds() -> u64 {
    4
}

fn default_status_api_url() -> String {
    "https://api.mcsrvstat.us/2".to_string()
}

fn default_status_api_timeout_seconds() -> u64 {
    5
}

fn default_discord_api_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_discord_timeout_seconds() -> u64 {
    10
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

impl MonitorConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str).map_err(|source| ConfigError::Read {
                    path: path_str.to_string(),
                    source,
                })?;
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path_str.to_string(),
                    source,
                })?
            }
            _ => PartialMonitorConfig::default(),
        };

        // 2. Load from environment variables
        let env_config = envy::from_env::<PartialMonitorConfig>()?;

        // 3. Merge: environment overrides file
        Self::merge(env_config, file_config)
    }

    fn merge(
        env_config: PartialMonitorConfig,
        file_config: PartialMonitorConfig,
    ) -> Result<Self, ConfigError> {
        Ok(MonitorConfig {
            discord_token: env_config
                .discord_token
                .or(file_config.discord_token)
                .ok_or(ConfigError::Missing("DISCORD_TOKEN"))?,
            api_token: env_config
                .api_token
                .or(file_config.api_token)
                .ok_or(ConfigError::Missing("API_TOKEN"))?,
            listen_address: env_config
                .listen_address
                .or(file_config.listen_address)
                .unwrap_or_else(default_listen_address),
            status_update_seconds: env_config
                .status_update_seconds
                .or(file_config.status_update_seconds)
                .unwrap_or_else(default_status_update_seconds),
            monitors_file: env_config
                .monitors_file
                .or(file_config.monitors_file)
                .unwrap_or_else(default_monitors_file),
            probe_helper_programs: env_config
                .probe_helper_programs
                .or(file_config.probe_helper_programs)
                .unwrap_or_else(default_probe_helper_programs),
            probe_helper_script: env_config
                .probe_helper_script
                .or(file_config.probe_helper_script)
                .or_else(default_probe_helper_script)
                .filter(|script| !script.is_empty()),
            probe_helper_timeout_seconds: env_config
                .probe_helper_timeout_seconds
                .or(file_config.probe_helper_timeout_seconds)
                .unwrap_or_else(default_probe_helper_timeout_seconds),
            status_api_url: env_config
                .status_api_url
                .or(file_config.status_api_url)
                .unwrap_or_else(default_status_api_url),
            status_api_timeout_seconds: env_config
                .status_api_timeout_seconds
                .or(file_config.status_api_timeout_seconds)
                .unwrap_or_else(default_status_api_timeout_seconds),
            discord_api_url: env_config
                .discord_api_url
                .or(file_config.discord_api_url)
                .unwrap_or_else(default_discord_api_url),
            discord_timeout_seconds: env_config
                .discord_timeout_seconds
                .or(file_config.discord_timeout_seconds)
                .unwrap_or_else(default_discord_timeout_seconds),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            locale: env_config
                .locale
                .or(file_config.locale)
                .unwrap_or_else(default_locale),
        })
    }

    /// Tick interval with the 5 second floor applied.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.status_update_seconds).max(MIN_UPDATE_INTERVAL)
    }
}
