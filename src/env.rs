use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub server: ServerSettings,
    pub redis: RedisSettings,
    pub channels: ChannelSettings,
    pub coordinator: CoordinatorSettings,
    pub directory: DirectorySettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Load environment-specific file (e.g., development.toml, production.toml)
            .add_source(
                File::with_name(&format!("config/{}", run_mode))
                    .format(FileFormat::Toml)
                    .required(true),
            )
            // Add environment variables (e.g., APP_SERVER__LOG_LEVEL=debug)
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub directory: String,
    pub filename: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisSettings {
    pub max_reconnect_attempts: u32,
    pub max_reconnect_delay_ms: u64,
    pub initial_reconnect_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChannelSettings {
    /// Channel the routing proxy publishes player intents on.
    pub inbound: String,
    /// Channel the backend game servers listen on.
    pub backend: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CoordinatorSettings {
    pub queue_key: String,
    pub points_key: String,
    /// Backend servers eligible for queue-open broadcasts.
    pub whitelist: Vec<String>,
    /// Server that hosts the arena matches.
    pub primary_server: String,
    /// Server players are returned to when a game is canceled.
    pub lobby_server: String,
    pub autostart_tick_interval_seconds: u64,
    /// Delay between the auto-start broadcast and the queue closing.
    pub autostart_close_delay_seconds: u64,
    /// Grace period between a force start and the queue closing.
    pub force_start_grace_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DirectorySettings {
    pub base_url: String,
    pub request_timeout_seconds: u64,
}
