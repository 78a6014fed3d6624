use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Seconds of inactivity before a room is eligible for reaping
    #[serde(default = "default_room_idle_timeout_secs")]
    pub room_idle_timeout_secs: u64,

    /// Seconds between idle-room sweep passes
    #[serde(default = "default_room_sweep_interval_secs")]
    pub room_sweep_interval_secs: u64,

    /// Hard timeout for a single code execution, in seconds
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,

    /// Scratch directory for code execution; system temp dir when unset
    pub exec_work_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Inactivity threshold beyond which a room is reaped
    pub fn room_idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.room_idle_timeout_secs as i64)
    }

    /// Interval between sweep passes of the idle reaper
    pub fn room_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.room_sweep_interval_secs)
    }

    /// Hard ceiling on a single code execution
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    /// Scratch directory for execution workspaces
    pub fn exec_work_dir(&self) -> PathBuf {
        self.exec_work_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            room_idle_timeout_secs: default_room_idle_timeout_secs(),
            room_sweep_interval_secs: default_room_sweep_interval_secs(),
            exec_timeout_secs: default_exec_timeout_secs(),
            exec_work_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_room_idle_timeout_secs() -> u64 {
    // 24 hours
    86_400
}

fn default_room_sweep_interval_secs() -> u64 {
    3_600
}

fn default_exec_timeout_secs() -> u64 {
    5
}
