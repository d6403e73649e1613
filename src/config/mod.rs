// Configuration module

use serde::Deserialize;

use crate::logbuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub redis_url: String,
    pub auth_token: String,
    pub launch_store_dir: String,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default = "default_scroll_threshold_px")]
    pub scroll_threshold_px: f64,
    #[serde(default = "default_stop_exit_delay_ms")]
    pub stop_exit_delay_ms: u64,
}

fn default_log_capacity() -> usize {
    logbuf::DEFAULT_CAPACITY
}

fn default_scroll_threshold_px() -> f64 {
    logbuf::DEFAULT_FOLLOW_THRESHOLD_PX
}

fn default_stop_exit_delay_ms() -> u64 {
    1500
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            auth_token: "dev-token-change-in-production".to_string(),
            launch_store_dir: ".scanwatch/launch".to_string(),
            log_capacity: default_log_capacity(),
            scroll_threshold_px: default_scroll_threshold_px(),
            stop_exit_delay_ms: default_stop_exit_delay_ms(),
        }
    }
}
