use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::kind::KindTable;
use super::revision::RevisionPlan;

/// Main configuration structure for meshward
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Mesh CLI executable invoked for every command
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Seconds between bootstrap probe attempts while the control plane is unreachable
    #[serde(default = "default_bootstrap_interval_secs")]
    pub bootstrap_interval_secs: u64,

    /// Seconds before a failed requeueable command is sent again
    #[serde(default = "default_requeue_delay_secs")]
    pub requeue_delay_secs: u64,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Kind to identity-field mapping
    #[serde(default)]
    pub kinds: KindTable,

    /// Expected revisions per tenant
    #[serde(default)]
    pub revisions: RevisionPlan,
}

fn default_executable() -> String {
    "greymatter".to_string()
}

const fn default_bootstrap_interval_secs() -> u64 {
    10
}

const fn default_requeue_delay_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            bootstrap_interval_secs: default_bootstrap_interval_secs(),
            requeue_delay_secs: default_requeue_delay_secs(),
            logging: LoggingConfig::default(),
            kinds: KindTable::default(),
            revisions: RevisionPlan::default(),
        }
    }
}

impl Config {
    pub const fn bootstrap_interval(&self) -> Duration {
        Duration::from_secs(self.bootstrap_interval_secs)
    }

    pub const fn requeue_delay(&self) -> Duration {
        Duration::from_secs(self.requeue_delay_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rotated log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
