use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::chat::protocol::DEFAULT_MAX_CONTENT_LENGTH;

/// Environment variable prefix, e.g. `ACTIVITY_CHAT_PORT`.
/// Nested keys use `__`: `ACTIVITY_CHAT_CHAT__MAX_CONTENT_LENGTH`.
pub const ENV_PREFIX: &str = "ACTIVITY_CHAT_";

/// Command-line flags. Only flags that were actually given are layered
/// over the file and environment.
#[derive(Parser, Serialize, Clone, Debug, Default)]
#[command(name = "activity-chat", version, about = "Activity meetup server with real-time group chat")]
pub struct Cli {
    /// Port to listen on
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Path to TOML config file
    #[arg(long, env = "ACTIVITY_CHAT_CONFIG", default_value = "./activity-chat.toml")]
    #[serde(skip)]
    pub config: String,

    /// Enable structured JSON logging
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_logs: Option<bool>,

    /// Seed the default interest categories at startup
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_interests: Option<bool>,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip)]
    pub generate_config: bool,
}

/// Resolved server configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub json_logs: bool,
    pub seed_interests: bool,

    /// Chat settings (loaded from [chat] section in TOML)
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Configuration for the activity chat channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum message length in characters (default: 4000)
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

fn default_max_content_length() -> usize {
    DEFAULT_MAX_CONTENT_LENGTH
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_address: "0.0.0.0".to_string(),
            json_logs: false,
            seed_interests: true,
            chat: ChatConfig::default(),
        }
    }
}

impl Config {
    /// Layered sources, lowest precedence first:
    /// built-in defaults < TOML file < env vars (ACTIVITY_CHAT_*) < CLI args
    pub fn figment(cli: &Cli) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&cli.config))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
            .merge(Serialized::defaults(cli))
    }

    pub fn load(cli: &Cli) -> Result<Self, figment::Error> {
        Self::figment(cli).extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Activity chat server configuration
# Place this file at ./activity-chat.toml or specify with --config <path>
# All settings can be overridden via environment variables (ACTIVITY_CHAT_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 5000)
# port = 5000

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging
# json_logs = false

# Seed the twelve default interest categories on startup
# seed_interests = true

# ---- Activity chat ----
# [chat]

# Maximum message length in characters
# max_content_length = 4000
"#
    .to_string()
}
