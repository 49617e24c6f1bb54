//! Runtime configuration.
//!
//! Every option can be given as a flag or through the matching `COLLAB_*`
//! environment variable.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

/// Entries kept per document in the chat history store.
pub const DEFAULT_CHAT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("jwt secret must be at least {min} characters long")]
    WeakJwtSecret { min: usize },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Parser, Debug, Clone)]
#[command(name = "collab-gateway")]
#[command(about = "Real-time collaboration gateway for shared documents", long_about = None)]
pub struct GatewayConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "COLLAB_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "COLLAB_PORT", default_value_t = 8080)]
    pub port: u16,

    /// HS256 secret used to verify connection tokens
    #[arg(long, env = "COLLAB_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Seconds without any inbound frame before a connection is closed
    #[arg(long, env = "COLLAB_IDLE_TIMEOUT_SECS", default_value_t = 120)]
    pub idle_timeout_secs: u64,

    /// Chat entries retained per document
    #[arg(long, env = "COLLAB_CHAT_HISTORY_LIMIT", default_value_t = DEFAULT_CHAT_HISTORY_LIMIT)]
    pub chat_history_limit: usize,

    /// Attempts per presence event before it is dropped
    #[arg(long, env = "COLLAB_PRESENCE_PUBLISH_ATTEMPTS", default_value_t = 3)]
    pub presence_publish_attempts: u32,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "COLLAB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::Zero("idle timeout"));
        }
        if self.chat_history_limit == 0 {
            return Err(ConfigError::Zero("chat history limit"));
        }
        if self.presence_publish_attempts == 0 {
            return Err(ConfigError::Zero("presence publish attempts"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
