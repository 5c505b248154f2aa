//! Command-line and environment configuration source.

use clap::Parser;

use crate::config::schema::{
    ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, TimeoutConfig,
};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Round-robin HTTP load balancer.
#[derive(Debug, Parser)]
#[command(name = "rr-balancer", version, about, long_about = None)]
pub struct Cli {
    /// Address to bind the listener on.
    #[arg(long, env = "LB_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "LB_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Upstream base URL; repeat or comma-separate for several, in rotation order.
    #[arg(short, long = "upstream", env = "LB_UPSTREAMS", value_delimiter = ',')]
    pub upstreams: Vec<String>,

    /// Outbound connect timeout in seconds.
    #[arg(long, env = "LB_CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    pub connect_timeout_secs: u64,

    /// Time allowed for an upstream to answer, in seconds.
    #[arg(long, env = "LB_RELAY_TIMEOUT_SECS", default_value_t = 30)]
    pub relay_timeout_secs: u64,

    /// Log level.
    #[arg(long, env = "LB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, env = "LB_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Build and validate the configuration.
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let config = ProxyConfig {
            listener: ListenerConfig {
                host: self.host,
                port: self.port,
            },
            upstreams: self
                .upstreams
                .into_iter()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect(),
            timeouts: TimeoutConfig {
                connect_secs: self.connect_timeout_secs,
                relay_secs: self.relay_timeout_secs,
            },
            observability: ObservabilityConfig {
                log_level: self.log_level,
                log_format: self.log_format,
            },
        };

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
