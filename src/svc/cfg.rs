//! # Configuration module
//!
//! This module provide utilities and helpers to interact with the configuration

use std::{convert::TryFrom, net::SocketAddr, path::PathBuf};

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::svc::rds::client::PUBLIC_ENDPOINT;

// -----------------------------------------------------------------------------
// Constants

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8000";
pub const DEFAULT_POLL_INTERVAL: u64 = 60;
pub const DEFAULT_RETRY_INTERVAL: u64 = 10;
pub const DEFAULT_TIMEOUT: u64 = 120;

// -----------------------------------------------------------------------------
// Operator structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Operator {
    #[serde(rename = "listen")]
    pub listen: SocketAddr,
    /// seconds between two reconciliations of the same resource
    #[serde(rename = "poll_interval")]
    pub poll_interval: u64,
    /// seconds before a failed reconciliation is retried
    #[serde(rename = "retry_interval")]
    pub retry_interval: u64,
    /// seconds a single reconciliation is allowed to last
    #[serde(rename = "timeout")]
    pub timeout: u64,
}

// -----------------------------------------------------------------------------
// Rds structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Rds {
    #[serde(rename = "endpoint")]
    pub endpoint: String,
}

// -----------------------------------------------------------------------------
// Jaeger structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Jaeger {
    #[serde(rename = "endpoint")]
    pub endpoint: String,
}

// -----------------------------------------------------------------------------
// ConfigurationError enum

#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error("failed to load configuration, {0}")]
    Build(ConfigError),
    #[error("failed to deserialize configuration, {0}")]
    Cast(ConfigError),
    #[error("failed to set default for key '{0}', {1}")]
    Default(String, ConfigError),
}

// -----------------------------------------------------------------------------
// Configuration structures

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Configuration {
    #[serde(rename = "operator")]
    pub operator: Operator,
    #[serde(rename = "rds")]
    pub rds: Rds,
    #[serde(rename = "jaeger", default, skip_serializing_if = "Option::is_none")]
    pub jaeger: Option<Jaeger>,
}

impl TryFrom<PathBuf> for Configuration {
    type Error = ConfigurationError;

    #[cfg_attr(feature = "trace", tracing::instrument)]
    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        Self::builder()?
            .add_source(File::from(path).required(true))
            .add_source(environment())
            .build()
            .map_err(ConfigurationError::Build)?
            .try_deserialize()
            .map_err(ConfigurationError::Cast)
    }
}

impl Configuration {
    /// returns a configuration builder filled with defaults
    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigurationError> {
        let defaults: [(&str, config::Value); 5] = [
            ("operator.listen", DEFAULT_LISTEN.into()),
            ("operator.poll_interval", DEFAULT_POLL_INTERVAL.into()),
            ("operator.retry_interval", DEFAULT_RETRY_INTERVAL.into()),
            ("operator.timeout", DEFAULT_TIMEOUT.into()),
            ("rds.endpoint", PUBLIC_ENDPOINT.into()),
        ];

        defaults
            .into_iter()
            .try_fold(Config::builder(), |builder, (key, value)| {
                builder
                    .set_default(key, value)
                    .map_err(|err| ConfigurationError::Default(key.to_string(), err))
            })
    }

    #[cfg_attr(feature = "trace", tracing::instrument)]
    pub fn try_default() -> Result<Self, ConfigurationError> {
        let mut paths = vec![
            PathBuf::from(format!("/usr/share/{}/config", env!("CARGO_PKG_NAME"))),
            PathBuf::from(format!("/etc/{}/config", env!("CARGO_PKG_NAME"))),
        ];

        if let Ok(home) = std::env::var("HOME") {
            paths.push(PathBuf::from(format!(
                "{}/.config/{}/config",
                home,
                env!("CARGO_PKG_NAME")
            )));

            paths.push(PathBuf::from(format!(
                "{}/.local/share/{}/config",
                home,
                env!("CARGO_PKG_NAME")
            )));
        }

        paths.push(PathBuf::from("config"));

        paths
            .into_iter()
            .fold(Self::builder()?, |builder, path| {
                builder.add_source(File::from(path).required(false))
            })
            .add_source(environment())
            .build()
            .map_err(ConfigurationError::Build)?
            .try_deserialize()
            .map_err(ConfigurationError::Cast)
    }

    /// log the loaded configuration, secrets are not part of it
    pub fn help(&self) {
        info!(
            listen = %self.operator.listen,
            poll_interval = self.operator.poll_interval,
            retry_interval = self.operator.retry_interval,
            timeout = self.operator.timeout,
            endpoint = &self.rds.endpoint,
            jaeger = ?self.jaeger.as_ref().map(|jaeger| &jaeger.endpoint),
            "Configuration loaded",
        );
    }
}

/// returns the environment source, variables look like
/// `RDS_OPERATOR_OPERATOR__POLL_INTERVAL`
fn environment() -> Environment {
    Environment::with_prefix(&env!("CARGO_PKG_NAME").replace('-', "_"))
        .prefix_separator("_")
        .separator("__")
}
