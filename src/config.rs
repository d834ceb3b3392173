// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Server settings: defaults overlaid with `NVX_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::rpc::DEFAULT_REQUEST_TIMEOUT;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 27436;

pub const ENV_HOST: &str = "NVX_HOST";
pub const ENV_PORT: &str = "NVX_PORT";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "NVX_REQUEST_TIMEOUT_MS";
pub const ENV_MANIFEST_PATH: &str = "NVX_MANIFEST_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid {name} value {value:?}: {reason}")]
    InvalidEnv { name: String, value: String, reason: String },
}

impl ConfigError {
    fn invalid(name: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidEnv { name: name.to_owned(), value: value.to_owned(), reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub manifest_path: Option<PathBuf>,
    pub server_version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            manifest_path: None,
            server_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_vars(std::env::vars())
    }

    /// Defaults overlaid with any recognised variables; empty values are ignored.
    pub fn from_env_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (name, value) in vars {
            let (name, value) = (name.as_ref(), value.as_ref().trim());
            if value.is_empty() {
                continue;
            }
            match name {
                ENV_HOST => config.host = value.to_owned(),
                ENV_PORT => {
                    config.port = match value.parse::<u16>() {
                        Ok(0) => {
                            return Err(ConfigError::invalid(name, value, "port must be non-zero"))
                        }
                        Ok(port) => port,
                        Err(err) => return Err(ConfigError::invalid(name, value, err.to_string())),
                    };
                }
                ENV_REQUEST_TIMEOUT_MS => {
                    let millis = value
                        .parse::<u64>()
                        .map_err(|err| ConfigError::invalid(name, value, err.to_string()))?;
                    if millis == 0 {
                        return Err(ConfigError::invalid(name, value, "timeout must be positive"));
                    }
                    config.request_timeout = Duration::from_millis(millis);
                }
                ENV_MANIFEST_PATH => config.manifest_path = Some(PathBuf::from(value)),
                _ => {}
            }
        }
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.bind_address())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{ConfigError, ServerConfig, DEFAULT_PORT};

    #[test]
    fn defaults_without_env() {
        let config = ServerConfig::from_env_vars(Vec::<(String, String)>::new()).expect("config");
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.base_url(), "http://127.0.0.1:27436");
    }

    #[test]
    fn overrides_apply() {
        let config = ServerConfig::from_env_vars([
            ("NVX_HOST", "0.0.0.0"),
            ("NVX_PORT", "9000"),
            ("NVX_REQUEST_TIMEOUT_MS", "2500"),
            ("NVX_MANIFEST_PATH", "/tmp/nvx/manifest.json"),
            ("UNRELATED", "x"),
        ])
        .expect("config");

        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
        assert_eq!(config.manifest_path, Some(PathBuf::from("/tmp/nvx/manifest.json")));
    }

    #[test]
    fn blank_values_keep_defaults() {
        let config = ServerConfig::from_env_vars([("NVX_PORT", "  ")]).expect("config");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[rstest]
    #[case("NVX_PORT", "http")]
    #[case("NVX_PORT", "0")]
    #[case("NVX_PORT", "70000")]
    #[case("NVX_REQUEST_TIMEOUT_MS", "-5")]
    #[case("NVX_REQUEST_TIMEOUT_MS", "0")]
    fn invalid_values_are_errors(#[case] name: &str, #[case] value: &str) {
        let err = ServerConfig::from_env_vars([(name, value)]).unwrap_err();
        let ConfigError::InvalidEnv { name: got, .. } = err;
        assert_eq!(got, name);
    }
}
