mod application;

pub use application::ApplicationConfig;

use dashmap::DashMap;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::{KeystoneError, Result};

/// Key/value configuration seeded from the process environment.
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    /// A service without environment values, for tests and explicit setups.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }
}

/// Bootstrap options for an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationOptions {
    pub global_prefix: String,
    pub host: String,
    pub port: u16,
}

impl Default for ApplicationOptions {
    fn default() -> Self {
        Self {
            global_prefix: String::new(),
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ApplicationOptions {
    /// Reads `KEYSTONE_GLOBAL_PREFIX`, `HOST` and `PORT`.
    pub fn from_config(config: &ConfigService) -> Result<Self> {
        let defaults = Self::default();
        let port = match config.get("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| KeystoneError::Internal(format!("invalid PORT value: {port}")))?,
            None => defaults.port,
        };
        Ok(Self {
            global_prefix: config.get_or("KEYSTONE_GLOBAL_PREFIX", &defaults.global_prefix),
            host: config.get_or("HOST", &defaults.host),
            port,
        })
    }

    pub fn with_global_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.global_prefix = prefix.into();
        self
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| KeystoneError::Internal(format!("invalid address {}:{}", self.host, self.port)))
    }
}
