//! Server configuration.
//!
//! Built once at startup from the process environment (optionally seeded from a
//! `.env` file by `dotenvy`) and shared read-only with every handler.

// Copyright (c) 2025 Jak Bracegirdle
//
// This file is part of the speedscan crate.
//
// Licensed under the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <http://opensource.org/licenses/MIT>, at your option.
// This file may not be copied, modified, or distributed except according to those terms.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::payload::MAX_CHUNK_SIZE;

pub const MIB: u64 = 1024 * 1024;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3360;
pub const DEFAULT_DOWNLOAD_SIZE_MB: u64 = 50;
pub const DEFAULT_UPLOAD_TEST_SECONDS: u64 = 5;
pub const DEFAULT_PING_TESTS: u32 = 10;
pub const DEFAULT_PACKET_LOSS_TESTS: u32 = 20;
pub const DEFAULT_PACKET_LOSS_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_GEO_API_URL: &str = "https://ipapi.co";
pub const DEFAULT_GEO_TIMEOUT_SECS: u64 = 3;

/// Immutable settings for one server process.
///
/// The server itself only reads `download_bytes`, `chunk_size`, `geo_api_url`
/// and `geo_timeout`. The remaining fields describe how a client should run the
/// test and are published verbatim through `GET /config`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    /// Exact body length served by `/download`.
    pub download_bytes: u64,
    /// Largest chunk handed to the transport while streaming.
    pub chunk_size: usize,
    pub upload_duration: Duration,
    pub ping_count: u32,
    pub packet_loss_probes: u32,
    pub packet_loss_timeout: Duration,
    pub geo_api_url: String,
    pub geo_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            download_bytes: DEFAULT_DOWNLOAD_SIZE_MB * MIB,
            chunk_size: MAX_CHUNK_SIZE,
            upload_duration: Duration::from_secs(DEFAULT_UPLOAD_TEST_SECONDS),
            ping_count: DEFAULT_PING_TESTS,
            packet_loss_probes: DEFAULT_PACKET_LOSS_TESTS,
            packet_loss_timeout: Duration::from_millis(DEFAULT_PACKET_LOSS_TIMEOUT_MS),
            geo_api_url: DEFAULT_GEO_API_URL.to_string(),
            geo_timeout: Duration::from_secs(DEFAULT_GEO_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Reads the configuration from environment variables, falling back to the
    /// defaults for anything unset.
    ///
    /// A variable that is set but cannot be parsed is an error rather than a
    /// silent fallback.
    ///
    /// # Examples
    ///
    /// ```
    /// # use speedscan::Config;
    /// let config = Config::from_env().unwrap();
    /// assert!(config.chunk_size <= 1024 * 1024);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let download_mb = env_or("DOWNLOAD_SIZE_MB", DEFAULT_DOWNLOAD_SIZE_MB)?;
        let download_bytes = download_mb
            .checked_mul(MIB)
            .ok_or_else(|| ConfigError::invalid("DOWNLOAD_SIZE_MB", download_mb))?;

        let chunk_size = env_or("CHUNK_SIZE_BYTES", defaults.chunk_size)?;
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::OutOfRange {
                var: "CHUNK_SIZE_BYTES",
                value: chunk_size.to_string(),
                expected: "1..=1048576",
            });
        }

        let geo_timeout_secs = env_or("GEO_TIMEOUT_SECS", DEFAULT_GEO_TIMEOUT_SECS)?;
        if geo_timeout_secs == 0 {
            return Err(ConfigError::OutOfRange {
                var: "GEO_TIMEOUT_SECS",
                value: geo_timeout_secs.to_string(),
                expected: "at least 1",
            });
        }

        let ping_count = env_or("PING_TESTS", defaults.ping_count)?;
        if ping_count == 0 {
            return Err(ConfigError::OutOfRange {
                var: "PING_TESTS",
                value: ping_count.to_string(),
                expected: "at least 1",
            });
        }

        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: env_or("BIND_PORT", defaults.port)?,
            download_bytes,
            chunk_size,
            upload_duration: Duration::from_secs(env_or(
                "UPLOAD_TEST_SECONDS",
                DEFAULT_UPLOAD_TEST_SECONDS,
            )?),
            ping_count,
            packet_loss_probes: env_or("PACKET_LOSS_TESTS", defaults.packet_loss_probes)?,
            packet_loss_timeout: Duration::from_millis(env_or(
                "PACKET_LOSS_TIMEOUT_MS",
                DEFAULT_PACKET_LOSS_TIMEOUT_MS,
            )?),
            geo_api_url: env::var("GEO_API_URL").unwrap_or(defaults.geo_api_url),
            geo_timeout: Duration::from_secs(geo_timeout_secs),
        })
    }
}

fn env_or<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::invalid(var, raw)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::invalid(var, "<non-unicode>")),
    }
}
