// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Service configuration.
//!
//! [`ServiceConfig`] groups the per-component settings with the two
//! process-level request inputs: the requested server name (`NTP_SERVER`)
//! and the requested timezone (`TZ`). The service is single-request by
//! contract, so the config is a plain owned struct read at construction;
//! there is no runtime-update handle.

use std::env;

use crate::cache::CacheConfig;
use crate::fetch::FetchConfig;
use crate::rate_limit::RateLimitConfig;

/// Environment key naming the requested NTP server.
pub const SERVER_ENV_KEY: &str = "NTP_SERVER";

/// Environment key naming the requested timezone.
pub const TIMEZONE_ENV_KEY: &str = "TZ";

/// The server queried when `NTP_SERVER` is unset.
pub const DEFAULT_SERVER: &str = "pool.ntp.org";

/// Configuration for the whole service.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Requested NTP server name (raw input; validated per request).
    pub server: String,
    /// Requested timezone name, or `None` for the system-local zone.
    pub timezone: Option<String>,
    /// Rate limiter settings.
    pub rate_limit: RateLimitConfig,
    /// Response cache settings.
    pub cache: CacheConfig,
    /// Fetcher settings.
    pub fetch: FetchConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            server: DEFAULT_SERVER.to_string(),
            timezone: None,
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load the request inputs from the process environment.
    ///
    /// `NTP_SERVER` defaults to [`DEFAULT_SERVER`] when unset; an empty or
    /// whitespace-only value is kept as-is so validation reports it rather
    /// than silently substituting the default. An unset or empty `TZ` means
    /// the system-local zone.
    pub fn from_env() -> Self {
        let server = env::var(SERVER_ENV_KEY)
            .unwrap_or_else(|_| DEFAULT_SERVER.to_string())
            .trim()
            .to_string();
        let timezone = env::var(TIMEZONE_ENV_KEY).ok().filter(|tz| !tz.is_empty());
        ServiceConfig {
            server,
            timezone,
            ..ServiceConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.server, "pool.ntp.org");
        assert_eq!(config.timezone, None);
        assert_eq!(config.rate_limit.max_requests_per_window, 60);
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.fetch.max_attempts, 3);
    }
}
