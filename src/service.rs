// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! The request orchestrator.
//!
//! [`TimeService`] composes the validator, rate limiter, cache, and fetcher
//! into a linear pipeline with terminal exits:
//!
//! 1. validate the requested name (rejections consume no rate budget and
//!    the rate window never learns about them);
//! 2. admit through the rate limiter;
//! 3. serve from the cache when fresh;
//! 4. resolve the requested timezone (an unknown zone is its own error and
//!    is never substituted);
//! 5. fetch from the NTP server, render, and cache;
//! 6. on fetch failure, fall back to the local clock with the reason
//!    embedded.
//!
//! Every exit is a well-formed report string; no error crosses this
//! boundary.

use chrono_tz::Tz;
use log::{error, info, warn};
use std::time::Instant;

use crate::cache::ResponseCache;
use crate::config::ServiceConfig;
use crate::error::ValidationError;
use crate::fetch::{NtpFetcher, TimeSource};
use crate::rate_limit::RateLimiter;
use crate::report::{TimeReport, resolve_timezone};
use crate::validate::{APPROVED_SERVERS, ServerPolicy};

/// The guarded time-retrieval service.
///
/// Holds all process-wide state (rate window, cache); construct one instance
/// at process start and keep it for the process lifetime. State resets on
/// restart. Callers exposing this to concurrent tasks must add their own
/// mutual exclusion; the service assumes one in-flight request at a time.
pub struct TimeService {
    config: ServiceConfig,
    policy: ServerPolicy,
    limiter: RateLimiter,
    cache: ResponseCache,
    source: Box<dyn TimeSource>,
}

impl TimeService {
    /// Create a service backed by the real NTP fetcher.
    pub fn new(config: ServiceConfig) -> Self {
        let fetcher = NtpFetcher::new(config.fetch.clone());
        TimeService::with_source(config, Box::new(fetcher))
    }

    /// Create a service with a custom time source (used by tests).
    pub fn with_source(config: ServiceConfig, source: Box<dyn TimeSource>) -> Self {
        TimeService {
            policy: ServerPolicy::new(),
            limiter: RateLimiter::new(config.rate_limit.clone()),
            cache: ResponseCache::new(config.cache.clone()),
            source,
            config,
        }
    }

    /// Retrieve the current time using the configured server and timezone.
    ///
    /// This is the primary inbound operation; the server comes from the
    /// `NTP_SERVER` setting and the timezone from `TZ` (see
    /// [`ServiceConfig::from_env`](crate::config::ServiceConfig::from_env)).
    pub async fn get_current_time(&mut self) -> String {
        let server = self.config.server.clone();
        let timezone = self.config.timezone.clone();
        self.current_time_for(&server, timezone.as_deref()).await
    }

    /// Run the full pipeline for an explicit server name and timezone.
    pub async fn current_time_for(&mut self, requested: &str, tz_name: Option<&str>) -> String {
        // Stage 1: security validation, before anything counts against the
        // rate budget.
        let name = match self.policy.validate(requested) {
            Ok(name) => name,
            Err(ValidationError::Empty) => {
                return "Error: Server name cannot be empty".to_string();
            }
            Err(ValidationError::InvalidEncoding) => {
                return "Error: Invalid server name encoding (IDN conversion failed)".to_string();
            }
            Err(ValidationError::InvalidFormat) => {
                return "Error: Invalid server name format".to_string();
            }
            Err(reason) => {
                warn!("blocked NTP server request: {reason}");
                return format!(
                    "Security Error: {reason}\n\nPlease use one of the approved servers. \
                     Use 'list_approved_servers' to see the list."
                );
            }
        };

        // Stage 2: rate ceiling.
        if !self.limiter.admit(Instant::now()) {
            return "Error: Rate limit exceeded. Please wait before making another request."
                .to_string();
        }

        // Stage 3: fresh cached report, if any.
        if let Some(cached) = self.cache.get(name.key(), Instant::now()) {
            info!("returning cached response for {}", name.host());
            return format!("{cached}\n(cached)");
        }

        // Stage 4: the requested zone must exist; never substitute another.
        let tz: Option<Tz> = match tz_name {
            Some(requested_tz) => match resolve_timezone(requested_tz) {
                Ok(tz) => Some(tz),
                Err(_) => {
                    return format!("Error: Unknown time zone: {requested_tz}");
                }
            },
            None => None,
        };

        info!("using approved NTP server: {}", name.host());

        // Stage 5: fetch (the fetcher retries internally).
        let failure_reason = match self.source.fetch(name.host()).await {
            Ok(instant) => match TimeReport::from_instant(instant, tz, name.host()) {
                Ok(report) => {
                    let rendered = report.render();
                    info!("NTP time retrieved from {}", name.host());
                    self.cache.insert(name.key(), rendered.clone(), Instant::now());
                    return rendered;
                }
                Err(e) => format!("Unexpected error: {e}"),
            },
            Err(e) => e.to_string(),
        };

        // Stage 6: local wall-clock fallback, reason embedded.
        warn!("{failure_reason}, falling back to local time");
        match TimeReport::from_local_clock(tz, failure_reason) {
            Ok(report) => report.render(),
            Err(e) => {
                error!("failed to get time: {e}");
                format!("Error: Failed to get time - {e}")
            }
        }
    }

    /// List the approved servers with the fixed security disclaimer.
    pub fn list_approved_servers(&self) -> String {
        let servers = APPROVED_SERVERS
            .iter()
            .map(|server| format!("\u{2022} {server}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Approved NTP Servers:\n{servers}\n\n\
             Note: Untrusted domains and direct IP addresses are blocked for security."
        )
    }
}
