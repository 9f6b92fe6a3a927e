// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

/*!
Guarded NTP time retrieval.

Given a requested time-source name, the service validates it against a
security policy (IDN normalization, IP-literal rejection, deny patterns, an
approved allow-list), enforces a sliding-window rate ceiling, serves a
bounded-freshness LRU cache when possible, otherwise queries the server over
SNTP with bounded exponential-backoff retries, and falls back to local
wall-clock time on any failure. Every request terminates in a structured
report string; no error reaches the caller.

# Example

```rust,no_run
use ntp_guard::{ServiceConfig, TimeService};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Reads NTP_SERVER (default "pool.ntp.org") and TZ from the environment.
    let mut service = TimeService::new(ServiceConfig::from_env());
    println!("{}", service.get_current_time().await);
}
```

A successful report looks like:

```text
Date:2024-01-15
Time:10:50:45
Timezone:UTC
NTP Server:time.cloudflare.com
Source:NTP
```

When the NTP query exhausts its retries, the service answers from the local
clock instead, tagging the report `Source:LOCAL SYSTEM (NTP unavailable: ...)`
with the classified failure reason.
*/

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Bounded LRU response cache with lazy TTL expiry.
pub mod cache;
/// Service configuration and environment loading.
pub mod config;
/// Error types for every pipeline stage.
pub mod error;
/// Async NTP fetching with bounded retry, behind the [`TimeSource`] seam.
pub mod fetch;
/// Minimal SNTP packet handling and NTP/Unix timestamp conversion.
pub mod protocol;
/// Sliding-window request-rate ceiling.
pub mod rate_limit;
/// Time report construction, timezone resolution, and rendering.
pub mod report;
/// The request orchestrator.
pub mod service;
/// Server-name validation against the security policy.
pub mod validate;

pub use cache::{CacheConfig, ResponseCache};
pub use config::ServiceConfig;
pub use error::{ClockError, FetchError, TimezoneError, ValidationError};
pub use fetch::{FetchConfig, NtpFetcher, TimeSource};
pub use protocol::UnixInstant;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use report::{ReportSource, TimeReport};
pub use service::TimeService;
pub use validate::{APPROVED_SERVERS, ServerName, ServerPolicy};
