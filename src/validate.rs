// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Server-name validation against the security policy.
//!
//! A requested name passes through a fixed rejection ladder: empty check,
//! IP-literal rejection, IDN-to-ASCII normalization, format rules (length
//! and charset), the compiled deny-pattern set, and finally the approved
//! allow-list (default deny). The IP check runs before the charset rule, so
//! an IPv6 literal (whose `:` would otherwise trip the format check) is
//! still rejected with the IP-specific reason. No allow-list entry can
//! bypass the IP or deny-pattern checks.

use regex::Regex;
use std::collections::HashSet;
use std::net::IpAddr;

use crate::error::ValidationError;

/// The approved NTP servers. Any name not on this list is rejected.
pub const APPROVED_SERVERS: &[&str] = &[
    // Global public servers
    "pool.ntp.org",
    "time.google.com",
    "time.cloudflare.com",
    "time.nist.gov",
    "time.windows.com",
    "time.apple.com",
    "ntp.ubuntu.com",
    // Regional pools
    "0.pool.ntp.org",
    "1.pool.ntp.org",
    "2.pool.ntp.org",
    "3.pool.ntp.org",
    "north-america.pool.ntp.org",
    "europe.pool.ntp.org",
    "asia.pool.ntp.org",
    "oceania.pool.ntp.org",
    "south-america.pool.ntp.org",
    "africa.pool.ntp.org",
    // US pools
    "0.us.pool.ntp.org",
    "1.us.pool.ntp.org",
    "2.us.pool.ntp.org",
    "3.us.pool.ntp.org",
    // EU pools
    "0.europe.pool.ntp.org",
    "1.europe.pool.ntp.org",
    "2.europe.pool.ntp.org",
    "3.europe.pool.ntp.org",
];

/// Combined deny pattern, matched against the normalized (lower-case) name.
///
/// Blocks the `.ru`/`.su`/`.by`/`.kz` TLDs (as interior or final labels) and
/// a set of specific untrusted services. Checked before the allow-list.
const BLOCKED_PATTERN: &str =
    r"(?i)(?:\.(?:ru|su|by|kz)(?:\.|$)|(?:^|\.)(?:ru\.|belarus|kremlin|yandex|mail\.ru|vk\.com))";

/// Charset and structure rule for the ASCII form of a server name.
const NAME_FORMAT: &str = r"^[a-zA-Z0-9._-]+$";

/// Maximum length of the ASCII form (RFC 1035 name limit).
const MAX_NAME_LEN: usize = 255;

/// A validated server name.
///
/// Carries the ASCII-normalized form used for display and fetching, and the
/// normalized key (lower-cased, trimmed, single trailing dot stripped) used
/// for cache lookups so differently-spelled forms of one server share an
/// entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerName {
    host: String,
    key: String,
}

impl ServerName {
    /// The ASCII form, for display and network queries.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The normalized form, for cache keys and allow-list comparison.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// The security policy: allow-list plus deny-pattern set.
#[derive(Clone, Debug)]
pub struct ServerPolicy {
    approved: HashSet<String>,
    blocked: Regex,
    name_format: Regex,
}

impl Default for ServerPolicy {
    fn default() -> Self {
        ServerPolicy::new()
    }
}

impl ServerPolicy {
    /// Create the policy from the built-in allow-list and deny patterns.
    ///
    /// # Panics
    ///
    /// Panics if the built-in patterns fail to compile, which cannot happen
    /// for the shipped constants.
    pub fn new() -> Self {
        ServerPolicy {
            approved: APPROVED_SERVERS.iter().map(|s| s.to_string()).collect(),
            blocked: Regex::new(BLOCKED_PATTERN).expect("deny pattern must compile"),
            name_format: Regex::new(NAME_FORMAT).expect("name format pattern must compile"),
        }
    }

    /// Validate a requested server name against the policy.
    ///
    /// Returns the validated [`ServerName`] or the first rejection reason in
    /// ladder order. Rejections are terminal: nothing later in the ladder can
    /// override an earlier rejection.
    pub fn validate(&self, raw: &str) -> Result<ServerName, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty);
        }

        // Direct IPs are rejected unconditionally, before any list lookup.
        if let Ok(ip) = trimmed.parse::<IpAddr>() {
            let kind = match ip {
                IpAddr::V4(_) => "IPv4",
                IpAddr::V6(_) => "IPv6",
            };
            return Err(ValidationError::DirectIp { kind });
        }

        let host = idna::domain_to_ascii(trimmed).map_err(|_| ValidationError::InvalidEncoding)?;
        if host.len() > MAX_NAME_LEN || !self.name_format.is_match(&host) {
            return Err(ValidationError::InvalidFormat);
        }

        let lower = host.to_lowercase();
        let key = lower.strip_suffix('.').unwrap_or(&lower).to_string();

        if self.blocked.is_match(&key) {
            return Err(ValidationError::BlockedPattern { server: host });
        }
        if !self.approved.contains(&key) {
            return Err(ValidationError::NotApproved { server: host });
        }

        Ok(ServerName { host, key })
    }
}
