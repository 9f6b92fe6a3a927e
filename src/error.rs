// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Error types for the guarded time service.
//!
//! Each pipeline stage has its own error class: [`ValidationError`] for the
//! server-name policy, [`FetchError`] for the NTP query (with retryability
//! classification), [`TimezoneError`] for timezone resolution, and
//! [`ClockError`] for the last-resort local clock read. No stage's error
//! crosses the orchestrator boundary: every one is rendered into a report
//! string for the caller.

use std::fmt;
use std::io;
use std::time::Duration;

/// Rejection reasons produced by server-name validation.
///
/// The `Display` text of the security-relevant variants is user-facing: the
/// orchestrator embeds it verbatim in `Security Error:` reports. Messages
/// describe the policy, never internal state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValidationError {
    /// The name was empty or whitespace-only.
    Empty,
    /// International-domain-to-ASCII conversion failed.
    InvalidEncoding,
    /// The ASCII form is too long or contains characters outside `[a-zA-Z0-9._-]`.
    InvalidFormat,
    /// The name parses as an IP literal; direct IPs are never allowed.
    DirectIp {
        /// `"IPv4"` or `"IPv6"`, for the rejection message.
        kind: &'static str,
    },
    /// The name matches the compiled security deny-pattern set.
    BlockedPattern {
        /// The offending name (ASCII form).
        server: String,
    },
    /// The name is not on the approved allow-list (default deny).
    NotApproved {
        /// The rejected name (ASCII form).
        server: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Empty => write!(f, "server name cannot be empty"),
            ValidationError::InvalidEncoding => {
                write!(f, "invalid server name encoding (IDN conversion failed)")
            }
            ValidationError::InvalidFormat => write!(f, "invalid server name format"),
            ValidationError::DirectIp { kind } => {
                write!(
                    f,
                    "direct IP addresses not allowed for security reasons (detected {kind} address)"
                )
            }
            ValidationError::BlockedPattern { server } => {
                write!(f, "server '{server}' blocked: matches security pattern")
            }
            ValidationError::NotApproved { server } => {
                write!(
                    f,
                    "server '{server}' not in approved list (security policy: default deny)"
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Failures of the external NTP query.
///
/// Protocol, network, and timeout failures are retryable; unexpected
/// failures are not (the retry loop stops immediately on those).
#[derive(Debug)]
pub enum FetchError {
    /// NTP protocol violation (malformed packet, wrong mode, bad timestamps).
    Protocol(String),
    /// Socket or DNS failure.
    Network(io::Error),
    /// No response within the per-attempt timeout.
    Timeout {
        /// The per-attempt timeout that elapsed.
        timeout: Duration,
    },
    /// Anything outside the classified categories. Not retried.
    Unexpected(String),
}

impl FetchError {
    /// Whether the retry loop should try again after this failure.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Unexpected(_))
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Protocol(msg) => write!(f, "NTP protocol error: {msg}"),
            FetchError::Network(e) => write!(f, "network error: {e}"),
            FetchError::Timeout { timeout } => {
                write!(f, "NTP timeout after {}s", timeout.as_secs())
            }
            FetchError::Unexpected(msg) => write!(f, "unexpected error: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Network(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FetchError {
    fn from(err: io::Error) -> FetchError {
        FetchError::Network(err)
    }
}

/// A timezone name that the tz database does not know.
///
/// Reported directly to the caller; the requested zone is never silently
/// substituted with another one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimezoneError {
    /// The unrecognized timezone name.
    pub name: String,
}

impl fmt::Display for TimezoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown time zone: {}", self.name)
    }
}

impl std::error::Error for TimezoneError {}

/// Failure to read or render local wall-clock time.
///
/// This is the only condition with no further fallback; the orchestrator
/// turns it into a bare error report.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClockError(pub String);

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ClockError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        assert_eq!(
            ValidationError::Empty.to_string(),
            "server name cannot be empty"
        );
        assert_eq!(
            ValidationError::InvalidFormat.to_string(),
            "invalid server name format"
        );
        let e = ValidationError::DirectIp { kind: "IPv4" };
        assert_eq!(
            e.to_string(),
            "direct IP addresses not allowed for security reasons (detected IPv4 address)"
        );
        let e = ValidationError::NotApproved {
            server: "evil.example".to_string(),
        };
        assert!(e.to_string().contains("default deny"));
    }

    #[test]
    fn test_fetch_error_display() {
        let e = FetchError::Timeout {
            timeout: Duration::from_secs(5),
        };
        assert_eq!(e.to_string(), "NTP timeout after 5s");
        let e = FetchError::Protocol("server transmit timestamp is zero".to_string());
        assert_eq!(
            e.to_string(),
            "NTP protocol error: server transmit timestamp is zero"
        );
    }

    #[test]
    fn test_fetch_error_retryability() {
        assert!(FetchError::Protocol("x".to_string()).is_retryable());
        assert!(FetchError::Network(io::Error::new(io::ErrorKind::Other, "x")).is_retryable());
        assert!(
            FetchError::Timeout {
                timeout: Duration::from_secs(5)
            }
            .is_retryable()
        );
        assert!(!FetchError::Unexpected("x".to_string()).is_retryable());
    }

    #[test]
    fn test_timezone_error_display() {
        let e = TimezoneError {
            name: "Mars/Phobos".to_string(),
        };
        assert_eq!(e.to_string(), "unknown time zone: Mars/Phobos");
    }

    #[test]
    fn test_from_io_error() {
        let e: FetchError = io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into();
        assert!(matches!(e, FetchError::Network(_)));
    }
}
