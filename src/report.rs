// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Time report construction and rendering.
//!
//! A [`TimeReport`] is immutable once built: the orchestrator renders it to
//! the wire format exactly once and caches the rendered string, never the
//! struct.

use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;

use crate::error::{ClockError, TimezoneError};
use crate::protocol::UnixInstant;

/// Resolve a timezone name against the IANA tz database.
pub fn resolve_timezone(name: &str) -> Result<Tz, TimezoneError> {
    name.parse::<Tz>().map_err(|_| TimezoneError {
        name: name.to_string(),
    })
}

/// Where a report's time values came from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReportSource {
    /// Values fetched from the named NTP server.
    Ntp {
        /// The queried server's validated name.
        server: String,
    },
    /// Values read from the local system clock after NTP failed.
    LocalSystem {
        /// The classified NTP failure that forced the fallback.
        reason: String,
    },
}

/// The externally visible result: calendar fields plus provenance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimeReport {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Time of day, `HH:MM:SS`.
    pub time: String,
    /// Timezone label (abbreviation or offset).
    pub timezone: String,
    /// Provenance of the values.
    pub source: ReportSource,
}

/// Render the calendar fields of a zoned datetime.
fn calendar_parts<T: TimeZone>(dt: &DateTime<T>) -> (String, String, String)
where
    T::Offset: fmt::Display,
{
    (
        dt.format("%Y-%m-%d").to_string(),
        dt.format("%H:%M:%S").to_string(),
        dt.format("%Z").to_string(),
    )
}

impl TimeReport {
    /// Build a report from an NTP-fetched instant.
    ///
    /// The instant is converted to the requested zone, or to the system's
    /// local zone when none was requested.
    pub(crate) fn from_instant(
        instant: UnixInstant,
        tz: Option<Tz>,
        server: &str,
    ) -> Result<TimeReport, ClockError> {
        let utc = Utc
            .timestamp_opt(instant.secs(), instant.subsec_nanos())
            .single()
            .ok_or_else(|| ClockError(format!("timestamp {} out of range", instant.secs())))?;

        let (date, time, timezone) = match tz {
            Some(tz) => calendar_parts(&utc.with_timezone(&tz)),
            None => calendar_parts(&utc.with_timezone(&Local)),
        };
        Ok(TimeReport {
            date,
            time,
            timezone,
            source: ReportSource::Ntp {
                server: server.to_string(),
            },
        })
    }

    /// Build a fallback report from the local system clock.
    pub(crate) fn from_local_clock(
        tz: Option<Tz>,
        reason: String,
    ) -> Result<TimeReport, ClockError> {
        let now = UnixInstant::now().map_err(|e| ClockError(format!("system clock: {e}")))?;
        let utc = Utc
            .timestamp_opt(now.secs(), now.subsec_nanos())
            .single()
            .ok_or_else(|| ClockError(format!("timestamp {} out of range", now.secs())))?;

        let (date, time, timezone) = match tz {
            Some(tz) => calendar_parts(&utc.with_timezone(&tz)),
            None => calendar_parts(&utc.with_timezone(&Local)),
        };
        Ok(TimeReport {
            date,
            time,
            timezone,
            source: ReportSource::LocalSystem { reason },
        })
    }

    /// Render the report to its wire format.
    ///
    /// NTP-sourced reports carry the server line; fallback reports carry the
    /// failure reason instead.
    pub fn render(&self) -> String {
        match &self.source {
            ReportSource::Ntp { server } => format!(
                "Date:{}\nTime:{}\nTimezone:{}\nNTP Server:{}\nSource:NTP",
                self.date, self.time, self.timezone, server
            ),
            ReportSource::LocalSystem { reason } => format!(
                "Date:{}\nTime:{}\nTimezone:{}\nSource:LOCAL SYSTEM (NTP unavailable: {})",
                self.date, self.time, self.timezone, reason
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-15 10:50:45 UTC.
    const INSTANT: i64 = 1_705_315_845;

    #[test]
    fn test_resolve_known_timezone() {
        assert!(resolve_timezone("UTC").is_ok());
        assert!(resolve_timezone("America/New_York").is_ok());
        assert!(resolve_timezone("Europe/Berlin").is_ok());
    }

    #[test]
    fn test_resolve_unknown_timezone() {
        let err = resolve_timezone("Mars/Phobos").unwrap_err();
        assert_eq!(err.name, "Mars/Phobos");
    }

    #[test]
    fn test_ntp_report_in_utc() {
        let tz = resolve_timezone("UTC").unwrap();
        let report = TimeReport::from_instant(
            UnixInstant::new(INSTANT, 0),
            Some(tz),
            "time.cloudflare.com",
        )
        .unwrap();
        assert_eq!(report.date, "2024-01-15");
        assert_eq!(report.time, "10:50:45");
        assert_eq!(report.timezone, "UTC");
    }

    #[test]
    fn test_zone_conversion_shifts_date() {
        // Midnight UTC on Jan 15 is still Jan 14 in New York (EST, -5).
        let tz = resolve_timezone("America/New_York").unwrap();
        let report =
            TimeReport::from_instant(UnixInstant::new(1_705_276_800, 0), Some(tz), "pool.ntp.org")
                .unwrap();
        assert_eq!(report.date, "2024-01-14");
        assert_eq!(report.time, "19:00:00");
        assert_eq!(report.timezone, "EST");
    }

    #[test]
    fn test_render_ntp_format() {
        let report = TimeReport {
            date: "2024-01-15".to_string(),
            time: "10:50:45".to_string(),
            timezone: "UTC".to_string(),
            source: ReportSource::Ntp {
                server: "time.cloudflare.com".to_string(),
            },
        };
        assert_eq!(
            report.render(),
            "Date:2024-01-15\nTime:10:50:45\nTimezone:UTC\nNTP Server:time.cloudflare.com\nSource:NTP"
        );
    }

    #[test]
    fn test_render_fallback_format() {
        let report = TimeReport {
            date: "2024-01-15".to_string(),
            time: "10:50:45".to_string(),
            timezone: "UTC".to_string(),
            source: ReportSource::LocalSystem {
                reason: "NTP timeout after 5s".to_string(),
            },
        };
        let rendered = report.render();
        assert!(rendered.ends_with("Source:LOCAL SYSTEM (NTP unavailable: NTP timeout after 5s)"));
        assert!(!rendered.contains("NTP Server:"));
    }

    #[test]
    fn test_local_clock_report() {
        let tz = resolve_timezone("UTC").unwrap();
        let report = TimeReport::from_local_clock(Some(tz), "boom".to_string()).unwrap();
        assert_eq!(report.timezone, "UTC");
        assert!(matches!(report.source, ReportSource::LocalSystem { .. }));
    }

    #[test]
    fn test_out_of_range_timestamp() {
        let err =
            TimeReport::from_instant(UnixInstant::new(i64::MAX, 0), None, "pool.ntp.org")
                .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
