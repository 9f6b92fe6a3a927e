// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Minimal SNTP (RFC 4330) packet construction and parsing.
//!
//! Only the fields this service consumes are modeled: the mode/version/leap
//! header byte, the stratum, and the origin and transmit timestamps. The
//! response validation ladder mirrors RFC 5905 Section 8 client checks
//! (mode, origin echo, non-zero transmit timestamp).

use byteorder::{BigEndian, ByteOrder};
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use crate::error::FetchError;

/// The default NTP port.
pub const NTP_PORT: u16 = 123;

/// Size of an NTP packet header in bytes.
pub const PACKET_SIZE: usize = 48;

/// Seconds between the NTP era-0 epoch (1900-01-01) and the Unix epoch (1970-01-01).
const NTP_UNIX_OFFSET: i64 = 2_208_988_800;

/// An NTP timestamp: seconds and fraction since the NTP epoch (era-relative).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct NtpTimestamp {
    /// Seconds since 1900-01-01 (modulo the 32-bit era length).
    pub seconds: u32,
    /// Fractional seconds in units of 2^-32 s.
    pub fraction: u32,
}

impl NtpTimestamp {
    /// True if both fields are zero (an unset timestamp, RFC 5905 Section 8).
    pub fn is_zero(&self) -> bool {
        self.seconds == 0 && self.fraction == 0
    }
}

/// An instant on the Unix timeline with nanosecond precision.
///
/// Produced from the transmit timestamp of an NTP server response, or from
/// the local system clock.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnixInstant {
    secs: i64,
    nanos: u32,
}

impl UnixInstant {
    /// Create an instant from whole seconds and subsecond nanoseconds.
    pub fn new(secs: i64, nanos: u32) -> Self {
        UnixInstant { secs, nanos }
    }

    /// Read the current instant from the system clock.
    pub fn now() -> Result<Self, SystemTimeError> {
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH)?;
        Ok(UnixInstant {
            secs: elapsed.as_secs() as i64,
            nanos: elapsed.subsec_nanos(),
        })
    }

    /// Whole seconds since the Unix epoch.
    pub fn secs(&self) -> i64 {
        self.secs
    }

    /// Subsecond nanoseconds.
    pub fn subsec_nanos(&self) -> u32 {
        self.nanos
    }
}

impl From<NtpTimestamp> for UnixInstant {
    /// Convert an NTP timestamp to Unix time.
    ///
    /// Timestamps below the era-0 offset are interpreted as era 1 (after
    /// 2036-02-07), so current-time conversions keep working across the
    /// 32-bit NTP rollover.
    fn from(ts: NtpTimestamp) -> Self {
        let mut secs = ts.seconds as i64 - NTP_UNIX_OFFSET;
        if (ts.seconds as i64) < NTP_UNIX_OFFSET {
            secs += 1i64 << 32;
        }
        let nanos = ((ts.fraction as u64 * 1_000_000_000) >> 32) as u32;
        UnixInstant { secs, nanos }
    }
}

impl From<UnixInstant> for NtpTimestamp {
    fn from(instant: UnixInstant) -> Self {
        let seconds = (instant.secs + NTP_UNIX_OFFSET) as u64 as u32;
        let fraction = ((instant.nanos as u64) << 32) / 1_000_000_000;
        NtpTimestamp {
            seconds,
            fraction: fraction as u32,
        }
    }
}

/// The response fields this service reads from a server packet.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ServerPacket {
    /// Mode field (3 bits); 4 = Server.
    pub mode: u8,
    /// Leap indicator (2 bits); 3 = unsynchronized.
    pub leap_indicator: u8,
    /// Stratum; 0 = unspecified.
    pub stratum: u8,
    /// Origin timestamp: must echo our request's transmit timestamp.
    pub origin_timestamp: NtpTimestamp,
    /// Transmit timestamp: the server's send time, the value we consume.
    pub transmit_timestamp: NtpTimestamp,
}

/// Mode 3: client request.
const MODE_CLIENT: u8 = 3;
/// Mode 4: server response.
const MODE_SERVER: u8 = 4;
/// Leap indicator 3: clock unsynchronized.
const LEAP_UNKNOWN: u8 = 3;

/// Build an NTPv4 client request packet.
///
/// Sets LI=0, VN=4, Mode=Client and stamps the transmit timestamp with the
/// current time, which doubles as the origin echo (T1) for anti-replay
/// verification of the response.
///
/// Returns the serialized buffer and T1.
pub(crate) fn build_client_packet() -> Result<([u8; PACKET_SIZE], NtpTimestamp), FetchError> {
    let now = UnixInstant::now()
        .map_err(|e| FetchError::Unexpected(format!("system clock read failed: {e}")))?;
    let t1 = NtpTimestamp::from(now);

    let mut buf = [0u8; PACKET_SIZE];
    buf[0] = (4 << 3) | MODE_CLIENT;
    BigEndian::write_u32(&mut buf[40..44], t1.seconds);
    BigEndian::write_u32(&mut buf[44..48], t1.fraction);
    Ok((buf, t1))
}

/// Parse the header of a server response.
///
/// Rejects packets shorter than 48 bytes. Extension fields and MACs past the
/// header are ignored.
pub(crate) fn parse_server_packet(buf: &[u8], len: usize) -> Result<ServerPacket, FetchError> {
    if len < PACKET_SIZE {
        return Err(FetchError::Protocol(format!(
            "NTP response too short ({len} bytes)"
        )));
    }
    Ok(ServerPacket {
        mode: buf[0] & 0x07,
        leap_indicator: buf[0] >> 6,
        stratum: buf[1],
        origin_timestamp: NtpTimestamp {
            seconds: BigEndian::read_u32(&buf[24..28]),
            fraction: BigEndian::read_u32(&buf[28..32]),
        },
        transmit_timestamp: NtpTimestamp {
            seconds: BigEndian::read_u32(&buf[40..44]),
            fraction: BigEndian::read_u32(&buf[44..48]),
        },
    })
}

/// Validate a parsed server response against the request's T1.
///
/// Checks, in order: Server mode, origin timestamp echo (anti-replay),
/// non-zero transmit timestamp, and synchronized clock (LI=3 with non-zero
/// stratum is rejected).
pub(crate) fn validate_server_packet(
    packet: &ServerPacket,
    t1: NtpTimestamp,
) -> Result<(), FetchError> {
    if packet.mode != MODE_SERVER {
        return Err(FetchError::Protocol(format!(
            "unexpected response mode {} (expected Server)",
            packet.mode
        )));
    }
    if packet.origin_timestamp != t1 {
        return Err(FetchError::Protocol(
            "origin timestamp mismatch: response does not match our request".to_string(),
        ));
    }
    if packet.transmit_timestamp.is_zero() {
        return Err(FetchError::Protocol(
            "server transmit timestamp is zero".to_string(),
        ));
    }
    if packet.leap_indicator == LEAP_UNKNOWN && packet.stratum != 0 {
        return Err(FetchError::Protocol(
            "server reports unsynchronized clock".to_string(),
        ));
    }
    Ok(())
}
