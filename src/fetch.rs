// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Async NTP time fetching with bounded retry.
//!
//! [`NtpFetcher`] performs one UDP query per attempt under a hard per-attempt
//! timeout, classifies failures via [`FetchError`], and retries retryable
//! classes with exponential backoff. The orchestrator consumes it through the
//! [`TimeSource`] trait, which is the seam used for network-free testing.
//!
//! This is the only component that touches the network; worst-case blocking
//! time is `max_attempts x (timeout + backoff_cap)`.

use async_trait::async_trait;
use log::{debug, warn};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{UdpSocket, lookup_host};
use tokio::time::{sleep, timeout};

use crate::error::FetchError;
use crate::protocol::{
    NTP_PORT, UnixInstant, build_client_packet, parse_server_packet, validate_server_packet,
};

/// Configuration for the NTP fetcher.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchConfig {
    /// UDP port to query.
    pub port: u16,
    /// Per-attempt timeout covering send and receive.
    pub timeout: Duration,
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles each retry.
    pub backoff_base: Duration,
    /// Ceiling for the computed backoff.
    pub backoff_cap: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            port: NTP_PORT,
            timeout: Duration::from_secs(5),
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(10),
        }
    }
}

/// A source of the current time, fallible and possibly remote.
///
/// The production implementation is [`NtpFetcher`]; tests substitute fixed
/// or failing sources.
#[async_trait]
pub trait TimeSource: Send + Sync {
    /// Fetch the current instant from the named server.
    ///
    /// Implementations own their retry policy; the caller sees only the
    /// final outcome.
    async fn fetch(&self, host: &str) -> Result<UnixInstant, FetchError>;
}

/// NTP fetcher: single-shot SNTP queries with retry and backoff.
#[derive(Clone, Debug)]
pub struct NtpFetcher {
    config: FetchConfig,
}

/// Select the bind address family matching the target address.
fn bind_addr_for(target: &SocketAddr) -> SocketAddr {
    match target {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
    }
}

impl NtpFetcher {
    /// Create a fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Self {
        NtpFetcher { config }
    }

    /// Backoff before the attempt after `attempt` failures:
    /// `min(cap, base * 2^(attempt-1))`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.config.backoff_base.saturating_mul(1 << exp);
        delay.min(self.config.backoff_cap)
    }

    /// One query: resolve, bind, send, receive under the attempt timeout,
    /// then validate the response and extract its transmit instant.
    async fn query_once(&self, host: &str) -> Result<UnixInstant, FetchError> {
        let resolved: Vec<SocketAddr> = lookup_host((host, self.config.port)).await?.collect();
        if resolved.is_empty() {
            return Err(FetchError::Network(io::Error::new(
                io::ErrorKind::InvalidInput,
                "address resolved to no socket addresses",
            )));
        }
        let target = resolved[0];

        let sock = UdpSocket::bind(bind_addr_for(&target)).await?;
        let (send_buf, t1) = build_client_packet()?;
        let mut recv_buf = [0u8; 1024];

        let exchange = async {
            let sent = sock.send_to(&send_buf, target).await?;
            debug!("sent {sent} bytes to {target}");
            Ok::<_, FetchError>(sock.recv_from(&mut recv_buf).await?)
        };
        let (recv_len, src_addr) = timeout(self.config.timeout, exchange)
            .await
            .map_err(|_| FetchError::Timeout {
                timeout: self.config.timeout,
            })??;
        debug!("received {recv_len} bytes from {src_addr}");

        // Responses must come from an address we resolved (IP only; the
        // source port may differ).
        if !resolved.iter().any(|a| a.ip() == src_addr.ip()) {
            return Err(FetchError::Protocol(
                "response from unexpected source address".to_string(),
            ));
        }

        let packet = parse_server_packet(&recv_buf, recv_len)?;
        validate_server_packet(&packet, t1)?;
        Ok(UnixInstant::from(packet.transmit_timestamp))
    }
}

#[async_trait]
impl TimeSource for NtpFetcher {
    async fn fetch(&self, host: &str) -> Result<UnixInstant, FetchError> {
        let mut attempt = 1;
        loop {
            match self.query_once(host).await {
                Ok(instant) => {
                    debug!(
                        "NTP time from {host} on attempt {attempt}: {}s",
                        instant.secs()
                    );
                    return Ok(instant);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        "NTP query to {host} failed (attempt {attempt}/{}): {e}; retrying in {delay:?}",
                        self.config.max_attempts
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        "NTP query to {host} failed on attempt {attempt}/{}: {e}",
                        self.config.max_attempts
                    );
                    return Err(e);
                }
            }
        }
    }
}

impl Default for NtpFetcher {
    fn default() -> Self {
        NtpFetcher::new(FetchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};

    fn fast_config(port: u16, max_attempts: u32) -> FetchConfig {
        FetchConfig {
            port,
            timeout: Duration::from_millis(200),
            max_attempts,
            backoff_base: Duration::from_millis(10),
            backoff_cap: Duration::from_millis(20),
        }
    }

    /// Spawn a loopback responder that echoes a valid server packet with the
    /// given NTP transmit seconds. Returns its port.
    async fn spawn_responder(transmit_secs: u32) -> u16 {
        let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = sock.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            while let Ok((len, peer)) = sock.recv_from(&mut buf).await {
                if len < 48 {
                    continue;
                }
                let mut resp = [0u8; 48];
                resp[0] = (4 << 3) | 4; // LI=0, VN=4, Mode=Server
                resp[1] = 2; // stratum
                resp[24..32].copy_from_slice(&buf[40..48]); // echo T1
                BigEndian::write_u32(&mut resp[40..44], transmit_secs);
                BigEndian::write_u32(&mut resp[44..48], 1);
                let _ = sock.send_to(&resp, peer).await;
            }
        });
        port
    }

    /// Spawn a loopback responder that replies with garbage.
    async fn spawn_garbage_responder() -> u16 {
        let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = sock.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            while let Ok((_, peer)) = sock.recv_from(&mut buf).await {
                let _ = sock.send_to(b"not ntp", peer).await;
            }
        });
        port
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let f = NtpFetcher::default();
        assert_eq!(f.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(f.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(f.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(f.backoff_delay(4), Duration::from_secs(8));
        assert_eq!(f.backoff_delay(5), Duration::from_secs(10));
        assert_eq!(f.backoff_delay(40), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_fetch_from_loopback_responder() {
        // 2024-01-15 00:00:00 UTC in NTP seconds.
        let port = spawn_responder(3_914_265_600).await;
        let fetcher = NtpFetcher::new(fast_config(port, 3));
        let instant = fetcher.fetch("127.0.0.1").await.unwrap();
        assert_eq!(instant.secs(), 1_705_276_800);
    }

    #[tokio::test]
    async fn test_fetch_times_out_when_unanswered() {
        // Hold a socket that never replies.
        let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = sock.local_addr().unwrap().port();
        let fetcher = NtpFetcher::new(fast_config(port, 2));
        let err = fetcher.fetch("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }), "got {err}");
        drop(sock);
    }

    #[tokio::test]
    async fn test_fetch_classifies_malformed_response() {
        let port = spawn_garbage_responder().await;
        let fetcher = NtpFetcher::new(fast_config(port, 1));
        let err = fetcher.fetch("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, FetchError::Protocol(_)), "got {err}");
        assert!(err.to_string().contains("too short"));
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failure() {
        // First request is answered with garbage, later ones are valid.
        let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = sock.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let mut first = true;
            while let Ok((len, peer)) = sock.recv_from(&mut buf).await {
                if first {
                    first = false;
                    let _ = sock.send_to(b"junk", peer).await;
                    continue;
                }
                if len < 48 {
                    continue;
                }
                let mut resp = [0u8; 48];
                resp[0] = (4 << 3) | 4;
                resp[1] = 2;
                resp[24..32].copy_from_slice(&buf[40..48]);
                BigEndian::write_u32(&mut resp[40..44], 3_914_265_600);
                BigEndian::write_u32(&mut resp[44..48], 1);
                let _ = sock.send_to(&resp, peer).await;
            }
        });

        let fetcher = NtpFetcher::new(fast_config(port, 3));
        let instant = fetcher.fetch("127.0.0.1").await.unwrap();
        assert_eq!(instant.secs(), 1_705_276_800);
    }
}
