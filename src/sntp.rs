//! SNTP client over embassy-net UDP
//!
//! One request per sync: resolve, send, wait for a single reply.

use baro_core::ntp::{self, NTP_PORT, NtpError, PACKET_LEN};
use baro_core::timesync::TimeSource;
use defmt::{Debug2Format, Format, debug};
use embassy_futures::select::{Either, select};
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{Duration, Timer};

/// Reply timeout per request
const SNTP_TIMEOUT: Duration = Duration::from_secs(5);

/// SNTP client errors
#[derive(Debug, Clone, Copy, Format)]
pub enum SntpError {
    /// Server name did not resolve
    Dns,
    /// Socket bind, send or receive failed
    Socket,
    /// No reply within the timeout
    Timeout,
    /// Reply came from somewhere else
    UnexpectedSource,
    /// Reply failed validation
    InvalidResponse(NtpError),
}

impl From<NtpError> for SntpError {
    fn from(e: NtpError) -> Self {
        SntpError::InvalidResponse(e)
    }
}

pub struct SntpClient {
    stack: Stack<'static>,
    server: &'static str,
}

impl SntpClient {
    pub fn new(stack: Stack<'static>, server: &'static str) -> Self {
        Self { stack, server }
    }
}

impl TimeSource for SntpClient {
    type Error = SntpError;

    async fn now_unix(&mut self) -> Result<u64, Self::Error> {
        let server_ip = self
            .stack
            .dns_query(self.server, DnsQueryType::A)
            .await
            .map_err(|_| SntpError::Dns)?
            .first()
            .copied()
            .ok_or(SntpError::Dns)?;
        let endpoint = IpEndpoint::new(server_ip, NTP_PORT);
        debug!("SNTP server {} at {}", self.server, Debug2Format(&endpoint));

        let mut rx_meta = [PacketMetadata::EMPTY; 2];
        let mut rx_buffer = [0u8; 2 * PACKET_LEN];
        let mut tx_meta = [PacketMetadata::EMPTY; 1];
        let mut tx_buffer = [0u8; PACKET_LEN];
        let mut socket = UdpSocket::new(
            self.stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| SntpError::Socket)?;

        socket
            .send_to(&ntp::request(), endpoint)
            .await
            .map_err(|_| SntpError::Socket)?;

        let mut response = [0u8; PACKET_LEN];
        let recv = socket.recv_from(&mut response);
        let (len, meta) = match select(Timer::after(SNTP_TIMEOUT), recv).await {
            Either::First(_) => return Err(SntpError::Timeout),
            Either::Second(result) => result.map_err(|_| SntpError::Socket)?,
        };

        if meta.endpoint.addr != server_ip {
            return Err(SntpError::UnexpectedSource);
        }

        Ok(ntp::parse_response(&response[..len])?)
    }
}
