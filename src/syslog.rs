//! Device log: defmt locally, syslog over UDP remotely

use baro_core::config::SyslogConfig;
use baro_core::log::{LogSink, Severity};
use baro_core::syslog::{DatagramTransport, FRAME_CAPACITY, ResolveBackoff, SyslogClient};
use defmt::{Format, debug, error, info, warn};
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpAddress, IpEndpoint, Stack};
use embassy_time::{Duration, Instant, with_timeout};
use static_cell::StaticCell;

/// Queued datagrams before `send_to` has to wait
const TX_PACKETS: usize = 4;

/// Upper bound on one collector name lookup
const DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// UDP transport errors
#[derive(Debug, Clone, Copy, Format)]
pub enum UdpError {
    /// No IP configuration yet
    NoNetwork,
    /// Collector host did not resolve
    Dns,
    /// Failed to bind local port
    Bind,
    /// Failed to queue the datagram
    Send,
}

struct SocketBuffers {
    rx_meta: [PacketMetadata; 1],
    rx: [u8; 16],
    tx_meta: [PacketMetadata; TX_PACKETS],
    tx: [u8; TX_PACKETS * FRAME_CAPACITY],
}

static SOCKET_BUFFERS: StaticCell<SocketBuffers> = StaticCell::new();
static DEVICE_LOG: StaticCell<DeviceLog> = StaticCell::new();

/// Long-lived UDP socket towards the collector
pub struct UdpSyslog {
    stack: Stack<'static>,
    socket: UdpSocket<'static>,
    host: &'static str,
    port: u16,
    resolved: Option<IpAddress>,
    backoff: ResolveBackoff,
}

impl UdpSyslog {
    fn new(stack: Stack<'static>, host: &'static str, port: u16) -> Result<Self, UdpError> {
        let SocketBuffers {
            rx_meta,
            rx,
            tx_meta,
            tx,
        } = SOCKET_BUFFERS.init(SocketBuffers {
            rx_meta: [PacketMetadata::EMPTY; 1],
            rx: [0; 16],
            tx_meta: [PacketMetadata::EMPTY; TX_PACKETS],
            tx: [0; TX_PACKETS * FRAME_CAPACITY],
        });
        let mut socket = UdpSocket::new(stack, rx_meta, rx, tx_meta, tx);
        socket.bind(0).map_err(|e| {
            warn!("Syslog UDP bind failed: {:?}", e);
            UdpError::Bind
        })?;

        Ok(Self {
            stack,
            socket,
            host,
            port,
            resolved: None,
            backoff: ResolveBackoff::new(),
        })
    }

    async fn resolve(&mut self) -> Result<IpAddress, UdpError> {
        if let Some(addr) = self.resolved {
            return Ok(addr);
        }
        if let Ok(v4) = self.host.parse::<core::net::Ipv4Addr>() {
            let addr = IpAddress::Ipv4(v4);
            self.resolved = Some(addr);
            return Ok(addr);
        }
        if !self.backoff.may_resolve(Instant::now()) {
            return Err(UdpError::Dns);
        }

        let query = self.stack.dns_query(self.host, DnsQueryType::A);
        let addr = match with_timeout(DNS_TIMEOUT, query).await {
            Ok(Ok(addrs)) => addrs.first().copied(),
            _ => None,
        };
        let Some(addr) = addr else {
            self.backoff.failed(Instant::now());
            return Err(UdpError::Dns);
        };
        self.backoff.succeeded();
        self.resolved = Some(addr);
        Ok(addr)
    }
}

impl DatagramTransport for UdpSyslog {
    type Error = UdpError;

    async fn send(&mut self, datagram: &[u8]) -> Result<(), Self::Error> {
        if !self.stack.is_config_up() {
            return Err(UdpError::NoNetwork);
        }
        let addr = self.resolve().await?;
        self.socket
            .send_to(datagram, IpEndpoint::new(addr, self.port))
            .await
            .map_err(|_| {
                // Re-resolve next time in case the collector moved
                self.resolved = None;
                UdpError::Send
            })
    }
}

/// Log sink shared by every task
pub struct DeviceLog {
    syslog: SyslogClient<UdpSyslog>,
}

impl LogSink for DeviceLog {
    async fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Emergency | Severity::Alert | Severity::Critical | Severity::Error => {
                error!("{}", message)
            }
            Severity::Warning => warn!("{}", message),
            Severity::Notice | Severity::Info => info!("{}", message),
            Severity::Debug => debug!("{}", message),
        }
        self.syslog.log(severity, message).await;
    }
}

/// Build the process-wide log sink.
///
/// With remote logging disabled no socket is created at all.
pub fn init(stack: Stack<'static>, config: &SyslogConfig<'static>) -> &'static DeviceLog {
    let transport = if config.enabled {
        info!("Syslog enabled: {}:{}", config.server, config.port);
        UdpSyslog::new(stack, config.server, config.port).ok()
    } else {
        info!("Syslog disabled");
        None
    };

    DEVICE_LOG.init(DeviceLog {
        syslog: SyslogClient::new(transport),
    })
}
