//! BSD-style syslog over an unreliable datagram transport
//!
//! Frames are `<PRI>message` with `PRI = facility * 8 + severity`, the
//! minimal form accepted by rsyslog and syslog-ng. Everything is sent with
//! the `user` facility.

use core::fmt::Write;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Instant};
use heapless::String;

use crate::log::{LogSink, MESSAGE_CAPACITY, Severity, Truncating};

/// Frame capacity: `<15>` plus the message
pub const FRAME_CAPACITY: usize = MESSAGE_CAPACITY + 4;

/// Syslog `user` facility code
const FACILITY_USER: u8 = 1;

/// Pause before looking up a collector name that failed to resolve
pub const RESOLVE_RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Encoded datagram
pub type Frame = String<FRAME_CAPACITY>;

/// Build the datagram for one message
pub fn encode_frame(severity: Severity, message: &str) -> Frame {
    let mut frame = Truncating(Frame::new());
    let priority = FACILITY_USER * 8 + severity.code();
    let _ = write!(frame, "<{}>{}", priority, message);
    frame.0
}

/// Fire-and-forget datagram sender
#[allow(async_fn_in_trait)]
pub trait DatagramTransport {
    type Error: core::fmt::Debug;

    async fn send(&mut self, datagram: &[u8]) -> Result<(), Self::Error>;
}

/// Syslog client; a client built without a transport drops everything
pub struct SyslogClient<T> {
    transport: Option<Mutex<CriticalSectionRawMutex, T>>,
}

impl<T: DatagramTransport> SyslogClient<T> {
    /// `None` disables remote logging entirely
    pub fn new(transport: Option<T>) -> Self {
        Self {
            transport: transport.map(Mutex::new),
        }
    }
}

impl<T: DatagramTransport> LogSink for SyslogClient<T> {
    async fn log(&self, severity: Severity, message: &str) {
        let Some(transport) = &self.transport else {
            return;
        };
        let frame = encode_frame(severity, message);
        // Transport failures are dropped, logging never fails the caller
        let _ = transport.lock().await.send(frame.as_bytes()).await;
    }
}

/// Rate limit for collector name lookups.
///
/// The transport is locked while it resolves, so an unresolvable name
/// would otherwise stall every log call for a full DNS timeout.
#[derive(Debug, Default)]
pub struct ResolveBackoff {
    retry_at: Option<Instant>,
}

impl ResolveBackoff {
    pub const fn new() -> Self {
        Self { retry_at: None }
    }

    /// Whether a lookup may be attempted at `now`
    pub fn may_resolve(&self, now: Instant) -> bool {
        self.retry_at.is_none_or(|at| now >= at)
    }

    pub fn failed(&mut self, now: Instant) {
        self.retry_at = Some(now + RESOLVE_RETRY_INTERVAL);
    }

    pub fn succeeded(&mut self) {
        self.retry_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Clone, Default)]
    struct FakeUdp {
        sent: Rc<RefCell<Vec<Vec<u8>>>>,
        fail: bool,
    }

    impl DatagramTransport for FakeUdp {
        type Error = ();

        async fn send(&mut self, datagram: &[u8]) -> Result<(), Self::Error> {
            if self.fail {
                return Err(());
            }
            self.sent.borrow_mut().push(datagram.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_frame_priorities() {
        assert_eq!(
            encode_frame(Severity::Info, "Syncing time...").as_str(),
            "<14>Syncing time..."
        );
        assert_eq!(encode_frame(Severity::Error, "boom").as_str(), "<11>boom");
        assert_eq!(encode_frame(Severity::Debug, "x").as_str(), "<15>x");
    }

    #[test]
    fn test_long_message_fills_frame() {
        let long = "x".repeat(MESSAGE_CAPACITY);
        let frame = encode_frame(Severity::Debug, &long);
        assert_eq!(frame.len(), FRAME_CAPACITY);
        assert!(frame.starts_with("<15>xxx"));
    }

    #[test]
    fn test_enabled_client_sends_datagram() {
        let udp = FakeUdp::default();
        let sent = udp.sent.clone();
        let client = SyslogClient::new(Some(udp));

        block_on(client.info("Data sent to InfluxDB successfully!"));
        assert_eq!(
            sent.borrow().as_slice(),
            [b"<14>Data sent to InfluxDB successfully!".to_vec()]
        );
    }

    #[test]
    fn test_disabled_client_never_sends() {
        let udp = FakeUdp::default();
        let sent = udp.sent.clone();
        let enabled = false;
        let client = SyslogClient::new(enabled.then_some(udp));

        block_on(client.error("Failed to sync time:timeout"));
        block_on(client.info("Syncing time..."));
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn test_transport_error_is_swallowed() {
        let udp = FakeUdp {
            fail: true,
            ..Default::default()
        };
        let sent = udp.sent.clone();
        let client = SyslogClient::new(Some(udp));

        block_on(client.error("BMP180 sensor error:nack"));
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn test_failed_lookup_is_not_retried_until_interval_passes() {
        let start = Instant::from_secs(100);
        let mut backoff = ResolveBackoff::new();
        assert!(backoff.may_resolve(start));

        backoff.failed(start);
        assert!(!backoff.may_resolve(start));
        assert!(!backoff.may_resolve(start + Duration::from_secs(59)));
        assert!(backoff.may_resolve(start + RESOLVE_RETRY_INTERVAL));

        backoff.failed(start + RESOLVE_RETRY_INTERVAL);
        backoff.succeeded();
        assert!(backoff.may_resolve(start + RESOLVE_RETRY_INTERVAL));
    }
}
