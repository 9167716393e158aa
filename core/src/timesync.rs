//! TimeSync: periodic wall-clock fetch, reported to the log only
//!
//! The fetched time is formatted and logged; it is not written to any
//! device clock.

use embassy_time::Timer;

use crate::calendar::LocalDateTime;
use crate::log::{LogSink, message};
use crate::network::{NetworkLink, OnceAssociated};
use crate::schedule::{Cycle, TIME_SYNC_INTERVAL};

/// Fixed offset applied to UTC before formatting
pub const TZ_OFFSET_HOURS: i8 = -7;

/// Network time source
#[allow(async_fn_in_trait)]
pub trait TimeSource {
    type Error: core::fmt::Debug;

    /// Current UTC time in seconds since the Unix epoch
    async fn now_unix(&mut self) -> Result<u64, Self::Error>;
}

/// Fetch, format and log the current time once
pub async fn sync_once<S, L>(source: &mut S, log: &L) -> Result<LocalDateTime, S::Error>
where
    S: TimeSource,
    L: LogSink,
{
    log.info("Syncing time...").await;
    match source.now_unix().await {
        Ok(unix_secs) => {
            let local = LocalDateTime::from_unix(unix_secs, TZ_OFFSET_HOURS);
            log.info(&message(format_args!("Time synchronized: {}", local)))
                .await;
            Ok(local)
        }
        Err(e) => {
            log.error(&message(format_args!("Failed to sync time:{:?}", e)))
                .await;
            Err(e)
        }
    }
}

/// Time sync task state; the source is built on first association
pub struct TimeSync<N, F, S> {
    source: OnceAssociated<N, F, S>,
}

impl<N, F, S> TimeSync<N, F, S>
where
    N: NetworkLink,
    F: FnOnce() -> S,
    S: TimeSource,
{
    pub fn new(link: N, connect: F) -> Self {
        Self {
            source: OnceAssociated::new(link, connect),
        }
    }

    /// One step: wait for the network, or sync once
    pub async fn step<L: LogSink>(&mut self, log: &L) -> Cycle<Result<LocalDateTime, S::Error>> {
        match self.source.ready() {
            Some(source) => Cycle::Ran(sync_once(source, log).await),
            None => Cycle::AwaitingNetwork,
        }
    }

    pub async fn run<L: LogSink>(mut self, log: &L) -> ! {
        loop {
            let cycle = self.step(log).await;
            Timer::after(cycle.next_delay(TIME_SYNC_INTERVAL)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Severity;
    use crate::log::testing::RecordingLog;
    use core::cell::Cell;
    use embassy_futures::block_on;

    struct SwitchLink(Cell<bool>);

    impl NetworkLink for SwitchLink {
        fn is_associated(&self) -> bool {
            self.0.get()
        }
    }

    struct FakeClock<'a> {
        fetches: &'a Cell<usize>,
        result: Result<u64, &'static str>,
    }

    impl TimeSource for FakeClock<'_> {
        type Error = &'static str;

        async fn now_unix(&mut self) -> Result<u64, Self::Error> {
            self.fetches.set(self.fetches.get() + 1);
            self.result
        }
    }

    #[test]
    fn test_no_fetch_before_association() {
        let link = SwitchLink(Cell::new(false));
        let fetches = Cell::new(0);
        let log = RecordingLog::default();
        let mut sync = TimeSync::new(&link, || FakeClock {
            fetches: &fetches,
            result: Ok(1_704_067_200),
        });

        for _ in 0..5 {
            assert_eq!(block_on(sync.step(&log)), Cycle::AwaitingNetwork);
        }
        assert_eq!(fetches.get(), 0);
        assert!(log.entries.borrow().is_empty());

        link.0.set(true);
        let cycle = block_on(sync.step(&log));
        assert_eq!(fetches.get(), 1);
        assert_eq!(cycle.next_delay(TIME_SYNC_INTERVAL), TIME_SYNC_INTERVAL);
    }

    #[test]
    fn test_success_logs_syncing_and_synchronized() {
        let fetches = Cell::new(0);
        let log = RecordingLog::default();
        let mut clock = FakeClock {
            fetches: &fetches,
            result: Ok(1_704_067_200),
        };

        let local = block_on(sync_once(&mut clock, &log)).unwrap();
        assert_eq!((local.year, local.month, local.day), (2023, 12, 31));
        assert_eq!(
            log.messages(Severity::Info),
            ["Syncing time...", "Time synchronized: 2023-12-31 17:00:00"]
        );
    }

    #[test]
    fn test_failure_logs_error_and_keeps_going() {
        let link = SwitchLink(Cell::new(true));
        let fetches = Cell::new(0);
        let log = RecordingLog::default();
        let mut sync = TimeSync::new(&link, || FakeClock {
            fetches: &fetches,
            result: Err("timeout"),
        });

        assert_eq!(block_on(sync.step(&log)), Cycle::Ran(Err("timeout")));
        assert_eq!(block_on(sync.step(&log)), Cycle::Ran(Err("timeout")));
        assert_eq!(fetches.get(), 2);
        assert_eq!(
            log.messages(Severity::Error),
            [
                "Failed to sync time:\"timeout\"",
                "Failed to sync time:\"timeout\"",
            ]
        );
        assert_eq!(log.messages(Severity::Info), ["Syncing time...", "Syncing time..."]);
    }
}
