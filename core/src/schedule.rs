//! Fixed task intervals
//!
//! Every retry and poll uses a constant interval. There is no exponential
//! backoff or jitter.

use embassy_time::Duration;

/// Sensor read period
pub const SENSOR_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Re-check period while the radio is associated
pub const WIFI_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Wait after a failed association attempt
pub const WIFI_RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// Poll period of tasks waiting for the first association
pub const NETWORK_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Period between time synchronizations
pub const TIME_SYNC_INTERVAL: Duration = Duration::from_secs(3600);

/// Period between uploads
pub const UPLOAD_INTERVAL: Duration = Duration::from_secs(10);

/// Idle period of the owning `main` loop
pub const IDLE_INTERVAL: Duration = Duration::from_secs(1);

/// Result of one step of a task that needs the network
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cycle<T> {
    /// The link has never been up; nothing was attempted
    AwaitingNetwork,
    /// The task ran one cycle of its work
    Ran(T),
}

impl<T> Cycle<T> {
    /// Delay before the next step, given the task's working interval
    pub fn next_delay(&self, interval: Duration) -> Duration {
        match self {
            Cycle::AwaitingNetwork => NETWORK_POLL_INTERVAL,
            Cycle::Ran(_) => interval,
        }
    }
}
