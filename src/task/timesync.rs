//! Time sync task
//! Hourly SNTP query, logged as local wall-clock time

use baro_core::timesync::TimeSync;
use embassy_net::Stack;

use crate::config::SETTINGS;
use crate::sntp::SntpClient;
use crate::syslog::DeviceLog;
use crate::task::network::StackLink;

#[embassy_executor::task]
pub async fn time_sync(stack: Stack<'static>, log: &'static DeviceLog) -> ! {
    let connect = || SntpClient::new(stack, SETTINGS.ntp_server);
    TimeSync::new(StackLink(stack), connect).run(log).await
}
