//! Upload task
//! Posts the latest reading to InfluxDB every 10 seconds

use baro_core::LogSink;
use baro_core::log::message;
use baro_core::schedule::IDLE_INTERVAL;
use baro_core::upload::{Uploader, WriteRequest};
use embassy_net::Stack;
use embassy_rp::clocks::RoscRng;
use embassy_time::Timer;
use rand::RngCore;

use crate::config::SETTINGS;
use crate::network::InfluxSession;
use crate::state::LATEST_READING;
use crate::syslog::DeviceLog;
use crate::task::network::StackLink;

#[embassy_executor::task]
pub async fn uploader(stack: Stack<'static>, log: &'static DeviceLog) -> ! {
    let request = match WriteRequest::new(&SETTINGS.influx) {
        Ok(request) => request,
        Err(e) => {
            // Settings are fixed at build time; nothing to retry
            log.error(&message(format_args!("Invalid InfluxDB settings: {}", e)))
                .await;
            loop {
                Timer::after(IDLE_INTERVAL).await;
            }
        }
    };

    let connect = || InfluxSession::new(stack, RoscRng.next_u64());
    Uploader::new(StackLink(stack), connect, request, &LATEST_READING)
        .run(log)
        .await
}
