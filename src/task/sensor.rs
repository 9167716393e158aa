//! Sensor polling task
//! Reads the BMP180 every second into the shared reading

use baro_core::bmp180::Bmp180;
use baro_core::sensor::run_sensor_poller;
use defmt::info;
use embassy_time::Delay;

use crate::config::SensorBus;
use crate::state::LATEST_READING;
use crate::syslog::DeviceLog;

/// Sensor poller task; a missing sensor is retried on every poll
#[embassy_executor::task]
pub async fn sensor_poller(bus: SensorBus, log: &'static DeviceLog) -> ! {
    info!("Sensor poller started");
    run_sensor_poller(Bmp180::new(bus, Delay), &LATEST_READING, log).await
}
