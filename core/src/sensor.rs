//! SensorPoller: periodic sensor reads into the shared reading

use embassy_time::Timer;

use crate::log::{LogSink, message};
use crate::reading::{Reading, SharedReading};
use crate::schedule::SENSOR_POLL_INTERVAL;

/// A sensor producing paired temperature/pressure samples
#[allow(async_fn_in_trait)]
pub trait BarometricSensor {
    type Error: core::fmt::Debug;

    /// Take one sample; both values come from the same measurement
    async fn read(&mut self) -> Result<Reading, Self::Error>;
}

/// One poll: store the sample on success, log the failure otherwise.
///
/// A failed read leaves `shared` untouched.
pub async fn poll_sensor<S, L>(
    sensor: &mut S,
    shared: &SharedReading,
    log: &L,
) -> Result<Reading, S::Error>
where
    S: BarometricSensor,
    L: LogSink,
{
    match sensor.read().await {
        Ok(reading) => {
            shared.store(reading);
            log.info(&message(format_args!(
                "Temperature: {} C, Pressure: {} hPa",
                reading.temperature_c, reading.pressure_hpa
            )))
            .await;
            Ok(reading)
        }
        Err(e) => {
            log.error(&message(format_args!("BMP180 sensor error:{:?}", e)))
                .await;
            Err(e)
        }
    }
}

/// Poll the sensor forever
pub async fn run_sensor_poller<S, L>(mut sensor: S, shared: &SharedReading, log: &L) -> !
where
    S: BarometricSensor,
    L: LogSink,
{
    loop {
        let _ = poll_sensor(&mut sensor, shared, log).await;
        Timer::after(SENSOR_POLL_INTERVAL).await;
    }
}
