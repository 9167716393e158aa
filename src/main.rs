//! # Pico W Barometer
//! Raspberry Pi Pico W reading a BMP180 and shipping the samples to
//! InfluxDB, with hourly SNTP checks and optional remote syslog

#![no_std]
#![no_main]

use baro_core::schedule::IDLE_INTERVAL;
use defmt::info;
use embassy_executor::Spawner;
use embassy_time::Timer;
use {defmt_rtt as _, panic_probe as _};

mod config;
mod network;
mod sntp;
mod state;
mod syslog;
mod task;

use task::{WifiPeripherals, init_wifi, sensor_poller, time_sync, uploader, wifi_supervisor};

/// Firmware version - automatically populated from Cargo.toml
pub static FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Helper function to spawn tasks and unwrap, panicking if spawn fails.
/// This is acceptable during initialization as we want to fail fast if we can't spawn a task.
#[allow(clippy::unwrap_used)]
fn spawn_unwrap<S>(spawner: &Spawner, token: embassy_executor::SpawnToken<S>) {
    spawner.spawn(token).unwrap();
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Starting Pico W Barometer v{}", FIRMWARE_VERSION);
    let p = embassy_rp::init(Default::default());

    let wifi_peripherals = WifiPeripherals {
        pwr_pin: p.PIN_23,
        cs_pin: p.PIN_25,
        pio: p.PIO0,
        dio_pin: p.PIN_24,
        clk_pin: p.PIN_29,
        dma_ch: p.DMA_CH0,
    };
    #[allow(clippy::unwrap_used)]
    let radio = init_wifi(spawner, wifi_peripherals).await.unwrap();
    let stack = radio.stack();

    let log = syslog::init(stack, &config::SETTINGS.syslog);
    let bus = config::init_sensor_bus(p.I2C0, p.PIN_0, p.PIN_1);

    spawn_unwrap(&spawner, wifi_supervisor(radio));
    spawn_unwrap(&spawner, sensor_poller(bus, log));
    spawn_unwrap(&spawner, time_sync(stack, log));
    spawn_unwrap(&spawner, uploader(stack, log));
    info!("All tasks spawned successfully");

    loop {
        Timer::after(IDLE_INTERVAL).await;
    }
}
