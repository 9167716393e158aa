//! Device settings (baked in at build time) and sensor bus wiring.
//!
//! BMP180 wiring:
//! - SDA -> GPIO0
//! - SCL -> GPIO1
//! - I2C0 at 100 kHz

include!(concat!(env!("OUT_DIR"), "/config_generated.rs"));

use baro_core::config::{InfluxConfig, Settings, SyslogConfig, WifiCredentials};
use embassy_rp::i2c::{self, I2c, InterruptHandler};
use embassy_rp::{Peri, bind_interrupts, peripherals};

/// I2C clock for the BMP180
const SENSOR_I2C_FREQUENCY_HZ: u32 = 100_000;

/// All connection parameters, immutable for the process lifetime
pub const SETTINGS: Settings<'static> = Settings {
    wifi: WifiCredentials {
        ssid: WIFI_SSID,
        psk: WIFI_PSK,
    },
    influx: InfluxConfig {
        url: INFLUXDB_URL,
        org: INFLUXDB_ORG,
        bucket: INFLUXDB_BUCKET,
        token: INFLUXDB_TOKEN,
    },
    syslog: SyslogConfig {
        server: SYSLOG_SERVER,
        port: SYSLOG_PORT,
        enabled: SYSLOG_SERVER_ENABLED,
    },
    ntp_server: NTP_SERVER,
};

bind_interrupts!(struct I2cIrqs {
    I2C0_IRQ => InterruptHandler<peripherals::I2C0>;
});

/// Async I2C bus the sensor sits on
pub type SensorBus = I2c<'static, peripherals::I2C0, i2c::Async>;

/// Initialize I2C0 on GPIO0 (SDA) / GPIO1 (SCL)
pub fn init_sensor_bus(
    i2c0: Peri<'static, peripherals::I2C0>,
    sda: Peri<'static, peripherals::PIN_0>,
    scl: Peri<'static, peripherals::PIN_1>,
) -> SensorBus {
    let mut config = i2c::Config::default();
    config.frequency = SENSOR_I2C_FREQUENCY_HZ;
    I2c::new_async(i2c0, scl, sda, I2cIrqs, config)
}
