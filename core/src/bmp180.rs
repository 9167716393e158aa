//! Bosch BMP180 barometric pressure/temperature sensor over async I2C
//!
//! Follows the integer compensation from the BMP180 datasheet (section
//! 3.5). Calibration is read lazily on the first measurement so a sensor
//! that is missing at boot is retried on every read instead of being
//! given up on.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use crate::reading::Reading;
use crate::sensor::BarometricSensor;

/// Fixed I2C address of the BMP180
pub const DEFAULT_ADDRESS: u8 = 0x77;

const REG_CALIBRATION: u8 = 0xAA;
const REG_CHIP_ID: u8 = 0xD0;
const REG_CONTROL: u8 = 0xF4;
const REG_DATA: u8 = 0xF6;

const CHIP_ID: u8 = 0x55;
const CMD_TEMPERATURE: u8 = 0x2E;
const CMD_PRESSURE: u8 = 0x34;

const TEMPERATURE_CONVERSION_US: u32 = 4_500;

/// Rated operating range, -40..=85 °C in 0.1 °C
const TEMPERATURE_RANGE: core::ops::RangeInclusive<i64> = -400..=850;

/// Rated operating range, 300..=1100 hPa in Pa
const PRESSURE_RANGE: core::ops::RangeInclusive<i64> = 30_000..=110_000;

/// Pressure oversampling setting (`oss`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oversampling {
    UltraLowPower = 0,
    Standard = 1,
    HighResolution = 2,
    UltraHighResolution = 3,
}

impl Oversampling {
    const fn oss(self) -> u8 {
        self as u8
    }

    /// Maximum pressure conversion time
    const fn conversion_time_us(self) -> u32 {
        match self {
            Self::UltraLowPower => 4_500,
            Self::Standard => 7_500,
            Self::HighResolution => 13_500,
            Self::UltraHighResolution => 25_500,
        }
    }
}

/// BMP180 driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bmp180Error<E> {
    /// Bus transaction failed
    I2c(E),
    /// Device at the address is not a BMP180
    InvalidChipId(u8),
    /// Calibration EEPROM returned 0x0000 or 0xFFFF
    InvalidCalibration,
    /// Raw sample compensates to a value outside the rated range
    OutOfRange,
}

/// Factory calibration coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Calibration {
    ac1: i16,
    ac2: i16,
    ac3: i16,
    ac4: u16,
    ac5: u16,
    ac6: u16,
    b1: i16,
    b2: i16,
    #[allow(dead_code)]
    mb: i16,
    mc: i16,
    md: i16,
}

impl Calibration {
    fn from_bytes(raw: &[u8; 22]) -> Option<Self> {
        // Every coefficient is a big-endian 16-bit word; all-zero or
        // all-one words mean the EEPROM was not read correctly.
        if raw
            .chunks_exact(2)
            .any(|w| matches!([w[0], w[1]], [0x00, 0x00] | [0xFF, 0xFF]))
        {
            return None;
        }
        let word = |i: usize| [raw[i * 2], raw[i * 2 + 1]];
        Some(Self {
            ac1: i16::from_be_bytes(word(0)),
            ac2: i16::from_be_bytes(word(1)),
            ac3: i16::from_be_bytes(word(2)),
            ac4: u16::from_be_bytes(word(3)),
            ac5: u16::from_be_bytes(word(4)),
            ac6: u16::from_be_bytes(word(5)),
            b1: i16::from_be_bytes(word(6)),
            b2: i16::from_be_bytes(word(7)),
            mb: i16::from_be_bytes(word(8)),
            mc: i16::from_be_bytes(word(9)),
            md: i16::from_be_bytes(word(10)),
        })
    }

    /// Returns (temperature in 0.1 °C, pressure in Pa), or `None` when the
    /// raw words do not compensate to a value inside the operating range.
    ///
    /// Intermediates are `i64`: 16-bit raw words at the extremes overflow
    /// the datasheet's 32-bit arithmetic.
    fn compensate(&self, ut: i32, up: i32, oss: u8) -> Option<(i32, i32)> {
        let (ut, up) = (i64::from(ut), i64::from(up));
        let ac1 = i64::from(self.ac1);
        let ac2 = i64::from(self.ac2);
        let ac3 = i64::from(self.ac3);
        let ac4 = i64::from(self.ac4);
        let ac5 = i64::from(self.ac5);
        let ac6 = i64::from(self.ac6);
        let b1 = i64::from(self.b1);
        let b2 = i64::from(self.b2);
        let mc = i64::from(self.mc);
        let md = i64::from(self.md);

        let x1 = ((ut - ac6) * ac5) >> 15;
        let x2 = (mc << 11).checked_div(x1 + md)?;
        let b5 = x1 + x2;
        let temperature = (b5 + 8) >> 4;

        let b6 = b5 - 4000;
        let b6_squared = (b6 * b6) >> 12;
        let x1 = (b2 * b6_squared) >> 11;
        let x2 = (ac2 * b6) >> 11;
        let b3 = (((ac1 * 4 + x1 + x2) << oss) + 2) >> 2;
        let x1 = (ac3 * b6) >> 13;
        let x2 = (b1 * b6_squared) >> 16;
        let x3 = (x1 + x2 + 2) >> 2;
        let b4 = (ac4 * (x3 + 32768)) >> 15;
        let b7 = (up - b3) * (50_000 >> oss);
        // Negative here is a wrapped unsigned value in the datasheet code
        if b4 <= 0 || b7 < 0 {
            return None;
        }
        let p = if b7 < 0x8000_0000 {
            b7 * 2 / b4
        } else {
            b7 / b4 * 2
        };
        let p = i64::from(i32::try_from(p).ok()?);

        let x1 = ((p >> 8) * (p >> 8) * 3038) >> 16;
        let x2 = (-7357 * p) >> 16;
        let pressure = p + ((x1 + x2 + 3791) >> 4);

        if !TEMPERATURE_RANGE.contains(&temperature) || !PRESSURE_RANGE.contains(&pressure) {
            return None;
        }
        Some((temperature as i32, pressure as i32))
    }
}

/// BMP180 driver
pub struct Bmp180<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    oversampling: Oversampling,
    calibration: Option<Calibration>,
}

impl<I, D, E> Bmp180<I, D>
where
    I: I2c<Error = E>,
    D: DelayNs,
{
    /// Create a driver at the default address in high-resolution mode
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: DEFAULT_ADDRESS,
            oversampling: Oversampling::HighResolution,
            calibration: None,
        }
    }

    pub fn with_oversampling(mut self, oversampling: Oversampling) -> Self {
        self.oversampling = oversampling;
        self
    }

    /// Verify the chip id and load calibration coefficients
    pub async fn init(&mut self) -> Result<(), Bmp180Error<E>> {
        let mut id = [0u8; 1];
        self.i2c
            .write_read(self.address, &[REG_CHIP_ID], &mut id)
            .await
            .map_err(Bmp180Error::I2c)?;
        if id[0] != CHIP_ID {
            return Err(Bmp180Error::InvalidChipId(id[0]));
        }

        let mut raw = [0u8; 22];
        self.i2c
            .write_read(self.address, &[REG_CALIBRATION], &mut raw)
            .await
            .map_err(Bmp180Error::I2c)?;
        let calibration = Calibration::from_bytes(&raw)
            .ok_or(Bmp180Error::InvalidCalibration)?;
        self.calibration = Some(calibration);
        Ok(())
    }

    /// Run one temperature and one pressure conversion
    pub async fn measure(&mut self) -> Result<Reading, Bmp180Error<E>> {
        let calibration = match self.calibration {
            Some(calibration) => calibration,
            None => {
                self.init().await?;
                self.calibration.ok_or(Bmp180Error::InvalidCalibration)?
            }
        };

        let ut = self.read_uncompensated_temperature().await?;
        let up = self.read_uncompensated_pressure().await?;
        let (temperature, pressure) = calibration
            .compensate(ut, up, self.oversampling.oss())
            .ok_or(Bmp180Error::OutOfRange)?;

        Ok(Reading {
            temperature_c: temperature as f32 / 10.0,
            pressure_hpa: pressure as f32 / 100.0,
        })
    }

    async fn read_uncompensated_temperature(&mut self) -> Result<i32, Bmp180Error<E>> {
        self.i2c
            .write(self.address, &[REG_CONTROL, CMD_TEMPERATURE])
            .await
            .map_err(Bmp180Error::I2c)?;
        self.delay.delay_us(TEMPERATURE_CONVERSION_US).await;

        let mut data = [0u8; 2];
        self.i2c
            .write_read(self.address, &[REG_DATA], &mut data)
            .await
            .map_err(Bmp180Error::I2c)?;
        Ok(i32::from(u16::from_be_bytes(data)))
    }

    async fn read_uncompensated_pressure(&mut self) -> Result<i32, Bmp180Error<E>> {
        let oss = self.oversampling.oss();
        self.i2c
            .write(self.address, &[REG_CONTROL, CMD_PRESSURE + (oss << 6)])
            .await
            .map_err(Bmp180Error::I2c)?;
        self.delay
            .delay_us(self.oversampling.conversion_time_us())
            .await;

        let mut data = [0u8; 3];
        self.i2c
            .write_read(self.address, &[REG_DATA], &mut data)
            .await
            .map_err(Bmp180Error::I2c)?;
        let raw = (i32::from(data[0]) << 16) | (i32::from(data[1]) << 8) | i32::from(data[2]);
        Ok(raw >> (8 - oss))
    }
}

impl<I, D, E> BarometricSensor for Bmp180<I, D>
where
    I: I2c<Error = E>,
    D: DelayNs,
    E: core::fmt::Debug,
{
    type Error = Bmp180Error<E>;

    async fn read(&mut self) -> Result<Reading, Self::Error> {
        self.measure().await
    }
}
