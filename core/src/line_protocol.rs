//! InfluxDB line-protocol encoding of a reading

use core::fmt::Write;

use heapless::String;

use crate::reading::Reading;

/// Capacity of an encoded record
pub const BODY_CAPACITY: usize = 128;

/// Tag identifying the sensor in every series
pub const DEVICE_TAG: &str = "bmp180";

/// Encoded two-line record
pub type Body = String<BODY_CAPACITY>;

/// Encode `reading` as two newline-separated measurements.
///
/// Values use the `Debug` float form so whole numbers keep their decimal
/// point (`15.0`, not `15`).
pub fn encode(reading: &Reading) -> Body {
    let mut body = Body::new();
    // Two f32 fields plus fixed text always fit in BODY_CAPACITY
    let _ = write!(
        body,
        "temperature,device={tag} value={t:?}\npressure,device={tag} value={p:?}",
        tag = DEVICE_TAG,
        t = reading.temperature_c,
        p = reading.pressure_hpa,
    );
    body
}
