//! Unix time to local calendar time
//!
//! Uses Howard Hinnant's `civil_from_days` algorithm (O(1), proleptic
//! Gregorian). Reference: http://howardhinnant.github.io/date_algorithms.html

use core::fmt;

const SECONDS_PER_DAY: i64 = 86_400;

/// Broken-down wall-clock time at a fixed UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocalDateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl LocalDateTime {
    /// Convert seconds since the Unix epoch, shifted by `offset_hours`
    pub fn from_unix(unix_secs: u64, offset_hours: i8) -> Self {
        let local = unix_secs as i64 + i64::from(offset_hours) * 3600;
        let days = local.div_euclid(SECONDS_PER_DAY);
        let secs_today = local.rem_euclid(SECONDS_PER_DAY);

        let (year, month, day) = civil_from_days(days);
        Self {
            year,
            month,
            day,
            hour: (secs_today / 3600) as u8,
            minute: ((secs_today % 3600) / 60) as u8,
            second: (secs_today % 60) as u8,
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS`
impl fmt::Display for LocalDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Days since 1970-01-01 to (year, month, day)
fn civil_from_days(days_since_epoch: i64) -> (i32, u8, u8) {
    // Shift the epoch to 0000-03-01 so the leap day is the last day of the year
    let z = days_since_epoch + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u32; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365; // [0, 399]
    let y = i64::from(yoe) + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11], March = 0
    let d = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = if m <= 2 { y + 1 } else { y };

    (year as i32, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn test_unix_epoch_utc() {
        let dt = LocalDateTime::from_unix(0, 0);
        assert_eq!(dt.to_string(), "1970-01-01 00:00:00");
    }

    #[test]
    fn test_negative_offset_crosses_midnight() {
        // 2024-01-01 00:00:00 UTC
        let dt = LocalDateTime::from_unix(1_704_067_200, -7);
        assert_eq!(dt.to_string(), "2023-12-31 17:00:00");
    }

    #[test]
    fn test_leap_day() {
        // 2024-02-29 12:34:56 UTC
        let dt = LocalDateTime::from_unix(1_709_210_096, 0);
        assert_eq!(
            dt,
            LocalDateTime {
                year: 2024,
                month: 2,
                day: 29,
                hour: 12,
                minute: 34,
                second: 56,
            }
        );
    }

    #[test]
    fn test_fields_are_zero_padded() {
        // 2021-03-04 05:06:07 UTC
        let dt = LocalDateTime::from_unix(1_614_834_367, 0);
        assert_eq!(dt.to_string(), "2021-03-04 05:06:07");
    }
}
