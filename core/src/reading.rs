//! Latest sensor sample shared between the poller and the uploader

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// One paired temperature/pressure sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Degrees Celsius
    pub temperature_c: f32,
    /// Hectopascals
    pub pressure_hpa: f32,
}

/// Single-writer cell holding the most recent [`Reading`].
///
/// Both fields are replaced in one store, so a reader never observes a
/// temperature from one sample paired with a pressure from another.
pub struct SharedReading {
    latest: Mutex<CriticalSectionRawMutex, Cell<Option<Reading>>>,
}

impl SharedReading {
    /// Create an empty cell (no reading yet)
    pub const fn new() -> Self {
        Self {
            latest: Mutex::new(Cell::new(None)),
        }
    }

    /// Replace the stored reading
    pub fn store(&self, reading: Reading) {
        self.latest.lock(|cell| cell.set(Some(reading)));
    }

    /// Most recent reading, `None` until the first successful read
    pub fn latest(&self) -> Option<Reading> {
        self.latest.lock(|cell| cell.get())
    }
}

impl Default for SharedReading {
    fn default() -> Self {
        Self::new()
    }
}
