//! Global state shared between tasks

use baro_core::SharedReading;

/// Latest sensor reading; written by the poller, read by the uploader
pub static LATEST_READING: SharedReading = SharedReading::new();
