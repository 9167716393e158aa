//! Task modules
//! Each long-running activity is its own embassy task

pub mod network;
pub mod sensor;
pub mod timesync;
pub mod uploader;

// Re-export commonly used items
pub use network::{WifiPeripherals, init_wifi, wifi_supervisor};
pub use sensor::sensor_poller;
pub use timesync::time_sync;
pub use uploader::uploader;
