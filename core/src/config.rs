//! Connection parameters, fixed for the lifetime of the process

/// WiFi access point credentials
#[derive(Debug, Clone, Copy)]
pub struct WifiCredentials<'a> {
    pub ssid: &'a str,
    pub psk: &'a str,
}

/// InfluxDB v2 write endpoint
#[derive(Debug, Clone, Copy)]
pub struct InfluxConfig<'a> {
    /// Base write URL, e.g. `https://influx.example.com/api/v2/write`
    pub url: &'a str,
    pub org: &'a str,
    pub bucket: &'a str,
    pub token: &'a str,
}

/// Remote syslog collector
#[derive(Debug, Clone, Copy)]
pub struct SyslogConfig<'a> {
    pub server: &'a str,
    pub port: u16,
    /// When false no datagram is ever sent
    pub enabled: bool,
}

/// Complete device configuration
#[derive(Debug, Clone, Copy)]
pub struct Settings<'a> {
    pub wifi: WifiCredentials<'a>,
    pub influx: InfluxConfig<'a>,
    pub syslog: SyslogConfig<'a>,
    pub ntp_server: &'a str,
}

/// A configured value does not fit its fixed-size buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    UrlTooLong,
    TokenTooLong,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UrlTooLong => write!(f, "write URL too long"),
            Self::TokenTooLong => write!(f, "access token too long"),
        }
    }
}
