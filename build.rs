//! Build script: RP2040 linker setup and compile-time device settings.
//!
//! Settings come from `settings.toml` (optional) and `PICO_BARO_*`
//! environment variables, and are emitted as constants into
//! `$OUT_DIR/config_generated.rs`.

use std::env;
use std::fs;
use std::path::PathBuf;

use config::{Config, Environment, File};

const DEFAULT_SYSLOG_PORT: i64 = 514;
const DEFAULT_NTP_SERVER: &str = "pool.ntp.org";

const KEYS: &[&str] = &[
    "ssid",
    "psk",
    "influxdb_url",
    "influxdb_org",
    "influxdb_bucket",
    "influxdb_token",
    "syslog_server",
    "syslog_server_enabled",
    "syslog_port",
    "ntp_server",
];

fn main() {
    let out = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR not set"));

    // Put `memory.x` in our output directory and ensure it's on the linker search path
    fs::copy("memory.x", out.join("memory.x")).expect("failed to copy memory.x");
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=settings.toml");
    for key in KEYS {
        println!("cargo:rerun-if-env-changed=PICO_BARO_{}", key.to_uppercase());
    }

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    let settings = Config::builder()
        .add_source(File::with_name("settings").required(false))
        .add_source(Environment::with_prefix("PICO_BARO"))
        .build()
        .expect("failed to load settings");

    let text = |key: &str| -> String {
        settings.get_string(key).unwrap_or_else(|_| {
            println!("cargo:warning=setting `{key}` is not set, using an empty value");
            String::new()
        })
    };

    // Only the exact spellings TRUE/true turn remote logging on
    let syslog_enabled = settings
        .get_string("syslog_server_enabled")
        .map(|v| v == "TRUE" || v == "true")
        .unwrap_or(false);
    let syslog_port = settings
        .get_int("syslog_port")
        .unwrap_or(DEFAULT_SYSLOG_PORT);
    let syslog_port = u16::try_from(syslog_port).expect("syslog_port out of range");
    let syslog_server = if syslog_enabled {
        text("syslog_server")
    } else {
        settings.get_string("syslog_server").unwrap_or_default()
    };
    let ntp_server = settings
        .get_string("ntp_server")
        .unwrap_or_else(|_| DEFAULT_NTP_SERVER.to_string());

    let generated = format!(
        "pub const WIFI_SSID: &str = {:?};\n\
         pub const WIFI_PSK: &str = {:?};\n\
         pub const INFLUXDB_URL: &str = {:?};\n\
         pub const INFLUXDB_ORG: &str = {:?};\n\
         pub const INFLUXDB_BUCKET: &str = {:?};\n\
         pub const INFLUXDB_TOKEN: &str = {:?};\n\
         pub const SYSLOG_SERVER: &str = {:?};\n\
         pub const SYSLOG_SERVER_ENABLED: bool = {};\n\
         pub const SYSLOG_PORT: u16 = {};\n\
         pub const NTP_SERVER: &str = {:?};\n",
        text("ssid"),
        text("psk"),
        text("influxdb_url"),
        text("influxdb_org"),
        text("influxdb_bucket"),
        text("influxdb_token"),
        syslog_server,
        syslog_enabled,
        syslog_port,
        ntp_server,
    );

    fs::write(out.join("config_generated.rs"), generated)
        .expect("failed to write config_generated.rs");
}
