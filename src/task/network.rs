//! WiFi bring-up and supervision
//! Owns the CYW43 control handle; other tasks only see the network stack

use baro_core::config::WifiCredentials;
use baro_core::network::{NetworkLink, Supervision, WifiRadio, run_network_supervisor};
use cyw43::JoinOptions;
use cyw43_pio::{DEFAULT_CLOCK_DIVIDER, PioSpi};
use defmt::{Format, info, warn};
use embassy_executor::Spawner;
use embassy_net::{Config, Stack, StackResources};
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{DMA_CH0, PIN_23, PIN_24, PIN_25, PIN_29, PIO0};
use embassy_rp::pio::{InterruptHandler, Pio};
use embassy_time::{Duration, with_timeout};
use rand::RngCore;
use static_cell::StaticCell;

use crate::config::SETTINGS;

/// Upper bound on waiting for DHCP after a successful join
const DHCP_TIMEOUT: Duration = Duration::from_secs(30);

/// WiFi peripherals needed for initialization
pub struct WifiPeripherals {
    pub pwr_pin: embassy_rp::Peri<'static, PIN_23>,
    pub cs_pin: embassy_rp::Peri<'static, PIN_25>,
    pub pio: embassy_rp::Peri<'static, PIO0>,
    pub dio_pin: embassy_rp::Peri<'static, PIN_24>,
    pub clk_pin: embassy_rp::Peri<'static, PIN_29>,
    pub dma_ch: embassy_rp::Peri<'static, DMA_CH0>,
}

embassy_rp::bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => InterruptHandler<PIO0>;
});

/// CYW43 runner task
#[embassy_executor::task]
async fn cyw43_task(
    runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>,
) -> ! {
    runner.run().await
}

/// Network stack runner task
#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, cyw43::NetDriver<'static>>) -> ! {
    runner.run().await
}

/// Bring up the CYW43 chip and a DHCP network stack (not yet associated)
pub async fn init_wifi(
    spawner: Spawner,
    peripherals: WifiPeripherals,
) -> Result<Cyw43Radio, embassy_executor::SpawnError> {
    info!("Loading CYW43 firmware...");
    let fw = include_bytes!("../../cyw43-firmware/43439A0.bin");
    let clm = include_bytes!("../../cyw43-firmware/43439A0_clm.bin");

    let pwr = Output::new(peripherals.pwr_pin, Level::Low);
    let cs = Output::new(peripherals.cs_pin, Level::High);
    let mut pio = Pio::new(peripherals.pio, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        peripherals.dio_pin,
        peripherals.clk_pin,
        peripherals.dma_ch,
    );

    static STATE: StaticCell<cyw43::State> = StaticCell::new();
    let state = STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
    spawner.spawn(cyw43_task(runner))?;

    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;
    info!("WiFi chip initialized");

    // Sockets: uploader TCP, syslog UDP, SNTP UDP, DNS
    static RESOURCES: StaticCell<StackResources<5>> = StaticCell::new();
    let seed = RoscRng.next_u64();
    let (stack, runner) = embassy_net::new(
        net_device,
        Config::dhcpv4(Default::default()),
        RESOURCES.init(StackResources::new()),
        seed,
    );
    spawner.spawn(net_task(runner))?;

    Ok(Cyw43Radio { control, stack })
}

/// Join failures
#[derive(Debug, Clone, Copy, Format)]
pub enum JoinError {
    /// Firmware rejected the join (status code)
    Join(u32),
    /// Associated, but no DHCP lease in time
    DhcpTimeout,
}

/// Association state seen through the IP stack
#[derive(Clone, Copy)]
pub struct StackLink(pub Stack<'static>);

impl NetworkLink for StackLink {
    fn is_associated(&self) -> bool {
        self.0.is_link_up() && self.0.is_config_up()
    }
}

/// The radio plus the stack it feeds
pub struct Cyw43Radio {
    control: cyw43::Control<'static>,
    stack: Stack<'static>,
}

impl Cyw43Radio {
    pub fn stack(&self) -> Stack<'static> {
        self.stack
    }
}

impl NetworkLink for Cyw43Radio {
    fn is_associated(&self) -> bool {
        StackLink(self.stack).is_associated()
    }
}

impl WifiRadio for Cyw43Radio {
    type Error = JoinError;

    async fn associate(&mut self, credentials: &WifiCredentials<'_>) -> Result<(), Self::Error> {
        info!("Joining WiFi network: {}", credentials.ssid);
        self.control
            .join(
                credentials.ssid,
                JoinOptions::new(credentials.psk.as_bytes()),
            )
            .await
            .map_err(|e| JoinError::Join(e.status))?;

        info!("Waiting for DHCP...");
        with_timeout(DHCP_TIMEOUT, self.stack.wait_config_up())
            .await
            .map_err(|_| JoinError::DhcpTimeout)?;

        if let Some(config) = self.stack.config_v4() {
            info!("IP address: {}", config.address);
        }
        Ok(())
    }
}

/// Keeps the station associated; failures are reported locally only
#[embassy_executor::task]
pub async fn wifi_supervisor(radio: Cyw43Radio) -> ! {
    run_network_supervisor(radio, SETTINGS.wifi, |outcome| match outcome {
        Supervision::Associated => {}
        Supervision::Joined => info!("WiFi connected"),
        Supervision::JoinFailed(e) => warn!("WiFi join failed: {:?}, retrying...", e),
    })
    .await
}
