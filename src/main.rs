//! Sugarlight firmware entry point
//!
//! Hexagonal architecture with a single event-driven dispatch loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiNetwork    EspBroker     EspBoot        PwmLed (LEDC)     │
//! │  (NetworkPort)  (BrokerPort)  (Boot+Restart) (OutputSink)      │
//! │  LogEventSink   Esp32TimeAdapter                               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Connectivity · Session · Timer · Router · Updates     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  EVENTS queue ◀── WiFi/IP event loop, MQTT receiver thread     │
//! │  FailureEscalator ◀── any Shutdown                             │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, config::TimerConfig};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use sugarlight::adapters::boot::EspBoot;
use sugarlight::adapters::led::PwmLed;
use sugarlight::adapters::log_sink::LogEventSink;
use sugarlight::adapters::mqtt::EspBroker;
use sugarlight::adapters::platform::Platform;
use sugarlight::adapters::time::Esp32TimeAdapter;
use sugarlight::adapters::wifi::WifiNetwork;
use sugarlight::app::ports::NetworkPort;
use sugarlight::app::service::AppService;
use sugarlight::config::SystemConfig;
use sugarlight::error::FatalError;
use sugarlight::events::EVENTS;
use sugarlight::failure::FailureEscalator;
use sugarlight::router::GlucoseDisplay;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Sugarlight v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let mut escalator = FailureEscalator::new(EspBoot::new());

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::from_build_env();
    if let Err(e) = config.validate() {
        error!("Config: {}", e);
        escalator.escalate(FatalError::Init("configuration"));
    }

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 3. Indicator LED (white until the first reading) ──────
    // R = GPIO4, G = GPIO5, B = GPIO6 on LEDC timer 0.
    let ledc = peripherals.ledc;
    let pins = peripherals.pins;
    let channels = LedcTimerDriver::new(
        ledc.timer0,
        &TimerConfig::default().frequency(config.led_pwm_frequency_hz.Hz()),
    )
    .and_then(|timer| {
        // The channels borrow the timer for the life of the program.
        let timer = &*Box::leak(Box::new(timer));
        Ok((
            LedcDriver::new(ledc.channel0, timer, pins.gpio4)?,
            LedcDriver::new(ledc.channel1, timer, pins.gpio5)?,
            LedcDriver::new(ledc.channel2, timer, pins.gpio6)?,
        ))
    });
    let led = match channels {
        Ok((r, g, b)) => PwmLed::new(r, g, b)
            .map_err(|e| warn!("LED: {}", e))
            .ok(),
        Err(e) => {
            warn!("LED: PWM init failed: {}", e);
            None
        }
    };
    let mut display = GlucoseDisplay::new(led, config.led_brightness);
    display.show_boot_color();

    // ── 4. Network (fatal on any failure) ─────────────────────
    let wifi = WifiNetwork::new(
        peripherals.modem,
        sysloop.clone(),
        Some(nvs),
        env!("WIFI_SSID"),
        env!("WIFI_PASSWORD"),
    )
    .unwrap_or_else(|e| {
        error!("WiFi: {:#}", e);
        escalator.escalate(FatalError::Init("wifi driver"))
    });
    let mut platform = Platform::new(wifi, EspBroker::new(&config), EspBoot::new());

    if let Err(e) = platform
        .bring_up()
        .and_then(|()| platform.connect_network())
    {
        escalator.escalate(FatalError::Network(e));
    }

    // ── 5. Application core ───────────────────────────────────
    let mut service = AppService::new(&config, display);
    let mut sink = LogEventSink::new();
    let clock = Esp32TimeAdapter::new();
    service.start(&mut sink);

    let poll = Duration::from_millis(u64::from(config.event_poll_interval_ms));

    // ── 6. Dispatch loop ──────────────────────────────────────
    loop {
        let now = clock.uptime_ms();
        if let Err(reason) = service.run_once(now, &EVENTS, &mut platform, &mut sink) {
            escalator.shutdown(reason);
        }

        std::thread::sleep(poll);
    }
}
