//! SwitchBank Firmware — Main Entry Point
//!
//! Hexagonal architecture with a single cooperative event loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BleLinkAdapter   RtcAdapter    FlashAdapter    RelayBank      │
//! │  (LinkPort)       (ClockPort)   (Eeprom+Config) (RelayPort)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  frame dispatch · snapshot · schedule engine           │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod config;
mod error;
mod events;
pub mod pins;

pub mod app;
mod adapters;
mod drivers;
pub mod proto;
pub mod schedule;
pub mod store;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use adapters::ble::BleLinkAdapter;
use adapters::flash::FlashAdapter;
use adapters::log_sink::LogEventSink;
use adapters::relays::RelayBankAdapter;
use adapters::rtc::RtcAdapter;
use app::events::AppEvent;
use app::ports::{ConfigPort, EventSink};
use app::service::AppService;
use config::SystemConfig;
use events::{push_event, Event};

use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("SwitchBank v{} booting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = drivers::hw_init::init_peripherals() {
        // Relay GPIO init failure is critical — log and halt.
        // In production this triggers the watchdog reset after timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 2. Flash + config ─────────────────────────────────────
    let mut flash = match FlashAdapter::new() {
        Ok(f) => f,
        Err(e) => {
            return Err(anyhow::anyhow!("NVS init failed: {e}"));
        }
    };
    let config = match flash.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("Config load failed ({e}), using defaults");
            SystemConfig::default()
        }
    };

    // ── 3. Wall clock (DS1307 over I²C) ───────────────────────
    let peripherals = Peripherals::take()?;
    let i2c_cfg = I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ));
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21, // pins::I2C_SDA_GPIO
        peripherals.pins.gpio22, // pins::I2C_SCL_GPIO
        &i2c_cfg,
    )?;
    let mut clock = RtcAdapter::new(i2c);

    // ── 4. Snapshot + service ─────────────────────────────────
    let mut relays = RelayBankAdapter::new();
    let mut sink = LogEventSink::new();

    let (snapshot, outcome) = store::load(&mut flash);
    sink.emit(&AppEvent::SnapshotLoaded(outcome));

    let mut app = AppService::new(snapshot);
    app.start(&mut relays, &mut sink);

    // ── 5. BLE link ───────────────────────────────────────────
    let mut ble = BleLinkAdapter::new(config.device_name.as_str(), config.send_spacing_ms);
    ble.start().map_err(|e| anyhow::anyhow!("BLE: {e}"))?;

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    //
    // One iteration per tick interval: sleep, queue the schedule tick,
    // then drain whatever the BT task queued meanwhile.  Each handler
    // runs to completion — no locking is needed around the snapshot.
    loop {
        std::thread::sleep(std::time::Duration::from_millis(
            config.tick_interval_ms as u64,
        ));
        push_event(Event::ScheduleTick);

        events::drain_events(|event| match event {
            Event::ScheduleTick => {
                app.tick(&mut clock, &mut flash, &mut relays, &mut ble, &mut sink);
            }

            Event::FrameReceived => {
                while let Some(frame) = ble.take_pending_frame() {
                    app.handle_frame(
                        &frame,
                        &mut clock,
                        &mut flash,
                        &mut relays,
                        &mut ble,
                        &mut sink,
                    );
                }
            }

            Event::ConnectionUp => {
                info!("link: central connected");
            }

            Event::ConnectionDown => {
                info!("link: central disconnected, restarting advertising");
                // Give the stack a moment to tidy up before re-advertising.
                std::thread::sleep(std::time::Duration::from_millis(
                    config.readvertise_delay_ms as u64,
                ));
                ble.restart_advertising();
            }
        });
    }
}
