//! Wall-clock adapter.
//!
//! Implements [`ClockPort`] for the SwitchBank controller.
//!
//! - **`target_os = "espidf"`** — wraps the DS1307 driver over the
//!   `esp-idf-hal` I²C bus.  Bus failures degrade to the last good
//!   reading (logged), keeping the port infallible: the dispatcher
//!   treats clock reads as instantaneous and always-available.
//! - **`not(target_os = "espidf")`** — a settable simulation clock for
//!   host-side testing; it holds whatever was last `set`.

use crate::app::ports::ClockPort;
use crate::store::DeviceTime;

#[cfg(target_os = "espidf")]
use crate::drivers::ds1307::Ds1307;
#[cfg(target_os = "espidf")]
use esp_idf_hal::i2c::I2cDriver;

pub struct RtcAdapter {
    #[cfg(target_os = "espidf")]
    rtc: Ds1307<I2cDriver<'static>>,
    /// Last good reading, served when the bus misbehaves.
    last: DeviceTime,
}

#[cfg(target_os = "espidf")]
impl RtcAdapter {
    /// Wrap an I²C bus with the DS1307 on it.  A halted oscillator is
    /// reported but not fixed here — it starts on the first clock-sync
    /// command from a peer.
    pub fn new(i2c: I2cDriver<'static>) -> Self {
        let mut rtc = Ds1307::new(i2c);
        match rtc.is_running() {
            Ok(true) => {}
            Ok(false) => log::warn!("rtc: oscillator is NOT running (battery flat?)"),
            Err(e) => log::warn!("rtc: probe failed: {e:?}"),
        }
        Self {
            rtc,
            last: DeviceTime::default(),
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl RtcAdapter {
    pub fn new() -> Self {
        Self {
            last: DeviceTime::default(),
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for RtcAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for RtcAdapter {
    fn now(&mut self) -> DeviceTime {
        #[cfg(target_os = "espidf")]
        {
            match self.rtc.read_datetime() {
                Ok(t) => {
                    self.last = t;
                    t
                }
                Err(e) => {
                    log::warn!("rtc: read failed ({e:?}), serving last reading");
                    self.last
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        self.last
    }

    fn set(&mut self, t: DeviceTime) {
        #[cfg(target_os = "espidf")]
        {
            if let Err(e) = self.rtc.set_datetime(&t) {
                log::warn!("rtc: adjust failed: {e:?}");
                return;
            }
        }

        self.last = t;
    }
}
