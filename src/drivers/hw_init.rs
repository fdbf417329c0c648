//! One-shot hardware peripheral initialization.
//!
//! Configures the relay GPIO directions using raw ESP-IDF sys calls.
//! Called once from `main()` before the event loop starts.  The I²C bus
//! for the RTC is owned by `esp-idf-hal` and set up in `main()`.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

// ── Init ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the event loop; single-threaded.
    unsafe {
        init_gpio_outputs()?;
    }
    log::info!("hw_init: relay GPIOs configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let mut mask: u64 = 0;
    for pin in pins::RELAY_GPIOS {
        mask |= 1u64 << pin;
    }

    let cfg = gpio_config_t {
        pin_bit_mask: mask,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };

    // SAFETY: plain C call with a fully initialised config struct.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    // Relays start de-energised regardless of reset state.
    for pin in pins::RELAY_GPIOS {
        gpio_write(pin, false);
    }
    Ok(())
}

// ── GPIO write helper ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: pin was configured as an output in init_gpio_outputs().
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    log::debug!("gpio(sim): pin {} -> {}", pin, u8::from(high));
}
