//! System configuration parameters
//!
//! All tunable parameters for the SwitchBank controller.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Identity ---
    /// BLE advertised device name (1-29 printable ASCII bytes)
    pub device_name: heapless::String<32>,

    // --- Timing ---
    /// Schedule evaluation interval (milliseconds).  The schedule engine
    /// fires on exact-second matches, so this should stay at 1000 unless
    /// the match cadence is deliberately being stress-tested.
    pub tick_interval_ms: u32,
    /// Minimum spacing between BLE notifies (milliseconds); the stack
    /// congests when packets are sent back-to-back.
    pub send_spacing_ms: u32,
    /// Delay before restarting advertising after a disconnect (milliseconds)
    pub readvertise_delay_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        // Cannot fail: "SwitchBank" is well under 32 bytes.
        let _ = device_name.push_str("SwitchBank");
        Self {
            device_name,
            tick_interval_ms: 1000,   // 1 Hz schedule evaluation
            send_spacing_ms: 100,     // BLE congestion guard
            readvertise_delay_ms: 500,
        }
    }
}
