//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements     | Connects to                    |
//! |------------|----------------|--------------------------------|
//! | `ble`      | LinkPort       | Bluedroid GATT server          |
//! | `flash`    | EepromPort     | NVS-backed 256-byte block      |
//! |            | ConfigPort     |                                |
//! | `log_sink` | EventSink      | Serial log output              |
//! | `relays`   | RelayPort      | ESP32 GPIO relay bank          |
//! | `rtc`      | ClockPort      | DS1307 over I²C / sim clock    |

pub mod ble;
pub mod flash;
pub mod log_sink;
pub mod relays;
pub mod rtc;
