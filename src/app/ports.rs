//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (clock, BLE link, relay bank, EEPROM, event sinks)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly — and never owns an adapter.
//!
//! All port errors are typed; callers must handle every variant explicitly.

use crate::config::SystemConfig;
use crate::proto::frame::FRAME_LEN;
use crate::store::{Channel, DeviceTime};

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: RTC → domain)
// ───────────────────────────────────────────────────────────────

/// Wall-clock time source, backed by the battery-buffered RTC.
///
/// Infallible at the port boundary: an adapter whose bus read fails must
/// degrade to its last known reading (logging the failure) rather than
/// surface an error — the dispatcher treats clock reads as instantaneous
/// and always-available.
pub trait ClockPort {
    /// Current date-time.
    fn now(&mut self) -> DeviceTime;

    /// Adjust the clock.  Every TurnOn/TurnOff/GetStatus/ScheduleRead
    /// command piggybacks one of these.
    fn set(&mut self, t: DeviceTime);
}

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: domain → wireless transport)
// ───────────────────────────────────────────────────────────────

/// Outbound side of the frame transport.
///
/// Implementations enforce the minimum inter-send spacing internally
/// (the BLE stack congests when notifies are sent back-to-back).  There
/// is no outbound queue: a frame that cannot be sent now is dropped by
/// the caller, never buffered.
pub trait LinkPort {
    /// Whether a central is currently connected.
    fn is_connected(&self) -> bool;

    /// Send one frame to the connected peer.
    fn send(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → output hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to drive a channel's physical level.
pub trait RelayPort {
    fn set_channel(&mut self, channel: Channel, on: bool);
}

// ───────────────────────────────────────────────────────────────
// EEPROM port (driven adapter: domain ↔ persistent block storage)
// ───────────────────────────────────────────────────────────────

/// Byte-addressable persistent block, 256 bytes.
///
/// Writes are synchronous and unbuffered; a write that returns `Ok` is
/// committed.  There is no atomicity guarantee across separate writes —
/// the dual-slot snapshot layout in [`store`](crate::store) exists to
/// detect the resulting torn writes.
pub trait EepromPort {
    /// Fill `buf` from `offset`.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), EepromError>;

    /// Write `data` at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), EepromError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, a
/// future status characteristic, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`EepromPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EepromError {
    /// Access beyond the fixed block size.
    OutOfBounds,
    /// Generic I/O error from the storage backend.
    Io,
}

impl core::fmt::Display for EepromError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "access beyond block"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

/// Errors from [`LinkPort::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// No central connected.
    Disconnected,
    /// The stack refused the notify (congestion).
    Congested,
    /// GATT I/O error.
    Io,
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "no client connected"),
            Self::Congested => write!(f, "stack congested"),
            Self::Io => write!(f, "GATT I/O error"),
        }
    }
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
