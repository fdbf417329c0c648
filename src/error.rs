#![allow(dead_code)] // Init/Clock variants are raised only by the espidf adapters

//! Unified error types for the SwitchBank firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level init and control paths uniform.  All variants are `Copy` so they
//! can be passed around without allocation.
//!
//! Protocol-level rejections are *not* errors in this sense — they are wire
//! replies, modelled by [`DispatchError`](crate::proto::command::DispatchError).

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible init/runtime operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A communication subsystem failed.
    Comms(CommsError),
    /// The real-time clock could not be reached or is not keeping time.
    Clock(ClockError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Clock(e) => write!(f, "clock: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// BLE controller or Bluedroid stack failed to come up.
    BleInitFailed,
    /// GATT service registration failed.
    GattRegisterFailed,
    /// Advertising could not be (re)started.
    AdvertiseFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BleInitFailed => write!(f, "BLE stack init failed"),
            Self::GattRegisterFailed => write!(f, "GATT service registration failed"),
            Self::AdvertiseFailed => write!(f, "advertising start failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Clock errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// I²C transaction with the RTC failed.
    BusError,
    /// The RTC oscillator halt bit is set (battery was removed).
    NotRunning,
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusError => write!(f, "I2C bus error"),
            Self::NotRunning => write!(f, "RTC oscillator stopped"),
        }
    }
}

impl From<ClockError> for Error {
    fn from(e: ClockError) -> Self {
        Self::Clock(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
