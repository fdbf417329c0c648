//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules for the SwitchBank controller:
//! frame dispatch, channel/schedule state, and per-tick schedule
//! orchestration.  All interaction with hardware happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
