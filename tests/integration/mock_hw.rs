//! Mock hardware adapters for integration tests.
//!
//! Records every port call so tests can assert on the full command
//! history without touching real GPIO, I²C or the BLE stack.

use switchbank::app::events::AppEvent;
use switchbank::app::ports::{
    ClockPort, EepromError, EepromPort, EventSink, LinkError, LinkPort, RelayPort,
};
use switchbank::proto::frame::FRAME_LEN;
use switchbank::store::{Channel, DeviceTime, CHANNEL_COUNT};

/// Size of the emulated EEPROM block (matches the flash adapter).
pub const EEPROM_SIZE: usize = 256;

// ── MockClock ─────────────────────────────────────────────────

/// Scripted wall clock: serves a fixed `now` and records adjustments.
pub struct MockClock {
    pub now: DeviceTime,
    pub adjustments: Vec<DeviceTime>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn at(now: DeviceTime) -> Self {
        Self {
            now,
            adjustments: Vec::new(),
        }
    }
}

impl ClockPort for MockClock {
    fn now(&mut self) -> DeviceTime {
        self.now
    }

    fn set(&mut self, t: DeviceTime) {
        self.adjustments.push(t);
        self.now = t;
    }
}

// ── MockEeprom ────────────────────────────────────────────────

/// In-memory EEPROM block with a write log and an injectable failure.
pub struct MockEeprom {
    pub data: [u8; EEPROM_SIZE],
    pub writes: Vec<usize>,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockEeprom {
    pub fn new() -> Self {
        Self {
            data: [0; EEPROM_SIZE],
            writes: Vec::new(),
            fail_writes: false,
        }
    }
}

impl EepromPort for MockEeprom {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), EepromError> {
        let end = offset + buf.len();
        if end > EEPROM_SIZE {
            return Err(EepromError::OutOfBounds);
        }
        buf.copy_from_slice(&self.data[offset..end]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), EepromError> {
        if self.fail_writes {
            return Err(EepromError::Io);
        }
        let end = offset + data.len();
        if end > EEPROM_SIZE {
            return Err(EepromError::OutOfBounds);
        }
        self.data[offset..end].copy_from_slice(data);
        self.writes.push(offset);
        Ok(())
    }
}

// ── MockRelays ────────────────────────────────────────────────

/// Records every relay command and tracks the resulting levels.
pub struct MockRelays {
    pub calls: Vec<(usize, bool)>,
    pub levels: [bool; CHANNEL_COUNT],
}

#[allow(dead_code)]
impl MockRelays {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            levels: [false; CHANNEL_COUNT],
        }
    }
}

impl RelayPort for MockRelays {
    fn set_channel(&mut self, channel: Channel, on: bool) {
        self.calls.push((channel.index(), on));
        self.levels[channel.index()] = on;
    }
}

// ── MockLink ──────────────────────────────────────────────────

/// Loopback link: records sent frames, connectivity is a test knob.
pub struct MockLink {
    pub connected: bool,
    pub sent: Vec<[u8; FRAME_LEN]>,
}

#[allow(dead_code)]
impl MockLink {
    pub fn connected() -> Self {
        Self {
            connected: true,
            sent: Vec::new(),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            sent: Vec::new(),
        }
    }

    pub fn last_sent(&self) -> Option<&[u8; FRAME_LEN]> {
        self.sent.last()
    }
}

impl LinkPort for MockLink {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn send(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::Disconnected);
        }
        self.sent.push(*frame);
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

/// Captures emitted events as debug strings for loose assertions.
pub struct RecordingSink {
    pub events: Vec<String>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events.iter().any(|e| e.contains(needle))
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(format!("{:?}", event));
    }
}
