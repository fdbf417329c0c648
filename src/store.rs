//! Channel/schedule data model and the dual-slot persistent snapshot.
//!
//! The [`Snapshot`] is the single authoritative record of the four output
//! channels and the twelve schedule rules.  It is encoded into a fixed
//! 89-byte layout and written identically to two slots of the 256-byte
//! EEPROM block, each guarded by an XOR checksum:
//!
//! ```text
//! ┌───────────────┬──────────────────────────────┬──────┐
//! │ 4 × channel   │ 12 × rule record (7 B each)  │ CRC  │
//! │ 'O' / 'F'     │ HH mm ss dd MM yy action     │ XOR  │
//! └───────────────┴──────────────────────────────┴──────┘
//!   slot 0 @ offset 0          slot 1 @ offset 89
//! ```
//!
//! The two slots are written with the same bytes on every save — the second
//! slot protects against a torn write, not against logical staleness.
//! [`load`] prefers slot 0, falls back to slot 1, and resets both to the
//! default snapshot when neither passes its checksum.

use crate::app::ports::{EepromError, EepromPort};

// ───────────────────────────────────────────────────────────────
// Layout constants
// ───────────────────────────────────────────────────────────────

/// Number of independently switched output channels.
pub const CHANNEL_COUNT: usize = 4;

/// Number of schedule rule slots.
pub const RULE_COUNT: usize = 12;

/// Consecutive rule slots owned by each channel.
pub const RULES_PER_CHANNEL: usize = 3;

/// Encoded size of one schedule rule record.
pub const RULE_RECORD_LEN: usize = 7;

/// Encoded snapshot size: channels + rules + checksum byte.
pub const SNAPSHOT_LEN: usize = CHANNEL_COUNT + RULE_COUNT * RULE_RECORD_LEN + 1;

/// EEPROM offsets of the two snapshot slots.
pub const SLOT_OFFSETS: [usize; 2] = [0, SNAPSHOT_LEN];

// ───────────────────────────────────────────────────────────────
// Index newtypes
// ───────────────────────────────────────────────────────────────

/// One of the four output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel(u8);

impl Channel {
    /// Construct from a 0-based index.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < CHANNEL_COUNT).then(|| Self(index as u8))
    }

    /// Construct from the wire id byte (`'0'`–`'3'`).
    pub fn from_ascii(id: u8) -> Option<Self> {
        (b'0'..b'0' + CHANNEL_COUNT as u8)
            .contains(&id)
            .then(|| Self(id - b'0'))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The wire digit for this channel (`'0'`–`'3'`).
    pub fn digit(self) -> u8 {
        b'0' + self.0
    }
}

/// One of the twelve schedule rule slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSlot(u8);

impl RuleSlot {
    /// Construct from a 0-based index.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < RULE_COUNT).then(|| Self(index as u8))
    }

    /// Construct from the wire id byte (`'0'`–`';'`, i.e. 0–11).
    pub fn from_ascii(id: u8) -> Option<Self> {
        (b'0'..b'0' + RULE_COUNT as u8)
            .contains(&id)
            .then(|| Self(id - b'0'))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The channel this rule slot belongs to.  Fixed partition: slots
    /// [0,3) → channel 0, [3,6) → channel 1, [6,9) → channel 2,
    /// [9,12) → channel 3.
    pub fn owning_channel(self) -> Channel {
        Channel(self.0 / RULES_PER_CHANNEL as u8)
    }
}

// ───────────────────────────────────────────────────────────────
// Value types
// ───────────────────────────────────────────────────────────────

/// Logical state of an output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    On,
    #[default]
    Off,
}

impl ChannelState {
    /// Wire/persisted byte for this state.
    pub fn wire(self) -> u8 {
        match self {
            Self::On => b'O',
            Self::Off => b'F',
        }
    }

    /// Anything other than `'O'` reads back as Off.
    pub fn from_wire(byte: u8) -> Self {
        if byte == b'O' {
            Self::On
        } else {
            Self::Off
        }
    }

    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

/// Action of a schedule rule when its trigger time is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleAction {
    /// Switch the owning channel on at the trigger time.
    ArmOn,
    /// Switch the owning channel off at the trigger time.
    ArmOff,
    /// Rule is inert.
    #[default]
    Disabled,
}

impl RuleAction {
    pub fn wire(self) -> u8 {
        match self {
            Self::ArmOn => b'S',
            Self::ArmOff => b'P',
            Self::Disabled => b'D',
        }
    }

    /// Unknown bytes normalize to Disabled.
    pub fn from_wire(byte: u8) -> Self {
        match byte {
            b'S' => Self::ArmOn,
            b'P' => Self::ArmOff,
            _ => Self::Disabled,
        }
    }

    pub fn is_armed(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// A wall-clock instant as the device understands it: two-digit year
/// (00–99, offset from 2000), month, day, hour, minute, second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub day: u8,
    pub month: u8,
    pub year: u8,
}

/// One programmable trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleRule {
    pub at: DeviceTime,
    pub action: RuleAction,
}

// ───────────────────────────────────────────────────────────────
// Snapshot
// ───────────────────────────────────────────────────────────────

/// The authoritative in-memory record of all channel and schedule state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub channels: [ChannelState; CHANNEL_COUNT],
    pub rules: [ScheduleRule; RULE_COUNT],
}

impl Snapshot {
    pub fn channel(&self, channel: Channel) -> ChannelState {
        self.channels[channel.index()]
    }

    pub fn set_channel(&mut self, channel: Channel, state: ChannelState) {
        self.channels[channel.index()] = state;
    }

    pub fn rule(&self, slot: RuleSlot) -> ScheduleRule {
        self.rules[slot.index()]
    }

    pub fn set_rule(&mut self, slot: RuleSlot, rule: ScheduleRule) {
        self.rules[slot.index()] = rule;
    }

    /// Encode into the persisted layout, checksum included.
    pub fn encode(&self) -> [u8; SNAPSHOT_LEN] {
        let mut out = [0u8; SNAPSHOT_LEN];
        for (i, state) in self.channels.iter().enumerate() {
            out[i] = state.wire();
        }
        for (i, rule) in self.rules.iter().enumerate() {
            let rec = &mut out[CHANNEL_COUNT + i * RULE_RECORD_LEN..][..RULE_RECORD_LEN];
            rec[0] = rule.at.hour;
            rec[1] = rule.at.minute;
            rec[2] = rule.at.second;
            rec[3] = rule.at.day;
            rec[4] = rule.at.month;
            rec[5] = rule.at.year;
            rec[6] = rule.action.wire();
        }
        out[SNAPSHOT_LEN - 1] = checksum(&out[..SNAPSHOT_LEN - 1]);
        out
    }

    /// Decode a persisted snapshot, verifying its checksum.
    pub fn decode(bytes: &[u8; SNAPSHOT_LEN]) -> Option<Self> {
        if checksum(&bytes[..SNAPSHOT_LEN - 1]) != bytes[SNAPSHOT_LEN - 1] {
            return None;
        }
        let mut snapshot = Self::default();
        for (i, state) in snapshot.channels.iter_mut().enumerate() {
            *state = ChannelState::from_wire(bytes[i]);
        }
        for (i, rule) in snapshot.rules.iter_mut().enumerate() {
            let rec = &bytes[CHANNEL_COUNT + i * RULE_RECORD_LEN..][..RULE_RECORD_LEN];
            rule.at = DeviceTime {
                hour: rec[0],
                minute: rec[1],
                second: rec[2],
                day: rec[3],
                month: rec[4],
                year: rec[5],
            };
            rule.action = RuleAction::from_wire(rec[6]);
        }
        Some(snapshot)
    }
}

/// XOR checksum over an encoded snapshot body.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

// ───────────────────────────────────────────────────────────────
// Dual-slot persistence
// ───────────────────────────────────────────────────────────────

/// Which path [`load`] took to produce a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Slot 0 passed its checksum.
    Primary,
    /// Slot 0 was corrupt; slot 1 passed.
    Backup,
    /// Both slots were corrupt; the default snapshot was persisted.
    Reset,
}

/// Load the snapshot from EEPROM, falling back across slots.
///
/// Corruption is self-healing: if both slots fail their checksum the
/// default snapshot (all channels Off, all rules Disabled) is written
/// back and returned.  Nothing is reported to the transport peer.
pub fn load(eeprom: &mut impl EepromPort) -> (Snapshot, LoadOutcome) {
    if let Some(snapshot) = read_slot(eeprom, SLOT_OFFSETS[0]) {
        return (snapshot, LoadOutcome::Primary);
    }
    log::warn!("store: slot 0 corrupt, trying slot 1");
    if let Some(snapshot) = read_slot(eeprom, SLOT_OFFSETS[1]) {
        return (snapshot, LoadOutcome::Backup);
    }
    log::warn!("store: both slots corrupt, resetting to defaults");
    let snapshot = Snapshot::default();
    if let Err(e) = save(eeprom, &snapshot) {
        log::warn!("store: reset write failed: {e}");
    }
    (snapshot, LoadOutcome::Reset)
}

/// Persist the snapshot to both slots, slot 0 first.
///
/// The two writes are not atomic with respect to power loss; a torn
/// write corrupts at most that slot's checksum, which [`load`] detects.
pub fn save(eeprom: &mut impl EepromPort, snapshot: &Snapshot) -> Result<(), EepromError> {
    let encoded = snapshot.encode();
    eeprom.write(SLOT_OFFSETS[0], &encoded)?;
    eeprom.write(SLOT_OFFSETS[1], &encoded)?;
    Ok(())
}

fn read_slot(eeprom: &impl EepromPort, offset: usize) -> Option<Snapshot> {
    let mut buf = [0u8; SNAPSHOT_LEN];
    eeprom.read(offset, &mut buf).ok()?;
    Snapshot::decode(&buf)
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
