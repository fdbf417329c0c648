//! Integration tests for the frame dispatch chain.
//!
//! Drives raw 18-byte frames through the public `AppService` API against
//! mock adapters and asserts on state mutation, persistence, relay drive
//! and the reply frames.

use crate::mock_hw::{MockClock, MockEeprom, MockLink, MockRelays, RecordingSink};

use switchbank::app::service::AppService;
use switchbank::store::{
    ChannelState, DeviceTime, RuleAction, Snapshot, SLOT_OFFSETS, SNAPSHOT_LEN,
};

// ── Harness ───────────────────────────────────────────────────

struct Rig {
    app: AppService,
    clock: MockClock,
    eeprom: MockEeprom,
    relays: MockRelays,
    link: MockLink,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self::with_snapshot(Snapshot::default())
    }

    fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            app: AppService::new(snapshot),
            clock: MockClock::at(DeviceTime {
                hour: 12,
                minute: 0,
                second: 0,
                day: 15,
                month: 6,
                year: 24,
            }),
            eeprom: MockEeprom::new(),
            relays: MockRelays::new(),
            link: MockLink::connected(),
            sink: RecordingSink::new(),
        }
    }

    fn handle(&mut self, raw: &[u8]) {
        self.app.handle_frame(
            raw,
            &mut self.clock,
            &mut self.eeprom,
            &mut self.relays,
            &mut self.link,
            &mut self.sink,
        );
    }

    /// Decode the snapshot persisted in a slot.
    fn persisted(&self, slot: usize) -> Option<Snapshot> {
        let offset = SLOT_OFFSETS[slot];
        let bytes: [u8; SNAPSHOT_LEN] = self.eeprom.data[offset..offset + SNAPSHOT_LEN]
            .try_into()
            .unwrap();
        Snapshot::decode(&bytes)
    }
}

/// Build a frame with the standard envelope.
fn frame(cmd: u8, id: u8, hhmmss: &str, ddmmyy: &str) -> [u8; 18] {
    let mut f = [0u8; 18];
    f[0] = b'A';
    f[1] = cmd;
    f[2] = id;
    f[3] = b'-';
    f[4..10].copy_from_slice(hhmmss.as_bytes());
    f[10] = b'-';
    f[11..17].copy_from_slice(ddmmyy.as_bytes());
    f[17] = b'B';
    f
}

// ── Switch commands ───────────────────────────────────────────

#[test]
fn turn_on_switches_persists_drives_and_echoes() {
    let mut rig = Rig::new();
    let request = frame(b'O', b'0', "083000", "150624");
    rig.handle(&request);

    // State and both persisted slots reflect the switch.
    assert_eq!(rig.app.snapshot().channels[0], ChannelState::On);
    assert_eq!(rig.persisted(0).unwrap().channels[0], ChannelState::On);
    assert_eq!(rig.persisted(1).unwrap().channels[0], ChannelState::On);

    // Relay bank driven with channel 0 on, others off.
    assert_eq!(rig.relays.levels, [true, false, false, false]);

    // Clock was synced from the frame's own timestamp.
    assert_eq!(
        rig.clock.adjustments,
        vec![DeviceTime {
            hour: 8,
            minute: 30,
            second: 0,
            day: 15,
            month: 6,
            year: 24,
        }]
    );

    // The reply echoes command + id with the (just-synced) clock time —
    // byte-for-byte the request.
    assert_eq!(rig.link.last_sent(), Some(&request));
    assert!(rig.sink.contains("ChannelSwitched"));
}

#[test]
fn turn_off_echoes_and_clears_channel() {
    let mut snapshot = Snapshot::default();
    snapshot.channels[2] = ChannelState::On;
    let mut rig = Rig::with_snapshot(snapshot);

    rig.handle(&frame(b'F', b'2', "090000", "010124"));

    assert_eq!(rig.app.snapshot().channels[2], ChannelState::Off);
    assert_eq!(rig.relays.levels, [false; 4]);
    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'F');
    assert_eq!(reply[2], b'2');
}

#[test]
fn switch_id_out_of_range_rejected_7_2() {
    let mut rig = Rig::new();
    // Id 5 is a valid target id (0-11) but selects no channel.
    rig.handle(&frame(b'O', b'5', "083000", "150624"));

    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'E');
    assert_eq!(reply[2], b'7');
    assert!(rig.sink.contains("SwitchIdOutOfRange"));
    assert!(rig.app.snapshot().channels.iter().all(|c| !c.is_on()));
    // The piggyback clock-sync still happened before the range check.
    assert_eq!(rig.clock.adjustments.len(), 1);
}

// ── Status ────────────────────────────────────────────────────

#[test]
fn get_status_reports_channel_state_as_command_byte() {
    let mut snapshot = Snapshot::default();
    snapshot.channels[1] = ChannelState::On;
    let mut rig = Rig::with_snapshot(snapshot);

    rig.handle(&frame(b'G', b'1', "120000", "150624"));
    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'O');
    assert_eq!(reply[2], b'1');

    rig.handle(&frame(b'G', b'3', "120000", "150624"));
    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'F');
    assert_eq!(reply[2], b'3');
}

#[test]
fn status_id_out_of_range_rejected_7_3() {
    let mut rig = Rig::new();
    rig.handle(&frame(b'G', b'9', "120000", "150624"));

    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'E');
    assert_eq!(reply[2], b'7');
    assert!(rig.sink.contains("StatusIdOutOfRange"));
}

// ── Validation failures ───────────────────────────────────────

#[test]
fn year_below_21_rejected_4_1_without_mutation() {
    let mut rig = Rig::new();
    rig.handle(&frame(b'O', b'0', "083000", "150620"));

    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'E');
    assert_eq!(reply[2], b'4');
    assert!(rig.sink.contains("InvalidTimestamp"));

    // No state mutation of any kind.
    assert!(rig.app.snapshot().channels.iter().all(|c| !c.is_on()));
    assert!(rig.eeprom.writes.is_empty());
    assert!(rig.relays.calls.is_empty());
    assert!(rig.clock.adjustments.is_empty());
}

#[test]
fn missing_separator_rejected_7_1() {
    let mut rig = Rig::new();
    let mut raw = frame(b'O', b'0', "083000", "150624");
    raw[10] = b'_';
    rig.handle(&raw);

    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'E');
    assert_eq!(reply[2], b'7');
    assert!(rig.sink.contains("MalformedFrame"));
}

#[test]
fn either_separator_missing_is_malformed() {
    // Both positions must hold '-'; one good separator is not enough.
    let mut rig = Rig::new();
    let mut raw = frame(b'O', b'0', "083000", "150624");
    raw[3] = b'+';
    rig.handle(&raw);
    assert_eq!(rig.link.last_sent().unwrap()[1], b'E');
}

#[test]
fn id_outside_target_range_rejected_6_1() {
    let mut rig = Rig::new();
    rig.handle(&frame(b'O', b'<', "083000", "150624"));

    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'E');
    assert_eq!(reply[2], b'6');
    assert!(rig.sink.contains("InvalidId"));
}

#[test]
fn unknown_command_rejected_5_1() {
    let mut rig = Rig::new();
    rig.handle(&frame(b'X', b'0', "083000", "150624"));

    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'E');
    assert_eq!(reply[2], b'5');
    assert!(rig.sink.contains("UnknownCommand"));
}

#[test]
fn non_digit_clock_field_rejected_4_1() {
    let mut rig = Rig::new();
    // Year passes the >= 21 plausibility check only because the parse
    // sentinel (255) is large; the per-field range check then rejects.
    rig.handle(&frame(b'O', b'0', "08x000", "150624"));

    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'E');
    assert_eq!(reply[2], b'4');
    assert!(rig.clock.adjustments.is_empty());
    assert!(rig.app.snapshot().channels.iter().all(|c| !c.is_on()));
}

// ── Framing rejects (silent) ──────────────────────────────────

#[test]
fn wrong_length_dropped_silently() {
    let mut rig = Rig::new();
    rig.handle(b"AO0-083000-150624"); // 17 bytes
    assert!(rig.link.sent.is_empty());
    assert!(rig.sink.events.is_empty());
}

#[test]
fn wrong_markers_dropped_silently() {
    let mut rig = Rig::new();
    let mut raw = frame(b'O', b'0', "083000", "150624");
    raw[0] = b'Z';
    rig.handle(&raw);
    raw = frame(b'O', b'0', "083000", "150624");
    raw[17] = b'Z';
    rig.handle(&raw);

    assert!(rig.link.sent.is_empty());
    assert!(rig.sink.events.is_empty());
}

// ── Schedule programming ──────────────────────────────────────

#[test]
fn schedule_arm_on_stores_rule_and_echoes_stored_fields() {
    let mut rig = Rig::new();
    rig.handle(&frame(b'S', b'5', "083000", "150624"));

    let rule = rig.app.snapshot().rules[5];
    assert_eq!(rule.action, RuleAction::ArmOn);
    assert_eq!(rule.at.hour, 8);
    assert_eq!(rule.at.day, 15);

    // Persisted.
    assert_eq!(rig.persisted(0).unwrap().rules[5], rule);

    // Reply carries the stored fields.
    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'S');
    assert_eq!(reply[2], b'5');
    assert_eq!(&reply[4..10], b"083000");
    assert_eq!(&reply[11..17], b"150624");

    // Schedule programming does not piggyback a clock sync.
    assert!(rig.clock.adjustments.is_empty());
}

#[test]
fn schedule_disable_clears_action_but_keeps_fields() {
    let mut rig = Rig::new();
    rig.handle(&frame(b'P', b';', "220000", "311225"));
    assert_eq!(rig.app.snapshot().rules[11].action, RuleAction::ArmOff);

    rig.handle(&frame(b'D', b';', "220000", "311225"));
    let rule = rig.app.snapshot().rules[11];
    assert_eq!(rule.action, RuleAction::Disabled);
    assert_eq!(rule.at.hour, 22);
}

#[test]
fn schedule_fields_out_of_range_rejected_4_2() {
    let mut rig = Rig::new();
    rig.handle(&frame(b'S', b'5', "256000", "150624"));

    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'E');
    assert_eq!(reply[2], b'4');
    assert!(rig.sink.contains("InvalidScheduleFields"));
    assert_eq!(rig.app.snapshot().rules[5].action, RuleAction::Disabled);
    assert!(rig.eeprom.writes.is_empty());
}

// ── ScheduleRead ──────────────────────────────────────────────

#[test]
fn schedule_read_returns_action_without_touching_time_fields() {
    let mut rig = Rig::new();

    // Program rule 5 for 01:02:03 04.05.21.
    rig.handle(&frame(b'S', b'5', "010203", "040521"));

    // An unrelated switch reply rewrites the transmit buffer's time
    // fields with the synced clock (10:11:12 13.07.24).
    rig.handle(&frame(b'O', b'0', "101112", "130724"));

    // ScheduleRead replies with the stored action byte but leaves the
    // previous reply's time fields in place — neither the rule's fields
    // nor this frame's own timestamp appear.
    rig.handle(&frame(b'R', b'5', "202122", "230825"));

    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'S', "stored action state");
    assert_eq!(reply[2], b'5');
    assert_eq!(&reply[4..10], b"101112", "left over from previous reply");
    assert_eq!(&reply[11..17], b"130724");

    // The read still piggybacked its clock sync.
    assert_eq!(
        rig.clock.now,
        DeviceTime {
            hour: 20,
            minute: 21,
            second: 22,
            day: 23,
            month: 8,
            year: 25,
        }
    );
}

#[test]
fn schedule_read_of_unprogrammed_slot_reports_disabled() {
    let mut rig = Rig::new();
    rig.handle(&frame(b'R', b'7', "120000", "150624"));
    let reply = rig.link.last_sent().unwrap();
    assert_eq!(reply[1], b'D');
    assert_eq!(reply[2], b'7');
}

// ── Connectivity and degradation ──────────────────────────────

#[test]
fn reply_dropped_when_disconnected_but_command_executes() {
    let mut rig = Rig::new();
    rig.link = MockLink::disconnected();

    rig.handle(&frame(b'O', b'1', "083000", "150624"));

    assert!(rig.link.sent.is_empty(), "no queueing, no retry");
    assert_eq!(rig.app.snapshot().channels[1], ChannelState::On);
    assert_eq!(rig.persisted(0).unwrap().channels[1], ChannelState::On);
}

#[test]
fn eeprom_write_failure_degrades_without_blocking_the_reply() {
    let mut rig = Rig::new();
    rig.eeprom.fail_writes = true;

    rig.handle(&frame(b'O', b'0', "083000", "150624"));

    // In-memory state stays authoritative and the peer still gets its echo.
    assert_eq!(rig.app.snapshot().channels[0], ChannelState::On);
    assert_eq!(rig.link.last_sent().unwrap()[1], b'O');
}
