//! Integration tests for the dual-slot persistent store.

use crate::mock_hw::MockEeprom;

use switchbank::store::{
    self, ChannelState, DeviceTime, LoadOutcome, RuleAction, RuleSlot, ScheduleRule, Snapshot,
    SLOT_OFFSETS, SNAPSHOT_LEN,
};

fn sample_snapshot() -> Snapshot {
    let mut snapshot = Snapshot::default();
    snapshot.channels[0] = ChannelState::On;
    snapshot.channels[3] = ChannelState::On;
    snapshot.set_rule(
        RuleSlot::from_index(7).unwrap(),
        ScheduleRule {
            at: DeviceTime {
                hour: 6,
                minute: 45,
                second: 30,
                day: 1,
                month: 9,
                year: 26,
            },
            action: RuleAction::ArmOff,
        },
    );
    snapshot
}

#[test]
fn save_then_load_returns_the_same_snapshot() {
    let mut eeprom = MockEeprom::new();
    let snapshot = sample_snapshot();
    store::save(&mut eeprom, &snapshot).unwrap();

    let (loaded, outcome) = store::load(&mut eeprom);
    assert_eq!(loaded, snapshot);
    assert_eq!(outcome, LoadOutcome::Primary);
}

#[test]
fn save_writes_identical_bytes_to_both_slots() {
    let mut eeprom = MockEeprom::new();
    store::save(&mut eeprom, &sample_snapshot()).unwrap();

    assert_eq!(
        eeprom.data[SLOT_OFFSETS[0]..SLOT_OFFSETS[0] + SNAPSHOT_LEN],
        eeprom.data[SLOT_OFFSETS[1]..SLOT_OFFSETS[1] + SNAPSHOT_LEN]
    );
    assert_eq!(eeprom.writes, vec![SLOT_OFFSETS[0], SLOT_OFFSETS[1]]);
}

#[test]
fn corrupt_primary_slot_falls_back_to_backup() {
    let mut eeprom = MockEeprom::new();
    let snapshot = sample_snapshot();
    store::save(&mut eeprom, &snapshot).unwrap();

    // Torn write: flip one byte inside slot 0.
    eeprom.data[SLOT_OFFSETS[0] + 2] ^= 0xFF;

    let (loaded, outcome) = store::load(&mut eeprom);
    assert_eq!(loaded, snapshot);
    assert_eq!(outcome, LoadOutcome::Backup);
}

#[test]
fn both_slots_corrupt_resets_to_default_and_persists() {
    let mut eeprom = MockEeprom::new();
    // Fill both slot regions with garbage that cannot checksum.
    for offset in SLOT_OFFSETS {
        for i in 0..SNAPSHOT_LEN {
            eeprom.data[offset + i] = 0x5A;
        }
        eeprom.data[offset + SNAPSHOT_LEN - 1] = 0x00;
    }

    let (loaded, outcome) = store::load(&mut eeprom);
    assert_eq!(loaded, Snapshot::default());
    assert_eq!(outcome, LoadOutcome::Reset);

    // The reset was persisted: a second load is a clean primary hit.
    let (reloaded, outcome) = store::load(&mut eeprom);
    assert_eq!(reloaded, Snapshot::default());
    assert_eq!(outcome, LoadOutcome::Primary);
}

#[test]
fn valid_primary_wins_over_differently_valid_backup() {
    // The store does not version slots: a checksum-valid slot 0 is
    // authoritative even when slot 1 holds different (also valid) data.
    let mut eeprom = MockEeprom::new();
    let primary = sample_snapshot();
    let mut backup = Snapshot::default();
    backup.channels[1] = ChannelState::On;

    let enc_primary = primary.encode();
    let enc_backup = backup.encode();
    eeprom.data[SLOT_OFFSETS[0]..SLOT_OFFSETS[0] + SNAPSHOT_LEN].copy_from_slice(&enc_primary);
    eeprom.data[SLOT_OFFSETS[1]..SLOT_OFFSETS[1] + SNAPSHOT_LEN].copy_from_slice(&enc_backup);

    let (loaded, outcome) = store::load(&mut eeprom);
    assert_eq!(loaded, primary);
    assert_eq!(outcome, LoadOutcome::Primary);
}

#[test]
fn blank_eeprom_loads_as_default() {
    // An all-zero block passes its checksum (zero body XORs to zero) and
    // normalizes to all-Off channels and Disabled rules, so a factory
    // blank behaves exactly like the default snapshot.
    let mut eeprom = MockEeprom::new();
    let (loaded, _outcome) = store::load(&mut eeprom);
    assert_eq!(loaded, Snapshot::default());
}
