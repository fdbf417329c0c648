//! Fuzz target: `Snapshot::decode`
//!
//! Feeds arbitrary 89-byte slots into the snapshot decoder and asserts
//! that it never panics and that anything it accepts re-encodes to a
//! checksum-valid snapshot.
//!
//! cargo fuzz run fuzz_snapshot_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use switchbank::store::{Snapshot, SNAPSHOT_LEN};

fuzz_target!(|data: &[u8]| {
    if data.len() < SNAPSHOT_LEN {
        return;
    }
    let slot: [u8; SNAPSHOT_LEN] = data[..SNAPSHOT_LEN].try_into().unwrap();

    let Some(snapshot) = Snapshot::decode(&slot) else {
        return;
    };

    // Decoded snapshots always re-encode to something decodable —
    // normalization (unknown state/action bytes) is idempotent.
    let encoded = snapshot.encode();
    assert_eq!(Snapshot::decode(&encoded), Some(snapshot));
});
