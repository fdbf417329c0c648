//! Fuzz target: `RawFrame::decode`
//!
//! Drives arbitrary byte sequences into the frame decoder and asserts
//! that it never panics and only accepts exact 18-byte marker-framed
//! input.  Accepted frames must survive a field-level re-encode.
//!
//! cargo fuzz run fuzz_frame_codec

#![no_main]

use libfuzzer_sys::fuzz_target;
use switchbank::proto::frame::{RawFrame, TxFrame, FRAME_LEN};

fuzz_target!(|data: &[u8]| {
    let Some(frame) = RawFrame::decode(data) else {
        return;
    };

    // Framing invariants on anything the decoder accepts.
    assert_eq!(data.len(), FRAME_LEN);
    assert_eq!(data[0], b'A');
    assert_eq!(data[FRAME_LEN - 1], b'B');

    // Field accessors must not panic on arbitrary interior bytes.
    let _ = frame.separators_ok();
    let _ = (frame.command_byte(), frame.id_byte());

    // If the time fields parse, re-encoding them must reproduce the
    // original field bytes.
    if let Some(t) = frame.parse_time() {
        let mut tx = TxFrame::new();
        tx.set_reply(frame.command_byte(), frame.id_byte());
        tx.set_time_fields(&t);
        assert_eq!(&tx.bytes()[4..10], &data[4..10]);
        assert_eq!(&tx.bytes()[11..17], &data[11..17]);
    }
});
