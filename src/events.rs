//! Event system bridging the BLE stack task and the main loop.
//!
//! Events are produced by:
//! - Bluedroid GATT callbacks (frame written, connect, disconnect)
//! - The main loop itself (schedule tick)
//!
//! Events are consumed by the main control loop, one at a time, each
//! handler running to completion before the next is serviced.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GATT callback│────▶│              │     │              │
//! │ (BT task)    │     │  Event Queue │────▶│  Main Loop   │
//! │ Tick         │────▶│  (lock-free) │     │  (consumer)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Frame *payloads* do not travel through this queue — the BLE adapter
//! buffers them and the main loop drains
//! [`take_pending_frame`](crate::adapters::ble::BleLinkAdapter::take_pending_frame)
//! when it sees [`Event::FrameReceived`].

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.
const EVENT_QUEUE_CAP: usize = 16;

/// System event types, ordered by rough priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// A central connected.
    ConnectionUp = 0,
    /// The central disconnected; advertising must restart.
    ConnectionDown = 1,
    /// One or more inbound frames are waiting in the BLE adapter.
    FrameReceived = 10,
    /// Schedule evaluation tick (≈1 Hz).
    ScheduleTick = 20,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// The BT task writes (produce), the main loop reads (consume).
// Uses atomic head/tail indices into a static byte buffer.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: one producer (BT task / main loop pushing its own tick) and one
// consumer (main loop).  Each cell is written before the head index that
// publishes it (Release) and read after observing it (Acquire).
static mut EVENT_BUFFER: [u8; EVENT_QUEUE_CAP] = [0; EVENT_QUEUE_CAP];

/// Push an event into the queue.
/// Safe to call from the BT task (lock-free).
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // Queue full — drop event.
    }

    // SAFETY: single producer; the cell at `head` is unpublished until the
    // Release store below.
    unsafe {
        EVENT_BUFFER[head as usize] = event as u8;
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event from the queue.
/// Called from the main loop (single consumer).
/// Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    // SAFETY: single consumer; the cell at `tail` was published by the
    // producer's Release store.
    let raw = unsafe { EVENT_BUFFER[tail as usize] };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Drain all pending events into a callback, FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Number of pending events.
pub fn queue_len() -> usize {
    let head = EVENT_HEAD.load(Ordering::Relaxed) as usize;
    let tail = EVENT_TAIL.load(Ordering::Relaxed) as usize;
    (head + EVENT_QUEUE_CAP - tail) % EVENT_QUEUE_CAP
}

// ── Internal ──────────────────────────────────────────────────

/// The queue is process-wide; tests that exercise it take this lock so the
/// parallel test harness cannot interleave their pushes.
#[cfg(test)]
pub(crate) static TEST_QUEUE_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        0 => Some(Event::ConnectionUp),
        1 => Some(Event::ConnectionDown),
        10 => Some(Event::FrameReceived),
        20 => Some(Event::ScheduleTick),
        _ => None,
    }
}
