//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => {
                info!("START | outputs driven from snapshot");
            }
            AppEvent::SnapshotLoaded(outcome) => {
                info!("STORE | loaded via {:?}", outcome);
            }
            AppEvent::ChannelSwitched { channel, state } => {
                info!("SWITCH | channel {} -> {:?}", channel.index(), state);
            }
            AppEvent::ScheduleStored { slot, action } => {
                info!("SCHED | slot {} stored as {:?}", slot.index(), action);
            }
            AppEvent::ScheduleFired {
                slot,
                channel,
                state,
            } => {
                info!(
                    "SCHED | slot {} fired, channel {} -> {:?}",
                    slot.index(),
                    channel.index(),
                    state
                );
            }
            AppEvent::ClockSynced(t) => {
                info!(
                    "CLOCK | set to {:02}:{:02}:{:02} {:02}.{:02}.{:02}",
                    t.hour, t.minute, t.second, t.day, t.month, t.year
                );
            }
            AppEvent::CommandRejected(reject) => {
                let (major, minor) = reject.code();
                warn!("REJECT | E{}-{} ({})", major, minor, reject);
            }
        }
    }
}
