//! Relay bank adapter.
//!
//! Implements [`RelayPort`] by composing four [`RelayDriver`]s, one per
//! output channel, wired to the GPIOs in [`pins`](crate::pins).

use log::info;

use crate::app::ports::RelayPort;
use crate::drivers::relay::RelayDriver;
use crate::pins;
use crate::store::{Channel, CHANNEL_COUNT};

pub struct RelayBankAdapter {
    relays: [RelayDriver; CHANNEL_COUNT],
}

impl RelayBankAdapter {
    pub fn new() -> Self {
        Self {
            relays: pins::RELAY_GPIOS.map(RelayDriver::new),
        }
    }

    /// Logical level of every channel, for diagnostics.
    pub fn levels(&self) -> [bool; CHANNEL_COUNT] {
        [
            self.relays[0].is_energised(),
            self.relays[1].is_energised(),
            self.relays[2].is_energised(),
            self.relays[3].is_energised(),
        ]
    }
}

impl Default for RelayBankAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayPort for RelayBankAdapter {
    fn set_channel(&mut self, channel: Channel, on: bool) {
        let relay = &mut self.relays[channel.index()];
        if relay.is_energised() != on {
            info!(
                "relay: channel {} -> {}",
                channel.index(),
                if on { "ON" } else { "OFF" }
            );
        }
        relay.set(on);
    }
}
