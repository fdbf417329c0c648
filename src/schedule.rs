//! Schedule engine — exact-second matching of the twelve rule slots.
//!
//! Invoked once per tick by the host loop.  A rule fires when it is armed
//! and its stored trigger time equals the current clock reading on all six
//! fields — a whole-second exact match, not a range.  Firing mutates the
//! owning channel in the snapshot; persisting, relay drive and peer
//! notification are the caller's job (see
//! [`AppService::tick`](crate::app::service::AppService::tick)).
//!
//! A rule that matches will fire on *every* evaluation that still observes
//! the same second.  Callers must guarantee at most one evaluation per
//! distinct second (the main loop ticks at `tick_interval_ms` ≥ 1000).

use crate::store::{
    Channel, ChannelState, DeviceTime, RuleAction, RuleSlot, Snapshot, RULE_COUNT,
};

/// One rule firing produced by [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firing {
    pub slot: RuleSlot,
    pub channel: Channel,
    pub state: ChannelState,
}

/// Scan all rule slots against `now`, switching the owning channel of every
/// armed rule whose trigger time matches exactly.  Returns the firings in
/// slot order.
pub fn evaluate(now: &DeviceTime, snapshot: &mut Snapshot) -> heapless::Vec<Firing, RULE_COUNT> {
    let mut firings = heapless::Vec::new();

    for index in 0..RULE_COUNT {
        // Index is always in range.
        let Some(slot) = RuleSlot::from_index(index) else {
            continue;
        };
        let rule = snapshot.rule(slot);
        if !rule.action.is_armed() || rule.at != *now {
            continue;
        }

        let channel = slot.owning_channel();
        let state = match rule.action {
            RuleAction::ArmOn => ChannelState::On,
            _ => ChannelState::Off,
        };
        snapshot.set_channel(channel, state);

        log::info!(
            "schedule: slot {} fired, channel {} -> {:?}",
            slot.index(),
            channel.index(),
            state
        );
        // Capacity equals RULE_COUNT, one entry per slot.
        let _ = firings.push(Firing {
            slot,
            channel,
            state,
        });
    }

    firings
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
