//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, publish over a
//! status characteristic, etc.

use crate::proto::command::DispatchError;
use crate::store::{Channel, ChannelState, DeviceTime, LoadOutcome, RuleAction, RuleSlot};

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service has started; relays were driven from the loaded snapshot.
    Started,

    /// The persisted snapshot was loaded (which slot, or reset).
    SnapshotLoaded(LoadOutcome),

    /// A channel changed state in response to a peer command.
    ChannelSwitched {
        channel: Channel,
        state: ChannelState,
    },

    /// A schedule rule slot was (re)programmed.
    ScheduleStored { slot: RuleSlot, action: RuleAction },

    /// A schedule rule fired and switched its owning channel.
    ScheduleFired {
        slot: RuleSlot,
        channel: Channel,
        state: ChannelState,
    },

    /// The device clock was set from a command's timestamp fields.
    ClockSynced(DeviceTime),

    /// An inbound frame failed validation and was answered with an
    /// Error reply.
    CommandRejected(DispatchError),
}
