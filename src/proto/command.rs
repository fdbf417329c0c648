//! Command-byte mapping and the dispatch rejection taxonomy.
//!
//! Commands are a closed enumeration with exactly one decode function from
//! wire byte to variant and one encode function back; nothing else in the
//! crate compares raw command bytes.

use core::fmt;

use crate::store::RuleAction;

/// Wire byte of an Error reply.
pub const ERROR_WIRE: u8 = b'E';

/// Every command a peer can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Switch a channel on.
    TurnOn,
    /// Switch a channel off.
    TurnOff,
    /// Report a channel's current state.
    GetStatus,
    /// Program a rule slot to switch its channel on.
    ScheduleArmOn,
    /// Program a rule slot to switch its channel off.
    ScheduleArmOff,
    /// Disable a rule slot.
    ScheduleDisable,
    /// Report a rule slot's stored action.
    ScheduleRead,
}

impl Command {
    /// Decode a wire command byte.  `None` for unrecognized bytes.
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            b'O' => Some(Self::TurnOn),
            b'F' => Some(Self::TurnOff),
            b'G' => Some(Self::GetStatus),
            b'S' => Some(Self::ScheduleArmOn),
            b'P' => Some(Self::ScheduleArmOff),
            b'D' => Some(Self::ScheduleDisable),
            b'R' => Some(Self::ScheduleRead),
            _ => None,
        }
    }

    /// Encode back to the wire byte.
    pub fn wire(self) -> u8 {
        match self {
            Self::TurnOn => b'O',
            Self::TurnOff => b'F',
            Self::GetStatus => b'G',
            Self::ScheduleArmOn => b'S',
            Self::ScheduleArmOff => b'P',
            Self::ScheduleDisable => b'D',
            Self::ScheduleRead => b'R',
        }
    }

    /// Whether this command carries a clock-sync side effect: its own
    /// timestamp fields set the device clock before dispatch.
    pub fn sets_clock(self) -> bool {
        matches!(
            self,
            Self::TurnOn | Self::TurnOff | Self::GetStatus | Self::ScheduleRead
        )
    }

    /// The rule action a schedule-programming command stores.
    pub fn schedule_action(self) -> Option<RuleAction> {
        match self {
            Self::ScheduleArmOn => Some(RuleAction::ArmOn),
            Self::ScheduleArmOff => Some(RuleAction::ArmOff),
            Self::ScheduleDisable => Some(RuleAction::Disabled),
            _ => None,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Rejections
// ───────────────────────────────────────────────────────────────

/// A validation failure reported back to the peer as an Error frame.
///
/// Each variant carries a `major-minor` sub-code; the Error reply's id
/// byte is ASCII `'0' + major`, and the full code appears in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// A separator position did not hold `'-'`.
    MalformedFrame,
    /// Year field below 21, or an out-of-range clock-sync timestamp.
    InvalidTimestamp,
    /// Target id byte outside `'0'`–`';'`.
    InvalidId,
    /// TurnOn/TurnOff id selects no channel (≥ 4).
    SwitchIdOutOfRange,
    /// GetStatus id selects no channel (≥ 4).
    StatusIdOutOfRange,
    /// Out-of-range schedule time fields.
    InvalidScheduleFields,
    /// Unrecognized command byte.
    UnknownCommand,
}

impl DispatchError {
    /// The `(major, minor)` sub-code pair.
    pub fn code(self) -> (u8, u8) {
        match self {
            Self::MalformedFrame => (7, 1),
            Self::InvalidTimestamp => (4, 1),
            Self::InvalidId => (6, 1),
            Self::SwitchIdOutOfRange => (7, 2),
            Self::StatusIdOutOfRange => (7, 3),
            Self::InvalidScheduleFields => (4, 2),
            Self::UnknownCommand => (5, 1),
        }
    }

    /// Id byte of the Error reply frame (`'0' + major`).
    pub fn reply_id(self) -> u8 {
        b'0' + self.code().0
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedFrame => write!(f, "missing separator"),
            Self::InvalidTimestamp => write!(f, "implausible timestamp"),
            Self::InvalidId => write!(f, "id outside 0-11"),
            Self::SwitchIdOutOfRange => write!(f, "switch id selects no channel"),
            Self::StatusIdOutOfRange => write!(f, "status id selects no channel"),
            Self::InvalidScheduleFields => write!(f, "schedule fields out of range"),
            Self::UnknownCommand => write!(f, "unknown command byte"),
        }
    }
}
