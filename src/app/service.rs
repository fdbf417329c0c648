//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the authoritative [`Snapshot`] and the reusable
//! transmit buffer.  It exposes two entry points, matching the two external
//! triggers of the device:
//!
//! ```text
//!  BLE frame ──▶ handle_frame ──▶ validate · dispatch · persist · reply
//!  host tick ──▶ tick ──────────▶ schedule match · persist · notify
//! ```
//!
//! All I/O flows through port traits injected at call sites, making the
//! entire service testable with mock adapters.

use log::{debug, info, warn};

use crate::proto::command::{Command, DispatchError, ERROR_WIRE};
use crate::proto::frame::{RawFrame, TxFrame};
use crate::schedule;
use crate::store::{Channel, ChannelState, RuleSlot, ScheduleRule, Snapshot};

use super::events::AppEvent;
use super::ports::{ClockPort, EepromPort, EventSink, LinkPort, RelayPort};

/// Smallest two-digit year a frame may carry.  The first units shipped in
/// 2021; anything earlier means the peer's clock is unset.
const MIN_YEAR: u8 = 21;

/// Which time fields a reply carries.
#[derive(Debug, Clone, Copy)]
enum ReplyTime {
    /// Current clock reading (switch, status and error replies).
    Clock,
    /// The stored trigger time of a rule slot (schedule-programming replies).
    Rule(RuleSlot),
    /// Leave the transmit buffer's time fields as the previous reply wrote
    /// them (ScheduleRead — inherited wire behavior, see [`TxFrame`]).
    Untouched,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    snapshot: Snapshot,
    tx: TxFrame,
    tick_count: u64,
}

impl AppService {
    /// Construct the service around a snapshot loaded by
    /// [`store::load`](crate::store::load).
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            tx: TxFrame::new(),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive every relay from the loaded snapshot.  Called once at boot so
    /// outputs resume their persisted state before any frame is handled.
    pub fn start(&mut self, relays: &mut impl RelayPort, sink: &mut impl EventSink) {
        self.apply_relays(relays);
        sink.emit(&AppEvent::Started);
        info!(
            "AppService started; channels {:?}",
            self.snapshot.channels
        );
    }

    // ── Inbound frames ────────────────────────────────────────

    /// Handle one raw inbound frame: decode, validate, execute, reply.
    ///
    /// Framing failures (wrong length or markers) are dropped silently;
    /// every validation failure past framing is answered with an Error
    /// reply carrying its sub-code.  Runs to completion — there is no
    /// cancellation or retry on any path.
    pub fn handle_frame(
        &mut self,
        raw: &[u8],
        clock: &mut impl ClockPort,
        eeprom: &mut impl EepromPort,
        relays: &mut impl RelayPort,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) {
        let Some(frame) = RawFrame::decode(raw) else {
            debug!("dispatch: dropping {}-byte non-frame", raw.len());
            return;
        };

        if let Err(reject) = self.dispatch(&frame, clock, eeprom, relays, link, sink) {
            let (major, minor) = reject.code();
            warn!("dispatch: E{major}-{minor} ({reject})");
            sink.emit(&AppEvent::CommandRejected(reject));
            self.reply(ERROR_WIRE, reject.reply_id(), ReplyTime::Clock, clock, link);
        }
    }

    fn dispatch(
        &mut self,
        frame: &RawFrame,
        clock: &mut impl ClockPort,
        eeprom: &mut impl EepromPort,
        relays: &mut impl RelayPort,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Result<(), DispatchError> {
        // 1. Structural validation: both separators must hold '-'.
        if !frame.separators_ok() {
            return Err(DispatchError::MalformedFrame);
        }

        // 2. Timestamp plausibility.  The two-digit parse sentinel (255)
        //    passes this check; it is caught by the range checks below.
        if frame.year() < MIN_YEAR {
            return Err(DispatchError::InvalidTimestamp);
        }

        // 3. Target id must represent 0–11.
        let slot =
            RuleSlot::from_ascii(frame.id_byte()).ok_or(DispatchError::InvalidId)?;

        let command = Command::from_wire(frame.command_byte());

        // 4. Clock-sync side effect: switch/status/read commands carry the
        //    peer's current time and set the device clock before executing.
        if command.is_some_and(Command::sets_clock) {
            let t = frame.parse_time().ok_or(DispatchError::InvalidTimestamp)?;
            clock.set(t);
            sink.emit(&AppEvent::ClockSynced(t));
        }

        // 5. Dispatch by command kind.
        match command {
            Some(cmd @ (Command::TurnOn | Command::TurnOff)) => {
                let channel = Channel::from_ascii(frame.id_byte())
                    .ok_or(DispatchError::SwitchIdOutOfRange)?;
                let state = match cmd {
                    Command::TurnOn => ChannelState::On,
                    _ => ChannelState::Off,
                };
                self.snapshot.set_channel(channel, state);
                self.persist(eeprom);
                self.apply_relays(relays);
                sink.emit(&AppEvent::ChannelSwitched { channel, state });
                self.reply(cmd.wire(), frame.id_byte(), ReplyTime::Clock, clock, link);
            }

            Some(Command::GetStatus) => {
                let channel = Channel::from_ascii(frame.id_byte())
                    .ok_or(DispatchError::StatusIdOutOfRange)?;
                let state = self.snapshot.channel(channel);
                self.reply(state.wire(), frame.id_byte(), ReplyTime::Clock, clock, link);
            }

            Some(
                cmd @ (Command::ScheduleArmOn
                | Command::ScheduleArmOff
                | Command::ScheduleDisable),
            ) => {
                let at = frame
                    .parse_time()
                    .ok_or(DispatchError::InvalidScheduleFields)?;
                // schedule_action is Some for exactly these three commands.
                let Some(action) = cmd.schedule_action() else {
                    return Err(DispatchError::UnknownCommand);
                };
                self.snapshot.set_rule(slot, ScheduleRule { at, action });
                self.persist(eeprom);
                sink.emit(&AppEvent::ScheduleStored { slot, action });
                self.reply(
                    cmd.wire(),
                    frame.id_byte(),
                    ReplyTime::Rule(slot),
                    clock,
                    link,
                );
            }

            Some(Command::ScheduleRead) => {
                let action = self.snapshot.rule(slot).action;
                self.reply(
                    action.wire(),
                    frame.id_byte(),
                    ReplyTime::Untouched,
                    clock,
                    link,
                );
            }

            None => return Err(DispatchError::UnknownCommand),
        }

        Ok(())
    }

    // ── Per-tick schedule evaluation ──────────────────────────

    /// Run one schedule evaluation against the current clock reading.
    ///
    /// For every rule that fires: persist the snapshot, re-drive the relay
    /// bank, and — if a central is connected — notify it with a frame
    /// echoing the new channel state.
    pub fn tick(
        &mut self,
        clock: &mut impl ClockPort,
        eeprom: &mut impl EepromPort,
        relays: &mut impl RelayPort,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let now = clock.now();
        let firings = schedule::evaluate(&now, &mut self.snapshot);

        for firing in &firings {
            self.persist(eeprom);
            self.apply_relays(relays);
            sink.emit(&AppEvent::ScheduleFired {
                slot: firing.slot,
                channel: firing.channel,
                state: firing.state,
            });
            self.reply(
                firing.state.wire(),
                firing.channel.digit(),
                ReplyTime::Clock,
                clock,
                link,
            );
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// The authoritative channel/schedule state.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Total schedule ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    /// Build the reply in the persistent transmit buffer and send it if a
    /// central is connected; otherwise drop it (no queueing, no retry).
    fn reply(
        &mut self,
        command: u8,
        id: u8,
        time: ReplyTime,
        clock: &mut impl ClockPort,
        link: &mut impl LinkPort,
    ) {
        self.tx.set_reply(command, id);
        match time {
            ReplyTime::Clock => self.tx.set_time_fields(&clock.now()),
            ReplyTime::Rule(slot) => {
                let rule = self.snapshot.rule(slot);
                self.tx.set_time_fields(&rule.at);
            }
            ReplyTime::Untouched => {}
        }

        if link.is_connected() {
            if let Err(e) = link.send(self.tx.bytes()) {
                warn!("link: send failed: {e}");
            }
        } else {
            debug!("link: not connected, dropping reply");
        }
    }

    /// Persist the snapshot.  A failed write is logged and not retried;
    /// the in-memory snapshot stays authoritative.
    fn persist(&mut self, eeprom: &mut impl EepromPort) {
        if let Err(e) = crate::store::save(eeprom, &self.snapshot) {
            warn!("store: save failed: {e}");
        }
    }

    /// Drive all four relays from the snapshot.
    fn apply_relays(&self, relays: &mut impl RelayPort) {
        for (index, state) in self.snapshot.channels.iter().enumerate() {
            if let Some(channel) = Channel::from_index(index) {
                relays.set_channel(channel, state.is_on());
            }
        }
    }
}
