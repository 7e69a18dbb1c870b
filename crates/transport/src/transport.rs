use timeline_tempo::{TimeContext, clamp_tick};

use crate::clock::{CanonicalClock, ClockWrite, WriteGuard};
use crate::{PlayheadAuthority, QuantizeMode, TransportState};

/// Everything that can change the transport or the playhead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SetCurrentTick { tick: i64, authority: PlayheadAuthority },
    /// Legacy seconds-domain write; lands with [`PlayheadAuthority::Seconds`].
    SetCurrentSeconds { seconds: f64 },
    Play,
    Pause,
    TogglePlay,
    SeekTick { tick: i64 },
    SetLoopEnabled(bool),
    SetLoopRange { start: Option<i64>, end: Option<i64> },
    SetQuantize(QuantizeMode),
    SetRate(f64),
    /// Leave the transient seeking state for whatever state preceded it.
    Settle,
    /// Re-derive the seconds mirror after the tempo context changed.
    Resync,
}

/// Result of applying a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    /// Whether any observable transport or clock field differs afterwards.
    pub changed: bool,
    /// Set when the playhead was explicitly repositioned; the frame clock
    /// must reset its fractional accumulator in lockstep.
    pub reposition: Option<u64>,
}

impl Transition {
    pub fn unchanged() -> Self {
        Self::default()
    }
}

/// Transport state machine layered over the [`CanonicalClock`].
///
/// Every mutation goes through [`Transport::apply`], which computes all
/// derived fields as part of the same update.
#[derive(Debug, Clone, PartialEq)]
pub struct Transport {
    clock: CanonicalClock,
    state: TransportState,
    /// State to return to when a seek settles.
    resume_state: TransportState,
    loop_enabled: bool,
    loop_start_tick: Option<u64>,
    loop_end_tick: Option<u64>,
    quantize: QuantizeMode,
    rate: f64,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            clock: CanonicalClock::new(),
            state: TransportState::Idle,
            resume_state: TransportState::Idle,
            loop_enabled: false,
            loop_start_tick: None,
            loop_end_tick: None,
            quantize: QuantizeMode::Off,
            rate: 1.0,
        }
    }

    pub fn apply(&mut self, command: Command, ctx: &TimeContext) -> Transition {
        let before = self.clone();

        let reposition = match command {
            Command::SetCurrentTick { tick, authority } => {
                self.write(ClockWrite::Tick(clamp_tick(tick)), authority, ctx)
            }
            Command::SetCurrentSeconds { seconds } => {
                self.write(ClockWrite::Seconds(seconds), PlayheadAuthority::Seconds, ctx)
            }
            Command::Play => self.start(ctx),
            Command::Pause => {
                self.state = TransportState::Paused;
                self.resume_state = TransportState::Paused;
                None
            }
            Command::TogglePlay => {
                if self.is_playing() {
                    self.state = TransportState::Paused;
                    self.resume_state = TransportState::Paused;
                    None
                } else {
                    self.start(ctx)
                }
            }
            Command::SeekTick { tick } => {
                if self.state != TransportState::Seeking {
                    self.resume_state = self.state;
                }
                self.write(ClockWrite::Tick(clamp_tick(tick)), PlayheadAuthority::User, ctx);
                self.state = TransportState::Seeking;
                Some(self.clock.current_tick())
            }
            Command::SetLoopEnabled(enabled) => {
                self.loop_enabled = enabled;
                None
            }
            Command::SetLoopRange { start, end } => {
                self.set_loop_range(start.map(clamp_tick), end.map(clamp_tick));
                None
            }
            Command::SetQuantize(mode) => {
                self.quantize = mode;
                None
            }
            Command::SetRate(rate) => {
                self.rate = sanitize_rate(rate);
                None
            }
            Command::Settle => {
                if self.state == TransportState::Seeking {
                    self.state = self.resume_state;
                }
                None
            }
            Command::Resync => {
                self.clock.resync(ctx);
                None
            }
        };

        if before.state != self.state {
            log::debug!("transport {:?} -> {:?}", before.state, self.state);
        }

        Transition {
            changed: *self != before,
            reposition,
        }
    }

    pub fn set_current_tick(
        &mut self,
        tick: i64,
        authority: PlayheadAuthority,
        ctx: &TimeContext,
    ) -> Transition {
        self.apply(Command::SetCurrentTick { tick, authority }, ctx)
    }

    pub fn set_current_seconds(&mut self, seconds: f64, ctx: &TimeContext) -> Transition {
        self.apply(Command::SetCurrentSeconds { seconds }, ctx)
    }

    pub fn play(&mut self, ctx: &TimeContext) -> Transition {
        self.apply(Command::Play, ctx)
    }

    pub fn pause(&mut self, ctx: &TimeContext) -> Transition {
        self.apply(Command::Pause, ctx)
    }

    pub fn toggle_play(&mut self, ctx: &TimeContext) -> Transition {
        self.apply(Command::TogglePlay, ctx)
    }

    pub fn seek_tick(&mut self, tick: i64, ctx: &TimeContext) -> Transition {
        self.apply(Command::SeekTick { tick }, ctx)
    }

    pub fn clock(&self) -> &CanonicalClock {
        &self.clock
    }

    pub fn current_tick(&self) -> u64 {
        self.clock.current_tick()
    }

    pub fn current_time_sec(&self) -> f64 {
        self.clock.current_time_sec()
    }

    pub fn authority(&self) -> PlayheadAuthority {
        self.clock.authority()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn loop_start_tick(&self) -> Option<u64> {
        self.loop_start_tick
    }

    pub fn loop_end_tick(&self) -> Option<u64> {
        self.loop_end_tick
    }

    /// The active loop as `(start, end)`, only when looping is enabled and both
    /// bounds are set.
    pub fn loop_range(&self) -> Option<(u64, u64)> {
        if !self.loop_enabled {
            return None;
        }
        self.loop_start_tick.zip(self.loop_end_tick)
    }

    pub fn quantize(&self) -> QuantizeMode {
        self.quantize
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    fn write(
        &mut self,
        write: ClockWrite,
        authority: PlayheadAuthority,
        ctx: &TimeContext,
    ) -> Option<u64> {
        let guard = WriteGuard {
            paused: self.state == TransportState::Paused,
            loop_range: self.loop_range(),
        };
        let outcome = self.clock.write(write, authority, guard, ctx);

        let external = match authority {
            PlayheadAuthority::Clock => false,
            PlayheadAuthority::Tick | PlayheadAuthority::Seconds | PlayheadAuthority::User => true,
        };

        if outcome.wrapped || (external && outcome.moved) {
            Some(self.clock.current_tick())
        } else {
            None
        }
    }

    /// Transition into playing. Quantize snaps the playhead down to the
    /// previous boundary so starting playback never jumps forward.
    fn start(&mut self, ctx: &TimeContext) -> Option<u64> {
        if self.is_playing() {
            return None;
        }

        let mut reposition = None;
        if let Some(unit) = self.quantize.unit_ticks(ctx.beats_per_bar()) {
            let current = self.clock.current_tick();
            let snapped = current - current % unit;
            if snapped != current {
                self.write(ClockWrite::Tick(snapped), PlayheadAuthority::Clock, ctx);
                reposition = Some(self.clock.current_tick());
            }
        }

        self.state = TransportState::Playing;
        self.resume_state = TransportState::Playing;
        reposition
    }

    fn set_loop_range(&mut self, start: Option<u64>, end: Option<u64>) {
        match (start, end) {
            (Some(start), Some(end)) if start > end => {
                log::debug!("loop range {start}..{end} reversed; swapping");
                self.loop_start_tick = Some(end);
                self.loop_end_tick = Some(start);
            }
            _ => {
                self.loop_start_tick = start;
                self.loop_end_tick = end;
            }
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        log::debug!("invalid rate {rate} replaced with 1.0");
        1.0
    }
}
