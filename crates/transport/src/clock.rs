use timeline_tempo::{TimeContext, clamp_seconds};

use crate::PlayheadAuthority;

/// The value carried by a clock write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockWrite {
    Tick(u64),
    Seconds(f64),
}

/// Conditions under which a write is arbitrated.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WriteGuard {
    pub paused: bool,
    /// `(start, end)` when looping is active with both bounds set.
    pub loop_range: Option<(u64, u64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct WriteOutcome {
    pub accepted: bool,
    pub moved: bool,
    pub wrapped: bool,
}

/// The single authoritative playhead.
///
/// `current_time_sec` is a derived mirror of `current_tick` and is rewritten on
/// every accepted write, so the two never disagree once a write returns.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalClock {
    current_tick: u64,
    authority: PlayheadAuthority,
    current_time_sec: f64,
}

impl CanonicalClock {
    pub fn new() -> Self {
        Self {
            current_tick: 0,
            authority: PlayheadAuthority::Tick,
            current_time_sec: 0.0,
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn authority(&self) -> PlayheadAuthority {
        self.authority
    }

    pub fn current_time_sec(&self) -> f64 {
        self.current_time_sec
    }

    pub(crate) fn write(
        &mut self,
        write: ClockWrite,
        authority: PlayheadAuthority,
        guard: WriteGuard,
        ctx: &TimeContext,
    ) -> WriteOutcome {
        let requested = match authority {
            // A seconds-domain writer owns the value: the tick is derived from
            // its seconds, never the other way around.
            PlayheadAuthority::Seconds => {
                let seconds = match write {
                    ClockWrite::Seconds(seconds) => clamp_seconds(seconds),
                    ClockWrite::Tick(tick) => ctx.ticks_to_seconds(tick),
                };
                ctx.seconds_to_ticks(seconds)
            }
            PlayheadAuthority::Tick | PlayheadAuthority::Clock | PlayheadAuthority::User => {
                match write {
                    ClockWrite::Tick(tick) => tick,
                    ClockWrite::Seconds(seconds) => ctx.seconds_to_ticks(seconds),
                }
            }
        };

        // An idle render loop re-submitting the paused position must not
        // touch anything, authority included.
        if authority == PlayheadAuthority::Clock && guard.paused && requested == self.current_tick {
            return WriteOutcome::default();
        }

        let mut tick = requested;
        let mut wrapped = false;
        if let Some((start, end)) = guard.loop_range {
            if tick > end {
                tick = start;
                wrapped = true;
            }
        }

        let moved = tick != self.current_tick;
        self.current_tick = tick;
        self.authority = authority;
        self.current_time_sec = ctx.ticks_to_seconds(tick);

        WriteOutcome {
            accepted: true,
            moved,
            wrapped,
        }
    }

    /// Re-derive the seconds mirror after the tempo context changed.
    pub(crate) fn resync(&mut self, ctx: &TimeContext) {
        self.current_time_sec = ctx.ticks_to_seconds(self.current_tick);
    }
}

impl Default for CanonicalClock {
    fn default() -> Self {
        Self::new()
    }
}
