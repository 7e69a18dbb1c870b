use timeline_tempo::{PPQN, TimeContext};

use crate::transport::{Command, Transition, Transport};
use crate::{PlayheadAuthority, TransportState};

/// Per-frame driver that turns wall-clock time into playhead advancement.
///
/// Fractional ticks carry over between frames. While the transport is not
/// playing the last timestamp is dropped, so the paused span never counts as
/// elapsed time and resuming cannot produce a catch-up jump.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_timestamp: Option<f64>,
    fractional_ticks: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the fractional accumulator. Call on every reposition.
    pub fn reset(&mut self) {
        self.fractional_ticks = 0.0;
    }

    pub fn fractional_ticks(&self) -> f64 {
        self.fractional_ticks
    }

    /// Advance `transport` to wall-clock time `now` (seconds, any epoch).
    pub fn advance(
        &mut self,
        transport: &mut Transport,
        ctx: &TimeContext,
        now: f64,
    ) -> Transition {
        let mut settled = Transition::unchanged();
        if transport.state() == TransportState::Seeking {
            settled = transport.apply(Command::Settle, ctx);
            self.reset();
        }

        match transport.state() {
            TransportState::Playing => {}
            TransportState::Paused => {
                self.last_timestamp = None;
                let tick = transport.current_tick();
                let passive =
                    transport.set_current_tick(clamp_to_i64(tick), PlayheadAuthority::Clock, ctx);
                return merge(settled, passive);
            }
            TransportState::Idle | TransportState::Seeking => {
                self.last_timestamp = None;
                return settled;
            }
        }

        let elapsed = match self.last_timestamp {
            Some(last) if now.is_finite() => (now - last).max(0.0),
            _ => 0.0,
        };
        if now.is_finite() {
            self.last_timestamp = Some(now);
        }

        // Tempo is looked up at the current position on every frame, so a
        // tempo change takes effect on the very next frame.
        let bpm = ctx.tempo_at_tick(transport.current_tick());
        let ticks_per_second = bpm / 60.0 * PPQN as f64;

        self.fractional_ticks += elapsed * ticks_per_second * transport.rate();
        let whole = self.fractional_ticks.floor();
        self.fractional_ticks -= whole;

        let target = transport.current_tick().saturating_add(whole as u64);
        let transition =
            transport.set_current_tick(clamp_to_i64(target), PlayheadAuthority::Clock, ctx);
        if transition.reposition.is_some() {
            self.reset();
        }

        merge(settled, transition)
    }
}

fn clamp_to_i64(tick: u64) -> i64 {
    i64::try_from(tick).unwrap_or(i64::MAX)
}

fn merge(first: Transition, second: Transition) -> Transition {
    Transition {
        changed: first.changed || second.changed,
        reposition: second.reposition.or(first.reposition),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline_tempo::{TempoMap, TempoMapEntry};

    fn playing(ctx: &TimeContext) -> Transport {
        let mut transport = Transport::new();
        transport.play(ctx);
        transport
    }

    #[test]
    fn test_first_frame_does_not_advance() {
        let ctx = TimeContext::new(120.0, 4);
        let mut transport = playing(&ctx);
        let mut frames = FrameClock::new();

        frames.advance(&mut transport, &ctx, 100.0);
        assert_eq!(transport.current_tick(), 0);
    }

    #[test]
    fn test_advances_by_elapsed_time() {
        let ctx = TimeContext::new(120.0, 4);
        let mut transport = playing(&ctx);
        let mut frames = FrameClock::new();

        frames.advance(&mut transport, &ctx, 10.0);
        frames.advance(&mut transport, &ctx, 10.5);

        // half a second at 120 bpm is one beat
        assert_eq!(transport.current_tick(), PPQN);
        assert_eq!(transport.authority(), PlayheadAuthority::Clock);
    }

    #[test]
    fn test_fractional_ticks_accumulate() {
        let ctx = TimeContext::new(120.0, 4);
        let mut transport = playing(&ctx);
        let mut frames = FrameClock::new();

        // 960 ticks per second: 60 frames of 1/60s should land on exactly 960
        frames.advance(&mut transport, &ctx, 0.0);
        for i in 1..=60 {
            frames.advance(&mut transport, &ctx, i as f64 / 60.0);
        }

        let tick = transport.current_tick();
        assert!((959..=960).contains(&tick), "tick {tick}");
    }

    #[test]
    fn test_rate_scales_advance() {
        let ctx = TimeContext::new(120.0, 4);
        let mut transport = playing(&ctx);
        transport.apply(Command::SetRate(2.0), &ctx);
        let mut frames = FrameClock::new();

        frames.advance(&mut transport, &ctx, 0.0);
        frames.advance(&mut transport, &ctx, 0.5);

        assert_eq!(transport.current_tick(), 2 * PPQN);
    }

    #[test]
    fn test_pause_excludes_wall_time() {
        let ctx = TimeContext::new(120.0, 4);
        let mut transport = playing(&ctx);
        let mut frames = FrameClock::new();

        frames.advance(&mut transport, &ctx, 0.0);
        frames.advance(&mut transport, &ctx, 0.5);
        assert_eq!(transport.current_tick(), PPQN);

        transport.pause(&ctx);
        for i in 0..600 {
            let transition = frames.advance(&mut transport, &ctx, 0.5 + i as f64);
            assert!(!transition.changed);
        }
        assert_eq!(transport.current_tick(), PPQN);

        transport.play(&ctx);
        frames.advance(&mut transport, &ctx, 1000.0);
        assert_eq!(transport.current_tick(), PPQN);
        frames.advance(&mut transport, &ctx, 1000.5);
        assert_eq!(transport.current_tick(), 2 * PPQN);
    }

    #[test]
    fn test_tempo_change_applies_next_frame() {
        let mut ctx = TimeContext::new(120.0, 4);
        let mut transport = playing(&ctx);
        let mut frames = FrameClock::new();

        frames.advance(&mut transport, &ctx, 0.0);
        frames.advance(&mut transport, &ctx, 0.5);
        assert_eq!(transport.current_tick(), PPQN);

        ctx.set_bpm(60.0);
        frames.advance(&mut transport, &ctx, 1.0);
        assert_eq!(transport.current_tick(), PPQN + PPQN / 2);
    }

    #[test]
    fn test_tempo_map_drives_advance() {
        let map = TempoMap::new(vec![TempoMapEntry::new(0.0, 240.0)]).expect("valid map");
        let ctx = TimeContext::new(120.0, 4).with_tempo_map(map);
        let mut transport = playing(&ctx);
        let mut frames = FrameClock::new();

        frames.advance(&mut transport, &ctx, 0.0);
        frames.advance(&mut transport, &ctx, 0.5);

        assert_eq!(transport.current_tick(), 2 * PPQN);
    }

    #[test]
    fn test_loop_wrap_resets_accumulator() {
        let ctx = TimeContext::new(120.0, 4);
        let mut transport = playing(&ctx);
        transport.apply(Command::SetLoopRange { start: Some(0), end: Some(PPQN as i64) }, &ctx);
        transport.apply(Command::SetLoopEnabled(true), &ctx);
        let mut frames = FrameClock::new();

        frames.advance(&mut transport, &ctx, 0.0);
        let transition = frames.advance(&mut transport, &ctx, 0.6);

        assert_eq!(transport.current_tick(), 0);
        assert_eq!(transition.reposition, Some(0));
        assert_eq!(frames.fractional_ticks(), 0.0);
    }

    #[test]
    fn test_seek_settles_on_next_frame() {
        let ctx = TimeContext::new(120.0, 4);
        let mut transport = playing(&ctx);
        let mut frames = FrameClock::new();
        frames.advance(&mut transport, &ctx, 0.0);

        transport.seek_tick(5000, &ctx);
        frames.advance(&mut transport, &ctx, 0.25);

        assert_eq!(transport.state(), TransportState::Playing);
        assert_eq!(transport.current_tick(), 5000 + PPQN / 2);
    }

    #[test]
    fn test_idle_transport_is_untouched() {
        let ctx = TimeContext::new(120.0, 4);
        let mut transport = Transport::new();
        transport.set_current_tick(300, PlayheadAuthority::User, &ctx);
        let mut frames = FrameClock::new();

        let transition = frames.advance(&mut transport, &ctx, 5.0);

        assert!(!transition.changed);
        assert_eq!(transport.authority(), PlayheadAuthority::User);
    }
}
