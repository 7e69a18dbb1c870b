//! Query-time projection of a track's cached notes onto the timeline.
//!
//! Nothing here is stored. A track's local tick space maps onto absolute
//! timeline ticks as `absolute = local - region_start + offset`, with
//! `region_start` taken as 0 when no region is set. Notes are clipped to the
//! region in local space before they are translated.

use timeline_ingest::NoteRaw;
use timeline_tempo::TimeContext;

use crate::track::Track;

/// A note placed on the timeline, in absolute canonical ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedNote {
    pub note: u8,
    pub channel: u8,
    pub velocity: Option<u8>,
    pub start_tick: u64,
    pub end_tick: u64,
}

impl ResolvedNote {
    pub fn duration_ticks(&self) -> u64 {
        self.end_tick.saturating_sub(self.start_tick)
    }

    pub fn start_seconds(&self, ctx: &TimeContext) -> f64 {
        ctx.ticks_to_seconds(self.start_tick)
    }

    pub fn end_seconds(&self, ctx: &TimeContext) -> f64 {
        ctx.ticks_to_seconds(self.end_tick)
    }
}

/// Notes of `track` that sound within the absolute window `[start_tick, end_tick)`.
///
/// Any `u64` bound is valid; `(0, u64::MAX)` selects every note.
pub fn resolve_window(
    notes: &[NoteRaw],
    track: &Track,
    start_tick: u64,
    end_tick: u64,
) -> Vec<ResolvedNote> {
    if end_tick <= start_tick {
        return Vec::new();
    }

    let region_start = track.region_start_tick().unwrap_or(0);
    let region_end = track.region_end_tick();
    // i128 holds every difference of two u64 ticks
    let shift = i128::from(track.offset_ticks()) - i128::from(region_start);

    let local_start = i128::from(start_tick) - shift;
    let local_end = i128::from(end_tick) - shift;

    notes
        .iter()
        .filter_map(|note| {
            let (start, end) = clip_to_region(note, region_start, region_end)?;
            let (start, end) = (i128::from(start), i128::from(end));

            let overlaps = if start == end {
                start >= local_start && start < local_end
            } else {
                start < local_end && end > local_start
            };
            if !overlaps {
                return None;
            }

            Some(ResolvedNote {
                note: note.note,
                channel: note.channel,
                velocity: note.velocity,
                start_tick: to_tick(start + shift),
                end_tick: to_tick(end + shift),
            })
        })
        .collect()
}

fn to_tick(tick: i128) -> u64 {
    u64::try_from(tick.max(0)).unwrap_or(u64::MAX)
}

/// Clip a note to `[region_start, region_end)` in local ticks. `None` when
/// nothing of the note survives.
fn clip_to_region(
    note: &NoteRaw,
    region_start: u64,
    region_end: Option<u64>,
) -> Option<(u64, u64)> {
    if note.duration_ticks == 0 {
        let inside = note.start_tick >= region_start
            && region_end.is_none_or(|end| note.start_tick < end);
        return inside.then_some((note.start_tick, note.start_tick));
    }

    let start = note.start_tick.max(region_start);
    let end = match region_end {
        Some(region_end) => note.end_tick.min(region_end),
        None => note.end_tick,
    };

    (start < end).then_some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackId;
    use approx::assert_relative_eq;
    use timeline_tempo::PPQN;

    fn track(offset: i64, region: (Option<i64>, Option<i64>)) -> Track {
        let mut track = Track::new(TrackId(1), "Lead".to_string());
        track.set_offset_ticks(offset);
        track.set_region_ticks(region.0, region.1);
        track
    }

    fn notes() -> Vec<NoteRaw> {
        vec![
            NoteRaw::new(60, 0, 0, PPQN, Some(100)),
            NoteRaw::new(62, 0, PPQN, 2 * PPQN, Some(100)),
            NoteRaw::new(64, 0, 2 * PPQN, 4 * PPQN, Some(100)),
        ]
    }

    #[test]
    fn test_offset_translates_notes() {
        let track = track(960, (None, None));
        let resolved = resolve_window(&notes(), &track, 0, 100 * PPQN);

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].start_tick, 960);
        assert_eq!(resolved[0].end_tick, 960 + PPQN);
        assert_eq!(resolved[2].start_tick, 960 + 2 * PPQN);
    }

    #[test]
    fn test_window_filters_in_absolute_space() {
        let track = track(960, (None, None));
        // absolute [1440, 1920) covers local [480, 960): only the second note
        let resolved = resolve_window(&notes(), &track, 1440, 1920);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].note, 62);
    }

    #[test]
    fn test_window_before_offset_is_empty() {
        let track = track(10 * PPQN as i64, (None, None));
        assert!(resolve_window(&notes(), &track, 0, 5 * PPQN).is_empty());
    }

    #[test]
    fn test_region_clips_and_anchors_at_offset() {
        // keep local [720, 1440), placed at absolute 4800
        let track = track(4800, (Some(720), Some(1440)));
        let resolved = resolve_window(&notes(), &track, 0, 100 * PPQN);

        assert_eq!(resolved.len(), 2);
        assert_eq!((resolved[0].start_tick, resolved[0].end_tick), (4800, 4800 + 240));
        assert_eq!((resolved[1].start_tick, resolved[1].end_tick), (4800 + 240, 4800 + 720));
    }

    #[test]
    fn test_note_ending_at_region_start_is_dropped() {
        let track = track(0, (Some(PPQN as i64), None));
        let resolved = resolve_window(&notes(), &track, 0, 100 * PPQN);

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].note, 62);
        assert_eq!(resolved[0].start_tick, 0);
    }

    #[test]
    fn test_zero_length_notes_inside_window() {
        let notes = vec![NoteRaw::new(70, 0, 500, 500, None)];
        let track = track(0, (None, None));

        assert_eq!(resolve_window(&notes, &track, 500, 501).len(), 1);
        assert!(resolve_window(&notes, &track, 501, 600).is_empty());
    }

    #[test]
    fn test_unbounded_window_selects_everything() {
        let track = track(960, (None, None));
        let resolved = resolve_window(&notes(), &track, 0, u64::MAX);

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[2].end_tick, 960 + 4 * PPQN);

        let tail = resolve_window(&notes(), &track, u64::MAX - 1, u64::MAX);
        assert!(tail.is_empty());
    }

    #[test]
    fn test_window_above_i64_range() {
        let track = track(0, (None, None));
        let start = i64::MAX as u64 + 10;
        assert!(resolve_window(&notes(), &track, start, u64::MAX).is_empty());
        assert_eq!(resolve_window(&notes(), &track, 0, i64::MAX as u64 + 1).len(), 3);
    }

    #[test]
    fn test_empty_window() {
        let track = track(0, (None, None));
        assert!(resolve_window(&notes(), &track, 500, 500).is_empty());
    }

    #[test]
    fn test_seconds_follow_tempo_at_query_time() {
        let track = track(PPQN as i64, (None, None));
        let resolved = resolve_window(&notes(), &track, 0, 100 * PPQN);
        let long_note = resolved[2];

        let fast = TimeContext::new(120.0, 4);
        let slow = TimeContext::new(60.0, 4);

        assert_relative_eq!(long_note.start_seconds(&fast), 1.5);
        assert_relative_eq!(long_note.end_seconds(&fast) - long_note.start_seconds(&fast), 1.0);
        assert_relative_eq!(long_note.end_seconds(&slow) - long_note.start_seconds(&slow), 2.0);
    }
}
