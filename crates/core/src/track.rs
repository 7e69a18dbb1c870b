use timeline_tempo::clamp_tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Placement of a track's notes on the timeline.
///
/// Editing the offset or region never touches the cached notes; both are
/// applied at query time by [`crate::region::resolve_window`].
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    offset_ticks: u64,
    region_start_tick: Option<u64>,
    region_end_tick: Option<u64>,
}

impl Track {
    pub fn new(id: TrackId, name: String) -> Self {
        Self {
            id,
            name,
            offset_ticks: 0,
            region_start_tick: None,
            region_end_tick: None,
        }
    }

    pub fn offset_ticks(&self) -> u64 {
        self.offset_ticks
    }

    pub fn region_start_tick(&self) -> Option<u64> {
        self.region_start_tick
    }

    pub fn region_end_tick(&self) -> Option<u64> {
        self.region_end_tick
    }

    pub fn set_offset_ticks(&mut self, ticks: i64) {
        self.offset_ticks = clamp_tick(ticks);
    }

    /// Set the clip region in local ticks. Reversed bounds are swapped.
    pub fn set_region_ticks(&mut self, start: Option<i64>, end: Option<i64>) {
        let start = start.map(clamp_tick);
        let end = end.map(clamp_tick);

        match (start, end) {
            (Some(s), Some(e)) if s > e => {
                self.region_start_tick = Some(e);
                self.region_end_tick = Some(s);
            }
            _ => {
                self.region_start_tick = start;
                self.region_end_tick = end;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_clamps_negative() {
        let mut track = Track::new(TrackId(1), "Keys".to_string());
        track.set_offset_ticks(-200);
        assert_eq!(track.offset_ticks(), 0);
        track.set_offset_ticks(960);
        assert_eq!(track.offset_ticks(), 960);
    }

    #[test]
    fn test_region_is_ordered() {
        let mut track = Track::new(TrackId(1), "Keys".to_string());
        track.set_region_ticks(Some(1920), Some(480));
        assert_eq!(track.region_start_tick(), Some(480));
        assert_eq!(track.region_end_tick(), Some(1920));

        track.set_region_ticks(None, Some(100));
        assert_eq!(track.region_start_tick(), None);
        assert_eq!(track.region_end_tick(), Some(100));
    }

    #[test]
    fn test_track_id_display() {
        assert_eq!(TrackId(12).to_string(), "#12");
    }
}
