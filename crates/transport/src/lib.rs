mod clock;
mod frame;
mod transport;

use serde::{Deserialize, Serialize};

pub use clock::{CanonicalClock, ClockWrite};
pub use frame::FrameClock;
pub use timeline_tempo::PPQN;
pub use transport::{Command, Transition, Transport};

/// Which writer last set the playhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayheadAuthority {
    /// Direct tick edit
    Tick,
    /// Legacy seconds-domain edit
    Seconds,
    /// Per-frame clock advancement, loop wrap or play-time snap
    Clock,
    /// Scrub or seek from user input
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    Idle,
    Playing,
    Paused,
    /// Transient marker set by an explicit reposition.
    Seeking,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantizeMode {
    #[default]
    Off,
    Bar,
    Quarter,
    Eighth,
    Sixteenth,
}

impl QuantizeMode {
    /// Length of one quantize unit in ticks, or `None` when quantize is off.
    pub fn unit_ticks(&self, beats_per_bar: u32) -> Option<u64> {
        match self {
            QuantizeMode::Off => None,
            QuantizeMode::Bar => Some(PPQN * beats_per_bar.max(1) as u64),
            QuantizeMode::Quarter => Some(PPQN),
            QuantizeMode::Eighth => Some(PPQN / 2),
            QuantizeMode::Sixteenth => Some(PPQN / 4),
        }
    }
}
