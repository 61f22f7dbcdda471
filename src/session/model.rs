//! Session Domain Model
//!
//! Value types for a recording session: the session itself, its tracks, and
//! the regions placed on each track's timeline. These types carry validation
//! helpers only; all mutation goes through the [`SessionRepository`]
//! (crate::session::SessionRepository) command surface.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timeline position or duration in seconds.
pub type Seconds = f64;

/// Session duration fixed at creation (6:00 minutes).
pub const DEFAULT_SESSION_DURATION: Seconds = 360.0;

/// Session sample rate fixed at creation.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Default track fader level.
pub const DEFAULT_TRACK_VOLUME: f64 = 0.8;

/// Default tempo for a new session.
pub const DEFAULT_BPM: f64 = 120.0;

/// Tempo bounds.
pub const BPM_RANGE: (f64, f64) = (40.0, 240.0);

/// Per-band EQ bounds in dB.
pub const EQ_RANGE_DB: (f64, f64) = (-12.0, 12.0);

/// Number of tracks a fresh session starts with.
pub const DEFAULT_TRACK_COUNT: usize = 4;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh unique id.
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(
    /// Opaque stable identifier for a [`Session`].
    SessionId
);
id_newtype!(
    /// Opaque stable identifier for a [`Track`].
    TrackId
);
id_newtype!(
    /// Opaque stable identifier for a [`Region`].
    RegionId
);

/// One recording project: timeline, tracks, and transport state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque stable identifier.
    pub id: SessionId,

    /// Mutable display label.
    pub name: String,

    /// Timeline length in seconds, fixed at creation.
    pub duration_seconds: Seconds,

    /// Sample rate in Hz, fixed at creation.
    pub sample_rate: u32,

    /// Tempo, clamped to 40..=240.
    pub bpm: f64,

    /// Playhead position, always within `0..=duration_seconds`.
    pub playhead_seconds: Seconds,

    /// Whether the transport is playing. Legality of flag combinations is
    /// enforced by the transport controller, not here.
    pub is_playing: bool,

    /// Whether the transport is recording (implies playback of other tracks).
    pub is_recording: bool,

    /// When the session was created.
    pub created_at: DateTime<Utc>,

    /// Recording lanes, in display order.
    pub tracks: Vec<Track>,
}

impl Session {
    /// Build a fresh session with the default track layout: four tracks, the
    /// first one armed, stopped transport, playhead at zero.
    pub fn with_defaults(name: impl Into<String>) -> Self {
        let tracks = (0..DEFAULT_TRACK_COUNT)
            .map(|index| Track::numbered(index + 1, index == 0))
            .collect();

        Session {
            id: SessionId::new(),
            name: name.into(),
            duration_seconds: DEFAULT_SESSION_DURATION,
            sample_rate: DEFAULT_SAMPLE_RATE,
            bpm: DEFAULT_BPM,
            playhead_seconds: 0.0,
            is_playing: false,
            is_recording: false,
            created_at: Utc::now(),
            tracks,
        }
    }

    /// Clamp a playhead position into this session's timeline.
    pub fn clamp_playhead(&self, seconds: Seconds) -> Seconds {
        seconds.clamp(0.0, self.duration_seconds)
    }

    /// The track currently armed for recording, if any.
    pub fn armed_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.armed)
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// Find a region anywhere in the session.
    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.tracks.iter().find_map(|t| t.region(id))
    }

    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.tracks.iter_mut().find_map(|t| t.region_mut(id))
    }
}

/// Three-band EQ offsets in dB, each within -12..=12.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EqBands {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

/// Which EQ band a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqBand {
    Low,
    Mid,
    High,
}

/// One recording lane with its own mix parameters and ordered regions.
///
/// Region order is insertion order (display order), not time order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,

    /// Fader level, 0..=1.
    pub volume: f64,

    /// Stereo position, -1..=1.
    pub pan: f64,

    /// Per-band dB offsets.
    pub eq: EqBands,

    pub muted: bool,
    pub solo: bool,

    /// Whether this track receives the next recording. At most one track per
    /// session is armed; [`SessionRepository::arm_track`]
    /// (crate::session::SessionRepository::arm_track) enforces exclusivity.
    pub armed: bool,

    pub regions: Vec<Region>,
}

impl Track {
    /// Build "Track NN" with default mix parameters.
    fn numbered(number: usize, armed: bool) -> Self {
        Track {
            id: TrackId::new(),
            name: format!("Track {number:02}"),
            volume: DEFAULT_TRACK_VOLUME,
            pan: 0.0,
            eq: EqBands::default(),
            muted: false,
            solo: false,
            armed,
            regions: Vec::new(),
        }
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.id == id)
    }
}

/// One audio clip placed on a track's timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,

    /// Reference to the backing audio asset. Empty while the region is a
    /// placeholder (e.g. freshly created for a recording in progress).
    pub file_uri: String,

    /// Absolute start on the session timeline.
    pub start_time: Seconds,

    /// Absolute end on the session timeline. `start_time <= end_time` holds
    /// at rest; a live region is transiently exempt while recording extends
    /// the end forward.
    pub end_time: Seconds,

    /// Read offset inside the referenced file, `>= 0` at rest.
    pub offset: Seconds,

    pub reverse: bool,
    pub fade_in: Seconds,
    pub fade_out: Seconds,

    /// True while an in-progress recording is extending this region.
    pub is_live: bool,

    pub effects: RegionEffects,
}

impl Region {
    pub fn duration(&self) -> Seconds {
        self.end_time - self.start_time
    }

    /// Whether the region can be scheduled for playback: it references a
    /// real file and spans a positive interval. A live region that has made
    /// no progress yet fails this check, which is expected rather than an
    /// error.
    pub fn is_playable(&self) -> bool {
        !self.file_uri.is_empty() && self.end_time > self.start_time
    }
}

/// Per-slot effect settings for a region.
///
/// Each slot is a sum type rather than a nullable record, so an occupied
/// reverb slot can only hold reverb parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionEffects {
    #[serde(default, skip_serializing_if = "EffectSlot::is_none")]
    pub reverb: EffectSlot,

    #[serde(default, skip_serializing_if = "EffectSlot::is_none")]
    pub delay: EffectSlot,

    #[serde(default, skip_serializing_if = "EffectSlot::is_none")]
    pub saturation: EffectSlot,
}

impl RegionEffects {
    pub fn is_empty(&self) -> bool {
        self.reverb.is_none() && self.delay.is_none() && self.saturation.is_none()
    }
}

/// Contents of one region effect slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectSlot {
    /// Slot is unoccupied.
    #[default]
    None,

    Reverb {
        /// Wet mix, 0..=1.
        wet: f64,
        /// Named engine preset, when one is selected.
        #[serde(skip_serializing_if = "Option::is_none")]
        preset: Option<String>,
    },

    Delay {
        /// Delay time in seconds.
        time: Seconds,
        feedback: f64,
        mix: f64,
    },

    Saturation {
        drive: f64,
        mix: f64,
    },
}

impl EffectSlot {
    pub fn is_none(&self) -> bool {
        matches!(self, EffectSlot::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_layout() {
        let session = Session::with_defaults("Session 01");
        assert_eq!(session.tracks.len(), DEFAULT_TRACK_COUNT);
        assert_eq!(session.duration_seconds, DEFAULT_SESSION_DURATION);
        assert_eq!(session.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(session.bpm, DEFAULT_BPM);
        assert!(!session.is_playing);
        assert!(!session.is_recording);

        // First track armed, the rest not
        assert!(session.tracks[0].armed);
        assert!(session.tracks[1..].iter().all(|t| !t.armed));
        assert_eq!(session.tracks[0].name, "Track 01");
        assert_eq!(session.tracks[3].name, "Track 04");
    }

    #[test]
    fn test_clamp_playhead() {
        let session = Session::with_defaults("s");
        assert_eq!(session.clamp_playhead(-5.0), 0.0);
        assert_eq!(session.clamp_playhead(10.0), 10.0);
        assert_eq!(session.clamp_playhead(1000.0), session.duration_seconds);
    }

    #[test]
    fn test_region_playability() {
        let mut region = Region {
            id: RegionId::new(),
            file_uri: String::new(),
            start_time: 5.0,
            end_time: 5.0,
            offset: 0.0,
            reverse: false,
            fade_in: 0.0,
            fade_out: 0.0,
            is_live: true,
            effects: RegionEffects::default(),
        };
        // Live region with no progress: excluded, not an error
        assert!(!region.is_playable());

        region.file_uri = "file://recordings/take-1.wav".into();
        assert!(!region.is_playable());

        region.end_time = 8.0;
        assert!(region.is_playable());
        assert_eq!(region.duration(), 3.0);
    }

    #[test]
    fn test_effect_slot_serde_tagging() {
        let slot = EffectSlot::Delay {
            time: 0.25,
            feedback: 0.4,
            mix: 0.3,
        };
        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(json["type"], "delay");

        let back: EffectSlot = serde_json::from_value(json).unwrap();
        assert_eq!(back, slot);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(TrackId::new(), TrackId::new());
        assert_ne!(RegionId::new(), RegionId::new());
    }
}
