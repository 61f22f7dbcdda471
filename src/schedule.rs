//! Schedule Builder
//!
//! Flattens a session into the ordered list of playable instructions handed
//! to the audio engine for one playback pass. Pure transform: no side
//! effects, no mutation of the session.

use serde::{Deserialize, Serialize};

use crate::session::{EqBands, Region, RegionEffects, RegionId, Seconds, Session, Track, TrackId};

/// Snapshot of the owning track's mix parameters, carried with each
/// instruction so the engine needs no back-reference into the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackMix {
    pub volume: f64,
    pub pan: f64,
    pub eq: EqBands,
}

/// One playable instruction for the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRegion {
    pub track_id: TrackId,
    pub region_id: RegionId,
    pub file_uri: String,

    /// Absolute bounds on the session timeline.
    pub start_time: Seconds,
    pub end_time: Seconds,

    /// Read offset inside the file.
    pub offset: Seconds,

    pub reverse: bool,
    pub fade_in: Seconds,
    pub fade_out: Seconds,

    pub mix: TrackMix,
    pub effects: RegionEffects,
}

/// Build the playback schedule for a session.
///
/// Includes exactly the regions that are playable (a non-empty file
/// reference and `end_time > start_time`); everything else is silently
/// excluded — a region still live with no progress, or a placeholder with no
/// file yet, is expected here and not an error. Instruction order follows
/// track order, then region insertion order; any further reordering is the
/// engine's concern.
pub fn build_schedule(session: &Session) -> Vec<ScheduleRegion> {
    session
        .tracks
        .iter()
        .flat_map(|track| {
            track
                .regions
                .iter()
                .filter(|region| region.is_playable())
                .map(|region| instruction(track, region))
        })
        .collect()
}

fn instruction(track: &Track, region: &Region) -> ScheduleRegion {
    ScheduleRegion {
        track_id: track.id,
        region_id: region.id,
        file_uri: region.file_uri.clone(),
        start_time: region.start_time,
        end_time: region.end_time,
        offset: region.offset,
        reverse: region.reverse,
        fade_in: region.fade_in,
        fade_out: region.fade_out,
        mix: TrackMix {
            volume: track.volume,
            pan: track.pan,
            eq: track.eq,
        },
        effects: region.effects.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{EqBand, RegionSpec, SessionRepository};

    #[test]
    fn test_empty_session_builds_empty_schedule() {
        let repo = SessionRepository::new();
        assert!(build_schedule(repo.current_session()).is_empty());
    }

    #[test]
    fn test_filters_unplayable_regions() {
        let mut repo = SessionRepository::new();
        let track_id = repo.current_session().tracks[0].id;

        let playable = repo
            .add_region(track_id, RegionSpec::file("file://a.wav").spanning(0.0, 4.0))
            .unwrap();
        // No file yet
        repo.add_region(track_id, RegionSpec::default().spanning(4.0, 8.0));
        // Zero duration (live region with no progress)
        repo.add_region(track_id, RegionSpec::live_at("file://b.wav", 8.0));
        // Inverted bounds
        repo.add_region(track_id, RegionSpec::file("file://c.wav").spanning(9.0, 6.0));

        let schedule = build_schedule(repo.current_session());
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].region_id, playable);
    }

    #[test]
    fn test_order_is_track_then_insertion() {
        let mut repo = SessionRepository::new();
        let t1 = repo.current_session().tracks[0].id;
        let t2 = repo.current_session().tracks[1].id;

        // Insertion order deliberately out of time order
        let late = repo
            .add_region(t1, RegionSpec::file("file://late.wav").spanning(20.0, 30.0))
            .unwrap();
        let early = repo
            .add_region(t1, RegionSpec::file("file://early.wav").spanning(0.0, 5.0))
            .unwrap();
        let other = repo
            .add_region(t2, RegionSpec::file("file://other.wav").spanning(1.0, 2.0))
            .unwrap();

        let ids: Vec<_> = build_schedule(repo.current_session())
            .iter()
            .map(|s| s.region_id)
            .collect();
        assert_eq!(ids, vec![late, early, other]);
    }

    #[test]
    fn test_instruction_carries_mix_and_effects() {
        let mut repo = SessionRepository::new();
        let track_id = repo.current_session().tracks[0].id;
        repo.update_track_volume(track_id, 0.5);
        repo.update_track_pan(track_id, -0.3);
        repo.update_track_eq(track_id, EqBand::High, 4.0);

        let spec = RegionSpec {
            file_uri: "file://take.wav".into(),
            start_time: Some(2.0),
            end_time: Some(6.0),
            offset: Some(1.5),
            reverse: Some(true),
            fade_in: Some(0.2),
            fade_out: Some(0.4),
            effects: Some(crate::session::RegionEffects {
                reverb: crate::session::EffectSlot::Reverb {
                    wet: 0.4,
                    preset: Some("hall".into()),
                },
                ..Default::default()
            }),
            ..Default::default()
        };
        repo.add_region(track_id, spec);

        let schedule = build_schedule(repo.current_session());
        let entry = &schedule[0];
        assert_eq!(entry.mix.volume, 0.5);
        assert_eq!(entry.mix.pan, -0.3);
        assert_eq!(entry.mix.eq.high, 4.0);
        assert_eq!(entry.offset, 1.5);
        assert!(entry.reverse);
        assert!(!entry.effects.reverb.is_none());
    }

    #[test]
    fn test_every_playable_region_included_exactly_once() {
        let mut repo = SessionRepository::new();
        let tracks: Vec<_> = repo.current_session().tracks.iter().map(|t| t.id).collect();
        let mut expected = Vec::new();
        for (i, track_id) in tracks.iter().enumerate() {
            let start = i as f64 * 10.0;
            let id = repo
                .add_region(
                    *track_id,
                    RegionSpec::file(format!("file://{i}.wav")).spanning(start, start + 5.0),
                )
                .unwrap();
            expected.push(id);
        }

        let ids: Vec<_> = build_schedule(repo.current_session())
            .iter()
            .map(|s| s.region_id)
            .collect();
        assert_eq!(ids, expected);
    }
}
