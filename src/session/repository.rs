//! Session Repository
//!
//! Owns the mutable collection of sessions and the "current" session, and
//! exposes the full command surface for mutating them. No other component
//! holds a mutable reference into the session tree; callers keep ids and
//! request changes here.
//!
//! Unknown track/region ids are a non-fatal condition: the command logs and
//! no-ops. Callers that need confirmation check the return value where one
//! is provided (e.g. [`SessionRepository::add_region`]).
//!
//! Every command is a single synchronous, non-suspending mutation step; with
//! the repository behind a mutex this is the only critical section in the
//! core, and it is never held across an engine call.

use log::{debug, error, warn};

use crate::session::model::{
    EffectSlot, EqBand, Region, RegionEffects, RegionId, Seconds, Session, SessionId, Track,
    TrackId, BPM_RANGE, EQ_RANGE_DB,
};

/// Partial region description for [`SessionRepository::add_region`].
///
/// Unset fields take the documented defaults (`start=0`, `end=10`,
/// `offset=0`, no reverse, no fades, not live, empty effect slots).
#[derive(Debug, Clone, Default)]
pub struct RegionSpec {
    pub file_uri: String,
    pub start_time: Option<Seconds>,
    pub end_time: Option<Seconds>,
    pub offset: Option<Seconds>,
    pub reverse: Option<bool>,
    pub fade_in: Option<Seconds>,
    pub fade_out: Option<Seconds>,
    pub is_live: Option<bool>,
    pub effects: Option<RegionEffects>,
}

impl RegionSpec {
    /// Spec for a clip backed by an existing file.
    pub fn file(uri: impl Into<String>) -> Self {
        RegionSpec {
            file_uri: uri.into(),
            ..RegionSpec::default()
        }
    }

    /// Spec for the zero-length live region created at recording start.
    pub fn live_at(uri: impl Into<String>, playhead: Seconds) -> Self {
        RegionSpec {
            file_uri: uri.into(),
            start_time: Some(playhead),
            end_time: Some(playhead),
            offset: Some(0.0),
            is_live: Some(true),
            ..RegionSpec::default()
        }
    }

    pub fn spanning(mut self, start: Seconds, end: Seconds) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }
}

/// Owns all sessions and applies every mutation to them.
#[derive(Debug)]
pub struct SessionRepository {
    /// All known sessions, newest first.
    sessions: Vec<Session>,

    /// Id of the current session. Always resolves to an entry in `sessions`.
    current_id: SessionId,

    /// The region an in-progress recording is extending, if any.
    active_recording_region: Option<RegionId>,
}

impl Default for SessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRepository {
    /// Create a repository holding one default session, made current.
    pub fn new() -> Self {
        let initial = Session::with_defaults(default_session_name(1));
        let current_id = initial.id;
        SessionRepository {
            sessions: vec![initial],
            current_id,
            active_recording_region: None,
        }
    }

    // ========================================================================
    // Session commands
    // ========================================================================

    /// Build a new session with the default track layout, insert it at the
    /// front of the session list, and make it current. Transport flags on
    /// the new session are stopped and any active recording pointer is
    /// cleared.
    pub fn create_session(&mut self, name: Option<&str>) -> SessionId {
        let name = name
            .map(str::to_owned)
            .unwrap_or_else(|| default_session_name(self.sessions.len().max(1) + 1));

        let session = Session::with_defaults(name);
        let id = session.id;
        self.sessions.insert(0, session);
        self.current_id = id;
        self.active_recording_region = None;

        debug!("[repository] Created session {id}");
        id
    }

    /// Make an existing session current. Logs and no-ops on an unknown id.
    pub fn open_session(&mut self, id: SessionId) {
        if self.sessions.iter().any(|s| s.id == id) {
            self.current_id = id;
            self.active_recording_region = None;
            debug!("[repository] Opened session {id}");
        } else {
            warn!("[repository] Session not found: {id}");
        }
    }

    /// Rename a session wherever it lives in the list.
    pub fn rename_session(&mut self, id: SessionId, name: &str) {
        match self.sessions.iter_mut().find(|s| s.id == id) {
            Some(session) => session.name = name.to_owned(),
            None => warn!("[repository] Cannot rename missing session: {id}"),
        }
    }

    // ========================================================================
    // Region commands
    // ========================================================================

    /// Add a region to a track of the current session, returning the fresh
    /// id. Returns `None` (logged) when the track is unknown.
    pub fn add_region(&mut self, track_id: TrackId, spec: RegionSpec) -> Option<RegionId> {
        let session = self.current_mut();
        let Some(track) = session.track_mut(track_id) else {
            error!("[repository] Track not found: {track_id}");
            return None;
        };

        let region = Region {
            id: RegionId::new(),
            file_uri: spec.file_uri,
            start_time: spec.start_time.unwrap_or(0.0),
            end_time: spec.end_time.unwrap_or(10.0),
            offset: spec.offset.unwrap_or(0.0),
            reverse: spec.reverse.unwrap_or(false),
            fade_in: spec.fade_in.unwrap_or(0.0),
            fade_out: spec.fade_out.unwrap_or(0.0),
            is_live: spec.is_live.unwrap_or(false),
            effects: spec.effects.unwrap_or_default(),
        };
        let region_id = region.id;
        track.regions.push(region);

        debug!("[repository] Added region {region_id} to track {track_id}");
        Some(region_id)
    }

    /// Translate a region by `delta` seconds. Duration is preserved exactly;
    /// the result is intentionally not clamped to the session timeline
    /// (downstream clamping is an engine concern).
    pub fn move_region(&mut self, region_id: RegionId, delta: Seconds) {
        self.with_region(region_id, "move", |region| {
            region.start_time += delta;
            region.end_time += delta;
        });
    }

    /// Trim or extend the head of a region: shifts the in-file read point
    /// together with the timeline start. Positive `delta` trims, negative
    /// extends (bounded by available pre-roll, which is not enforced here).
    pub fn crop_region_start(&mut self, region_id: RegionId, delta: Seconds) {
        self.with_region(region_id, "crop start of", |region| {
            region.offset += delta;
            region.start_time += delta;
        });
    }

    /// Trim or extend the tail of a region.
    pub fn crop_region_end(&mut self, region_id: RegionId, delta: Seconds) {
        self.with_region(region_id, "crop end of", |region| {
            region.end_time += delta;
        });
    }

    /// Extend a live region as recording proceeds. The end is clamped to the
    /// region's own start so a stale tick can never invert it.
    pub fn update_region_end(&mut self, region_id: RegionId, end_time: Seconds) {
        self.with_region(region_id, "update end of", |region| {
            region.end_time = end_time.max(region.start_time);
        });
    }

    pub fn update_region_file_uri(&mut self, region_id: RegionId, file_uri: &str) {
        self.with_region(region_id, "update file of", |region| {
            region.file_uri = file_uri.to_owned();
        });
    }

    pub fn set_region_live(&mut self, region_id: RegionId, is_live: bool) {
        self.with_region(region_id, "set live flag of", |region| {
            region.is_live = is_live;
        });
    }

    /// Set a region's fades, saturating negative values to zero.
    pub fn set_region_fade(&mut self, region_id: RegionId, fade_in: Seconds, fade_out: Seconds) {
        self.with_region(region_id, "set fades of", |region| {
            region.fade_in = fade_in.max(0.0);
            region.fade_out = fade_out.max(0.0);
        });
    }

    pub fn set_region_reverse(&mut self, region_id: RegionId, reverse: bool) {
        self.with_region(region_id, "set reverse of", |region| {
            region.reverse = reverse;
        });
    }

    /// Place an effect into the slot matching its variant. An explicit
    /// `EffectSlot::None` has no target slot and is rejected with a log.
    pub fn set_region_effect(&mut self, region_id: RegionId, effect: EffectSlot) {
        self.with_region(region_id, "set effect of", |region| match effect {
            EffectSlot::None => {
                warn!("[repository] Refusing to place an empty effect slot on {region_id}")
            }
            EffectSlot::Reverb { .. } => region.effects.reverb = effect,
            EffectSlot::Delay { .. } => region.effects.delay = effect,
            EffectSlot::Saturation { .. } => region.effects.saturation = effect,
        });
    }

    /// Delete a region from its track. Clears the active recording pointer
    /// when it referenced the removed region.
    pub fn remove_region(&mut self, region_id: RegionId) {
        let session = self.current_mut();
        let removed = session.tracks.iter_mut().any(|track| {
            match track.regions.iter().position(|r| r.id == region_id) {
                Some(index) => {
                    track.regions.remove(index);
                    true
                }
                None => false,
            }
        });

        if !removed {
            error!("[repository] Region not found: {region_id}");
            return;
        }
        if self.active_recording_region == Some(region_id) {
            self.active_recording_region = None;
        }
        debug!("[repository] Removed region {region_id}");
    }

    // ========================================================================
    // Track commands
    // ========================================================================

    /// Arm a track for recording, disarming every other track in the
    /// session. This is the only writer of the armed flag, so at most one
    /// track is ever armed.
    pub fn arm_track(&mut self, track_id: TrackId) {
        let session = self.current_mut();
        if session.track(track_id).is_none() {
            error!("[repository] Track not found: {track_id}");
            return;
        }
        for track in &mut session.tracks {
            track.armed = track.id == track_id;
        }
        debug!("[repository] Armed track {track_id}");
    }

    /// Disarm a track, leaving the session with no armed track if it was the
    /// armed one. Recording then refuses to start until a track is re-armed.
    pub fn disarm_track(&mut self, track_id: TrackId) {
        self.with_track(track_id, |track| track.armed = false);
    }

    /// Set a track's fader level, saturating into 0..=1.
    pub fn update_track_volume(&mut self, track_id: TrackId, volume: f64) {
        self.with_track(track_id, |track| {
            track.volume = volume.clamp(0.0, 1.0);
        });
    }

    /// Set a track's stereo position, saturating into -1..=1.
    pub fn update_track_pan(&mut self, track_id: TrackId, pan: f64) {
        self.with_track(track_id, |track| {
            track.pan = pan.clamp(-1.0, 1.0);
        });
    }

    /// Set one EQ band, saturating into -12..=12 dB.
    pub fn update_track_eq(&mut self, track_id: TrackId, band: EqBand, value: f64) {
        let value = value.clamp(EQ_RANGE_DB.0, EQ_RANGE_DB.1);
        self.with_track(track_id, |track| match band {
            EqBand::Low => track.eq.low = value,
            EqBand::Mid => track.eq.mid = value,
            EqBand::High => track.eq.high = value,
        });
    }

    pub fn set_track_muted(&mut self, track_id: TrackId, muted: bool) {
        self.with_track(track_id, |track| track.muted = muted);
    }

    pub fn set_track_solo(&mut self, track_id: TrackId, solo: bool) {
        self.with_track(track_id, |track| track.solo = solo);
    }

    // ========================================================================
    // Transport-facing state
    // ========================================================================

    /// Move the playhead, clamped to the session timeline.
    pub fn set_playhead(&mut self, seconds: Seconds) {
        let session = self.current_mut();
        session.playhead_seconds = session.clamp_playhead(seconds);
    }

    /// Raw flag setter; the transport controller enforces which combinations
    /// are legal.
    pub fn set_is_playing(&mut self, is_playing: bool) {
        self.current_mut().is_playing = is_playing;
    }

    /// Raw flag setter; the transport controller enforces which combinations
    /// are legal.
    pub fn set_is_recording(&mut self, is_recording: bool) {
        self.current_mut().is_recording = is_recording;
    }

    /// Set the session tempo, saturating into 40..=240 bpm.
    pub fn set_bpm(&mut self, bpm: f64) {
        let session = self.current_mut();
        session.bpm = bpm.clamp(BPM_RANGE.0, BPM_RANGE.1);
        debug!("[repository] BPM set to {}", session.bpm);
    }

    pub fn set_active_recording_region(&mut self, region_id: Option<RegionId>) {
        self.active_recording_region = region_id;
    }

    pub fn active_recording_region(&self) -> Option<RegionId> {
        self.active_recording_region
    }

    // ========================================================================
    // Read surface
    // ========================================================================

    pub fn current_session(&self) -> &Session {
        self.sessions
            .iter()
            .find(|s| s.id == self.current_id)
            .expect("current session id always resolves")
    }

    /// All sessions, newest first.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn find_track(&self, track_id: TrackId) -> Option<&Track> {
        self.current_session().track(track_id)
    }

    pub fn find_region(&self, region_id: RegionId) -> Option<&Region> {
        self.current_session().region(region_id)
    }

    pub fn armed_track_id(&self) -> Option<TrackId> {
        self.current_session().armed_track().map(|t| t.id)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn current_mut(&mut self) -> &mut Session {
        let id = self.current_id;
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .expect("current session id always resolves")
    }

    fn with_region(&mut self, region_id: RegionId, verb: &str, f: impl FnOnce(&mut Region)) {
        match self.current_mut().region_mut(region_id) {
            Some(region) => f(region),
            None => error!("[repository] Cannot {verb} missing region: {region_id}"),
        }
    }

    fn with_track(&mut self, track_id: TrackId, f: impl FnOnce(&mut Track)) {
        match self.current_mut().track_mut(track_id) {
            Some(track) => f(track),
            None => error!("[repository] Track not found: {track_id}"),
        }
    }
}

fn default_session_name(number: usize) -> String {
    format!("Session {number:02}")
}
