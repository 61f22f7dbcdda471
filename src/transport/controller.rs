//! Transport Controller
//!
//! State machine sequencing play, stop, seek, and record (with count-in)
//! against the external audio engine. The controller makes optimistic model
//! changes before an engine call resolves and rolls them back on failure;
//! the repository mutex is only ever held for one synchronous command, never
//! across an engine call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use chrono::Utc;
use log::{debug, error, warn};

use crate::engine::{AudioEngine, EngineEvent, EventSubscription};
use crate::error::{Result, TapelabError};
use crate::schedule::build_schedule;
use crate::session::{EffectSlot, EqBand, RegionId, RegionSpec, Seconds, SessionRepository, TrackId};

/// Public transport states.
///
/// `Recording` implies concurrent playback of the other tracks;
/// `CountingIn` is the window between the record request and the engine's
/// reported pre-roll deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
    CountingIn,
    Recording,
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportState::Stopped => write!(f, "Stopped"),
            TransportState::Playing => write!(f, "Playing"),
            TransportState::CountingIn => write!(f, "Counting in"),
            TransportState::Recording => write!(f, "Recording"),
        }
    }
}

/// Transient bookkeeping for an in-progress recording. The region id also
/// lives in the repository (`active_recording_region`); the start playhead
/// and requested file uri are controller-internal.
#[derive(Debug, Clone)]
struct ActiveRecording {
    region_id: RegionId,
    file_uri: String,
    start_playhead: Seconds,
}

/// Sequences transport commands against the engine and keeps the session
/// model in sync with engine events.
pub struct TransportController {
    repository: Arc<Mutex<SessionRepository>>,
    engine: Arc<dyn AudioEngine>,

    recording: Mutex<Option<ActiveRecording>>,

    /// Deadline of the engine-reported count-in, while one is pending.
    count_in_deadline: Mutex<Option<Instant>>,

    /// Set while the user is dragging the playhead; gates playhead-update
    /// events so they cannot overwrite the dragged position.
    scrubbing: AtomicBool,

    /// Last input level reported by the engine, for UI polling.
    input_level: Mutex<f32>,
}

impl TransportController {
    pub fn new(repository: Arc<Mutex<SessionRepository>>, engine: Arc<dyn AudioEngine>) -> Self {
        TransportController {
            repository,
            engine,
            recording: Mutex::new(None),
            count_in_deadline: Mutex::new(None),
            scrubbing: AtomicBool::new(false),
            input_level: Mutex::new(0.0),
        }
    }

    /// The repository this controller mutates.
    pub fn repository(&self) -> &Arc<Mutex<SessionRepository>> {
        &self.repository
    }

    // ========================================================================
    // Transport commands
    // ========================================================================

    /// Start playback from the current playhead.
    ///
    /// Pushes a freshly built schedule, optimistically flags the session as
    /// playing, then starts the engine. On engine failure the flag is rolled
    /// back; the schedule push is not (the next `play` rebuilds it anyway).
    pub async fn play(&self) -> Result<()> {
        let (schedule, playhead) = {
            let repo = self.lock_repo();
            let session = repo.current_session();
            (build_schedule(session), session.playhead_seconds)
        };

        debug!("[transport] play() at playhead {playhead:.3}s");

        self.push_schedule(schedule, playhead);
        self.lock_repo().set_is_playing(true);

        if let Err(err) = self.engine.start_at(playhead, None).await {
            error!("[transport] Failed to start playback: {err}");
            self.lock_repo().set_is_playing(false);
            return Err(err);
        }
        Ok(())
    }

    /// Stop playback, or tear down recording first when one is running
    /// (recording always takes priority over a bare stop).
    pub async fn stop(&self) -> Result<()> {
        if self.lock_repo().current_session().is_recording {
            return self.record_stop().await;
        }

        debug!("[transport] stop()");
        self.lock_repo().set_is_playing(false);

        if let Err(err) = self.engine.stop().await {
            // The model stays stopped; the model is authoritative here.
            error!("[transport] Failed to stop engine: {err}");
            return Err(err);
        }
        Ok(())
    }

    /// Move the playhead. The model updates immediately (clamped); the
    /// engine is informed asynchronously. Play/record state is unchanged.
    pub async fn seek(&self, seconds: Seconds) -> Result<()> {
        self.lock_repo().set_playhead(seconds);

        if let Err(err) = self.engine.seek(seconds).await {
            error!("[transport] Failed to seek: {err}");
            return Err(err);
        }
        Ok(())
    }

    /// Start recording on the armed track, behind the engine's count-in.
    ///
    /// Creates the live zero-length region at the playhead, optimistically
    /// flags recording+playing, pushes the schedule, and asks the engine for
    /// a count-in. Playback start is deferred until the count-in elapses so
    /// the pre-roll click and the record head stay sample-accurate. If the
    /// count-in call fails everything is reverted, including the region.
    pub async fn record_start(&self) -> Result<RegionId> {
        let (track_id, playhead, bpm) = {
            let repo = self.lock_repo();
            let session = repo.current_session();
            let track = session.armed_track().ok_or_else(|| {
                error!("[transport] No track armed for recording");
                TapelabError::NoArmedTrack
            })?;
            (track.id, session.playhead_seconds, session.bpm)
        };

        if !self.engine.request_record_permission().await {
            warn!("[transport] Record permission denied");
            return Err(TapelabError::PermissionDenied);
        }

        let file_uri = format!(
            "file://recordings/recording-{}.wav",
            Utc::now().timestamp_millis()
        );
        debug!("[transport] record_start() on track {track_id} at playhead {playhead:.3}s");

        let (region_id, schedule) = {
            let mut repo = self.lock_repo();
            let region_id = repo
                .add_region(track_id, RegionSpec::live_at(&file_uri, playhead))
                .ok_or(TapelabError::TrackNotFound { id: track_id })?;
            repo.set_active_recording_region(Some(region_id));
            repo.set_is_recording(true);
            // Recording implies playback of the other tracks
            repo.set_is_playing(true);
            (region_id, build_schedule(repo.current_session()))
        };
        *self.recording.lock().unwrap() = Some(ActiveRecording {
            region_id,
            file_uri: file_uri.clone(),
            start_playhead: playhead,
        });

        self.push_schedule(schedule, playhead);

        match self
            .engine
            .start_recording_with_count_in(&file_uri, playhead, track_id, bpm)
            .await
        {
            Ok(count_in) => {
                let wait = Duration::from_secs_f64(count_in.count_in_duration.max(0.0));
                *self.count_in_deadline.lock().unwrap() = Some(Instant::now() + wait);
                debug!(
                    "[transport] Count-in started at {bpm} BPM, {:.3}s",
                    count_in.count_in_duration
                );

                // Deferred playback start keyed off the engine-reported
                // count-in. Not cancellable once issued: stopping during the
                // count-in still lets this fire (known race, see DESIGN.md).
                let engine = Arc::clone(&self.engine);
                tokio::spawn(async move {
                    tokio::time::sleep(wait).await;
                    if let Err(err) = engine.start_at(playhead, None).await {
                        error!("[transport] Failed to start playback after count-in: {err}");
                    }
                });

                Ok(region_id)
            }
            Err(err) => {
                error!("[transport] Failed to start count-in recording: {err}");
                {
                    let mut repo = self.lock_repo();
                    repo.set_is_recording(false);
                    repo.set_is_playing(false);
                    repo.set_active_recording_region(None);
                    repo.remove_region(region_id);
                }
                *self.recording.lock().unwrap() = None;
                *self.count_in_deadline.lock().unwrap() = None;
                Err(err)
            }
        }
    }

    /// Stop recording, finalize or delete the live region, then stop the
    /// transport.
    ///
    /// The ordering is deliberate: the model reaches its consistent final
    /// shape (region finalized or removed, recording flag off) before the
    /// engine's own playback state is torn down, so no observer can see
    /// "not recording" alongside a still-live region.
    pub async fn record_stop(&self) -> Result<()> {
        if !self.lock_repo().current_session().is_recording {
            error!("[transport] record_stop called but transport is not recording");
            return Err(TapelabError::NotRecording);
        }

        let active = self.recording.lock().unwrap().take();
        *self.count_in_deadline.lock().unwrap() = None;

        match self.engine.stop_recording().await {
            Ok(outcome) => {
                debug!(
                    "[transport] Recording stopped, duration {:.3}s",
                    outcome.duration
                );
                {
                    let mut repo = self.lock_repo();
                    repo.set_is_recording(false);

                    if let Some(active) = &active {
                        let recorded_uri = outcome
                            .file_uri
                            .clone()
                            .unwrap_or_else(|| active.file_uri.clone());
                        if outcome.duration > 0.0 && !recorded_uri.is_empty() {
                            repo.update_region_end(
                                active.region_id,
                                active.start_playhead + outcome.duration,
                            );
                            repo.update_region_file_uri(active.region_id, &recorded_uri);
                            repo.set_region_live(active.region_id, false);
                        } else {
                            // Nothing usable was captured: normal outcome
                            warn!("[transport] Recording produced no audio, removing region");
                            repo.remove_region(active.region_id);
                        }
                    }
                    repo.set_active_recording_region(None);
                    repo.set_is_playing(false);
                }

                if let Err(err) = self.engine.stop().await {
                    error!("[transport] Failed to stop engine after recording: {err}");
                    return Err(err);
                }
                Ok(())
            }
            Err(err) => {
                // Recording must never leave the model live-but-unrecording
                error!("[transport] Failed to stop recording: {err}");
                {
                    let mut repo = self.lock_repo();
                    repo.set_is_recording(false);
                    repo.set_is_playing(false);
                    if let Some(active) = &active {
                        repo.remove_region(active.region_id);
                    }
                    repo.set_active_recording_region(None);
                }
                Err(err)
            }
        }
    }

    // ========================================================================
    // Engine events
    // ========================================================================

    /// Apply one engine event to the model.
    ///
    /// Playhead updates are dropped while a scrub drag is in progress so the
    /// locally dragged position is not overwritten mid-gesture. While
    /// recording, every tick also extends the live region's end so it grows
    /// in lockstep with the transport.
    pub fn handle_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::PlayheadUpdate { position } => {
                if self.scrubbing.load(Ordering::Acquire) {
                    return;
                }
                let mut repo = self.lock_repo();
                repo.set_playhead(position);
                if repo.current_session().is_recording {
                    if let Some(region_id) = repo.active_recording_region() {
                        repo.update_region_end(region_id, position);
                    }
                }
            }
            EngineEvent::InputLevel { level } => {
                *self.input_level.lock().unwrap() = level;
            }
        }
    }

    /// Drive [`Self::handle_event`] from a bus subscription until the bus
    /// closes.
    pub fn spawn_event_loop(
        controller: Arc<Self>,
        mut subscription: EventSubscription,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = subscription.receiver.recv().await {
                controller.handle_event(event);
            }
        })
    }

    /// Playback rate (varispeed). Purely an engine parameter; the model
    /// does not track it.
    pub fn set_speed(&self, rate: f64) {
        self.engine.set_speed(rate);
    }

    /// Gate playhead-update events while the user drags the playhead.
    pub fn set_scrubbing(&self, scrubbing: bool) {
        self.scrubbing.store(scrubbing, Ordering::Release);
    }

    /// Last input level reported by the engine.
    pub fn input_level(&self) -> f32 {
        *self.input_level.lock().unwrap()
    }

    // ========================================================================
    // Mixer pass-through
    // ========================================================================
    //
    // Parameter edits mutate the model first (clamped by the repository) and
    // then push the stored value to the engine, fire-and-forget.

    pub fn set_track_volume(&self, track_id: TrackId, volume: f64) {
        let stored = {
            let mut repo = self.lock_repo();
            repo.update_track_volume(track_id, volume);
            repo.find_track(track_id).map(|t| t.volume)
        };
        if let Some(volume) = stored {
            self.engine.set_track_volume(track_id, volume);
        }
    }

    pub fn set_track_pan(&self, track_id: TrackId, pan: f64) {
        let stored = {
            let mut repo = self.lock_repo();
            repo.update_track_pan(track_id, pan);
            repo.find_track(track_id).map(|t| t.pan)
        };
        if let Some(pan) = stored {
            self.engine.set_track_pan(track_id, pan);
        }
    }

    pub fn set_track_eq(&self, track_id: TrackId, band: EqBand, value: f64) {
        let stored = {
            let mut repo = self.lock_repo();
            repo.update_track_eq(track_id, band, value);
            repo.find_track(track_id).map(|t| t.eq)
        };
        if let Some(eq) = stored {
            self.engine.set_track_eq(track_id, eq.low, eq.mid, eq.high);
        }
    }

    pub fn set_region_fade(&self, region_id: RegionId, fade_in: Seconds, fade_out: Seconds) {
        let stored = {
            let mut repo = self.lock_repo();
            repo.set_region_fade(region_id, fade_in, fade_out);
            repo.find_region(region_id).map(|r| (r.fade_in, r.fade_out))
        };
        if let Some((fade_in, fade_out)) = stored {
            self.engine.set_region_fade(region_id, fade_in, fade_out);
        }
    }

    pub fn set_region_reverse(&self, region_id: RegionId, reverse: bool) {
        let known = {
            let mut repo = self.lock_repo();
            repo.set_region_reverse(region_id, reverse);
            repo.find_region(region_id).is_some()
        };
        if known {
            self.engine.set_region_reverse(region_id, reverse);
        }
    }

    pub fn set_region_reverb(&self, region_id: RegionId, wet: f64, preset: Option<&str>) {
        let known = {
            let mut repo = self.lock_repo();
            repo.set_region_effect(
                region_id,
                EffectSlot::Reverb {
                    wet,
                    preset: preset.map(str::to_owned),
                },
            );
            repo.find_region(region_id).is_some()
        };
        if known {
            self.engine.set_region_reverb(region_id, wet, preset);
        }
    }

    pub fn set_region_delay(&self, region_id: RegionId, time: Seconds, feedback: f64, mix: f64) {
        let known = {
            let mut repo = self.lock_repo();
            repo.set_region_effect(region_id, EffectSlot::Delay { time, feedback, mix });
            repo.find_region(region_id).is_some()
        };
        if known {
            self.engine.set_region_delay(region_id, time, feedback, mix);
        }
    }

    // ========================================================================
    // State queries
    // ========================================================================

    /// Derive the public transport state from the session flags and the
    /// pending count-in deadline.
    pub fn transport_state(&self) -> TransportState {
        let (is_playing, is_recording) = {
            let repo = self.lock_repo();
            let session = repo.current_session();
            (session.is_playing, session.is_recording)
        };
        if is_recording {
            let counting_in = self
                .count_in_deadline
                .lock()
                .unwrap()
                .map(|deadline| Instant::now() < deadline)
                .unwrap_or(false);
            if counting_in {
                TransportState::CountingIn
            } else {
                TransportState::Recording
            }
        } else if is_playing {
            TransportState::Playing
        } else {
            TransportState::Stopped
        }
    }

    pub fn is_playing(&self) -> bool {
        self.lock_repo().current_session().is_playing
    }

    pub fn is_recording(&self) -> bool {
        self.lock_repo().current_session().is_recording
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn lock_repo(&self) -> std::sync::MutexGuard<'_, SessionRepository> {
        self.repository.lock().expect("repository lock poisoned")
    }

    /// Clear the engine's pending schedule and hand over a new pass when it
    /// is non-empty. Idempotent from the engine's point of view.
    fn push_schedule(&self, schedule: Vec<crate::schedule::ScheduleRegion>, from: Seconds) {
        self.engine.clear_schedule();
        if !schedule.is_empty() {
            self.engine.schedule_regions(schedule, from);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockEngine;

    fn controller() -> TransportController {
        TransportController::new(
            Arc::new(Mutex::new(SessionRepository::new())),
            Arc::new(MockEngine::new()),
        )
    }

    #[test]
    fn test_initial_state_is_stopped() {
        let controller = controller();
        assert_eq!(controller.transport_state(), TransportState::Stopped);
        assert!(!controller.is_playing());
        assert!(!controller.is_recording());
    }

    #[test]
    fn test_state_derivation_from_session_flags() {
        let controller = controller();

        controller.lock_repo().set_is_playing(true);
        assert_eq!(controller.transport_state(), TransportState::Playing);

        controller.lock_repo().set_is_recording(true);
        assert_eq!(controller.transport_state(), TransportState::Recording);

        // Recording wins over playing in the derivation
        controller.lock_repo().set_is_playing(false);
        assert_eq!(controller.transport_state(), TransportState::Recording);
    }

    #[test]
    fn test_counting_in_while_deadline_pending() {
        let controller = controller();
        controller.lock_repo().set_is_recording(true);
        *controller.count_in_deadline.lock().unwrap() =
            Some(Instant::now() + Duration::from_secs(60));
        assert_eq!(controller.transport_state(), TransportState::CountingIn);

        *controller.count_in_deadline.lock().unwrap() = None;
        assert_eq!(controller.transport_state(), TransportState::Recording);
    }

    #[test]
    fn test_transport_state_display() {
        assert_eq!(format!("{}", TransportState::Stopped), "Stopped");
        assert_eq!(format!("{}", TransportState::Playing), "Playing");
        assert_eq!(format!("{}", TransportState::CountingIn), "Counting in");
        assert_eq!(format!("{}", TransportState::Recording), "Recording");
    }

    #[test]
    fn test_scrub_flag_round_trip() {
        let controller = controller();
        controller.set_scrubbing(true);
        controller.handle_event(EngineEvent::PlayheadUpdate { position: 12.0 });
        assert_eq!(
            controller.lock_repo().current_session().playhead_seconds,
            0.0
        );
        controller.set_scrubbing(false);
        controller.handle_event(EngineEvent::PlayheadUpdate { position: 12.0 });
        assert_eq!(
            controller.lock_repo().current_session().playhead_seconds,
            12.0
        );
    }
}
