//! Mock audio engine for tests and the CLI demo
//!
//! Does no real audio work: records every call in order, resolves
//! immediately, and lets tests script failures, permission denial, and the
//! recording outcome. The count-in length uses the same formula as the real
//! engine's hidden click track: four beats at the session tempo.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::events::EventBus;
use crate::engine::{AudioEngine, CountIn, EngineEvent, RecordingOutcome};
use crate::error::{Result, TapelabError};
use crate::schedule::ScheduleRegion;
use crate::session::{RegionId, Seconds, TrackId};

/// Beats of pre-roll before capture starts.
const COUNT_IN_BEATS: f64 = 4.0;

/// One recorded engine call, in invocation order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    StartAt {
        seconds: Seconds,
        host_start_time: Option<f64>,
    },
    Seek {
        seconds: Seconds,
    },
    Stop,
    SetSpeed {
        rate: f64,
    },
    ClearSchedule,
    ScheduleRegions {
        count: usize,
        from_seconds: Seconds,
    },
    StartRecording {
        file_uri: String,
        playhead: Seconds,
        track_id: TrackId,
    },
    StartRecordingWithCountIn {
        file_uri: String,
        playhead: Seconds,
        track_id: TrackId,
        bpm: f64,
    },
    StopRecording,
    RequestRecordPermission,
    SetTrackVolume {
        track_id: TrackId,
        volume: f64,
    },
    SetTrackPan {
        track_id: TrackId,
        pan: f64,
    },
    SetTrackEq {
        track_id: TrackId,
        low: f64,
        mid: f64,
        high: f64,
    },
    SetRegionFade {
        region_id: RegionId,
        fade_in: Seconds,
        fade_out: Seconds,
    },
    SetRegionReverse {
        region_id: RegionId,
        reverse: bool,
    },
    SetRegionReverb {
        region_id: RegionId,
        wet: f64,
        preset: Option<String>,
    },
    SetRegionDelay {
        region_id: RegionId,
        time: Seconds,
        feedback: f64,
        mix: f64,
    },
}

/// Scripted engine double.
#[derive(Debug, Default)]
pub struct MockEngine {
    calls: Mutex<Vec<EngineCall>>,
    failing_ops: Mutex<HashSet<&'static str>>,
    deny_permission: Mutex<bool>,
    recording_outcome: Mutex<RecordingOutcome>,
    pub events: EventBus,
}

impl MockEngine {
    pub fn new() -> Self {
        MockEngine::default()
    }

    /// Make the named operation (`"startAt"`, `"stop"`,
    /// `"startRecordingWithCountIn"`, `"stopRecording"`, `"seek"`) fail.
    pub fn fail_on(&self, op: &'static str) {
        self.failing_ops.lock().unwrap().insert(op);
    }

    pub fn clear_failures(&self) {
        self.failing_ops.lock().unwrap().clear();
    }

    pub fn deny_record_permission(&self) {
        *self.deny_permission.lock().unwrap() = true;
    }

    /// Script what the next `stop_recording` reports.
    pub fn set_recording_outcome(&self, outcome: RecordingOutcome) {
        *self.recording_outcome.lock().unwrap() = outcome;
    }

    /// Everything called so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Push a playhead tick through the event bus, as the real engine does
    /// from its render thread.
    pub fn emit_playhead(&self, position: Seconds) {
        self.events.emit(EngineEvent::PlayheadUpdate { position });
    }

    pub fn emit_input_level(&self, level: f32) {
        self.events.emit(EngineEvent::InputLevel { level });
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: &'static str) -> Result<()> {
        if self.failing_ops.lock().unwrap().contains(op) {
            Err(TapelabError::engine(op, "injected failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AudioEngine for MockEngine {
    async fn start_at(&self, seconds: Seconds, host_start_time: Option<f64>) -> Result<()> {
        self.record(EngineCall::StartAt {
            seconds,
            host_start_time,
        });
        self.check("startAt")
    }

    async fn seek(&self, seconds: Seconds) -> Result<()> {
        self.record(EngineCall::Seek { seconds });
        self.check("seek")
    }

    async fn stop(&self) -> Result<()> {
        self.record(EngineCall::Stop);
        self.check("stop")
    }

    fn set_speed(&self, rate: f64) {
        self.record(EngineCall::SetSpeed { rate });
    }

    fn clear_schedule(&self) {
        self.record(EngineCall::ClearSchedule);
    }

    fn schedule_regions(&self, regions: Vec<ScheduleRegion>, from_seconds: Seconds) {
        self.record(EngineCall::ScheduleRegions {
            count: regions.len(),
            from_seconds,
        });
    }

    async fn start_recording(
        &self,
        file_uri: &str,
        playhead: Seconds,
        track_id: TrackId,
    ) -> Result<()> {
        self.record(EngineCall::StartRecording {
            file_uri: file_uri.to_owned(),
            playhead,
            track_id,
        });
        self.check("startRecording")
    }

    async fn start_recording_with_count_in(
        &self,
        file_uri: &str,
        playhead: Seconds,
        track_id: TrackId,
        bpm: f64,
    ) -> Result<CountIn> {
        self.record(EngineCall::StartRecordingWithCountIn {
            file_uri: file_uri.to_owned(),
            playhead,
            track_id,
            bpm,
        });
        self.check("startRecordingWithCountIn")?;
        Ok(CountIn {
            record_start_host_time: 0.0,
            count_in_duration: (60.0 / bpm) * COUNT_IN_BEATS,
        })
    }

    async fn stop_recording(&self) -> Result<RecordingOutcome> {
        self.record(EngineCall::StopRecording);
        self.check("stopRecording")?;
        Ok(self.recording_outcome.lock().unwrap().clone())
    }

    async fn request_record_permission(&self) -> bool {
        self.record(EngineCall::RequestRecordPermission);
        !*self.deny_permission.lock().unwrap()
    }

    fn set_track_volume(&self, track_id: TrackId, volume: f64) {
        self.record(EngineCall::SetTrackVolume { track_id, volume });
    }

    fn set_track_pan(&self, track_id: TrackId, pan: f64) {
        self.record(EngineCall::SetTrackPan { track_id, pan });
    }

    fn set_track_eq(&self, track_id: TrackId, low: f64, mid: f64, high: f64) {
        self.record(EngineCall::SetTrackEq {
            track_id,
            low,
            mid,
            high,
        });
    }

    fn set_region_fade(&self, region_id: RegionId, fade_in: Seconds, fade_out: Seconds) {
        self.record(EngineCall::SetRegionFade {
            region_id,
            fade_in,
            fade_out,
        });
    }

    fn set_region_reverse(&self, region_id: RegionId, reverse: bool) {
        self.record(EngineCall::SetRegionReverse { region_id, reverse });
    }

    fn set_region_reverb(&self, region_id: RegionId, wet: f64, preset: Option<&str>) {
        self.record(EngineCall::SetRegionReverb {
            region_id,
            wet,
            preset: preset.map(str::to_owned),
        });
    }

    fn set_region_delay(&self, region_id: RegionId, time: Seconds, feedback: f64, mix: f64) {
        self.record(EngineCall::SetRegionDelay {
            region_id,
            time,
            feedback,
            mix,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let engine = MockEngine::new();
        engine.clear_schedule();
        engine.start_at(3.0, None).await.unwrap();
        engine.stop().await.unwrap();

        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::ClearSchedule,
                EngineCall::StartAt {
                    seconds: 3.0,
                    host_start_time: None
                },
                EngineCall::Stop,
            ]
        );
    }

    #[tokio::test]
    async fn test_count_in_is_four_beats() {
        let engine = MockEngine::new();
        let count_in = engine
            .start_recording_with_count_in("file://r.wav", 0.0, TrackId::new(), 120.0)
            .await
            .unwrap();
        assert_eq!(count_in.count_in_duration, 2.0);

        let slower = engine
            .start_recording_with_count_in("file://r.wav", 0.0, TrackId::new(), 60.0)
            .await
            .unwrap();
        assert_eq!(slower.count_in_duration, 4.0);
    }

    #[tokio::test]
    async fn test_direct_recording_logs_target() {
        let engine = MockEngine::new();
        let track_id = TrackId::new();
        engine
            .start_recording("file://r.wav", 1.5, track_id)
            .await
            .unwrap();

        assert_eq!(
            engine.calls(),
            vec![EngineCall::StartRecording {
                file_uri: "file://r.wav".to_owned(),
                playhead: 1.5,
                track_id,
            }]
        );
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let engine = MockEngine::new();
        engine.fail_on("startAt");
        assert!(engine.start_at(0.0, None).await.is_err());

        engine.clear_failures();
        assert!(engine.start_at(0.0, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_permission_denial() {
        let engine = MockEngine::new();
        assert!(engine.request_record_permission().await);

        engine.deny_record_permission();
        assert!(!engine.request_record_permission().await);
    }
}
