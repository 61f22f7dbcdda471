//! Audio Engine Interface
//!
//! The real-time engine (capture, mixing, playback) lives outside this core;
//! this module only defines the boundary: the [`AudioEngine`] trait the
//! transport drives, the payload types its calls return, the asynchronous
//! [`EngineEvent`]s it emits, and a scripted [`MockEngine`] used by tests and
//! the CLI demo.
//!
//! Engine calls are asynchronous and may suspend for an unbounded time
//! (permission prompts, hardware setup). The model is never locked across
//! one of these calls.

pub mod events;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schedule::ScheduleRegion;
use crate::session::{RegionId, Seconds, TrackId};

/// Result of starting a count-in recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountIn {
    /// Host time at which actual capture begins, in the engine's clock.
    pub record_start_host_time: f64,

    /// Length of the pre-roll metronome in seconds. Playback start is
    /// deferred by this much so click, playback, and record head line up.
    pub count_in_duration: Seconds,
}

/// What the engine reports after recording stops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingOutcome {
    /// Seconds of audio actually captured. Zero means nothing usable was
    /// recorded; that is a normal outcome, not a failure.
    pub duration: Seconds,

    /// Final location of the captured file, when one was produced.
    pub file_uri: Option<String>,
}

/// Asynchronous events emitted by the engine and consumed by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// The transport position advanced.
    PlayheadUpdate { position: Seconds },

    /// Input level for the armed track's source, 0..=1.
    InputLevel { level: f32 },
}

/// Contract the external audio engine implements.
///
/// Fallible calls return the crate [`Result`]; the parameter pushes at the
/// bottom are fire-and-forget. Implementations must be shareable across
/// tasks.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Start playback at the given timeline position. `host_start_time`
    /// anchors the start to an engine clock value when sample-accurate
    /// alignment with another stream is required.
    async fn start_at(&self, seconds: Seconds, host_start_time: Option<f64>) -> Result<()>;

    async fn seek(&self, seconds: Seconds) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    fn set_speed(&self, rate: f64);

    /// Drop any previously scheduled regions.
    fn clear_schedule(&self);

    /// Hand the engine a playback pass. Fire-and-forget; the next transport
    /// start consumes it.
    fn schedule_regions(&self, regions: Vec<ScheduleRegion>, from_seconds: Seconds);

    /// Start capture immediately, without a count-in.
    async fn start_recording(
        &self,
        file_uri: &str,
        playhead: Seconds,
        track_id: TrackId,
    ) -> Result<()>;

    /// Start capture behind a metronome pre-roll sized from `bpm`.
    async fn start_recording_with_count_in(
        &self,
        file_uri: &str,
        playhead: Seconds,
        track_id: TrackId,
        bpm: f64,
    ) -> Result<CountIn>;

    async fn stop_recording(&self) -> Result<RecordingOutcome>;

    /// May raise an on-device permission dialog; resolves to whether capture
    /// is allowed.
    async fn request_record_permission(&self) -> bool;

    // Fire-and-forget parameter pushes

    fn set_track_volume(&self, track_id: TrackId, volume: f64);
    fn set_track_pan(&self, track_id: TrackId, pan: f64);
    fn set_track_eq(&self, track_id: TrackId, low: f64, mid: f64, high: f64);
    fn set_region_fade(&self, region_id: RegionId, fade_in: Seconds, fade_out: Seconds);
    fn set_region_reverse(&self, region_id: RegionId, reverse: bool);
    fn set_region_reverb(&self, region_id: RegionId, wet: f64, preset: Option<&str>);
    fn set_region_delay(&self, region_id: RegionId, time: Seconds, feedback: f64, mix: f64);
}

pub use events::{EventBus, EventSubscription, SubscriptionId};
pub use mock::{EngineCall, MockEngine};
