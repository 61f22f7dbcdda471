//! Tapelab - Multi-track Recording Session Core
//!
//! Tapelab manages the authoritative state of a multi-track recording
//! session and orchestrates transitions between playback, recording, and
//! seeking against an external real-time audio engine.
//!
//! # Architecture
//!
//! - `session`: the session/track/region domain model and the repository
//!   that owns every mutation to it
//! - `schedule`: the pure transform flattening a session into ordered
//!   playback instructions for the engine
//! - `transport`: the state machine sequencing play/stop/seek/record (with
//!   count-in) against the engine
//! - `engine`: the engine interface boundary — trait, event bus, and a
//!   scripted mock
//!
//! The core models time and commands only; audio capture, mixing, and DSP
//! live behind the [`engine::AudioEngine`] trait.

pub mod cli;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod session;
pub mod transport;

pub use error::{Result, TapelabError};
