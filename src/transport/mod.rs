//! Transport Module
//!
//! The controller that sequences playback, recording, and seeking against
//! the external audio engine.

pub mod controller;

pub use controller::{TransportController, TransportState};
