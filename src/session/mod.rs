//! Session State Module
//!
//! The session/track/region domain model and the repository that owns and
//! mutates it.

pub mod model;
pub mod repository;

pub use model::{
    EffectSlot, EqBand, EqBands, Region, RegionEffects, RegionId, Seconds, Session, SessionId,
    Track, TrackId,
};
pub use repository::{RegionSpec, SessionRepository};
