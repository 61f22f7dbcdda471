//! Error handling for Tapelab
//!
//! Nothing in the session core is fatal to the process: repository commands
//! that miss their target log and no-op, and transport failures degrade to
//! "operation had no effect" plus a diagnostic.

use thiserror::Error;

use crate::session::{RegionId, SessionId, TrackId};

/// Result type alias for Tapelab operations
pub type Result<T> = std::result::Result<T, TapelabError>;

/// Main error type for Tapelab operations
#[derive(Error, Debug)]
pub enum TapelabError {
    // Lookup Errors
    #[error("Session not found: {id}")]
    SessionNotFound { id: SessionId },

    #[error("Track not found: {id}")]
    TrackNotFound { id: TrackId },

    #[error("Region not found: {id}")]
    RegionNotFound { id: RegionId },

    // Transport Errors
    #[error("No track is armed for recording")]
    NoArmedTrack,

    #[error("Record permission denied by the audio engine")]
    PermissionDenied,

    #[error("Transport is not recording")]
    NotRecording,

    // Engine Errors
    #[error("Engine call '{op}' failed: {reason}")]
    Engine { op: &'static str, reason: String },
}

impl TapelabError {
    /// Build an engine-call failure for the named operation.
    pub fn engine(op: &'static str, reason: impl Into<String>) -> Self {
        TapelabError::Engine {
            op,
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            TapelabError::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            TapelabError::TrackNotFound { .. } => "TRACK_NOT_FOUND",
            TapelabError::RegionNotFound { .. } => "REGION_NOT_FOUND",
            TapelabError::NoArmedTrack => "NO_ARMED_TRACK",
            TapelabError::PermissionDenied => "PERMISSION_DENIED",
            TapelabError::NotRecording => "NOT_RECORDING",
            TapelabError::Engine { .. } => "ENGINE_FAILURE",
        }
    }

    /// Whether the user can resolve this error directly.
    ///
    /// Permission denial wants a settings prompt; a missing armed track wants
    /// a track to be armed. Engine failures are surfaced but not actionable.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            TapelabError::PermissionDenied | TapelabError::NoArmedTrack
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TrackId;

    #[test]
    fn test_error_codes() {
        let err = TapelabError::TrackNotFound { id: TrackId::new() };
        assert_eq!(err.error_code(), "TRACK_NOT_FOUND");
        assert_eq!(TapelabError::NoArmedTrack.error_code(), "NO_ARMED_TRACK");
    }

    #[test]
    fn test_user_actionable() {
        assert!(TapelabError::PermissionDenied.is_user_actionable());
        assert!(!TapelabError::engine("startAt", "device lost").is_user_actionable());
    }
}
