use std::fmt::{Display, Formatter};

use timeline::TimelineError;

use crate::audio::AudioIoError;

/// Result type used by the session crate.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by a playback session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The audio graph refused to start after the engine began playback.
    AudioStart(AudioIoError),
    Timeline(TimelineError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AudioStart(err) => write!(f, "audio graph failed to start: {err}"),
            Self::Timeline(err) => write!(f, "timeline command failed: {err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AudioStart(err) => Some(err),
            Self::Timeline(err) => Some(err),
        }
    }
}

impl From<TimelineError> for SessionError {
    fn from(value: TimelineError) -> Self {
        Self::Timeline(value)
    }
}

impl From<AudioIoError> for SessionError {
    fn from(value: AudioIoError) -> Self {
        Self::AudioStart(value)
    }
}
