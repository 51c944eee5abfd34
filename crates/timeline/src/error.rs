use std::fmt::{Display, Formatter};

/// Result type used by the timeline crate.
pub type Result<T> = std::result::Result<T, TimelineError>;

/// Errors produced by timeline commands and song validation.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineError {
    EmptyDuration {
        duration: f64,
    },
    InvalidProgress(f64),
    InvalidRewind(f64),
    InvalidTempo(f64),
    SectionOutOfRange {
        index: usize,
        seek: f64,
        duration: f64,
    },
    LyricLineOutOfOrder {
        index: usize,
    },
    InvalidTonality {
        pitch_class: u8,
    },
}

impl Display for TimelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDuration { duration } => {
                write!(f, "song duration must be positive, got {duration}")
            }
            Self::InvalidProgress(value) => {
                write!(f, "playback progress must be within 0..=1, got {value}")
            }
            Self::InvalidRewind(seconds) => {
                write!(f, "rewind distance must be non-negative seconds, got {seconds}")
            }
            Self::InvalidTempo(factor) => {
                write!(f, "tempo factor must be positive, got {factor}")
            }
            Self::SectionOutOfRange {
                index,
                seek,
                duration,
            } => write!(
                f,
                "section {index} at {seek}s lies outside the song (0..={duration}s)"
            ),
            Self::LyricLineOutOfOrder { index } => {
                write!(f, "lyric line {index} is out of order or outside the song")
            }
            Self::InvalidTonality { pitch_class } => {
                write!(f, "invalid tonality pitch class {pitch_class}")
            }
        }
    }
}

impl std::error::Error for TimelineError {}
