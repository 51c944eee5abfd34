//! Playback timeline contract and an in-memory reference engine for the vocal trainer.

pub mod api;
pub mod error;
pub mod listener;
pub mod simulated;
pub mod song;
pub mod time;

pub use api::{ListenerId, TimelineCommand, TimelineEngine, TimelineEvent, TimelineListener};
pub use error::{Result, TimelineError};
pub use listener::ListenerSet;
pub use simulated::{LYRICS_WINDOW_LINES, SimulatedTimeline};
pub use song::{LyricLine, LyricsSection, Mode, SectionKind, SongProject, Tonality};
pub use time::{normalize_seek, progress_to_seek, seek_to_progress};
