//! Presentation-side playback session: keeps UI fields in step with a timeline engine.

pub mod audio;
pub mod bridge;
pub mod config;
pub mod display;
pub mod error;
pub mod format;
pub mod sections;

pub use audio::{AudioIo, AudioIoError, NullAudioIo};
pub use bridge::SyncBridge;
pub use config::{DEFAULT_RETRY_SECONDS, SessionConfig};
pub use display::{DisplayField, LyricsSelection, PlayState, PlaybackSection, SessionSnapshot};
pub use error::{Result, SessionError};
pub use format::format_playback_time;
pub use sections::{EnglishSectionNames, SectionNames, build_playback_sections};
