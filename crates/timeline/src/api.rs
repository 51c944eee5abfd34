use std::rc::Weak;

use crate::error::Result;
use crate::song::{LyricsSection, Tonality};

/// Identifier handed out when a listener is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Commands accepted by a timeline engine.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineCommand {
    TogglePlay,
    Stop,
    SetMetronomeEnabled(bool),
    SetLyricsVisible(bool),
    /// Moves playback to normalized `progress` in `0..=1`.
    SetPlaybackProgress(f64),
    /// Moves playback back by playback `seconds`, stopping at the song start.
    RewindBack(f64),
    SetTempo(f64),
    /// Advances a playing timeline by wall-clock `seconds`.
    Advance(f64),
}

/// Notifications emitted by a timeline engine.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    /// Position in playback seconds; also sent after a tempo change.
    ProgressChanged {
        seek: f64,
    },
    MetronomeChanged {
        enabled: bool,
    },
    LyricsVisibilityChanged {
        visible: bool,
    },
    LyricsLinesChanged {
        lines: Vec<String>,
    },
    SelectionChanged {
        selected_count: usize,
        last_position: f64,
        line_index: usize,
    },
    TempoChanged {
        factor: f64,
    },
    PlaybackStarted,
    PlaybackStopped,
}

impl TimelineEvent {
    /// Delivers this event to the matching listener callback.
    pub fn dispatch(&self, listener: &dyn TimelineListener) {
        match self {
            Self::ProgressChanged { seek } => listener.on_progress_changed(*seek),
            Self::MetronomeChanged { enabled } => listener.on_metronome_changed(*enabled),
            Self::LyricsVisibilityChanged { visible } => {
                listener.on_lyrics_visibility_changed(*visible)
            }
            Self::LyricsLinesChanged { lines } => listener.on_lyrics_lines_changed(lines),
            Self::SelectionChanged {
                selected_count,
                last_position,
                line_index,
            } => listener.on_selection_changed(*selected_count, *last_position, *line_index),
            Self::TempoChanged { factor } => listener.on_tempo_changed(*factor),
            Self::PlaybackStarted => listener.on_playback_started(),
            Self::PlaybackStopped => listener.on_playback_stopped(),
        }
    }
}

/// Receiver of timeline notifications.
///
/// Every callback defaults to a no-op so listeners only implement what they
/// display. Callbacks run on the thread that drives the engine and may call
/// back into the engine.
pub trait TimelineListener {
    fn on_progress_changed(&self, _seek: f64) {}

    fn on_metronome_changed(&self, _enabled: bool) {}

    fn on_lyrics_visibility_changed(&self, _visible: bool) {}

    fn on_lyrics_lines_changed(&self, _lines: &[String]) {}

    fn on_selection_changed(&self, _selected_count: usize, _last_position: f64, _line_index: usize) {
    }

    fn on_tempo_changed(&self, _factor: f64) {}

    /// Sent only after the engine has transitioned to playing.
    fn on_playback_started(&self) {}

    fn on_playback_stopped(&self) {}
}

/// Command and query surface of the playback timeline.
///
/// Methods take `&self`: engines are shared between a session and its
/// listeners on one thread and use interior mutability.
///
/// Every seek exchanged through this trait is in playback seconds at the
/// current tempo, the same base as [`TimelineEngine::duration`].
pub trait TimelineEngine {
    fn toggle_play(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    fn set_metronome_enabled(&self, enabled: bool) -> Result<()>;

    fn set_lyrics_visible(&self, visible: bool) -> Result<()>;

    /// Seeks to normalized `progress`; values outside `0..=1` are rejected.
    fn set_playback_progress(&self, progress: f64) -> Result<()>;

    fn rewind_back(&self, seconds: f64) -> Result<()>;

    fn convert_seek_to_progress(&self, seek: f64) -> f64;

    fn is_metronome_enabled(&self) -> bool;

    fn is_lyrics_visible(&self) -> bool;

    fn is_playing(&self) -> bool;

    fn lyrics_sections(&self) -> Vec<LyricsSection>;

    fn artist_name(&self) -> String;

    fn song_title(&self) -> String;

    /// Playback length in seconds at the current tempo.
    fn duration(&self) -> f64;

    fn original_tonality(&self) -> Tonality;

    /// Registers a listener; the engine never keeps it alive.
    fn add_listener(&self, listener: Weak<dyn TimelineListener>) -> ListenerId;

    /// Unregisters a listener. Takes effect for deliveries still pending.
    fn remove_listener(&self, id: ListenerId);
}
