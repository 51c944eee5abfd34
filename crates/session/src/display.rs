use serde::Serialize;

/// Section marker placed on the progress slider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSection {
    pub name: String,
    /// Normalized position in `0..=1`.
    pub position: f64,
}

/// Currently highlighted lyric character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LyricsSelection {
    pub character_index: usize,
    /// Visual offset of the last selected character.
    pub position: f64,
    pub line_index: usize,
}

impl LyricsSelection {
    /// Builds a selection from an engine highlight report.
    ///
    /// An empty highlight maps to character 0, the same as a highlight of
    /// exactly one character. Callers cannot tell "nothing selected" apart
    /// from "first character selected".
    pub fn from_highlight(selected_count: usize, position: f64, line_index: usize) -> Self {
        Self {
            character_index: selected_count.saturating_sub(1),
            position,
            line_index,
        }
    }
}

/// Play state as last confirmed by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
}

/// Tag identifying which display field changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayField {
    Progress,
    CurrentTime,
    EndTime,
    PlayState,
    MetronomeEnabled,
    LyricsVisible,
    LyricsLines,
    LyricsSelection,
}

/// Mutable fields mirrored for the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DisplayState {
    pub progress: f64,
    pub current_time_text: String,
    pub end_time_text: String,
    pub play_state: PlayState,
    pub metronome_enabled: bool,
    pub lyrics_visible: bool,
    pub lyrics_lines: Vec<String>,
    pub lyrics_selection: LyricsSelection,
}

/// Owned copy of everything a session shows, ready to serialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub title: String,
    pub original_tonality: String,
    pub progress: f64,
    pub current_time_text: String,
    pub end_time_text: String,
    pub is_playing: bool,
    pub is_metronome_enabled: bool,
    pub is_lyrics_visible: bool,
    pub lyrics_lines: Vec<String>,
    pub lyrics_selection: LyricsSelection,
    pub sections: Vec<PlaybackSection>,
    pub retry_seconds: u32,
}
