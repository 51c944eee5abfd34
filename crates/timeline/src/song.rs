use std::fmt::{Display, Formatter};

use crate::error::{Result, TimelineError};

const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Structural role of a song section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Intro,
    Verse,
    PreChorus,
    Chorus,
    Bridge,
    Solo,
    Outro,
}

/// A named landmark on the song timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LyricsSection {
    pub kind: SectionKind,
    /// Absolute position in seconds.
    pub seek: f64,
}

/// One timed lyrics line.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl LyricLine {
    /// Number of characters the highlight walks through.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns how many characters are sung at `seek`.
    pub fn selected_chars_at(&self, seek: f64) -> usize {
        let span = self.end - self.start;
        if span <= 0.0 || seek <= self.start {
            return 0;
        }
        let fraction = ((seek - self.start) / span).clamp(0.0, 1.0);
        (fraction * self.char_count() as f64).floor() as usize
    }
}

/// Scale mode of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Major,
    Minor,
}

/// Song key, e.g. `F#m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tonality {
    pitch_class: u8,
    mode: Mode,
}

impl Tonality {
    /// Creates a key from a pitch class in `0..12` (C = 0).
    pub fn new(pitch_class: u8, mode: Mode) -> Result<Self> {
        if usize::from(pitch_class) >= PITCH_CLASS_NAMES.len() {
            return Err(TimelineError::InvalidTonality { pitch_class });
        }
        Ok(Self { pitch_class, mode })
    }

    pub fn pitch_class(&self) -> u8 {
        self.pitch_class
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

impl Display for Tonality {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = PITCH_CLASS_NAMES[usize::from(self.pitch_class)];
        match self.mode {
            Mode::Major => write!(f, "{name}"),
            Mode::Minor => write!(f, "{name}m"),
        }
    }
}

/// A loaded song as seen by the playback timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SongProject {
    pub artist_name: String,
    pub song_title: String,
    /// Length at original tempo, in seconds.
    pub duration: f64,
    pub tonality: Tonality,
    pub sections: Vec<LyricsSection>,
    pub lyrics: Vec<LyricLine>,
}

impl SongProject {
    /// Builds a validated song.
    ///
    /// Sections must lie inside the song and lyric lines must be ordered,
    /// non-overlapping and inside the song.
    pub fn new(
        artist_name: impl Into<String>,
        song_title: impl Into<String>,
        duration: f64,
        tonality: Tonality,
        sections: Vec<LyricsSection>,
        lyrics: Vec<LyricLine>,
    ) -> Result<Self> {
        let duration = ensure_positive_duration(duration)?;

        for (index, section) in sections.iter().enumerate() {
            if !section.seek.is_finite() || section.seek < 0.0 || section.seek > duration {
                return Err(TimelineError::SectionOutOfRange {
                    index,
                    seek: section.seek,
                    duration,
                });
            }
        }

        let mut previous_end = 0.0;
        for (index, line) in lyrics.iter().enumerate() {
            let ordered = line.start.is_finite()
                && line.end.is_finite()
                && line.start >= previous_end
                && line.end >= line.start
                && line.end <= duration;
            if !ordered {
                return Err(TimelineError::LyricLineOutOfOrder { index });
            }
            previous_end = line.end;
        }

        Ok(Self {
            artist_name: artist_name.into(),
            song_title: song_title.into(),
            duration,
            tonality,
            sections,
            lyrics,
        })
    }

    /// Index of the lyric line active at `seek`: the last line that started.
    pub fn line_index_at(&self, seek: f64) -> Option<usize> {
        self.lyrics
            .iter()
            .rposition(|line| line.start <= seek)
    }
}

pub(crate) fn ensure_positive_duration(duration: f64) -> Result<f64> {
    if duration.is_finite() && duration > 0.0 {
        Ok(duration)
    } else {
        Err(TimelineError::EmptyDuration { duration })
    }
}
