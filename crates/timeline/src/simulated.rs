use std::cell::RefCell;
use std::rc::Weak;

use tracing::{debug, info};

use crate::api::{ListenerId, TimelineCommand, TimelineEngine, TimelineEvent, TimelineListener};
use crate::error::{Result, TimelineError};
use crate::listener::ListenerSet;
use crate::song::{LyricsSection, SongProject, Tonality};
use crate::time::{normalize_seek, progress_to_seek, seek_to_progress, validate_progress, validate_tempo};

/// Lyrics are shown in pages of this many lines.
pub const LYRICS_WINDOW_LINES: usize = 2;

/// In-memory timeline engine driven by explicit `advance` calls.
///
/// Commands mutate state first and dispatch the resulting events afterwards,
/// so listeners may call back into the engine from any callback.
#[derive(Debug)]
pub struct SimulatedTimeline {
    state: RefCell<TimelineState>,
    listeners: ListenerSet,
}

#[derive(Debug, Clone, PartialEq)]
struct TimelineState {
    song: SongProject,
    seek: f64,
    tempo: f64,
    playing: bool,
    metronome_enabled: bool,
    lyrics_visible: bool,
    lyrics_window: Vec<String>,
    selection: Option<LyricsHighlight>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LyricsHighlight {
    selected_count: usize,
    last_position: f64,
    line_index: usize,
}

impl SimulatedTimeline {
    /// Creates a stopped timeline positioned at the song start.
    ///
    /// # Example
    /// ```
    /// use timeline::{Mode, SimulatedTimeline, SongProject, TimelineEngine, Tonality};
    ///
    /// let key = Tonality::new(9, Mode::Minor).expect("valid key");
    /// let song = SongProject::new("Artist", "Song", 90.0, key, Vec::new(), Vec::new())
    ///     .expect("valid song");
    /// let timeline = SimulatedTimeline::new(song);
    /// assert!(!timeline.is_playing());
    /// assert_eq!(timeline.duration(), 90.0);
    /// ```
    pub fn new(song: SongProject) -> Self {
        let state = TimelineState {
            song,
            seek: 0.0,
            tempo: 1.0,
            playing: false,
            metronome_enabled: false,
            lyrics_visible: true,
            lyrics_window: Vec::new(),
            selection: None,
        };
        Self {
            state: RefCell::new(state),
            listeners: ListenerSet::new(),
        }
    }

    /// Applies one command and dispatches the emitted events to listeners.
    pub fn execute(&self, command: TimelineCommand) -> Result<()> {
        let events = self.state.borrow_mut().handle_command(command)?;
        self.listeners.notify(&events);
        Ok(())
    }

    /// Advances a playing timeline by wall-clock `seconds`.
    pub fn advance(&self, seconds: f64) -> Result<()> {
        self.execute(TimelineCommand::Advance(seconds))
    }

    pub fn set_tempo(&self, factor: f64) -> Result<()> {
        self.execute(TimelineCommand::SetTempo(factor))
    }

    /// Current position in song seconds, independent of tempo.
    pub fn seek(&self) -> f64 {
        self.state.borrow().seek
    }

    pub fn tempo(&self) -> f64 {
        self.state.borrow().tempo
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl TimelineState {
    fn handle_command(&mut self, command: TimelineCommand) -> Result<Vec<TimelineEvent>> {
        match command {
            TimelineCommand::TogglePlay => Ok(self.toggle_play()),
            TimelineCommand::Stop => Ok(self.stop()),
            TimelineCommand::SetMetronomeEnabled(enabled) => Ok(self.set_metronome(enabled)),
            TimelineCommand::SetLyricsVisible(visible) => Ok(self.set_lyrics_visible(visible)),
            TimelineCommand::SetPlaybackProgress(progress) => self.set_progress(progress),
            TimelineCommand::RewindBack(seconds) => self.rewind_back(seconds),
            TimelineCommand::SetTempo(factor) => self.set_tempo(factor),
            TimelineCommand::Advance(seconds) => Ok(self.advance(seconds)),
        }
    }

    fn toggle_play(&mut self) -> Vec<TimelineEvent> {
        if self.playing {
            return self.stop();
        }

        let mut events = Vec::new();
        if self.seek >= self.song.duration {
            events.extend(self.move_to(0.0));
        }
        self.playing = true;
        info!(seek = self.seek, tempo = self.tempo, "playback started");
        events.push(TimelineEvent::PlaybackStarted);
        events
    }

    fn stop(&mut self) -> Vec<TimelineEvent> {
        if !self.playing {
            return Vec::new();
        }
        self.playing = false;
        info!(seek = self.seek, "playback stopped");
        vec![TimelineEvent::PlaybackStopped]
    }

    fn set_metronome(&mut self, enabled: bool) -> Vec<TimelineEvent> {
        if self.metronome_enabled == enabled {
            return Vec::new();
        }
        self.metronome_enabled = enabled;
        vec![TimelineEvent::MetronomeChanged { enabled }]
    }

    fn set_lyrics_visible(&mut self, visible: bool) -> Vec<TimelineEvent> {
        if self.lyrics_visible == visible {
            return Vec::new();
        }
        self.lyrics_visible = visible;
        vec![TimelineEvent::LyricsVisibilityChanged { visible }]
    }

    fn set_progress(&mut self, progress: f64) -> Result<Vec<TimelineEvent>> {
        let progress = validate_progress(progress)?;
        let seek = progress_to_seek(progress, self.song.duration);
        debug!(progress, seek, "seek requested");
        Ok(self.move_to(seek))
    }

    fn rewind_back(&mut self, seconds: f64) -> Result<Vec<TimelineEvent>> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(TimelineError::InvalidRewind(seconds));
        }
        Ok(self.move_to(self.seek - seconds * self.tempo))
    }

    fn set_tempo(&mut self, factor: f64) -> Result<Vec<TimelineEvent>> {
        let factor = validate_tempo(factor)?;
        self.tempo = factor;
        info!(factor, "tempo changed");
        Ok(vec![
            TimelineEvent::TempoChanged { factor },
            TimelineEvent::ProgressChanged {
                seek: self.playback_seek(),
            },
        ])
    }

    fn advance(&mut self, seconds: f64) -> Vec<TimelineEvent> {
        if !self.playing || !seconds.is_finite() || seconds <= 0.0 {
            return Vec::new();
        }

        let mut events = self.move_to(self.seek + seconds * self.tempo);
        if self.seek >= self.song.duration {
            events.extend(self.stop());
        }
        events
    }

    fn move_to(&mut self, seek: f64) -> Vec<TimelineEvent> {
        self.seek = normalize_seek(seek, self.song.duration);
        let mut events = vec![TimelineEvent::ProgressChanged {
            seek: self.playback_seek(),
        }];
        events.extend(self.refresh_lyrics());
        events
    }

    /// Position in playback seconds at the current tempo.
    fn playback_seek(&self) -> f64 {
        self.seek / self.tempo
    }

    fn playback_duration(&self) -> f64 {
        self.song.duration / self.tempo
    }

    /// Recomputes the visible lyrics window and highlight, reporting changes only.
    fn refresh_lyrics(&mut self) -> Vec<TimelineEvent> {
        let mut events = Vec::new();
        let current = self.song.line_index_at(self.seek);
        let first = current
            .map(|index| index - index % LYRICS_WINDOW_LINES)
            .unwrap_or(0);
        let window: Vec<String> = self
            .song
            .lyrics
            .iter()
            .skip(first)
            .take(LYRICS_WINDOW_LINES)
            .map(|line| line.text.clone())
            .collect();
        if window != self.lyrics_window {
            self.lyrics_window = window.clone();
            events.push(TimelineEvent::LyricsLinesChanged { lines: window });
        }

        let highlight = current.map(|index| {
            let selected_count = self.song.lyrics[index].selected_chars_at(self.seek);
            LyricsHighlight {
                selected_count,
                last_position: selected_count as f64,
                line_index: index - first,
            }
        });
        if highlight != self.selection {
            self.selection = highlight;
            let highlight = highlight.unwrap_or(LyricsHighlight {
                selected_count: 0,
                last_position: 0.0,
                line_index: 0,
            });
            events.push(TimelineEvent::SelectionChanged {
                selected_count: highlight.selected_count,
                last_position: highlight.last_position,
                line_index: highlight.line_index,
            });
        }
        events
    }
}

impl TimelineEngine for SimulatedTimeline {
    fn toggle_play(&self) -> Result<()> {
        self.execute(TimelineCommand::TogglePlay)
    }

    fn stop(&self) -> Result<()> {
        self.execute(TimelineCommand::Stop)
    }

    fn set_metronome_enabled(&self, enabled: bool) -> Result<()> {
        self.execute(TimelineCommand::SetMetronomeEnabled(enabled))
    }

    fn set_lyrics_visible(&self, visible: bool) -> Result<()> {
        self.execute(TimelineCommand::SetLyricsVisible(visible))
    }

    fn set_playback_progress(&self, progress: f64) -> Result<()> {
        self.execute(TimelineCommand::SetPlaybackProgress(progress))
    }

    fn rewind_back(&self, seconds: f64) -> Result<()> {
        self.execute(TimelineCommand::RewindBack(seconds))
    }

    fn convert_seek_to_progress(&self, seek: f64) -> f64 {
        seek_to_progress(seek, self.state.borrow().playback_duration())
    }

    fn is_metronome_enabled(&self) -> bool {
        self.state.borrow().metronome_enabled
    }

    fn is_lyrics_visible(&self) -> bool {
        self.state.borrow().lyrics_visible
    }

    fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }

    fn lyrics_sections(&self) -> Vec<LyricsSection> {
        let state = self.state.borrow();
        state
            .song
            .sections
            .iter()
            .map(|section| LyricsSection {
                kind: section.kind,
                seek: section.seek / state.tempo,
            })
            .collect()
    }

    fn artist_name(&self) -> String {
        self.state.borrow().song.artist_name.clone()
    }

    fn song_title(&self) -> String {
        self.state.borrow().song.song_title.clone()
    }

    fn duration(&self) -> f64 {
        self.state.borrow().playback_duration()
    }

    fn original_tonality(&self) -> Tonality {
        self.state.borrow().song.tonality
    }

    fn add_listener(&self, listener: Weak<dyn TimelineListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::{Rc, Weak};

    use super::SimulatedTimeline;
    use crate::api::{TimelineEngine, TimelineEvent, TimelineListener};
    use crate::error::TimelineError;
    use crate::song::{LyricLine, LyricsSection, Mode, SectionKind, SongProject, Tonality};

    #[derive(Default)]
    struct EventLog {
        events: RefCell<Vec<TimelineEvent>>,
    }

    impl EventLog {
        fn take(&self) -> Vec<TimelineEvent> {
            self.events.take()
        }
    }

    impl TimelineListener for EventLog {
        fn on_progress_changed(&self, seek: f64) {
            self.events
                .borrow_mut()
                .push(TimelineEvent::ProgressChanged { seek });
        }

        fn on_metronome_changed(&self, enabled: bool) {
            self.events
                .borrow_mut()
                .push(TimelineEvent::MetronomeChanged { enabled });
        }

        fn on_lyrics_lines_changed(&self, lines: &[String]) {
            self.events
                .borrow_mut()
                .push(TimelineEvent::LyricsLinesChanged {
                    lines: lines.to_vec(),
                });
        }

        fn on_selection_changed(&self, selected_count: usize, last_position: f64, line_index: usize) {
            self.events.borrow_mut().push(TimelineEvent::SelectionChanged {
                selected_count,
                last_position,
                line_index,
            });
        }

        fn on_tempo_changed(&self, factor: f64) {
            self.events
                .borrow_mut()
                .push(TimelineEvent::TempoChanged { factor });
        }

        fn on_playback_started(&self) {
            self.events.borrow_mut().push(TimelineEvent::PlaybackStarted);
        }

        fn on_playback_stopped(&self) {
            self.events.borrow_mut().push(TimelineEvent::PlaybackStopped);
        }
    }

    struct StopOnStart {
        timeline: Rc<SimulatedTimeline>,
        stopped: RefCell<bool>,
    }

    impl TimelineListener for StopOnStart {
        fn on_playback_started(&self) {
            self.timeline.stop().expect("reentrant stop");
        }

        fn on_playback_stopped(&self) {
            *self.stopped.borrow_mut() = true;
        }
    }

    fn sample_song() -> SongProject {
        SongProject::new(
            "Artist",
            "Song",
            100.0,
            Tonality::new(2, Mode::Major).expect("valid key"),
            vec![
                LyricsSection {
                    kind: SectionKind::Verse,
                    seek: 10.0,
                },
                LyricsSection {
                    kind: SectionKind::Chorus,
                    seek: 50.0,
                },
            ],
            vec![
                LyricLine {
                    text: "abcdefghij".to_owned(),
                    start: 10.0,
                    end: 20.0,
                },
                LyricLine {
                    text: "klmno".to_owned(),
                    start: 20.0,
                    end: 30.0,
                },
                LyricLine {
                    text: "pqrst".to_owned(),
                    start: 30.0,
                    end: 40.0,
                },
            ],
        )
        .expect("valid song")
    }

    fn attach(timeline: &SimulatedTimeline) -> Rc<EventLog> {
        let log = Rc::new(EventLog::default());
        let weak = Rc::downgrade(&log) as Weak<dyn TimelineListener>;
        timeline.add_listener(weak);
        log
    }

    #[test]
    fn toggle_play_emits_started_then_stopped() {
        let timeline = SimulatedTimeline::new(sample_song());
        let log = attach(&timeline);

        timeline.toggle_play().expect("start");
        assert!(timeline.is_playing());
        timeline.toggle_play().expect("pause");

        assert_eq!(
            log.take(),
            vec![TimelineEvent::PlaybackStarted, TimelineEvent::PlaybackStopped]
        );
    }

    #[test]
    fn stop_while_stopped_emits_nothing() {
        let timeline = SimulatedTimeline::new(sample_song());
        let log = attach(&timeline);

        timeline.stop().expect("stop");

        assert!(log.take().is_empty());
    }

    #[test]
    fn set_playback_progress_echoes_progress_synchronously() {
        let timeline = SimulatedTimeline::new(sample_song());
        let log = attach(&timeline);

        timeline.set_playback_progress(0.05).expect("seek");

        let events = log.take();
        assert_eq!(events[0], TimelineEvent::ProgressChanged { seek: 5.0 });
        assert_eq!(timeline.convert_seek_to_progress(timeline.seek()), 0.05);
    }

    #[test]
    fn set_playback_progress_rejects_out_of_range() {
        let timeline = SimulatedTimeline::new(sample_song());

        let error = timeline
            .set_playback_progress(1.5)
            .expect_err("out of range must fail");

        assert_eq!(error, TimelineError::InvalidProgress(1.5));
        assert_eq!(timeline.seek(), 0.0);
    }

    #[test]
    fn rewind_back_stops_at_song_start() {
        let timeline = SimulatedTimeline::new(sample_song());
        timeline.set_playback_progress(0.03).expect("seek");
        let log = attach(&timeline);

        timeline.rewind_back(5.0).expect("rewind");

        assert_eq!(timeline.seek(), 0.0);
        assert_eq!(log.take()[0], TimelineEvent::ProgressChanged { seek: 0.0 });
        assert!(timeline.rewind_back(-1.0).is_err());
    }

    #[test]
    fn metronome_change_is_reported_once() {
        let timeline = SimulatedTimeline::new(sample_song());
        let log = attach(&timeline);

        timeline.set_metronome_enabled(true).expect("enable");
        timeline.set_metronome_enabled(true).expect("enable again");

        assert_eq!(
            log.take(),
            vec![TimelineEvent::MetronomeChanged { enabled: true }]
        );
    }

    #[test]
    fn tempo_scales_duration_and_advance() {
        let timeline = SimulatedTimeline::new(sample_song());
        let log = attach(&timeline);

        timeline.set_tempo(2.0).expect("tempo");
        assert_eq!(timeline.duration(), 50.0);
        timeline.toggle_play().expect("start");
        timeline.advance(1.5).expect("advance");

        assert_eq!(timeline.seek(), 3.0);
        let events = log.take();
        assert_eq!(
            events[..4],
            [
                TimelineEvent::TempoChanged { factor: 2.0 },
                TimelineEvent::ProgressChanged { seek: 0.0 },
                TimelineEvent::PlaybackStarted,
                TimelineEvent::ProgressChanged { seek: 1.5 },
            ]
        );
        assert!(timeline.set_tempo(0.0).is_err());
    }

    #[test]
    fn reported_positions_never_pass_duration_under_tempo() {
        let timeline = SimulatedTimeline::new(sample_song());
        timeline.set_playback_progress(0.5).expect("seek");
        let log = attach(&timeline);

        timeline.set_tempo(2.0).expect("tempo");
        timeline.toggle_play().expect("start");
        timeline.advance(40.0).expect("advance past end");

        let seeks: Vec<f64> = log
            .take()
            .into_iter()
            .filter_map(|event| match event {
                TimelineEvent::ProgressChanged { seek } => Some(seek),
                _ => None,
            })
            .collect();
        assert_eq!(seeks, vec![25.0, 50.0]);
        assert!(seeks.iter().all(|seek| *seek <= timeline.duration()));
        assert_eq!(timeline.convert_seek_to_progress(25.0), 0.5);
        assert!(!timeline.is_playing());
    }

    #[test]
    fn sections_and_rewind_follow_playback_seconds() {
        let timeline = SimulatedTimeline::new(sample_song());
        timeline.set_tempo(2.0).expect("tempo");
        timeline.set_playback_progress(0.5).expect("seek");
        let log = attach(&timeline);

        timeline.rewind_back(5.0).expect("rewind");

        assert_eq!(timeline.seek(), 40.0);
        assert_eq!(log.take()[0], TimelineEvent::ProgressChanged { seek: 20.0 });
        let seeks: Vec<f64> = timeline
            .lyrics_sections()
            .iter()
            .map(|section| section.seek)
            .collect();
        assert_eq!(seeks, vec![5.0, 25.0]);
    }

    #[test]
    fn advance_is_ignored_while_stopped() {
        let timeline = SimulatedTimeline::new(sample_song());
        let log = attach(&timeline);

        timeline.advance(3.0).expect("advance");

        assert_eq!(timeline.seek(), 0.0);
        assert!(log.take().is_empty());
    }

    #[test]
    fn advance_past_end_stops_playback() {
        let timeline = SimulatedTimeline::new(sample_song());
        timeline.set_playback_progress(0.99).expect("seek");
        timeline.toggle_play().expect("start");
        let log = attach(&timeline);

        timeline.advance(5.0).expect("advance");

        assert!(!timeline.is_playing());
        assert_eq!(timeline.seek(), 100.0);
        assert_eq!(log.take().last(), Some(&TimelineEvent::PlaybackStopped));
    }

    #[test]
    fn toggle_play_at_end_restarts_from_beginning() {
        let timeline = SimulatedTimeline::new(sample_song());
        timeline.set_playback_progress(1.0).expect("seek to end");

        timeline.toggle_play().expect("start");

        assert_eq!(timeline.seek(), 0.0);
        assert!(timeline.is_playing());
    }

    #[test]
    fn seeking_into_lyrics_reports_window_and_selection() {
        let timeline = SimulatedTimeline::new(sample_song());
        let log = attach(&timeline);

        timeline.set_playback_progress(0.25).expect("seek");

        assert_eq!(
            log.take(),
            vec![
                TimelineEvent::ProgressChanged { seek: 25.0 },
                TimelineEvent::LyricsLinesChanged {
                    lines: vec!["abcdefghij".to_owned(), "klmno".to_owned()],
                },
                TimelineEvent::SelectionChanged {
                    selected_count: 2,
                    last_position: 2.0,
                    line_index: 1,
                },
            ]
        );
    }

    #[test]
    fn crossing_a_page_boundary_replaces_lyrics_window() {
        let timeline = SimulatedTimeline::new(sample_song());
        let log = attach(&timeline);

        timeline.set_playback_progress(0.35).expect("seek");

        let events = log.take();
        assert_eq!(
            events[1],
            TimelineEvent::LyricsLinesChanged {
                lines: vec!["pqrst".to_owned()],
            }
        );
        assert_eq!(
            events[2],
            TimelineEvent::SelectionChanged {
                selected_count: 2,
                last_position: 2.0,
                line_index: 0,
            }
        );
    }

    #[test]
    fn listener_may_stop_playback_from_started_callback() {
        let timeline = Rc::new(SimulatedTimeline::new(sample_song()));
        let listener = Rc::new(StopOnStart {
            timeline: Rc::clone(&timeline),
            stopped: RefCell::new(false),
        });
        let weak = Rc::downgrade(&listener) as Weak<dyn TimelineListener>;
        timeline.add_listener(weak);

        timeline.toggle_play().expect("start");

        assert!(!timeline.is_playing());
        assert!(*listener.stopped.borrow());
    }

    #[test]
    fn removed_listener_gets_no_further_events() {
        let timeline = SimulatedTimeline::new(sample_song());
        let log = Rc::new(EventLog::default());
        let weak = Rc::downgrade(&log) as Weak<dyn TimelineListener>;
        let id = timeline.add_listener(weak);

        timeline.remove_listener(id);
        timeline.toggle_play().expect("start");

        assert!(log.take().is_empty());
        assert_eq!(timeline.listener_count(), 0);
    }
}
