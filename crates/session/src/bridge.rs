use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

use timeline::{ListenerId, TimelineEngine, TimelineListener};
use tracing::{debug, error, info, warn};

use crate::audio::AudioIo;
use crate::config::SessionConfig;
use crate::display::{
    DisplayField, DisplayState, LyricsSelection, PlayState, PlaybackSection, SessionSnapshot,
};
use crate::error::{Result, SessionError};
use crate::format::format_playback_time;
use crate::sections::{EnglishSectionNames, SectionNames, build_playback_sections};

type Observer = Rc<dyn Fn(DisplayField)>;

/// Two-way state bridge between a playback timeline and a UI surface.
///
/// User actions go through the `set_*`/command methods, which update the
/// mirrored field and forward a command. Engine notifications only update
/// the mirror. The progress field, the only one both sides write, is
/// protected by a scoped guard so a seek never produces more than one
/// outbound command, whatever the engine or a UI binding echoes back.
///
/// All methods must be called on the thread that drives the engine.
pub struct SyncBridge {
    core: Rc<BridgeCore>,
}

struct BridgeCore {
    engine: Rc<dyn TimelineEngine>,
    audio: RefCell<Box<dyn AudioIo>>,
    title: String,
    sections: Vec<PlaybackSection>,
    retry_seconds: u32,
    display: RefCell<DisplayState>,
    progress_guard: Cell<bool>,
    audio_running: Cell<bool>,
    listener_id: Cell<Option<ListenerId>>,
    failure: RefCell<Option<SessionError>>,
    observers: RefCell<Vec<Observer>>,
}

/// Holds the progress field for one writer; released on every exit path.
struct ProgressGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> ProgressGuard<'a> {
    /// Returns `None` when another writer already holds the field.
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

impl SyncBridge {
    /// Attaches a session to a loaded timeline using English section names.
    pub fn new(
        engine: Rc<dyn TimelineEngine>,
        audio: Box<dyn AudioIo>,
        config: SessionConfig,
    ) -> Self {
        Self::with_section_names(engine, audio, config, &EnglishSectionNames)
    }

    /// Attaches a session, naming section markers with `names`.
    ///
    /// Every display field is read from the engine before the bridge starts
    /// listening for notifications.
    pub fn with_section_names(
        engine: Rc<dyn TimelineEngine>,
        audio: Box<dyn AudioIo>,
        config: SessionConfig,
        names: &dyn SectionNames,
    ) -> Self {
        let sections = build_playback_sections(engine.as_ref(), names);
        let title = format!("{} - {}", engine.artist_name(), engine.song_title());
        let display = DisplayState {
            progress: 0.0,
            current_time_text: format_playback_time(0.0),
            end_time_text: format_playback_time(engine.duration()),
            play_state: PlayState::Stopped,
            metronome_enabled: engine.is_metronome_enabled(),
            lyrics_visible: engine.is_lyrics_visible(),
            lyrics_lines: Vec::new(),
            lyrics_selection: LyricsSelection::default(),
        };

        let core = Rc::new(BridgeCore {
            engine: Rc::clone(&engine),
            audio: RefCell::new(audio),
            title,
            sections,
            retry_seconds: config.retry_seconds,
            display: RefCell::new(display),
            progress_guard: Cell::new(false),
            audio_running: Cell::new(false),
            listener_id: Cell::new(None),
            failure: RefCell::new(None),
            observers: RefCell::new(Vec::new()),
        });

        let listener = Rc::downgrade(&core) as Weak<dyn TimelineListener>;
        let id = engine.add_listener(listener);
        core.listener_id.set(Some(id));
        info!(
            title = %core.title,
            sections = core.sections.len(),
            "playback session attached"
        );

        Self { core }
    }

    /// Requests a metronome change; the field reflects the request at once.
    pub fn set_metronome_enabled(&self, enabled: bool) -> Result<()> {
        let core = &self.core;
        if !core.is_attached() {
            return Ok(());
        }
        core.update(DisplayField::MetronomeEnabled, |d| &mut d.metronome_enabled, enabled);
        core.engine.set_metronome_enabled(enabled)?;
        Ok(())
    }

    /// Requests a lyrics visibility change; the field reflects it at once.
    pub fn set_lyrics_visible(&self, visible: bool) -> Result<()> {
        let core = &self.core;
        if !core.is_attached() {
            return Ok(());
        }
        core.update(DisplayField::LyricsVisible, |d| &mut d.lyrics_visible, visible);
        core.engine.set_lyrics_visible(visible)?;
        Ok(())
    }

    /// Moves the progress slider and seeks the engine.
    ///
    /// Values are clamped to `0..=1`; non-finite values are ignored. The
    /// command is only sent when the mirrored value actually changes, and
    /// never from a call nested inside another progress write.
    pub fn set_progress(&self, value: f64) -> Result<()> {
        let core = &self.core;
        if !core.is_attached() {
            return Ok(());
        }
        if !value.is_finite() {
            warn!(value, "ignoring non-finite playback progress");
            return Ok(());
        }
        let progress = value.clamp(0.0, 1.0);
        if progress != value {
            debug!(value, progress, "playback progress clamped");
        }

        let Some(_guard) = ProgressGuard::acquire(&core.progress_guard) else {
            core.update(DisplayField::Progress, |d| &mut d.progress, progress);
            return Ok(());
        };
        let previous = core.display.borrow().progress;
        if !core.update(DisplayField::Progress, |d| &mut d.progress, progress) {
            return Ok(());
        }
        debug!(progress, "seeking timeline");
        if let Err(error) = core.engine.set_playback_progress(progress) {
            // The engine kept its old position.
            core.update(DisplayField::Progress, |d| &mut d.progress, previous);
            return Err(error.into());
        }
        Ok(())
    }

    /// Asks the engine to toggle play/pause.
    ///
    /// The play state changes only when the engine reports it. If the engine
    /// starts synchronously and the audio graph fails, the failure is
    /// returned here. A failure recorded before this call stays available
    /// through [`SyncBridge::take_failure`].
    pub fn toggle_play(&self) -> Result<()> {
        let core = &self.core;
        if !core.is_attached() {
            return Ok(());
        }
        let earlier = core.take_failure();
        let toggled = core.engine.toggle_play();
        let failure = core.take_failure();
        if earlier.is_some() {
            *core.failure.borrow_mut() = earlier;
        }
        toggled?;
        match failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    /// Rewinds by the configured retry distance.
    pub fn rewind_back(&self) -> Result<()> {
        let core = &self.core;
        if !core.is_attached() {
            return Ok(());
        }
        core.engine.rewind_back(f64::from(core.retry_seconds))?;
        Ok(())
    }

    /// Stops playback when the hosting screen goes to the background.
    pub fn will_become_inactive(&self) -> Result<()> {
        let core = &self.core;
        if !core.is_attached() {
            return Ok(());
        }
        core.engine.stop()?;
        Ok(())
    }

    /// Detaches from the engine, stopping playback first if it is running.
    ///
    /// Idempotent. Every later call and notification is a no-op.
    pub fn teardown(&self) {
        let core = &self.core;
        let Some(id) = core.listener_id.get() else {
            return;
        };

        let playing = core.display.borrow().play_state == PlayState::Playing;
        if playing {
            if let Err(error) = core.engine.stop() {
                warn!(%error, "failed to stop playback during teardown");
            }
        }

        core.listener_id.set(None);
        core.engine.remove_listener(id);
        if core.audio_running.replace(false) {
            core.audio.borrow_mut().stop();
        }
        core.observers.borrow_mut().clear();
        info!(title = %core.title, "playback session detached");
    }

    /// Registers a callback run whenever a display field changes value.
    ///
    /// Callbacks may call back into the bridge.
    pub fn observe(&self, observer: impl Fn(DisplayField) + 'static) {
        if !self.core.is_attached() {
            return;
        }
        self.core.observers.borrow_mut().push(Rc::new(observer));
    }

    /// Returns and clears the last failure reported from a notification.
    pub fn take_failure(&self) -> Option<SessionError> {
        self.core.take_failure()
    }

    pub fn is_attached(&self) -> bool {
        self.core.is_attached()
    }

    pub fn title(&self) -> &str {
        &self.core.title
    }

    pub fn sections(&self) -> &[PlaybackSection] {
        &self.core.sections
    }

    pub fn retry_seconds(&self) -> u32 {
        self.core.retry_seconds
    }

    /// Song key as a display string, read from the engine on every call.
    pub fn original_tonality(&self) -> String {
        self.core.engine.original_tonality().to_string()
    }

    pub fn progress(&self) -> f64 {
        self.core.display.borrow().progress
    }

    pub fn current_time_text(&self) -> String {
        self.core.display.borrow().current_time_text.clone()
    }

    pub fn end_time_text(&self) -> String {
        self.core.display.borrow().end_time_text.clone()
    }

    pub fn play_state(&self) -> PlayState {
        self.core.display.borrow().play_state
    }

    pub fn is_playing(&self) -> bool {
        self.play_state() == PlayState::Playing
    }

    pub fn is_metronome_enabled(&self) -> bool {
        self.core.display.borrow().metronome_enabled
    }

    pub fn is_lyrics_visible(&self) -> bool {
        self.core.display.borrow().lyrics_visible
    }

    pub fn lyrics_lines(&self) -> Vec<String> {
        self.core.display.borrow().lyrics_lines.clone()
    }

    pub fn lyrics_selection(&self) -> LyricsSelection {
        self.core.display.borrow().lyrics_selection
    }

    /// Copies every display field into a serializable snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        let core = &self.core;
        let display = core.display.borrow();
        SessionSnapshot {
            title: core.title.clone(),
            original_tonality: core.engine.original_tonality().to_string(),
            progress: display.progress,
            current_time_text: display.current_time_text.clone(),
            end_time_text: display.end_time_text.clone(),
            is_playing: display.play_state == PlayState::Playing,
            is_metronome_enabled: display.metronome_enabled,
            is_lyrics_visible: display.lyrics_visible,
            lyrics_lines: display.lyrics_lines.clone(),
            lyrics_selection: display.lyrics_selection,
            sections: core.sections.clone(),
            retry_seconds: core.retry_seconds,
        }
    }
}

impl Drop for SyncBridge {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Debug for SyncBridge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncBridge")
            .field("title", &self.core.title)
            .field("attached", &self.core.is_attached())
            .field("display", &*self.core.display.borrow())
            .finish()
    }
}

impl BridgeCore {
    fn is_attached(&self) -> bool {
        self.listener_id.get().is_some()
    }

    fn take_failure(&self) -> Option<SessionError> {
        self.failure.borrow_mut().take()
    }

    /// Writes one display field and tells observers if the value changed.
    fn update<T, F>(&self, field: DisplayField, slot: F, value: T) -> bool
    where
        T: PartialEq,
        F: FnOnce(&mut DisplayState) -> &mut T,
    {
        let changed = {
            let mut display = self.display.borrow_mut();
            let current = slot(&mut display);
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        };
        if changed {
            self.publish(field);
        }
        changed
    }

    fn publish(&self, field: DisplayField) {
        let observers: Vec<Observer> = self.observers.borrow().clone();
        for observer in observers {
            observer(field);
        }
    }
}

impl TimelineListener for BridgeCore {
    fn on_progress_changed(&self, seek: f64) {
        if !self.is_attached() {
            return;
        }
        let progress = self.engine.convert_seek_to_progress(seek);
        {
            // Observers reacting to this write must not seek the engine again.
            let _guard = ProgressGuard::acquire(&self.progress_guard);
            self.update(DisplayField::Progress, |d| &mut d.progress, progress);
        }
        self.update(
            DisplayField::CurrentTime,
            |d| &mut d.current_time_text,
            format_playback_time(seek),
        );
    }

    fn on_metronome_changed(&self, enabled: bool) {
        if !self.is_attached() {
            return;
        }
        self.update(DisplayField::MetronomeEnabled, |d| &mut d.metronome_enabled, enabled);
    }

    fn on_lyrics_visibility_changed(&self, visible: bool) {
        if !self.is_attached() {
            return;
        }
        self.update(DisplayField::LyricsVisible, |d| &mut d.lyrics_visible, visible);
    }

    fn on_lyrics_lines_changed(&self, lines: &[String]) {
        if !self.is_attached() {
            return;
        }
        self.update(DisplayField::LyricsLines, |d| &mut d.lyrics_lines, lines.to_vec());
    }

    fn on_selection_changed(&self, selected_count: usize, last_position: f64, line_index: usize) {
        if !self.is_attached() {
            return;
        }
        let selection = LyricsSelection::from_highlight(selected_count, last_position, line_index);
        self.update(DisplayField::LyricsSelection, |d| &mut d.lyrics_selection, selection);
    }

    fn on_tempo_changed(&self, factor: f64) {
        if !self.is_attached() {
            return;
        }
        let duration = self.engine.duration();
        debug!(factor, duration, "tempo changed");
        self.update(
            DisplayField::EndTime,
            |d| &mut d.end_time_text,
            format_playback_time(duration),
        );
    }

    fn on_playback_started(&self) {
        if !self.is_attached() {
            return;
        }
        let started = self.audio.borrow_mut().start();
        match started {
            Ok(()) => {
                self.audio_running.set(true);
                self.update(DisplayField::PlayState, |d| &mut d.play_state, PlayState::Playing);
            }
            Err(audio_error) => {
                if let Err(stop_error) = self.engine.stop() {
                    warn!(%stop_error, "failed to stop playback after audio start failure");
                }
                error!(%audio_error, "audio graph failed to start after playback began");
                *self.failure.borrow_mut() = Some(SessionError::AudioStart(audio_error));
            }
        }
    }

    fn on_playback_stopped(&self) {
        if !self.is_attached() {
            return;
        }
        self.audio.borrow_mut().stop();
        self.audio_running.set(false);
        self.update(DisplayField::PlayState, |d| &mut d.play_state, PlayState::Stopped);
    }
}
