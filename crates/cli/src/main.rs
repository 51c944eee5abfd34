use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use session::{AudioIo, AudioIoError, NullAudioIo, SessionConfig, SyncBridge};
use timeline::{
    LyricLine, LyricsSection, Mode, SectionKind, SimulatedTimeline, SongProject, TimelineEngine,
    Tonality,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Runs a scripted practice session and prints the display state after each step.
#[derive(Debug, Parser)]
#[command(name = "vocal-session", version)]
struct Args {
    /// Seconds the "retry" button rewinds.
    #[arg(long, default_value_t = session::DEFAULT_RETRY_SECONDS)]
    retry_seconds: u32,

    /// Playback tempo factor; 1.0 is the original tempo.
    #[arg(long, default_value_t = 1.0)]
    tempo: f64,

    /// Number of playback ticks to simulate.
    #[arg(long, default_value_t = 8)]
    ticks: u32,

    /// Wall-clock length of one tick in milliseconds.
    #[arg(long, default_value_t = 2_500)]
    tick_ms: u64,

    /// Slider position to seek to after the ticks, in 0..=1.
    #[arg(long, default_value_t = 0.5)]
    seek: f64,

    /// Simulate an audio graph that refuses to start.
    #[arg(long)]
    fail_audio: bool,
}

/// Audio graph that always fails, for exercising the failure path.
#[derive(Debug, Default)]
struct UnavailableAudioIo;

impl AudioIo for UnavailableAudioIo {
    fn start(&mut self) -> std::result::Result<(), AudioIoError> {
        Err(AudioIoError::DeviceUnavailable("default input".to_owned()))
    }

    fn stop(&mut self) {}
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let timeline = Rc::new(SimulatedTimeline::new(demo_song()?));
    let audio: Box<dyn AudioIo> = if args.fail_audio {
        Box::new(UnavailableAudioIo)
    } else {
        Box::new(NullAudioIo::new())
    };
    let config = SessionConfig {
        retry_seconds: args.retry_seconds,
    };
    let engine: Rc<dyn TimelineEngine> = Rc::clone(&timeline) as Rc<dyn TimelineEngine>;
    let bridge = SyncBridge::new(engine, audio, config);
    print_snapshot("attached", &bridge)?;

    timeline
        .set_tempo(args.tempo)
        .context("failed to apply tempo")?;
    print_snapshot("tempo", &bridge)?;

    if let Err(error) = bridge.toggle_play() {
        warn!(%error, "playback could not start");
    }
    print_snapshot("toggle_play", &bridge)?;

    let tick_seconds = args.tick_ms as f64 / 1_000.0;
    for tick in 0..args.ticks {
        timeline
            .advance(tick_seconds)
            .with_context(|| format!("failed to advance tick {tick}"))?;
        print_snapshot("tick", &bridge)?;
    }

    bridge.set_progress(args.seek).context("failed to seek")?;
    print_snapshot("seek", &bridge)?;

    bridge.rewind_back().context("failed to rewind")?;
    print_snapshot("retry", &bridge)?;

    bridge.set_metronome_enabled(true).context("failed to enable metronome")?;
    print_snapshot("metronome", &bridge)?;

    bridge.teardown();
    info!(playing = timeline.is_playing(), "session finished");
    print_snapshot("teardown", &bridge)?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_snapshot(step: &str, bridge: &SyncBridge) -> Result<()> {
    let line = serde_json::json!({
        "step": step,
        "state": bridge.snapshot(),
    });
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}

fn demo_song() -> Result<SongProject> {
    let lyrics = [
        ("Morning light upon the hill", 8.0, 14.0),
        ("Carry every note until", 14.0, 20.0),
        ("Voices rise and voices fall", 24.0, 30.0),
        ("Sing it once and sing it all", 30.0, 36.0),
    ]
    .into_iter()
    .map(|(text, start, end)| LyricLine {
        text: text.to_owned(),
        start,
        end,
    })
    .collect();

    let sections = vec![
        LyricsSection {
            kind: SectionKind::Intro,
            seek: 0.0,
        },
        LyricsSection {
            kind: SectionKind::Verse,
            seek: 8.0,
        },
        LyricsSection {
            kind: SectionKind::Chorus,
            seek: 24.0,
        },
        LyricsSection {
            kind: SectionKind::Outro,
            seek: 36.0,
        },
    ];

    let song = SongProject::new(
        "Demo Choir",
        "Warm-Up Song",
        42.0,
        Tonality::new(2, Mode::Major)?,
        sections,
        lyrics,
    )?;
    Ok(song)
}
