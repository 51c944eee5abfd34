use timeline::{SectionKind, TimelineEngine};

use crate::display::PlaybackSection;

/// Display names for section kinds. Hosts plug their localization in here.
pub trait SectionNames {
    fn name(&self, kind: SectionKind) -> String;
}

/// Built-in English section names.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishSectionNames;

impl SectionNames for EnglishSectionNames {
    fn name(&self, kind: SectionKind) -> String {
        let name = match kind {
            SectionKind::Intro => "Intro",
            SectionKind::Verse => "Verse",
            SectionKind::PreChorus => "Pre-Chorus",
            SectionKind::Chorus => "Chorus",
            SectionKind::Bridge => "Bridge",
            SectionKind::Solo => "Solo",
            SectionKind::Outro => "Outro",
        };
        name.to_owned()
    }
}

/// Maps the engine's sections to slider markers, keeping engine order.
pub fn build_playback_sections(
    engine: &dyn TimelineEngine,
    names: &dyn SectionNames,
) -> Vec<PlaybackSection> {
    engine
        .lyrics_sections()
        .into_iter()
        .map(|section| PlaybackSection {
            name: names.name(section.kind),
            position: engine.convert_seek_to_progress(section.seek),
        })
        .collect()
}
