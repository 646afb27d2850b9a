//! Renders one tagged audio file per exercise.
//!
//! Exercises are processed strictly in order, one at a time. File names are
//! derived from exercise names, so two renderers must never share an output
//! directory.

use crate::audio_buffer::AudioBuffer;
use crate::error::RepcastResult;
use crate::exercise::ExerciseRecord;
use crate::exporter::TrackExporter;
use crate::synthesis::{SpeechSynthesizer, SynthesisPolicy};
use crate::tags::TagOptions;
use crate::timeline::Timeline;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Longest file stem derived from an exercise name
pub const MAX_STEM_CHARS: usize = 20;

/// One rendered exercise
#[derive(Debug, Clone)]
pub struct Segment {
    /// The exercise that was rendered
    pub exercise: ExerciseRecord,
    /// Synthesized instruction; empty if synthesis was skipped
    pub speech: AudioBuffer,
    /// Where the rendered track was written
    pub path: PathBuf,
}

/// File stem for an exercise name: lowercase, safe characters only,
/// whitespace folded to `_`, at most [`MAX_STEM_CHARS`] characters.
#[must_use]
pub fn track_stem(name: &str) -> String {
    let folded = name
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_lowercase();

    let truncated: String = folded.chars().take(MAX_STEM_CHARS).collect();
    let trimmed = truncated.trim_matches('_');
    if trimmed.is_empty() {
        "exercise".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Drives synthesis, assembly and export for a list of exercises
pub struct Renderer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    timeline: Timeline,
    exporter: TrackExporter,
    output_dir: PathBuf,
    policy: SynthesisPolicy,
    reserved: HashSet<String>,
}

impl Renderer {
    /// Create a renderer writing into `output_dir`
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        timeline: Timeline,
        exporter: TrackExporter,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            synthesizer,
            timeline,
            exporter,
            output_dir: output_dir.into(),
            policy: SynthesisPolicy::default(),
            reserved: HashSet::new(),
        }
    }

    /// Set how synthesis failures are handled
    #[must_use]
    pub fn with_policy(mut self, policy: SynthesisPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Keep per-exercise files from using `stem` (e.g. the merged output).
    ///
    /// Stems are compared ignoring case, so `Plank` also reserves `plank`.
    #[must_use]
    pub fn with_reserved_stem(mut self, stem: impl AsRef<str>) -> Self {
        self.reserved.insert(stem_key(stem.as_ref()));
        self
    }

    /// Render every exercise in order, one file each.
    ///
    /// Track `i` (0-based) is tagged `i+1/N`. A repeated file stem gets
    /// `_{track}` appended.
    ///
    /// # Errors
    ///
    /// Returns the first write, tagging or (under [`SynthesisPolicy::Fail`])
    /// synthesis error. Files rendered before the failure stay on disk.
    pub async fn render_all(
        &self,
        exercises: &[ExerciseRecord],
        tags: &TagOptions,
    ) -> RepcastResult<Vec<Segment>> {
        let total = u32::try_from(exercises.len()).unwrap_or(u32::MAX);
        let settings = self.exporter.writer().settings();
        let extension = self.exporter.format().extension();
        let mut used = self.reserved.clone();
        let mut segments = Vec::with_capacity(exercises.len());

        info!(
            "Rendering {} exercise(s) into {}",
            exercises.len(),
            self.output_dir.display()
        );

        for (i, exercise) in exercises.iter().enumerate() {
            let track = u32::try_from(i + 1).unwrap_or(u32::MAX);

            let synthesized = self
                .policy
                .run(
                    self.synthesizer.as_ref(),
                    &exercise.instruction_text(),
                    exercise.language(),
                    exercise.slow(),
                )
                .await?;
            let speech = match synthesized {
                Some(audio) => audio.conform(settings.sample_rate, settings.channels)?,
                None => AudioBuffer::empty(settings.sample_rate, settings.channels),
            };

            let audio = self.timeline.assemble(&speech, exercise.duration())?;

            let stem = unique_stem(&track_stem(exercise.name()), track, &mut used);
            let path = self.output_dir.join(format!("{stem}.{extension}"));
            self.exporter
                .export(&audio, &path, &tags.for_track(exercise.name(), track, total))
                .await?;

            info!(
                "[{}/{}] {} -> {} ({:.1}s)",
                track,
                total,
                exercise,
                path.display(),
                audio.duration().as_secs_f64()
            );

            segments.push(Segment {
                exercise: exercise.clone(),
                speech,
                path,
            });
        }

        Ok(segments)
    }
}

/// Case-folded stem, so names that differ only in case never share a file
/// on case-insensitive filesystems
fn stem_key(stem: &str) -> String {
    stem.to_lowercase()
}

fn unique_stem(base: &str, track: u32, used: &mut HashSet<String>) -> String {
    let mut stem = base.to_string();
    let mut suffix = track;
    while used.contains(&stem_key(&stem)) {
        stem = format!("{base}_{suffix}");
        suffix += 1;
    }
    used.insert(stem_key(&stem));
    stem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_stem_sanitizes() {
        assert_eq!(track_stem("Jumping Jacks"), "jumping_jacks");
        assert_eq!(track_stem("  push-ups (wide)!  "), "push-ups_wide");
        assert_eq!(track_stem("???"), "exercise");
    }

    #[test]
    fn test_track_stem_truncates() {
        let stem = track_stem("mountain climbers with a twist");
        assert_eq!(stem, "mountain_climbers_wi");
        assert_eq!(stem.chars().count(), MAX_STEM_CHARS);

        assert_eq!(track_stem("abcdefghijklmnopqrs tuv"), "abcdefghijklmnopqrs");
    }

    #[test]
    fn test_unique_stem_disambiguates() {
        let mut used = HashSet::new();
        assert_eq!(unique_stem("plank", 1, &mut used), "plank");
        assert_eq!(unique_stem("plank", 3, &mut used), "plank_3");
        assert_eq!(unique_stem("squats", 4, &mut used), "squats");

        used.insert("lunges_5".to_string());
        used.insert("lunges".to_string());
        assert_eq!(unique_stem("lunges", 5, &mut used), "lunges_6");
    }

    #[test]
    fn test_unique_stem_ignores_case() {
        // Output `Plank.mp3` reserved next to an exercise called "plank"
        let mut used = HashSet::from([stem_key("Plank")]);
        assert_eq!(unique_stem(&track_stem("plank"), 1, &mut used), "plank_1");
        assert_eq!(unique_stem("PLANK_1", 2, &mut used), "PLANK_1_2");
    }
}
