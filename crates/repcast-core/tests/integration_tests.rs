//! Integration tests for repcast-core

use async_trait::async_trait;
use lofty::file::TaggedFileExt;
use lofty::tag::Accessor;
use repcast_core::{
    load_exercises, AudioBuffer, AudioDecoder, AudioFormat, AudioResources, AudioWriter,
    CsvSource, EncodingSettings, ExerciseRecord, LineSource, Merger, RepcastError, RepcastResult,
    Renderer, SpeechSynthesizer, SynthesisPolicy, TagOptions, Timeline, TrackExporter,
    XlsxSource,
};
use rstest::rstest;
use rust_xlsxwriter::Workbook;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

const RATE: u32 = 8000;

/// One second of tone for every request
struct FixedSpeech {
    calls: AtomicU32,
}

#[async_trait]
impl SpeechSynthesizer for FixedSpeech {
    async fn synthesize(
        &self,
        _text: &str,
        _language: &str,
        _slow: bool,
    ) -> RepcastResult<AudioBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AudioBuffer::sine(440.0, Duration::from_secs(1), 0.5, RATE, 1))
    }
}

struct Offline;

#[async_trait]
impl SpeechSynthesizer for Offline {
    async fn synthesize(
        &self,
        _text: &str,
        _language: &str,
        _slow: bool,
    ) -> RepcastResult<AudioBuffer> {
        Err(RepcastError::synthesis("network unreachable"))
    }
}

fn workout() -> Vec<ExerciseRecord> {
    vec![
        ExerciseRecord::new("jumping jacks", 30, Some(30)).unwrap(),
        ExerciseRecord::new("burpees", 7, None).unwrap(),
    ]
}

fn exporter_for(format: AudioFormat) -> TrackExporter {
    TrackExporter::new(AudioWriter::with_settings(EncodingSettings::new(RATE, 1)), format)
}

fn exporter() -> TrackExporter {
    exporter_for(AudioFormat::Wav)
}

fn generated() -> AudioResources {
    AudioResources::generated(RATE, 1).unwrap()
}

fn renderer_for(synth: Arc<dyn SpeechSynthesizer>, dir: &Path, format: AudioFormat) -> Renderer {
    Renderer::new(synth, Timeline::new(generated().markers), exporter_for(format), dir)
}

fn renderer(synth: Arc<dyn SpeechSynthesizer>, dir: &Path) -> Renderer {
    renderer_for(synth, dir, AudioFormat::Wav)
}

fn fixed_speech() -> Arc<FixedSpeech> {
    Arc::new(FixedSpeech {
        calls: AtomicU32::new(0),
    })
}

fn frames_of(path: &Path) -> usize {
    AudioDecoder::decode_file(path).unwrap().frames()
}

fn secs(s: f64) -> usize {
    (s * f64::from(RATE)) as usize
}

fn files_with(dir: &Path, extension: &str) -> Vec<String> {
    let suffix = format!(".{extension}");
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(&suffix))
        .collect();
    names.sort();
    names
}

fn wav_files(dir: &Path) -> Vec<String> {
    files_with(dir, "wav")
}

#[tokio::test]
async fn test_render_without_merge() {
    let dir = tempfile::tempdir().unwrap();
    let synth = fixed_speech();

    let segments = renderer(synth.clone(), dir.path())
        .render_all(&workout(), &TagOptions::default())
        .await
        .unwrap();

    assert_eq!(synth.calls.load(Ordering::SeqCst), 2);
    assert_eq!(segments.len(), 2);
    assert_eq!(wav_files(dir.path()), vec!["burpees.wav", "jumping_jacks.wav"]);

    // speech + 2.5s pause + exercise window
    assert_eq!(frames_of(&segments[0].path), secs(1.0 + 2.5 + 30.0));
    assert_eq!(frames_of(&segments[1].path), secs(1.0 + 2.5 + 7.0));
    assert_eq!(segments[0].speech.frames(), secs(1.0));
}

#[tokio::test]
async fn test_track_tags() {
    let dir = tempfile::tempdir().unwrap();
    let options = TagOptions {
        title: None,
        artist: Some("Coach".into()),
        album: None,
    };

    let segments = renderer(fixed_speech(), dir.path())
        .render_all(&workout(), &options)
        .await
        .unwrap();

    for (i, segment) in segments.iter().enumerate() {
        let tagged = lofty::read_from_path(&segment.path).unwrap();
        let tag = tagged.primary_tag().unwrap();
        assert_eq!(tag.title().as_deref(), Some(segment.exercise.name()));
        assert_eq!(tag.artist().as_deref(), Some("Coach"));
        assert_eq!(tag.album().as_deref(), Some("Unknown Album"));
        assert_eq!(tag.track(), Some(i as u32 + 1));
        assert_eq!(tag.track_total(), Some(2));
    }
}

#[rstest]
#[case::wav(AudioFormat::Wav)]
#[case::mp3(AudioFormat::Mp3)]
#[tokio::test]
async fn test_merge_scenario(#[case] format: AudioFormat) {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join(format!("workout.{}", format.extension()));
    let resources = generated();
    let finish_frames = resources.finish.frames();

    let segments = renderer_for(fixed_speech(), dir.path(), format)
        .with_reserved_stem("workout")
        .render_all(&workout(), &TagOptions::default())
        .await
        .unwrap();

    // Decoded lengths match what was encoded, for MP3 as well as WAV
    assert_eq!(frames_of(&segments[0].path), secs(1.0 + 2.5 + 30.0));
    assert_eq!(frames_of(&segments[1].path), secs(1.0 + 2.5 + 7.0));
    let segment_frames: usize = segments.iter().map(|s| frames_of(&s.path)).sum();

    let merged = Merger::new(exporter_for(format), resources.finish)
        .merge(&segments, &output, &TagOptions::default().for_merged(&output))
        .await
        .unwrap();

    assert_eq!(merged, output);
    assert_eq!(frames_of(&output), secs(2.0) + segment_frames + finish_frames);
    assert_eq!(finish_frames, secs(0.9));

    // Segment files are gone once the merge succeeded
    assert_eq!(
        files_with(dir.path(), format.extension()),
        vec![format!("workout.{}", format.extension())]
    );
    assert!(segments.iter().all(|s| !s.path.exists()));

    let tagged = lofty::read_from_path(&output).unwrap();
    let tag = tagged.primary_tag().unwrap();
    assert_eq!(tag.title().as_deref(), Some("workout"));
    assert_eq!(tag.track(), None);
}

#[tokio::test]
async fn test_failed_merge_keeps_segments() {
    let dir = tempfile::tempdir().unwrap();
    let segments = renderer(fixed_speech(), dir.path())
        .render_all(&workout(), &TagOptions::default())
        .await
        .unwrap();

    // A directory where the merged file should go cannot be written
    let output = dir.path().join("blocked.wav");
    std::fs::create_dir(&output).unwrap();

    let merger = Merger::new(exporter(), generated().finish);
    assert!(merger
        .merge(&segments, &output, &TagOptions::default().for_merged(&output))
        .await
        .is_err());
    assert!(segments.iter().all(|s| s.path.exists()));
}

#[tokio::test]
async fn test_corrupt_segment_fails_merge() {
    let dir = tempfile::tempdir().unwrap();
    let segments = renderer(fixed_speech(), dir.path())
        .render_all(&workout(), &TagOptions::default())
        .await
        .unwrap();

    // Lose the second half of the first track
    let bytes = std::fs::read(&segments[0].path).unwrap();
    std::fs::write(&segments[0].path, &bytes[..(bytes.len() / 2) & !1]).unwrap();

    let output = dir.path().join("workout.wav");
    let err = Merger::new(exporter(), generated().finish)
        .merge(&segments, &output, &TagOptions::default().for_merged(&output))
        .await
        .unwrap_err();

    assert!(matches!(err, RepcastError::AudioDecode { .. }), "{err:?}");
    assert!(!output.exists());
    assert!(segments.iter().all(|s| s.path.exists()));
}

#[tokio::test]
async fn test_lead_in_override() {
    let dir = tempfile::tempdir().unwrap();
    let segments = renderer(fixed_speech(), dir.path())
        .render_all(&workout()[1..], &TagOptions::default())
        .await
        .unwrap();

    let merger = Merger::new(exporter(), AudioBuffer::empty(RATE, 1)).with_lead_in(Duration::ZERO);
    let combined = merger.combine(&segments).unwrap();
    assert_eq!(combined.frames(), secs(1.0 + 2.5 + 7.0));
}

#[tokio::test]
async fn test_synthesis_failure_policies() {
    let dir = tempfile::tempdir().unwrap();

    let segments = renderer(Arc::new(Offline), dir.path())
        .render_all(&workout(), &TagOptions::default())
        .await
        .unwrap();
    assert!(segments[0].speech.is_empty());
    assert_eq!(frames_of(&segments[0].path), secs(2.5 + 30.0));

    let strict = tempfile::tempdir().unwrap();
    let err = renderer(Arc::new(Offline), strict.path())
        .with_policy(SynthesisPolicy::Fail)
        .render_all(&workout(), &TagOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RepcastError::SynthesisUnavailable { .. }));
    assert!(wav_files(strict.path()).is_empty());
}

#[tokio::test]
async fn test_repeated_names_get_distinct_files() {
    let dir = tempfile::tempdir().unwrap();
    let exercises = vec![
        ExerciseRecord::new("plank", 1, None).unwrap(),
        ExerciseRecord::new("Plank", 1, None).unwrap(),
        ExerciseRecord::new("plank", 1, None).unwrap(),
    ];

    renderer(fixed_speech(), dir.path())
        .render_all(&exercises, &TagOptions::default())
        .await
        .unwrap();

    assert_eq!(
        wav_files(dir.path()),
        vec!["plank.wav", "plank_2.wav", "plank_3.wav"]
    );
}

#[tokio::test]
async fn test_reserved_stem_ignores_case() {
    let dir = tempfile::tempdir().unwrap();
    let exercises = vec![ExerciseRecord::new("plank", 1, None).unwrap()];

    // Merging into `Plank.wav` must not share a file with the "plank" track
    let segments = renderer(fixed_speech(), dir.path())
        .with_reserved_stem("Plank")
        .render_all(&exercises, &TagOptions::default())
        .await
        .unwrap();

    assert_eq!(segments[0].path, dir.path().join("plank_1.wav"));
}

#[test]
fn test_sources_agree() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("workout.csv");
    std::fs::write(&csv, "exercise,seconds,reps\njumping jacks,30,30\nburpees,7,\n").unwrap();

    // Spreadsheets store every number as a float
    let xlsx = dir.path().join("workout.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "exercise").unwrap();
    sheet.write_string(0, 1, "seconds").unwrap();
    sheet.write_string(0, 2, "reps").unwrap();
    sheet.write_string(1, 0, "jumping jacks").unwrap();
    sheet.write_number(1, 1, 30.0).unwrap();
    sheet.write_number(1, 2, 30.0).unwrap();
    sheet.write_string(2, 0, "burpees").unwrap();
    sheet.write_number(2, 1, 7.0).unwrap();
    workbook.save(&xlsx).unwrap();

    let from_csv = load_exercises(&mut CsvSource::new(&csv)).unwrap();
    let from_lines = load_exercises(&mut LineSource::new(
        Cursor::new("jumping jacks,30,30\nburpees,7\n"),
        "stdin",
    ))
    .unwrap();

    let from_xlsx = load_exercises(&mut XlsxSource::new(&xlsx)).unwrap();

    assert_eq!(from_csv, workout());
    assert_eq!(from_lines, workout());
    assert_eq!(from_xlsx, workout());
}

#[test]
fn test_malformed_row_stops_before_rendering() {
    let err = load_exercises(&mut LineSource::new(Cursor::new("pushups,abc,20\n"), "stdin"))
        .unwrap_err();
    assert!(matches!(err, RepcastError::MalformedRow { row: 1, .. }));
}
