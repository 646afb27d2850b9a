//! The four short clips every run needs: start, intermediate and end beeps
//! plus the workout-complete sound.

use crate::audio_buffer::AudioBuffer;
use crate::decoder::AudioDecoder;
use crate::error::{RepcastError, RepcastResult};
use crate::timeline::BeepMarkers;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// File name of the start beep inside the resources directory
pub const BEEP_START_FILE: &str = "beep_start.mp3";
/// File name of the intermediate beep inside the resources directory
pub const BEEP_INTERMEDIATE_FILE: &str = "beep_intermediate.mp3";
/// File name of the end beep inside the resources directory
pub const BEEP_END_FILE: &str = "beep_end.mp3";
/// File name of the workout-complete sound inside the resources directory
pub const FINISH_FILE: &str = "workout_end.mp3";

const TONE_AMPLITUDE: f32 = 0.6;

/// Clips loaded once per run and shared by every exercise
#[derive(Debug, Clone, PartialEq)]
pub struct AudioResources {
    /// Beep markers written into each silence window
    pub markers: BeepMarkers,
    /// Sound appended after the last exercise of a merged file
    pub finish: AudioBuffer,
}

impl AudioResources {
    /// Load clips from `dir`, converted to the given format.
    ///
    /// A clip missing from disk is replaced by its generated tone.
    ///
    /// # Errors
    ///
    /// Returns an error if a clip exists but cannot be decoded
    pub fn load<P: AsRef<Path>>(dir: P, sample_rate: u32, channels: u16) -> RepcastResult<Self> {
        let dir = dir.as_ref();
        let generated = Self::generated(sample_rate, channels)?;

        let load_or = |file: &str, fallback: AudioBuffer| -> RepcastResult<AudioBuffer> {
            let path = dir.join(file);
            if path.is_file() {
                info!("Loading audio resource {}", path.display());
                AudioDecoder::decode_file(&path)?.conform(sample_rate, channels)
            } else {
                warn!("{} not found, using a generated tone", path.display());
                Ok(fallback)
            }
        };

        Ok(Self {
            markers: BeepMarkers {
                start: load_or(BEEP_START_FILE, generated.markers.start)?,
                intermediate: load_or(BEEP_INTERMEDIATE_FILE, generated.markers.intermediate)?,
                end: load_or(BEEP_END_FILE, generated.markers.end)?,
            },
            finish: load_or(FINISH_FILE, generated.finish)?,
        })
    }

    /// Synthetic clips, used when no resource files are available
    ///
    /// # Errors
    ///
    /// Returns an error if the format is invalid
    pub fn generated(sample_rate: u32, channels: u16) -> RepcastResult<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(RepcastError::invalid_input(format!(
                "Cannot generate tones at {sample_rate} Hz with {channels} channel(s)"
            )));
        }

        let tone = |hz: f32, ms: u64| {
            AudioBuffer::sine(hz, Duration::from_millis(ms), TONE_AMPLITUDE, sample_rate, channels)
        };

        let chime: Vec<AudioBuffer> = [523.25, 659.25, 783.99]
            .iter()
            .map(|&hz| tone(hz, 300))
            .collect();

        Ok(Self {
            markers: BeepMarkers {
                start: tone(880.0, 250),
                intermediate: tone(660.0, 120),
                end: tone(440.0, 400),
            },
            finish: AudioBuffer::concat_all(sample_rate, channels, &chime)?,
        })
    }
}
