//! Per-exercise timeline assembly.
//!
//! An exercise track is laid out as
//!
//! ```text
//! | speech | pause | start beep ... beep ... beep ... end beep |
//!                  |<-------- exercise duration ------------->|
//! ```
//!
//! The beeps are written over the silence window in place, so the window is
//! always exactly as long as the exercise. Intermediate beeps go down first,
//! then the start beep, then the end beep; later writes win where they
//! overlap. Writes that would run past the window are clipped.

use crate::audio_buffer::{frames_for, AudioBuffer};
use crate::error::RepcastResult;
use std::time::Duration;
use tracing::debug;

/// Silence between the spoken instruction and the exercise window
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(2500);

/// Spacing of intermediate beeps inside the exercise window
pub const DEFAULT_BEEP_INTERVAL: Duration = Duration::from_secs(5);

/// The three beep clips written into every silence window
#[derive(Debug, Clone, PartialEq)]
pub struct BeepMarkers {
    /// Marks the first frame of the window
    pub start: AudioBuffer,
    /// Repeats every beep interval
    pub intermediate: AudioBuffer,
    /// Marks the last frame of the window
    pub end: AudioBuffer,
}

/// Build the silence window for one exercise with its beeps in place
///
/// # Errors
///
/// Returns an error if a beep cannot be converted to the window's format
pub fn mark_silence_window(
    window: Duration,
    markers: &BeepMarkers,
    beep_interval: Duration,
    sample_rate: u32,
    channels: u16,
) -> RepcastResult<AudioBuffer> {
    let mut silence = AudioBuffer::silent(window, sample_rate, channels);
    let frames = silence.frames();
    let step = frames_for(beep_interval, sample_rate);

    if step > 0 {
        let mut offset = step;
        while offset < frames {
            silence.overwrite_at(offset, &markers.intermediate)?;
            offset += step;
        }
    }

    silence.overwrite_at(0, &markers.start)?;
    silence.overwrite_end(&markers.end)?;
    Ok(silence)
}

/// Assemble the full track for one exercise: speech, pause, marked window.
///
/// The result is in the speech buffer's format. Its length is always
/// `speech + pause + exercise_duration`.
///
/// # Errors
///
/// Returns an error if a beep cannot be converted to the speech format
pub fn assemble(
    speech: &AudioBuffer,
    exercise_duration: Duration,
    markers: &BeepMarkers,
    pause: Duration,
    beep_interval: Duration,
) -> RepcastResult<AudioBuffer> {
    let rate = speech.sample_rate();
    let channels = speech.channels();

    let window = mark_silence_window(exercise_duration, markers, beep_interval, rate, channels)?;
    let pause = AudioBuffer::silent(pause, rate, channels);

    debug!(
        "Assembled timeline: speech {:?} + pause {:?} + window {:?}",
        speech.duration(),
        pause.duration(),
        window.duration()
    );

    speech.clone().concat(&pause)?.concat(&window)
}

/// Immutable timeline settings shared by every exercise of a run
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    markers: BeepMarkers,
    pause: Duration,
    beep_interval: Duration,
}

impl Timeline {
    /// Create a timeline with the default pause and beep interval
    #[must_use]
    pub fn new(markers: BeepMarkers) -> Self {
        Self {
            markers,
            pause: DEFAULT_PAUSE,
            beep_interval: DEFAULT_BEEP_INTERVAL,
        }
    }

    /// Set the pause after the spoken instruction
    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Set the spacing of intermediate beeps
    #[must_use]
    pub fn with_beep_interval(mut self, beep_interval: Duration) -> Self {
        self.beep_interval = beep_interval;
        self
    }

    /// Pause after the spoken instruction
    #[must_use]
    pub const fn pause(&self) -> Duration {
        self.pause
    }

    /// Spacing of intermediate beeps
    #[must_use]
    pub const fn beep_interval(&self) -> Duration {
        self.beep_interval
    }

    /// Assemble one exercise track with these settings
    ///
    /// # Errors
    ///
    /// Returns an error if a beep cannot be converted to the speech format
    pub fn assemble(
        &self,
        speech: &AudioBuffer,
        exercise_duration: Duration,
    ) -> RepcastResult<AudioBuffer> {
        assemble(
            speech,
            exercise_duration,
            &self.markers,
            self.pause,
            self.beep_interval,
        )
    }
}
