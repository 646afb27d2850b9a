//! Timed audio buffers: interleaved `f32` frames at a fixed sample rate.
//!
//! Every timeline operation is expressed in frames so lengths add up
//! exactly. Time offsets are converted with [`frames_for`], which rounds
//! down.

use crate::error::{RepcastError, RepcastResult};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::time::Duration;
use tracing::debug;

/// Frames fed to the resampler per call
const RESAMPLE_CHUNK: usize = 1024;

/// Number of whole frames covered by `duration` at `sample_rate`
#[must_use]
pub fn frames_for(duration: Duration, sample_rate: u32) -> usize {
    let frames = duration.as_nanos() * u128::from(sample_rate) / 1_000_000_000;
    usize::try_from(frames).unwrap_or(usize::MAX)
}

/// Decoded audio held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Wrap interleaved samples
    ///
    /// # Errors
    ///
    /// Returns an error if the format is invalid or the sample count is not
    /// a whole number of frames
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> RepcastResult<Self> {
        if sample_rate == 0 {
            return Err(RepcastError::invalid_input("Sample rate must be greater than 0"));
        }
        if channels == 0 {
            return Err(RepcastError::invalid_input("Channel count must be greater than 0"));
        }
        if samples.len() % usize::from(channels) != 0 {
            return Err(RepcastError::invalid_input(format!(
                "{} samples do not divide into {channels} channels",
                samples.len()
            )));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// A buffer with no frames
    #[must_use]
    pub fn empty(sample_rate: u32, channels: u16) -> Self {
        Self::silent_frames(0, sample_rate, channels)
    }

    /// Silence lasting `duration`
    #[must_use]
    pub fn silent(duration: Duration, sample_rate: u32, channels: u16) -> Self {
        Self::silent_frames(frames_for(duration, sample_rate), sample_rate, channels)
    }

    /// Silence lasting exactly `frames` frames
    #[must_use]
    pub fn silent_frames(frames: usize, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: vec![0.0; frames * usize::from(channels)],
            sample_rate,
            channels,
        }
    }

    /// A sine tone with short linear fades so it does not click
    #[must_use]
    pub fn sine(
        frequency_hz: f32,
        duration: Duration,
        amplitude: f32,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        let frames = frames_for(duration, sample_rate);
        let fade = (sample_rate as usize / 200).min(frames / 2).max(1);
        let step = std::f32::consts::TAU * frequency_hz / sample_rate as f32;

        let mut samples = Vec::with_capacity(frames * usize::from(channels));
        for i in 0..frames {
            let edge = i.min(frames - 1 - i);
            let envelope = if edge < fade { edge as f32 / fade as f32 } else { 1.0 };
            let value = (step * i as f32).sin() * amplitude * envelope;
            samples.extend(std::iter::repeat(value).take(usize::from(channels)));
        }

        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Interleaved samples
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels
    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (samples per channel)
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    /// Whether the buffer holds no frames
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playing time of the buffer
    #[must_use]
    pub fn duration(&self) -> Duration {
        let nanos = self.frames() as u128 * 1_000_000_000 / u128::from(self.sample_rate);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Whether `other` shares this buffer's sample rate and channel count
    #[must_use]
    pub const fn same_format(&self, other: &Self) -> bool {
        self.sample_rate == other.sample_rate && self.channels == other.channels
    }

    /// Append `other` after the last frame.
    ///
    /// `other` is converted to this buffer's format first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversion fails
    pub fn append(&mut self, other: &Self) -> RepcastResult<()> {
        if self.same_format(other) {
            self.samples.extend_from_slice(&other.samples);
        } else {
            let converted = other.conform(self.sample_rate, self.channels)?;
            self.samples.extend_from_slice(&converted.samples);
        }
        Ok(())
    }

    /// Concatenate two buffers
    ///
    /// # Errors
    ///
    /// Returns an error if `other` cannot be converted to this format
    pub fn concat(mut self, other: &Self) -> RepcastResult<Self> {
        self.append(other)?;
        Ok(self)
    }

    /// Concatenate buffers in order into an empty buffer of the given format
    ///
    /// # Errors
    ///
    /// Returns an error if a part cannot be converted to the format
    pub fn concat_all<'a, I>(sample_rate: u32, channels: u16, parts: I) -> RepcastResult<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        parts
            .into_iter()
            .try_fold(Self::empty(sample_rate, channels), |acc, part| acc.concat(part))
    }

    /// Frames between two time offsets, clamped to the buffer
    #[must_use]
    pub fn slice(&self, start: Duration, end: Duration) -> Self {
        self.slice_frames(
            frames_for(start, self.sample_rate),
            frames_for(end, self.sample_rate),
        )
    }

    /// Frames `start..end`, clamped to the buffer
    #[must_use]
    pub fn slice_frames(&self, start: usize, end: usize) -> Self {
        let frames = self.frames();
        let end = end.min(frames);
        let start = start.min(end);
        let ch = usize::from(self.channels);

        Self {
            samples: self.samples[start * ch..end * ch].to_vec(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Replace frames starting at `offset` with `other`, in place.
    ///
    /// Writes past the end are dropped; the buffer length never changes.
    /// Returns the number of frames written.
    ///
    /// # Errors
    ///
    /// Returns an error if `other` cannot be converted to this format
    pub fn overwrite_at(&mut self, offset: usize, other: &Self) -> RepcastResult<usize> {
        let frames = self.frames();
        if offset >= frames {
            return Ok(0);
        }

        let converted;
        let other = if self.same_format(other) {
            other
        } else {
            converted = other.conform(self.sample_rate, self.channels)?;
            &converted
        };

        let count = other.frames().min(frames - offset);
        let ch = usize::from(self.channels);
        self.samples[offset * ch..(offset + count) * ch]
            .copy_from_slice(&other.samples[..count * ch]);
        Ok(count)
    }

    /// Replace the last frames with `other`, right-aligned.
    ///
    /// If `other` is longer than the buffer only its tail is kept, so the
    /// buffer always ends on the last frame of `other`. Returns the number of
    /// frames written.
    ///
    /// # Errors
    ///
    /// Returns an error if `other` cannot be converted to this format
    pub fn overwrite_end(&mut self, other: &Self) -> RepcastResult<usize> {
        let converted = other.conform(self.sample_rate, self.channels)?;
        let frames = self.frames();
        let count = converted.frames().min(frames);
        let tail = converted.slice_frames(converted.frames() - count, converted.frames());
        self.overwrite_at(frames - count, &tail)
    }

    /// Convert to another sample rate and channel count.
    ///
    /// Channels are mixed down by averaging or copied up. The rate is changed
    /// with a windowed sinc resampler, and the result always holds
    /// `frames * to / from` frames (rounded down), aligned with the input.
    ///
    /// # Errors
    ///
    /// Returns [`RepcastError::Resample`] if the resampler rejects the rates
    pub fn conform(&self, sample_rate: u32, channels: u16) -> RepcastResult<Self> {
        if self.sample_rate == sample_rate && self.channels == channels {
            return Ok(self.clone());
        }
        if sample_rate == 0 || channels == 0 {
            return Err(RepcastError::invalid_input(format!(
                "Cannot convert to {sample_rate} Hz with {channels} channel(s)"
            )));
        }

        let remixed = remix_channels(&self.samples, self.channels, channels);
        let samples = if self.sample_rate == sample_rate {
            remixed
        } else {
            let planar = deinterleave(&remixed, channels);
            interleave(&resample(&planar, self.sample_rate, sample_rate)?)
        };

        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Largest absolute sample value
    #[must_use]
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()))
    }
}

fn remix_channels(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    if from == to {
        return samples.to_vec();
    }

    let from = usize::from(from);
    let to = usize::from(to);
    let mut out = Vec::with_capacity(samples.len() / from * to);

    for frame in samples.chunks_exact(from) {
        if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else if from == 1 {
            out.extend(std::iter::repeat(frame[0]).take(to));
        } else {
            out.extend((0..to).map(|c| frame[c % from]));
        }
    }

    out
}

fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
    let ch = usize::from(channels);
    let mut planar = vec![Vec::with_capacity(samples.len() / ch); ch];
    for frame in samples.chunks_exact(ch) {
        for (channel, &sample) in planar.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    planar
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.first().map_or(0, Vec::len);
    let mut samples = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        samples.extend(planar.iter().map(|channel| channel[i]));
    }
    samples
}

fn extend_planar(output: &mut [Vec<f32>], chunk: Vec<Vec<f32>>) {
    for (out, part) in output.iter_mut().zip(chunk) {
        out.extend(part);
    }
}

/// Resample planar audio, trimming the filter delay so output frame `i`
/// lines up with input time `i / to_rate`
fn resample(planar: &[Vec<f32>], from_rate: u32, to_rate: u32) -> RepcastResult<Vec<Vec<f32>>> {
    let in_frames = planar.first().map_or(0, Vec::len);
    let expected = usize::try_from(in_frames as u64 * u64::from(to_rate) / u64::from(from_rate))
        .map_err(|e| RepcastError::resample(e.to_string()))?;
    if in_frames == 0 {
        return Ok(vec![Vec::new(); planar.len()]);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(
        f64::from(to_rate) / f64::from(from_rate),
        1.0,
        params,
        RESAMPLE_CHUNK,
        planar.len(),
    )
    .map_err(|e| RepcastError::resample(format!("Failed to create resampler: {e}")))?;

    let delay = resampler.output_delay();
    let wanted = delay + expected;
    let mut output = vec![Vec::with_capacity(wanted + RESAMPLE_CHUNK); planar.len()];

    let mut pos = 0;
    while pos < in_frames {
        let end = (pos + RESAMPLE_CHUNK).min(in_frames);
        let chunk: Vec<&[f32]> = planar.iter().map(|channel| &channel[pos..end]).collect();
        let processed = if end - pos == RESAMPLE_CHUNK {
            resampler.process(chunk.as_slice(), None)
        } else {
            resampler.process_partial(Some(chunk.as_slice()), None)
        }
        .map_err(|e| RepcastError::resample(format!("Resampling failed: {e}")))?;
        extend_planar(&mut output, processed);
        pos = end;
    }

    // Zero input drains the samples still held back by the filter
    while output[0].len() < wanted {
        let processed = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| RepcastError::resample(format!("Resampling failed: {e}")))?;
        if processed.first().map_or(true, Vec::is_empty) {
            break;
        }
        extend_planar(&mut output, processed);
    }

    for channel in &mut output {
        channel.drain(..delay.min(channel.len()));
        channel.resize(expected, 0.0);
    }

    debug!(
        "Resampled {} frames at {} Hz to {} frames at {} Hz",
        in_frames, from_rate, expected, to_rate
    );
    Ok(output)
}
