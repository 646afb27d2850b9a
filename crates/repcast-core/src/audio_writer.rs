//! Audio file writing for MP3 and WAV output.

use crate::audio_buffer::AudioBuffer;
use crate::error::{RepcastError, RepcastResult};
use mp3lame_encoder::{Bitrate, Builder, FlushGap, InterleavedPcm, MonoPcm, Quality};
use std::path::Path;
use tracing::{debug, info, warn};

/// Supported audio output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    /// WAV format (uncompressed)
    Wav,
    /// MP3 format (lossy compression)
    Mp3,
}

impl AudioFormat {
    /// Get file extension for the format
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }

    /// Detect format from file extension
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is not supported
    pub fn from_extension(extension: &str) -> RepcastResult<Self> {
        match extension.to_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            _ => Err(RepcastError::invalid_input(format!(
                "Unsupported audio format: {extension}"
            ))),
        }
    }

    /// Detect format from file path
    ///
    /// # Errors
    ///
    /// Returns an error if the file has no extension or unsupported extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> RepcastResult<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                RepcastError::invalid_input(format!(
                    "No file extension found in path: {}",
                    path.display()
                ))
            })?;

        Self::from_extension(extension)
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension().to_uppercase())
    }
}

/// Audio encoding settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingSettings {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of audio channels
    pub channels: u16,
    /// Bit depth for WAV output
    pub bit_depth: u16,
    /// Constant bitrate for MP3 output, in kbps
    pub bitrate_kbps: u32,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            sample_rate: crate::DEFAULT_SAMPLE_RATE,
            channels: crate::DEFAULT_CHANNELS,
            bit_depth: 16,
            bitrate_kbps: 64,
        }
    }
}

impl EncodingSettings {
    /// Create new encoding settings
    #[must_use]
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            ..Default::default()
        }
    }

    /// Set bit depth for WAV output
    #[must_use]
    pub fn with_bit_depth(mut self, bit_depth: u16) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    /// Set the MP3 bitrate
    #[must_use]
    pub fn with_bitrate(mut self, bitrate_kbps: u32) -> Self {
        self.bitrate_kbps = bitrate_kbps;
        self
    }

    /// Validate encoding settings
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid field
    pub fn validate(&self) -> RepcastResult<()> {
        if self.sample_rate < 8000 || self.sample_rate > 48_000 {
            return Err(RepcastError::configuration(format!(
                "Sample rate must be between 8000 and 48000 Hz, got {}",
                self.sample_rate
            )));
        }

        if self.channels == 0 || self.channels > 2 {
            return Err(RepcastError::configuration(format!(
                "Channels must be 1 or 2, got {}",
                self.channels
            )));
        }

        if !matches!(self.bit_depth, 16 | 24 | 32) {
            return Err(RepcastError::configuration(format!(
                "Bit depth must be 16, 24, or 32, got {}",
                self.bit_depth
            )));
        }

        lame_bitrate(self.bitrate_kbps)?;
        Ok(())
    }
}

fn lame_bitrate(kbps: u32) -> RepcastResult<Bitrate> {
    let bitrate = match kbps {
        8 => Bitrate::Kbps8,
        16 => Bitrate::Kbps16,
        24 => Bitrate::Kbps24,
        32 => Bitrate::Kbps32,
        40 => Bitrate::Kbps40,
        48 => Bitrate::Kbps48,
        64 => Bitrate::Kbps64,
        80 => Bitrate::Kbps80,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        other => {
            return Err(RepcastError::configuration(format!(
                "Unsupported MP3 bitrate: {other} kbps"
            )))
        }
    };
    Ok(bitrate)
}

/// Writes audio buffers to disk in the configured output format
#[derive(Debug, Clone)]
pub struct AudioWriter {
    settings: EncodingSettings,
}

impl AudioWriter {
    /// Create a new audio writer with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(EncodingSettings::default())
    }

    /// Create a new audio writer with custom settings
    #[must_use]
    pub fn with_settings(settings: EncodingSettings) -> Self {
        Self { settings }
    }

    /// Encoding settings in use
    #[must_use]
    pub fn settings(&self) -> &EncodingSettings {
        &self.settings
    }

    /// Write audio to `path` in `format`.
    ///
    /// The buffer is converted to the writer's sample rate and channel count
    /// before encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The audio is empty or contains non-finite samples
    /// - The encoding settings are invalid
    /// - Encoding fails
    /// - The file cannot be created or written to
    pub async fn write_file<P: AsRef<Path>>(
        &self,
        audio: &AudioBuffer,
        path: P,
        format: AudioFormat,
    ) -> RepcastResult<()> {
        let path = path.as_ref();
        self.validate_inputs(audio)?;

        let audio = audio.conform(self.settings.sample_rate, self.settings.channels)?;
        info!(
            "Writing {:.1}s of audio to {} in {} format",
            audio.duration().as_secs_f64(),
            path.display(),
            format
        );

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| RepcastError::file_write(parent, e.to_string()))?;
        }

        match format {
            AudioFormat::Wav => self.write_wav(&audio, path),
            AudioFormat::Mp3 => self.write_mp3(&audio, path),
        }
    }

    fn validate_inputs(&self, audio: &AudioBuffer) -> RepcastResult<()> {
        if audio.is_empty() {
            return Err(RepcastError::invalid_input("Audio data cannot be empty"));
        }

        if let Some((i, sample)) = audio
            .samples()
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_finite())
        {
            return Err(RepcastError::invalid_input(format!(
                "Invalid audio sample at index {i}: {sample}"
            )));
        }

        if audio.peak() > 1.0 {
            warn!("Audio exceeds range [-1.0, 1.0] and will be clipped");
        }

        self.settings.validate()
    }

    fn write_wav(&self, audio: &AudioBuffer, path: &Path) -> RepcastResult<()> {
        debug!("Writing WAV file with {} bit depth", self.settings.bit_depth);

        let spec = hound::WavSpec {
            channels: audio.channels(),
            sample_rate: audio.sample_rate(),
            bits_per_sample: self.settings.bit_depth,
            sample_format: if self.settings.bit_depth == 32 {
                hound::SampleFormat::Float
            } else {
                hound::SampleFormat::Int
            },
        };
        let wav_err = |e: hound::Error| RepcastError::file_write(path, e.to_string());

        let mut writer = hound::WavWriter::create(path, spec).map_err(wav_err)?;
        match self.settings.bit_depth {
            16 => {
                for &sample in audio.samples() {
                    writer.write_sample(to_i16(sample)).map_err(wav_err)?;
                }
            }
            24 => {
                for &sample in audio.samples() {
                    let value = (sample.clamp(-1.0, 1.0) * 8_388_607.0) as i32;
                    writer.write_sample(value).map_err(wav_err)?;
                }
            }
            _ => {
                for &sample in audio.samples() {
                    writer.write_sample(sample.clamp(-1.0, 1.0)).map_err(wav_err)?;
                }
            }
        }
        writer.finalize().map_err(wav_err)?;

        Ok(())
    }

    fn write_mp3(&self, audio: &AudioBuffer, path: &Path) -> RepcastResult<()> {
        debug!("Encoding MP3 at {} kbps", self.settings.bitrate_kbps);

        let lame_err = |stage: &str, detail: String| {
            RepcastError::encode(format!("LAME {stage} failed: {detail}"))
        };

        let mut builder =
            Builder::new().ok_or_else(|| RepcastError::encode("Failed to create LAME encoder"))?;
        builder
            .set_num_channels(audio.channels() as u8)
            .map_err(|e| lame_err("channel setup", format!("{e:?}")))?;
        builder
            .set_sample_rate(audio.sample_rate())
            .map_err(|e| lame_err("sample rate setup", format!("{e:?}")))?;
        builder
            .set_brate(lame_bitrate(self.settings.bitrate_kbps)?)
            .map_err(|e| lame_err("bitrate setup", format!("{e:?}")))?;
        builder
            .set_quality(Quality::Best)
            .map_err(|e| lame_err("quality setup", format!("{e:?}")))?;
        let mut encoder = builder
            .build()
            .map_err(|e| lame_err("initialisation", format!("{e:?}")))?;

        let pcm: Vec<i16> = audio.samples().iter().map(|&s| to_i16(s)).collect();
        let mut encoded = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(pcm.len()));

        let result = if audio.channels() == 1 {
            encoder.encode_to_vec(MonoPcm(&pcm), &mut encoded)
        } else {
            encoder.encode_to_vec(InterleavedPcm(&pcm), &mut encoded)
        };
        result.map_err(|e| lame_err("encoding", format!("{e:?}")))?;

        encoded.reserve(7200);
        encoder
            .flush_to_vec::<FlushGap>(&mut encoded)
            .map_err(|e| lame_err("flush", format!("{e:?}")))?;

        // The first frame is a placeholder for the Info/LAME tag. Decoders
        // read the encoder delay and padding from it to trim the stream back
        // to the exact input length.
        if encoder.is_lame_tag_written() {
            let mut tag = Vec::with_capacity(encoder.lame_tag_size());
            let written = encoder
                .lame_tag_encode_to_vec(&mut tag)
                .ok_or_else(|| RepcastError::encode("LAME tag frame could not be produced"))?
                .get();
            if written > encoded.len() {
                return Err(RepcastError::encode("LAME tag frame is larger than the stream"));
            }
            encoded[..written].copy_from_slice(&tag[..written]);
        }

        std::fs::write(path, &encoded).map_err(|e| RepcastError::file_write(path, e.to_string()))
    }
}

impl Default for AudioWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}
