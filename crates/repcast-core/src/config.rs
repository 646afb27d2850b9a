//! Run configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration. Command-line flags are applied on top by the CLI.

use crate::audio_writer::EncodingSettings;
use crate::error::{RepcastError, RepcastResult};
use crate::exercise::DEFAULT_LANGUAGE;
use crate::merger::DEFAULT_LEAD_IN;
use crate::synthesis::{GoogleTranslateTts, SynthesisPolicy, DEFAULT_TTS_ENDPOINT};
use crate::timeline::{BeepMarkers, Timeline, DEFAULT_BEEP_INTERVAL, DEFAULT_PAUSE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default directory holding the beep and finish clips
pub const DEFAULT_RESOURCES_DIR: &str = "audio_resources";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepcastConfig {
    /// Output audio format
    pub audio: AudioConfig,
    /// Pause and beep placement
    pub timeline: TimelineConfig,
    /// Speech service
    pub synthesis: SynthesisConfig,
    /// Bundled clips
    pub resources: ResourcesConfig,
}

/// Output audio format
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AudioConfig {
    /// Sample rate of every rendered file
    pub sample_rate: u32,
    /// Channel count of every rendered file
    pub channels: u16,
    /// MP3 bitrate in kbps
    pub bitrate_kbps: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let settings = EncodingSettings::default();
        Self {
            sample_rate: settings.sample_rate,
            channels: settings.channels,
            bitrate_kbps: settings.bitrate_kbps,
        }
    }
}

/// Pause and beep placement
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimelineConfig {
    /// Silence between the instruction and the exercise window
    pub pause_ms: u64,
    /// Spacing of intermediate beeps; 0 disables them
    pub beep_interval_secs: u64,
    /// Silence before the first exercise of a merged file
    pub lead_in_ms: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            pause_ms: duration_ms(DEFAULT_PAUSE),
            beep_interval_secs: DEFAULT_BEEP_INTERVAL.as_secs(),
            lead_in_ms: duration_ms(DEFAULT_LEAD_IN),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Speech service settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthesisConfig {
    /// Endpoint URL
    pub endpoint: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Language code for every exercise
    pub language: String,
    /// Ask for slowed-down speech
    pub slow: bool,
    /// Failure handling
    pub policy: SynthesisPolicy,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_TTS_ENDPOINT.to_string(),
            timeout_secs: 30,
            language: DEFAULT_LANGUAGE.to_string(),
            slow: false,
            policy: SynthesisPolicy::default(),
        }
    }
}

/// Location of the bundled clips
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourcesConfig {
    /// Directory searched for the beep and finish clips
    pub dir: PathBuf,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_RESOURCES_DIR),
        }
    }
}

impl RepcastConfig {
    /// Read and validate a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or holds
    /// invalid values
    pub fn load<P: AsRef<Path>>(path: P) -> RepcastResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RepcastError::file_read(path, e.to_string()))?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or holds invalid values
    pub fn from_toml_str(text: &str) -> RepcastResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that TOML types alone cannot express
    ///
    /// # Errors
    ///
    /// Returns [`RepcastError::Configuration`] describing the first bad value
    pub fn validate(&self) -> RepcastResult<()> {
        self.encoding_settings().validate()?;

        if self.synthesis.language.trim().is_empty() {
            return Err(RepcastError::configuration("synthesis.language must not be empty"));
        }
        if self.synthesis.timeout_secs == 0 {
            return Err(RepcastError::configuration("synthesis.timeout_secs must be positive"));
        }
        if !self.synthesis.endpoint.starts_with("http://")
            && !self.synthesis.endpoint.starts_with("https://")
        {
            return Err(RepcastError::configuration(format!(
                "synthesis.endpoint '{}' is not an HTTP URL",
                self.synthesis.endpoint
            )));
        }
        Ok(())
    }

    /// Encoder settings for rendered files
    #[must_use]
    pub fn encoding_settings(&self) -> EncodingSettings {
        EncodingSettings::new(self.audio.sample_rate, self.audio.channels)
            .with_bitrate(self.audio.bitrate_kbps)
    }

    /// Timeline using `markers` and the configured pause and interval
    #[must_use]
    pub fn timeline(&self, markers: BeepMarkers) -> Timeline {
        Timeline::new(markers)
            .with_pause(Duration::from_millis(self.timeline.pause_ms))
            .with_beep_interval(Duration::from_secs(self.timeline.beep_interval_secs))
    }

    /// Silence before the first exercise of a merged file
    #[must_use]
    pub const fn lead_in(&self) -> Duration {
        Duration::from_millis(self.timeline.lead_in_ms)
    }

    /// Speech client producing audio in the configured format
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn synthesizer(&self) -> RepcastResult<GoogleTranslateTts> {
        GoogleTranslateTts::new(
            self.synthesis.endpoint.clone(),
            Duration::from_secs(self.synthesis.timeout_secs),
            self.audio.sample_rate,
            self.audio.channels,
        )
    }
}
