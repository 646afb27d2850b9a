//! Error types for the Repcast workout pipeline.

use std::path::Path;

/// Result type alias for Repcast operations
pub type RepcastResult<T> = Result<T, RepcastError>;

/// Main error type for Repcast operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RepcastError {
    /// A source row could not be turned into an exercise
    #[error("Malformed row {row}: {message}")]
    MalformedRow {
        /// 1-based row position in the source
        row: usize,
        /// What was wrong with the row
        message: String,
    },

    /// The speech service could not produce audio
    #[error("Speech synthesis unavailable: {message}")]
    SynthesisUnavailable {
        /// Error message describing the failure
        message: String,
    },

    /// Writing or deleting an output file failed
    #[error("Failed to write {path}: {message}")]
    FileWriteFailure {
        /// Path of the file being written
        path: String,
        /// Error message describing the file operation failure
        message: String,
    },

    /// Reading an input file failed
    #[error("Failed to read {path}: {message}")]
    FileRead {
        /// Path of the file being read
        path: String,
        /// Error message describing the failure
        message: String,
    },

    /// Audio could not be decoded
    #[error("Audio decode error: {message}")]
    AudioDecode {
        /// Error message describing the decode failure
        message: String,
    },

    /// Audio could not be converted to another sample rate
    #[error("Resampling error: {message}")]
    Resample {
        /// Error message describing the resampler failure
        message: String,
    },

    /// Audio could not be encoded
    #[error("Audio encode error: {message}")]
    AudioEncode {
        /// Error message describing the encode failure
        message: String,
    },

    /// Metadata tags could not be written
    #[error("Tagging error: {message}")]
    Tagging {
        /// Error message describing the tagging failure
        message: String,
    },

    /// Invalid input error
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message describing the invalid input
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },
}

impl RepcastError {
    /// Create a new malformed row error
    #[must_use]
    pub fn malformed_row<S: Into<String>>(row: usize, message: S) -> Self {
        Self::MalformedRow {
            row,
            message: message.into(),
        }
    }

    /// Create a new synthesis error
    #[must_use]
    pub fn synthesis<S: Into<String>>(message: S) -> Self {
        Self::SynthesisUnavailable {
            message: message.into(),
        }
    }

    /// Create a new file write error for `path`
    #[must_use]
    pub fn file_write<P: AsRef<Path>, S: Into<String>>(path: P, message: S) -> Self {
        Self::FileWriteFailure {
            path: path.as_ref().display().to_string(),
            message: message.into(),
        }
    }

    /// Create a new file read error for `path`
    #[must_use]
    pub fn file_read<P: AsRef<Path>, S: Into<String>>(path: P, message: S) -> Self {
        Self::FileRead {
            path: path.as_ref().display().to_string(),
            message: message.into(),
        }
    }

    /// Create a new decode error
    #[must_use]
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::AudioDecode {
            message: message.into(),
        }
    }

    /// Create a new resampling error
    #[must_use]
    pub fn resample<S: Into<String>>(message: S) -> Self {
        Self::Resample {
            message: message.into(),
        }
    }

    /// Create a new encode error
    #[must_use]
    pub fn encode<S: Into<String>>(message: S) -> Self {
        Self::AudioEncode {
            message: message.into(),
        }
    }

    /// Create a new tagging error
    #[must_use]
    pub fn tagging<S: Into<String>>(message: S) -> Self {
        Self::Tagging {
            message: message.into(),
        }
    }

    /// Create a new invalid input error
    #[must_use]
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Check if this error is worth retrying
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::SynthesisUnavailable { .. })
    }
}

impl From<toml::de::Error> for RepcastError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(format!("Invalid TOML: {err}"))
    }
}

impl From<reqwest::Error> for RepcastError {
    fn from(err: reqwest::Error) -> Self {
        Self::synthesis(err.to_string())
    }
}

impl From<lofty::error::LoftyError> for RepcastError {
    fn from(err: lofty::error::LoftyError) -> Self {
        Self::tagging(err.to_string())
    }
}
