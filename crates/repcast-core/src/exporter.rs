//! Writes assembled buffers to disk and tags them.

use crate::audio_buffer::AudioBuffer;
use crate::audio_writer::{AudioFormat, AudioWriter};
use crate::error::RepcastResult;
use crate::tags::TagSet;
use std::path::Path;

/// Encoder plus tagger for one output format
#[derive(Debug, Clone)]
pub struct TrackExporter {
    writer: AudioWriter,
    format: AudioFormat,
}

impl TrackExporter {
    /// Create an exporter writing `format` files with `writer`
    #[must_use]
    pub fn new(writer: AudioWriter, format: AudioFormat) -> Self {
        Self { writer, format }
    }

    /// Output format
    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }

    /// Underlying writer
    #[must_use]
    pub fn writer(&self) -> &AudioWriter {
        &self.writer
    }

    /// Encode `audio` to `path`, then embed `tags`
    ///
    /// # Errors
    ///
    /// Returns an error if encoding, writing or tagging fails
    pub async fn export<P: AsRef<Path>>(
        &self,
        audio: &AudioBuffer,
        path: P,
        tags: &TagSet,
    ) -> RepcastResult<()> {
        let path = path.as_ref();
        self.writer.write_file(audio, path, self.format).await?;
        tags.apply(path)
    }
}
