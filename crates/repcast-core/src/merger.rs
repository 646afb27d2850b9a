//! Joins rendered exercise files into a single workout track.

use crate::audio_buffer::AudioBuffer;
use crate::decoder::AudioDecoder;
use crate::error::RepcastResult;
use crate::exporter::TrackExporter;
use crate::renderer::Segment;
use crate::tags::TagSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Silence before the first exercise of a merged file
pub const DEFAULT_LEAD_IN: Duration = Duration::from_secs(2);

/// Builds `lead-in + every segment + finish sound` and exports it
#[derive(Debug, Clone)]
pub struct Merger {
    exporter: TrackExporter,
    finish: AudioBuffer,
    lead_in: Duration,
}

impl Merger {
    /// Create a merger appending `finish` after the last exercise
    #[must_use]
    pub fn new(exporter: TrackExporter, finish: AudioBuffer) -> Self {
        Self {
            exporter,
            finish,
            lead_in: DEFAULT_LEAD_IN,
        }
    }

    /// Set the silence before the first exercise
    #[must_use]
    pub fn with_lead_in(mut self, lead_in: Duration) -> Self {
        self.lead_in = lead_in;
        self
    }

    /// Concatenate the segment files into one buffer without writing it
    ///
    /// # Errors
    ///
    /// Returns an error if a segment file cannot be read in full
    pub fn combine(&self, segments: &[Segment]) -> RepcastResult<AudioBuffer> {
        let settings = self.exporter.writer().settings();
        let (rate, channels) = (settings.sample_rate, settings.channels);

        let mut combined = AudioBuffer::silent(self.lead_in, rate, channels);
        for segment in segments {
            combined.append(&AudioDecoder::decode_file(&segment.path)?)?;
        }
        combined.append(&self.finish)?;

        Ok(combined)
    }

    /// Write the merged track to `output` and remove the segment files.
    ///
    /// Segment files are only removed once the merged file has been written
    /// and tagged; a file that cannot be removed is logged and left behind.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment cannot be read or the merged file cannot
    /// be written or tagged
    pub async fn merge<P: AsRef<Path>>(
        &self,
        segments: &[Segment],
        output: P,
        tags: &TagSet,
    ) -> RepcastResult<PathBuf> {
        let output = output.as_ref();
        info!("Merging {} segment(s) into {}", segments.len(), output.display());

        let combined = self.combine(segments)?;
        self.exporter.export(&combined, output, tags).await?;

        for segment in segments {
            if let Err(e) = std::fs::remove_file(&segment.path) {
                warn!("Could not remove {}: {}", segment.path.display(), e);
            }
        }

        info!(
            "Wrote {} ({:.1}s)",
            output.display(),
            combined.duration().as_secs_f64()
        );
        Ok(output.to_path_buf())
    }
}
