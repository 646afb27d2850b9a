//! Metadata tags embedded in rendered files.

use crate::error::{RepcastError, RepcastResult};
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::{Accessor, Tag, TagExt};
use std::path::Path;
use tracing::debug;

/// Artist written when the caller does not supply one
pub const DEFAULT_ARTIST: &str = "Unknown Artist";

/// Album written when the caller does not supply one
pub const DEFAULT_ALBUM: &str = "Unknown Album";

/// Caller-facing tag choices shared by every track of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOptions {
    /// Title of the merged file; defaults to the output stem
    pub title: Option<String>,
    /// Artist for every file
    pub artist: Option<String>,
    /// Album for every file
    pub album: Option<String>,
}

impl TagOptions {
    /// Tags for per-exercise track `index` (1-based) of `total`
    #[must_use]
    pub fn for_track(&self, title: &str, index: u32, total: u32) -> TagSet {
        TagSet {
            title: title.to_string(),
            artist: self.artist_or_default().to_string(),
            album: self.album_or_default().to_string(),
            track: Some((index, total)),
        }
    }

    /// Tags for the merged file written to `output`
    #[must_use]
    pub fn for_merged(&self, output: &Path) -> TagSet {
        let title = self.title.clone().unwrap_or_else(|| {
            output
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        TagSet {
            title,
            artist: self.artist_or_default().to_string(),
            album: self.album_or_default().to_string(),
            track: None,
        }
    }

    fn artist_or_default(&self) -> &str {
        self.artist.as_deref().unwrap_or(DEFAULT_ARTIST)
    }

    fn album_or_default(&self) -> &str {
        self.album.as_deref().unwrap_or(DEFAULT_ALBUM)
    }
}

/// Resolved tags for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    /// Track title
    pub title: String,
    /// Artist name
    pub artist: String,
    /// Album name
    pub album: String,
    /// Track index (1-based) and track count
    pub track: Option<(u32, u32)>,
}

impl TagSet {
    /// Track label in `index/total` form
    #[must_use]
    pub fn track_label(&self) -> Option<String> {
        self.track.map(|(index, total)| format!("{index}/{total}"))
    }

    /// Write these tags into the audio file at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read as audio or the tag
    /// cannot be saved
    pub fn apply<P: AsRef<Path>>(&self, path: P) -> RepcastResult<()> {
        let path = path.as_ref();
        let mut tagged_file = Probe::open(path)
            .map_err(|e| RepcastError::tagging(format!("Failed to open {}: {e}", path.display())))?
            .read()
            .map_err(|e| RepcastError::tagging(format!("Failed to read {}: {e}", path.display())))?;

        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.primary_tag().is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file
            .primary_tag_mut()
            .ok_or_else(|| RepcastError::tagging("File does not accept tags"))?;

        tag.set_title(self.title.clone());
        tag.set_artist(self.artist.clone());
        tag.set_album(self.album.clone());
        if let Some((index, total)) = self.track {
            tag.set_track(index);
            tag.set_track_total(total);
        }

        tag.save_to_path(path, WriteOptions::default())?;
        debug!(
            "Tagged {} as '{}' ({})",
            path.display(),
            self.title,
            self.track_label().unwrap_or_else(|| "untracked".to_string())
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_track_tags_use_defaults() {
        let tags = TagOptions::default().for_track("burpees", 2, 2);
        assert_eq!(tags.title, "burpees");
        assert_eq!(tags.artist, DEFAULT_ARTIST);
        assert_eq!(tags.album, DEFAULT_ALBUM);
        assert_eq!(tags.track_label().as_deref(), Some("2/2"));
    }

    #[test]
    fn test_track_tags_keep_caller_values() {
        let options = TagOptions {
            title: Some("ignored for tracks".into()),
            artist: Some("Coach".into()),
            album: Some("Leg Day".into()),
        };
        let tags = options.for_track("lunges", 1, 5);
        assert_eq!(tags.title, "lunges");
        assert_eq!(tags.artist, "Coach");
        assert_eq!(tags.album, "Leg Day");
    }

    #[test]
    fn test_merged_title_defaults_to_stem() {
        let tags = TagOptions::default().for_merged(&PathBuf::from("/music/leg_day.mp3"));
        assert_eq!(tags.title, "leg_day");
        assert_eq!(tags.track, None);
        assert_eq!(tags.track_label(), None);

        let options = TagOptions {
            title: Some("Morning".into()),
            ..Default::default()
        };
        assert_eq!(options.for_merged(&PathBuf::from("x.mp3")).title, "Morning");
    }

    #[test]
    fn test_apply_to_non_audio_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.mp3");
        std::fs::write(&path, b"plain text").unwrap();
        assert!(TagOptions::default().for_track("x", 1, 1).apply(&path).is_err());
    }
}
