//! # Repcast Core
//!
//! Builds spoken workout tracks: each exercise becomes a synthesized
//! instruction, a short pause, and a timed silence window marked with beeps.
//!
//! ## Features
//!
//! - Frame-exact timeline assembly over in-memory audio buffers
//! - Speech synthesis through a pluggable [`SpeechSynthesizer`]
//! - MP3 and WAV output with title/artist/album/track tags
//! - Exercise lists from spreadsheets, CSV files or plain text lines
//! - Optional merge of every exercise into one track
//!
//! ## Example
//!
//! ```rust,no_run
//! use repcast_core::{
//!     load_exercises, AudioFormat, AudioResources, AudioWriter, CsvSource, RepcastConfig,
//!     Renderer, TagOptions, TrackExporter,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RepcastConfig::default();
//!     let exercises = load_exercises(&mut CsvSource::new("workout.csv"))?;
//!
//!     let resources = AudioResources::load(
//!         &config.resources.dir,
//!         config.audio.sample_rate,
//!         config.audio.channels,
//!     )?;
//!     let exporter = TrackExporter::new(
//!         AudioWriter::with_settings(config.encoding_settings()),
//!         AudioFormat::Mp3,
//!     );
//!     let renderer = Renderer::new(
//!         Arc::new(config.synthesizer()?),
//!         config.timeline(resources.markers),
//!         exporter,
//!         "out",
//!     );
//!
//!     renderer.render_all(&exercises, &TagOptions::default()).await?;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod audio_buffer;
pub mod audio_writer;
pub mod config;
pub mod decoder;
pub mod error;
pub mod exercise;
pub mod exporter;
pub mod loader;
pub mod merger;
pub mod renderer;
pub mod resources;
pub mod synthesis;
pub mod tags;
pub mod timeline;

// Re-export main types for convenience
pub use audio_buffer::{frames_for, AudioBuffer};
pub use audio_writer::{AudioFormat, AudioWriter, EncodingSettings};
pub use config::RepcastConfig;
pub use decoder::AudioDecoder;
pub use error::{RepcastError, RepcastResult};
pub use exercise::ExerciseRecord;
pub use exporter::TrackExporter;
pub use loader::{load_exercises, CsvSource, LineSource, RowSource, XlsxSource};
pub use merger::Merger;
pub use renderer::{Renderer, Segment};
pub use resources::AudioResources;
pub use synthesis::{GoogleTranslateTts, SpeechSynthesizer, SynthesisPolicy};
pub use tags::{TagOptions, TagSet};
pub use timeline::{assemble, BeepMarkers, Timeline};

/// Version information for the repcast-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default sample rate for rendered audio (24 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Default number of audio channels (mono)
pub const DEFAULT_CHANNELS: u16 = 1;
