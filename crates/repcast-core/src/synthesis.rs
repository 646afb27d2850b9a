//! Speech synthesis adapters.
//!
//! The pipeline only needs "text in, audio out". [`SpeechSynthesizer`] is
//! that seam; [`GoogleTranslateTts`] talks to the Google Translate speech
//! endpoint, and [`SynthesisPolicy`] decides what a failed call means for the
//! rest of the run.

use crate::audio_buffer::AudioBuffer;
use crate::decoder::AudioDecoder;
use crate::error::{RepcastError, RepcastResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default speech endpoint
pub const DEFAULT_TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// Longest text the endpoint accepts in one request
pub const MAX_CHUNK_CHARS: usize = 100;

/// Text-to-speech capability used by the renderer
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` in `language`, optionally slowed down
    ///
    /// # Errors
    ///
    /// Returns [`RepcastError::SynthesisUnavailable`] if the service cannot
    /// produce audio
    async fn synthesize(&self, text: &str, language: &str, slow: bool)
        -> RepcastResult<AudioBuffer>;
}

/// What to do when synthesis fails for an exercise
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SynthesisPolicy {
    /// Log and render the exercise without speech
    #[default]
    Skip,
    /// Try again `attempts` more times, waiting `backoff_ms * attempt`
    /// between tries, then skip
    Retry {
        /// Extra attempts after the first failure
        attempts: u32,
        /// Base wait between attempts, in milliseconds
        backoff_ms: u64,
    },
    /// Abort the run
    Fail,
}

impl SynthesisPolicy {
    /// Synthesize under this policy.
    ///
    /// `Ok(None)` means the failure was tolerated and the exercise goes on
    /// without speech.
    ///
    /// # Errors
    ///
    /// Only [`SynthesisPolicy::Fail`] returns the synthesis error
    pub async fn run(
        &self,
        synthesizer: &dyn SpeechSynthesizer,
        text: &str,
        language: &str,
        slow: bool,
    ) -> RepcastResult<Option<AudioBuffer>> {
        let retries = match *self {
            Self::Retry { attempts, .. } => attempts,
            Self::Skip | Self::Fail => 0,
        };

        let mut attempt = 0;
        loop {
            match synthesizer.synthesize(text, language, slow).await {
                Ok(audio) => return Ok(Some(audio)),
                Err(e) if attempt < retries && e.is_retriable() => {
                    attempt += 1;
                    let wait = match *self {
                        Self::Retry { backoff_ms, .. } => {
                            Duration::from_millis(backoff_ms * u64::from(attempt))
                        }
                        Self::Skip | Self::Fail => Duration::ZERO,
                    };
                    warn!(
                        "Synthesis of '{}' failed ({}), retry {}/{} in {:?}",
                        text, e, attempt, retries, wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    if *self == Self::Fail {
                        return Err(e);
                    }
                    warn!("Synthesis of '{}' failed, continuing without speech: {}", text, e);
                    return Ok(None);
                }
            }
        }
    }
}

/// Split `text` into request-sized chunks at whitespace.
///
/// Words longer than `max_chars` are split mid-word.
#[must_use]
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            chunks.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current.is_empty() { word.len() } else { word.len() + 1 };
        if current.chars().count() + needed > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Speech from the Google Translate TTS endpoint (MP3 over HTTP)
#[derive(Debug, Clone)]
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    endpoint: String,
    sample_rate: u32,
    channels: u16,
}

impl GoogleTranslateTts {
    /// Create a client producing audio in the given format
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        sample_rate: u32,
        channels: u16,
    ) -> RepcastResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("repcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RepcastError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            sample_rate,
            channels,
        })
    }

    async fn fetch_chunk(&self, chunk: &str, language: &str, slow: bool) -> RepcastResult<Vec<u8>> {
        let speed = if slow { "0.3" } else { "1" };
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", language),
                ("q", chunk),
                ("ttsspeed", speed),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RepcastError::synthesis(format!(
                "Speech endpoint returned {status}"
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        slow: bool,
    ) -> RepcastResult<AudioBuffer> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(RepcastError::synthesis("Nothing to speak"));
        }

        debug!("Requesting speech for {} chunk(s) in '{}'", chunks.len(), language);
        let mut speech = AudioBuffer::empty(self.sample_rate, self.channels);
        for chunk in &chunks {
            let bytes = self.fetch_chunk(chunk, language, slow).await?;
            let decoded = AudioDecoder::decode_bytes(bytes, "mp3")
                .map_err(|e| RepcastError::synthesis(format!("Unreadable speech audio: {e}")))?;
            speech.append(&decoded)?;
        }

        info!("Synthesized {:.1}s of speech for '{}'", speech.duration().as_secs_f64(), text);
        Ok(speech)
    }
}
