//! Audio decoding using symphonia.
//!
//! Speech comes back from the synthesis service as MP3 bytes, the bundled
//! beeps are MP3 files, and the merger reads rendered tracks back from disk.
//! All of them go through [`AudioDecoder`].
//!
//! MP3 streams carrying an Info/LAME tag are trimmed of encoder delay and
//! padding, so a file decodes to exactly the frames that were encoded.

use crate::audio_buffer::AudioBuffer;
use crate::error::{RepcastError, RepcastResult};
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_MP3, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Stateless decoder for whole files or in-memory payloads
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioDecoder;

impl AudioDecoder {
    /// Decode an entire audio file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or decoded
    pub fn decode_file<P: AsRef<Path>>(path: P) -> RepcastResult<AudioBuffer> {
        let path = path.as_ref();
        debug!("Decoding file: {}", path.display());

        let file = std::fs::File::open(path)
            .map_err(|e| RepcastError::file_read(path, e.to_string()))?;

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        Self::decode_source(Box::new(file), &hint).map_err(|e| match e {
            RepcastError::AudioDecode { message } => {
                RepcastError::decode(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Decode an in-memory payload, using `extension` as a format hint
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a supported audio stream
    pub fn decode_bytes(bytes: Vec<u8>, extension: &str) -> RepcastResult<AudioBuffer> {
        let mut hint = Hint::new();
        hint.with_extension(extension);
        Self::decode_source(Box::new(Cursor::new(bytes)), &hint)
    }

    fn decode_source(source: Box<dyn MediaSource>, hint: &Hint) -> RepcastResult<AudioBuffer> {
        let mss = MediaSourceStream::new(source, Default::default());

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };
        let probed = symphonia::default::get_probe()
            .format(hint, mss, &format_opts, &MetadataOptions::default())
            .map_err(|e| RepcastError::decode(format!("Failed to probe format: {e}")))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| RepcastError::decode("No audio track found"))?;
        let track_id = track.id;

        // WAV headers and LAME tags give exact lengths; other MP3 lengths are
        // estimates from the bitrate
        let declared_frames = track.codec_params.n_frames.filter(|_| {
            track.codec_params.codec != CODEC_TYPE_MP3 || track.codec_params.delay.is_some()
        });

        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels = track
            .codec_params
            .channels
            .and_then(|c| u16::try_from(c.count()).ok());

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| RepcastError::decode(format!("Failed to create decoder: {e}")))?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => {
                    return Err(RepcastError::decode(format!("Error reading packet: {e}")));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate.get_or_insert(spec.rate);
                    channels.get_or_insert(u16::try_from(spec.channels.count()).unwrap_or(1));

                    let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping undecodable packet: {}", e);
                }
                Err(e) => {
                    return Err(RepcastError::decode(format!("Decode failed: {e}")));
                }
            }
        }

        let sample_rate =
            sample_rate.ok_or_else(|| RepcastError::decode("Sample rate not found"))?;
        let channels = channels.ok_or_else(|| RepcastError::decode("Channel count not found"))?;

        let frames = samples.len() / usize::from(channels.max(1));
        if let Some(declared) = declared_frames {
            if (frames as u64) < declared {
                return Err(RepcastError::decode(format!(
                    "Stream ended after {frames} of {declared} frames"
                )));
            }
        }

        debug!(
            "Decoded {} frames at {} Hz, {} channel(s)",
            frames, sample_rate, channels
        );

        AudioBuffer::new(samples, sample_rate, channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_wav(path: &Path, samples: &[i16], sample_rate: u32, channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_wav_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        write_wav(&path, &[0, 16384, -16384, 0], 8000, 2);

        let buffer = AudioDecoder::decode_file(&path).unwrap();
        assert_eq!(buffer.sample_rate(), 8000);
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.frames(), 2);
        assert!((buffer.samples()[1] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_decode_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        write_wav(&path, &[0; 800], 8000, 1);

        let bytes = std::fs::read(&path).unwrap();
        let buffer = AudioDecoder::decode_bytes(bytes, "wav").unwrap();
        assert_eq!(buffer.frames(), 800);
    }

    #[test]
    fn test_decode_missing_file() {
        let err = AudioDecoder::decode_file("/definitely/not/here.mp3").unwrap_err();
        assert!(matches!(err, RepcastError::FileRead { .. }));
    }

    #[test]
    fn test_decode_truncated_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        write_wav(&path, &[1000; 8000], 8000, 1);

        // Cut the data chunk short of the length its header declares
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..44 + 4000]).unwrap();

        let err = AudioDecoder::decode_file(&path).unwrap_err();
        assert!(matches!(err, RepcastError::AudioDecode { .. }), "{err:?}");
        assert!(err.to_string().contains("of 8000 frames"));
    }

    #[test]
    fn test_decode_garbage() {
        let err = AudioDecoder::decode_bytes(b"not audio at all".to_vec(), "mp3").unwrap_err();
        assert!(matches!(err, RepcastError::AudioDecode { .. }));
    }
}
