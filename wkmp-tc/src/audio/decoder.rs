//! Compressed audio decoder using symphonia
//!
//! Exposes decoded audio as a byte stream of interleaved little-endian signed
//! 16-bit stereo samples through [`std::io::Read`]. `Ok(0)` marks the end of
//! the stream.
//!
//! Mono sources are duplicated to both channels so every stream matches the
//! fixed 2-channel output format. Sources with more than two channels are
//! rejected rather than remixed.

use crate::error::CodecError;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Lazy source of raw interleaved sample bytes
pub trait SampleDecoder: Read + Send {
    /// Native sample rate of the source stream
    fn sample_rate(&self) -> u32;
}

/// Opens a [`SampleDecoder`] over an already-opened source file
pub trait DecoderBackend: Send + Sync {
    fn open(&self, source: File, path: &Path) -> Result<Box<dyn SampleDecoder>, CodecError>;
}

/// Default backend: symphonia format probing and codec registry
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaBackend;

impl DecoderBackend for SymphoniaBackend {
    fn open(&self, source: File, path: &Path) -> Result<Box<dyn SampleDecoder>, CodecError> {
        Ok(Box::new(SymphoniaDecoder::open(source, path)?))
    }
}

/// Streaming symphonia decoder producing s16le stereo bytes
pub struct SymphoniaDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    /// Decoded bytes not yet handed out
    pending: Vec<u8>,
    position: usize,
    finished: bool,
}

impl SymphoniaDecoder {
    /// Probe the container and set up the codec for its first audio track.
    pub fn open(source: File, path: &Path) -> Result<Self, CodecError> {
        let mss = MediaSourceStream::new(Box::new(source), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(ext_str) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext_str);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| CodecError::Unsupported("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| CodecError::Malformed("Sample rate not found".to_string()))?;

        if let Some(channels) = codec_params.channels {
            Self::check_channel_count(channels.count())?;
        }

        let decoder =
            symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;

        debug!(
            file = %path.display(),
            sample_rate,
            channels = ?codec_params.channels.map(|c| c.count()),
            "Decoder initialized"
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            pending: Vec::new(),
            position: 0,
            finished: false,
        })
    }

    fn check_channel_count(channels: usize) -> Result<(), CodecError> {
        match channels {
            1 | 2 => Ok(()),
            n => Err(CodecError::Unsupported(format!(
                "{} channel source (only mono and stereo are supported)",
                n
            ))),
        }
    }

    /// Decode packets until at least one byte is pending or the stream ends.
    fn refill(&mut self) -> io::Result<()> {
        self.pending.clear();
        self.position = 0;

        while self.pending.is_empty() && !self.finished {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of stream");
                    self.finished = true;
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    debug!("Stream reset required, treating as end of stream");
                    self.finished = true;
                    break;
                }
                Err(e) => return Err(into_io_error(e)),
            };

            // Skip packets for other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    // Corrupt packet: skip it and keep going
                    warn!("Decode error, skipping packet: {}", msg);
                    continue;
                }
                Err(e) => return Err(into_io_error(e)),
            };

            if decoded.frames() == 0 {
                continue;
            }

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            Self::check_channel_count(channels)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

            let mut samples = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
            samples.copy_interleaved_ref(decoded);

            Self::append_stereo_bytes(samples.samples(), channels, &mut self.pending);
        }

        Ok(())
    }

    /// Append interleaved samples as s16le stereo, duplicating mono.
    fn append_stereo_bytes(samples: &[i16], channels: usize, output: &mut Vec<u8>) {
        if channels == 1 {
            output.reserve(samples.len() * 4);
            for sample in samples {
                let bytes = sample.to_le_bytes();
                output.extend_from_slice(&bytes);
                output.extend_from_slice(&bytes);
            }
        } else {
            output.reserve(samples.len() * 2);
            for sample in samples {
                output.extend_from_slice(&sample.to_le_bytes());
            }
        }
    }
}

impl Read for SymphoniaDecoder {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.position >= self.pending.len() {
            if self.finished {
                return Ok(0);
            }
            self.refill()?;
            if self.pending.is_empty() {
                return Ok(0);
            }
        }

        let available = &self.pending[self.position..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }
}

impl SampleDecoder for SymphoniaDecoder {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

fn into_io_error(err: SymphoniaError) -> io::Error {
    match err {
        SymphoniaError::IoError(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}
