//! WAV container encoder using hound
//!
//! The header is written when the encoder is created; sample data is appended
//! block by block and the chunk sizes are patched on [`ContainerEncoder::finalize`].

use crate::audio::frames::{FrameBuffer, FrameFormat};
use crate::error::CodecError;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;

/// Append-only sink for converted frames
pub trait ContainerEncoder: Send {
    /// Append one block. Blocks must be written in decode order.
    fn write(&mut self, frames: &FrameBuffer) -> Result<(), CodecError>;

    /// Flush buffered data and patch the header.
    fn finalize(self: Box<Self>) -> Result<(), CodecError>;
}

/// Creates a [`ContainerEncoder`] over an already-created destination file
pub trait EncoderBackend: Send + Sync {
    fn create(
        &self,
        destination: File,
        format: FrameFormat,
    ) -> Result<Box<dyn ContainerEncoder>, CodecError>;
}

/// Default backend: 16-bit integer PCM WAV
#[derive(Debug, Default, Clone, Copy)]
pub struct WavBackend;

impl EncoderBackend for WavBackend {
    fn create(
        &self,
        destination: File,
        format: FrameFormat,
    ) -> Result<Box<dyn ContainerEncoder>, CodecError> {
        Ok(Box::new(WavEncoder::new(destination, format)?))
    }
}

/// PCM WAV writer for a single destination file
pub struct WavEncoder {
    writer: WavWriter<BufWriter<File>>,
    format: FrameFormat,
}

impl WavEncoder {
    pub fn new(destination: File, format: FrameFormat) -> Result<Self, CodecError> {
        let spec = WavSpec {
            channels: format.channels(),
            sample_rate: format.sample_rate(),
            bits_per_sample: format.bit_depth(),
            sample_format: SampleFormat::Int,
        };

        let writer = WavWriter::new(BufWriter::new(destination), spec)?;
        Ok(Self { writer, format })
    }
}

impl ContainerEncoder for WavEncoder {
    fn write(&mut self, frames: &FrameBuffer) -> Result<(), CodecError> {
        if frames.format != self.format {
            return Err(CodecError::Malformed(format!(
                "block format {:?} does not match container format {:?}",
                frames.format, self.format
            )));
        }

        for &sample in &frames.samples {
            self.writer.write_sample(sample)?;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<(), CodecError> {
        self.writer.finalize()?;
        Ok(())
    }
}
