//! Audio collaborators: decoding, sample conversion and container encoding
//!
//! Pipeline per file: [`decoder`] (compressed → s16le bytes) →
//! [`frames`] (bytes → sample frames) → [`encoder`] (frames → WAV).

pub mod decoder;
pub mod encoder;
pub mod frames;

pub use decoder::{DecoderBackend, SampleDecoder, SymphoniaBackend, SymphoniaDecoder};
pub use encoder::{ContainerEncoder, EncoderBackend, WavBackend, WavEncoder};
pub use frames::{decode_le_i16, FrameBuffer, FrameConverter, FrameFormat};
