//! Raw PCM byte → sample frame conversion
//!
//! The decoder hands out little-endian signed 16-bit interleaved bytes in
//! arbitrary block sizes. Blocks are not guaranteed to end on a sample (or
//! frame) boundary, so [`FrameConverter`] carries leftover bytes into the next
//! block instead of truncating them.
//!
//! **Boundary policy:**
//! - Bytes that do not complete a whole frame (`channels * 2` bytes) are
//!   carried over and prepended to the next block.
//! - At end of stream, whatever remains (always fewer than one frame) is
//!   dropped and reported by [`FrameConverter::finish`].

/// Bit depth of decoded samples and of the output container
pub const SOURCE_BIT_DEPTH: u16 = 16;

/// Channel count declared for every output container
pub const OUTPUT_CHANNELS: u16 = 2;

const BYTES_PER_SAMPLE: usize = (SOURCE_BIT_DEPTH / 8) as usize;

/// Format metadata attached to every [`FrameBuffer`]
///
/// Only built through [`FrameFormat::stereo_s16`], so the channel count is
/// never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    /// Native sample rate reported by the decoder (never resampled)
    sample_rate: u32,
    channels: u16,
    bit_depth: u16,
}

impl FrameFormat {
    /// Fixed 2-channel 16-bit format at the given sample rate
    pub fn stereo_s16(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: OUTPUT_CHANNELS,
            bit_depth: SOURCE_BIT_DEPTH,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bit_depth(&self) -> u16 {
        self.bit_depth
    }

    /// Bytes occupied by one interleaved frame
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * BYTES_PER_SAMPLE
    }
}

/// Converted samples for one block, ready for the container encoder
///
/// Samples are interleaved: `[L, R, L, R, ...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub format: FrameFormat,
    pub samples: Vec<i16>,
}

impl FrameBuffer {
    /// Number of whole frames in this buffer
    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Interpret `bytes` as little-endian signed 16-bit samples.
///
/// Returns one sample per byte pair, in order, plus the unconsumed tail
/// (empty for even-length input, one byte otherwise).
pub fn decode_le_i16(bytes: &[u8]) -> (Vec<i16>, &[u8]) {
    let chunks = bytes.chunks_exact(BYTES_PER_SAMPLE);
    let remainder = chunks.remainder();
    let samples = chunks
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    (samples, remainder)
}

/// Block-to-frame converter with carry-over of incomplete frames
///
/// One instance per file; never shared between tasks.
#[derive(Debug)]
pub struct FrameConverter {
    format: FrameFormat,
    carry: Vec<u8>,
}

impl FrameConverter {
    pub fn new(format: FrameFormat) -> Self {
        Self {
            format,
            carry: Vec::with_capacity(format.frame_bytes()),
        }
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    /// Number of bytes currently held back waiting for the next block
    pub fn pending_bytes(&self) -> usize {
        self.carry.len()
    }

    /// Convert one decoded block.
    ///
    /// Returns `None` when the block (plus any carried bytes) does not yet
    /// complete a single frame.
    pub fn push(&mut self, block: &[u8]) -> Option<FrameBuffer> {
        let frame_bytes = self.format.frame_bytes();

        let samples = if self.carry.is_empty() {
            let usable = block.len() - block.len() % frame_bytes;
            self.carry.extend_from_slice(&block[usable..]);
            decode_le_i16(&block[..usable]).0
        } else {
            let mut joined = std::mem::take(&mut self.carry);
            joined.extend_from_slice(block);
            let usable = joined.len() - joined.len() % frame_bytes;
            self.carry.extend_from_slice(&joined[usable..]);
            decode_le_i16(&joined[..usable]).0
        };

        if samples.is_empty() {
            return None;
        }

        Some(FrameBuffer {
            format: self.format,
            samples,
        })
    }

    /// End of stream: drop any incomplete trailing frame.
    ///
    /// Returns the number of bytes dropped.
    pub fn finish(self) -> usize {
        self.carry.len()
    }
}
