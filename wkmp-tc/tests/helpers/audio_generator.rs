//! Audio Test File Generation Utilities
//!
//! Generates deterministic 16-bit PCM WAV sources. symphonia decodes these
//! losslessly, so converted outputs can be compared sample by sample.

#![allow(dead_code)]

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;

/// Generate a sine wave WAV file
///
/// Returns the interleaved samples written.
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    duration_ms: u64,
    frequency_hz: f32,
) -> Vec<i16> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).unwrap();
    let total_frames = (sample_rate as u64 * duration_ms) / 1000;
    let amplitude = i16::MAX as f32 * 0.5;
    let mut written = Vec::with_capacity(total_frames as usize * channels as usize);

    for frame_idx in 0..total_frames {
        let t = frame_idx as f32 / sample_rate as f32;
        for ch in 0..channels {
            // Offset phase per channel so channels are distinguishable
            let phase = ch as f32 * PI / 2.0;
            let sample = ((2.0 * PI * frequency_hz * t + phase).sin() * amplitude) as i16;
            writer.write_sample(sample).unwrap();
            written.push(sample);
        }
    }

    writer.finalize().unwrap();
    written
}

/// Write bytes that no format reader accepts
pub fn write_corrupt_file<P: AsRef<Path>>(path: P) {
    let mut garbage = b"NOT AUDIO ".repeat(64);
    garbage.extend_from_slice(&[0u8; 128]);
    std::fs::write(path, garbage).unwrap();
}

/// Read back a WAV file: spec plus all samples
pub fn read_wav<P: AsRef<Path>>(path: P) -> (WavSpec, Vec<i16>) {
    let mut reader = WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    (spec, samples)
}
