//! Test helper modules for wkmp-tc integration tests

pub mod audio_generator;

pub use audio_generator::{generate_sine_wav, read_wav, write_corrupt_file};
