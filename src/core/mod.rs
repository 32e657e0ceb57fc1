//! Core audio types

pub mod buffer;

pub use buffer::AudioBuffer;
