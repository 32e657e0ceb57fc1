//! Owned PCM sample buffers

use crate::{Error, Result};

/// Signed 16-bit PCM audio, interleaved when stereo.
///
/// A buffer always owns its samples. Appending copies the other buffer's
/// samples in, so buffers rendered for different scenarios never alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: u16,
    samples: Vec<i16>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self::with_capacity(sample_rate, channels, 0)
    }

    /// Empty buffer with room for `frames` frames.
    pub fn with_capacity(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            samples: Vec::with_capacity(frames * channels as usize),
        }
    }

    /// Wrap already interleaved samples.
    pub fn from_interleaved(sample_rate: u32, channels: u16, samples: Vec<i16>) -> Result<Self> {
        if channels == 0 {
            return Err(Error::configuration_mismatch("channel count must be at least 1"));
        }
        if samples.len() % channels as usize != 0 {
            return Err(Error::configuration_mismatch(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
            samples,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (sampling instants), independent of channel count.
    pub fn len(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Samples of frame `index`, one per channel.
    pub fn frame(&self, index: usize) -> Option<&[i16]> {
        let width = self.channels as usize;
        let start = index.checked_mul(width)?;
        self.samples.get(start..start + width)
    }

    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Size of the PCM payload in bytes.
    pub fn data_bytes(&self) -> usize {
        self.samples.len() * std::mem::size_of::<i16>()
    }

    /// Push one sampling instant, duplicated into every channel.
    pub fn push_frame(&mut self, value: i16) {
        for _ in 0..self.channels {
            self.samples.push(value);
        }
    }

    /// Push `frames` frames of digital silence.
    pub fn push_silence(&mut self, frames: usize) {
        let new_len = self.samples.len() + frames * self.channels as usize;
        self.samples.resize(new_len, 0);
    }

    /// Copy all of `other` onto the end of this buffer.
    pub fn append(&mut self, other: &AudioBuffer) -> Result<()> {
        self.ensure_compatible(other)?;
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    fn ensure_compatible(&self, other: &AudioBuffer) -> Result<()> {
        if self.sample_rate != other.sample_rate {
            return Err(Error::configuration_mismatch(format!(
                "cannot join {} Hz audio onto {} Hz audio",
                other.sample_rate, self.sample_rate
            )));
        }
        if self.channels != other.channels {
            return Err(Error::configuration_mismatch(format!(
                "cannot join {}-channel audio onto {}-channel audio",
                other.channels, self.channels
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_frame_duplicates_channels() {
        let mut buffer = AudioBuffer::new(8000, 2);
        buffer.push_frame(100);
        buffer.push_frame(-7);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.samples(), &[100, 100, -7, -7]);
        assert_eq!(buffer.frame(1), Some(&[-7i16, -7][..]));
        assert_eq!(buffer.frame(2), None);
    }

    #[test]
    fn test_append_copies_samples() {
        let mut first = AudioBuffer::from_interleaved(8000, 1, vec![1, 2, 3]).unwrap();
        let second = AudioBuffer::from_interleaved(8000, 1, vec![4, 5]).unwrap();

        first.append(&second).unwrap();
        first.push_silence(2);

        assert_eq!(first.samples(), &[1, 2, 3, 4, 5, 0, 0]);
        assert_eq!(second.samples(), &[4, 5]);
        assert_eq!(first.data_bytes(), 14);
    }

    #[test]
    fn test_append_rejects_mismatched_layout() {
        let mut mono = AudioBuffer::new(8000, 1);
        let stereo = AudioBuffer::new(8000, 2);
        let wideband = AudioBuffer::new(16000, 1);

        assert!(matches!(mono.append(&stereo), Err(Error::ConfigurationMismatch(_))));
        assert!(matches!(mono.append(&wideband), Err(Error::ConfigurationMismatch(_))));
    }

    #[test]
    fn test_from_interleaved_validates_shape() {
        assert!(AudioBuffer::from_interleaved(8000, 2, vec![1, 2, 3]).is_err());
        assert!(AudioBuffer::from_interleaved(8000, 0, vec![]).is_err());

        let buffer = AudioBuffer::from_interleaved(8000, 2, vec![1, 1, 2, 2]).unwrap();
        assert_eq!(buffer.len(), 2);
        assert!((buffer.duration_secs() - 0.00025).abs() < 1e-12);
    }
}
