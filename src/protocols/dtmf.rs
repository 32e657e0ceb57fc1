//! DTMF (Dual-Tone Multi-Frequency) tone synthesis
//!
//! Tones follow the ITU-T Q.23 keypad matrix: every key is the sum of one
//! row (low group) and one column (high group) sinusoid at equal amplitude.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::AudioConfig;
use crate::core::AudioBuffer;
use crate::{Error, Result};

/// Row frequencies in Hz.
pub const LOW_GROUP_HZ: [f64; 4] = [697.0, 770.0, 852.0, 941.0];

/// Column frequencies in Hz.
pub const HIGH_GROUP_HZ: [f64; 4] = [1209.0, 1336.0, 1477.0, 1633.0];

/// Only 16-bit linear PCM is produced.
pub const PCM_BITS_PER_SAMPLE: u16 = 16;

/// Largest PCM payload a RIFF data chunk can describe.
pub const MAX_DATA_BYTES: u64 = u32::MAX as u64;

/// Per-tone amplitude; the two tones sum to at most full scale.
pub const TONE_AMPLITUDE: f64 = 0.5;

const KEYPAD: [[DtmfDigit; 4]; 4] = [
    [DtmfDigit::One, DtmfDigit::Two, DtmfDigit::Three, DtmfDigit::A],
    [DtmfDigit::Four, DtmfDigit::Five, DtmfDigit::Six, DtmfDigit::B],
    [DtmfDigit::Seven, DtmfDigit::Eight, DtmfDigit::Nine, DtmfDigit::C],
    [DtmfDigit::Star, DtmfDigit::Zero, DtmfDigit::Hash, DtmfDigit::D],
];

static FREQUENCY_TABLE: Lazy<HashMap<DtmfDigit, (f64, f64)>> = Lazy::new(|| {
    let mut table = HashMap::with_capacity(16);
    for (row, keys) in KEYPAD.iter().enumerate() {
        for (column, digit) in keys.iter().enumerate() {
            table.insert(*digit, (LOW_GROUP_HZ[row], HIGH_GROUP_HZ[column]));
        }
    }
    table
});

/// One key of the 16-key DTMF keypad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub enum DtmfDigit {
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    A,
    B,
    C,
    D,
    Star,
    Hash,
}

impl DtmfDigit {
    pub const ALL: [DtmfDigit; 16] = [
        DtmfDigit::Zero,
        DtmfDigit::One,
        DtmfDigit::Two,
        DtmfDigit::Three,
        DtmfDigit::Four,
        DtmfDigit::Five,
        DtmfDigit::Six,
        DtmfDigit::Seven,
        DtmfDigit::Eight,
        DtmfDigit::Nine,
        DtmfDigit::A,
        DtmfDigit::B,
        DtmfDigit::C,
        DtmfDigit::D,
        DtmfDigit::Star,
        DtmfDigit::Hash,
    ];

    pub fn from_char(symbol: char) -> Result<Self> {
        let digit = match symbol {
            '0' => DtmfDigit::Zero,
            '1' => DtmfDigit::One,
            '2' => DtmfDigit::Two,
            '3' => DtmfDigit::Three,
            '4' => DtmfDigit::Four,
            '5' => DtmfDigit::Five,
            '6' => DtmfDigit::Six,
            '7' => DtmfDigit::Seven,
            '8' => DtmfDigit::Eight,
            '9' => DtmfDigit::Nine,
            'A' => DtmfDigit::A,
            'B' => DtmfDigit::B,
            'C' => DtmfDigit::C,
            'D' => DtmfDigit::D,
            '*' => DtmfDigit::Star,
            '#' => DtmfDigit::Hash,
            other => return Err(Error::InvalidDigit(other)),
        };
        Ok(digit)
    }

    pub fn as_char(self) -> char {
        match self {
            DtmfDigit::Zero => '0',
            DtmfDigit::One => '1',
            DtmfDigit::Two => '2',
            DtmfDigit::Three => '3',
            DtmfDigit::Four => '4',
            DtmfDigit::Five => '5',
            DtmfDigit::Six => '6',
            DtmfDigit::Seven => '7',
            DtmfDigit::Eight => '8',
            DtmfDigit::Nine => '9',
            DtmfDigit::A => 'A',
            DtmfDigit::B => 'B',
            DtmfDigit::C => 'C',
            DtmfDigit::D => 'D',
            DtmfDigit::Star => '*',
            DtmfDigit::Hash => '#',
        }
    }

    /// (low, high) frequency pair in Hz.
    pub fn frequencies(self) -> (f64, f64) {
        FREQUENCY_TABLE[&self]
    }
}

impl fmt::Display for DtmfDigit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl TryFrom<char> for DtmfDigit {
    type Error = Error;

    fn try_from(symbol: char) -> Result<Self> {
        DtmfDigit::from_char(symbol)
    }
}

impl From<DtmfDigit> for char {
    fn from(digit: DtmfDigit) -> Self {
        digit.as_char()
    }
}

/// Ordered run of keypad digits, e.g. a PIN
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DtmfSequence(Vec<DtmfDigit>);

impl DtmfSequence {
    pub fn new(digits: Vec<DtmfDigit>) -> Self {
        Self(digits)
    }

    pub fn digits(&self) -> &[DtmfDigit] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for DtmfSequence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.chars()
            .map(DtmfDigit::from_char)
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

impl fmt::Display for DtmfSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in &self.0 {
            write!(f, "{}", digit)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for DtmfSequence {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DtmfSequence> for String {
    fn from(sequence: DtmfSequence) -> Self {
        sequence.to_string()
    }
}

/// DTMF tone and silence generator for 16-bit PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneSynthesizer {
    sample_rate: u32,
    channels: u16,
}

impl ToneSynthesizer {
    pub fn new(sample_rate: u32, bits_per_sample: u16, channels: u16) -> Result<Self> {
        if bits_per_sample != PCM_BITS_PER_SAMPLE {
            return Err(Error::configuration_mismatch(format!(
                "{}-bit samples requested, the PCM container carries {}-bit samples",
                bits_per_sample, PCM_BITS_PER_SAMPLE
            )));
        }
        if !(1..=2).contains(&channels) {
            return Err(Error::configuration_mismatch(format!(
                "{} channels requested, only mono or stereo is supported",
                channels
            )));
        }

        // Both groups must sit below Nyquist.
        let highest = HIGH_GROUP_HZ[HIGH_GROUP_HZ.len() - 1];
        if (sample_rate as f64) <= 2.0 * highest {
            return Err(Error::configuration_mismatch(format!(
                "sample rate {} Hz cannot represent the {} Hz column tone",
                sample_rate, highest
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    pub fn from_config(config: &AudioConfig) -> Result<Self> {
        Self::new(config.sample_rate, config.bits_per_sample, config.channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u16 {
        PCM_BITS_PER_SAMPLE
    }

    /// Most frames one WAV file can hold at this channel count.
    pub fn max_frames(&self) -> usize {
        let frame_bytes = (self.channels as u64) * (PCM_BITS_PER_SAMPLE as u64 / 8);
        (MAX_DATA_BYTES / frame_bytes) as usize
    }

    /// Frames needed for `duration` seconds, rounded to the nearest frame.
    pub fn samples_for(&self, duration: f64) -> Result<usize> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(Error::InvalidDuration(duration));
        }

        let frames = (self.sample_rate as f64 * duration).round();
        if frames > self.max_frames() as f64 {
            return Err(Error::InvalidDuration(duration));
        }
        Ok(frames as usize)
    }

    pub fn generate_tone(&self, digit: DtmfDigit, duration: f64) -> Result<AudioBuffer> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(Error::InvalidDuration(duration));
        }

        let (low_freq, high_freq) = digit.frequencies();
        let sample_count = self.samples_for(duration)?;
        let mut buffer = AudioBuffer::with_capacity(self.sample_rate, self.channels, sample_count);

        for i in 0..sample_count {
            let t = i as f64 / self.sample_rate as f64;
            let value = TONE_AMPLITUDE * (2.0 * PI * low_freq * t).sin()
                + TONE_AMPLITUDE * (2.0 * PI * high_freq * t).sin();
            // `as` truncates toward zero and saturates at the i16 bounds.
            buffer.push_frame((value * i16::MAX as f64) as i16);
        }

        trace!("Generated tone {} ({} Hz + {} Hz) for {}s", digit, low_freq, high_freq, duration);
        Ok(buffer)
    }

    pub fn generate_silence(&self, duration: f64) -> Result<AudioBuffer> {
        let sample_count = self.samples_for(duration)?;
        let mut buffer = AudioBuffer::with_capacity(self.sample_rate, self.channels, sample_count);
        buffer.push_silence(sample_count);
        Ok(buffer)
    }
}
