//! Configuration management for the DTMF test fixture generator

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::protocols::dtmf::ToneSynthesizer;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub audio: AudioConfig,
    pub timing: TimingConfig,
    pub decoder: DecoderConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// PCM format of the generated file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 8000,
            bits_per_sample: 16,
            channels: 1,
        }
    }
}

/// Tone and silence lengths in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub digit_duration: f64,
    pub gap_duration: f64,
    pub pause_after: f64,
    /// Gap after the single digit of a timeout scenario.
    pub timeout_gap_duration: f64,
    pub inter_digit_timeout_silence: f64,
    pub entry_timeout_silence: f64,
    pub reset_silence: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            digit_duration: 0.1,
            gap_duration: 0.15,
            pause_after: 0.5,
            timeout_gap_duration: 0.1,
            inter_digit_timeout_silence: 4.0,
            entry_timeout_silence: 12.0,
            reset_silence: 4.0,
        }
    }
}

/// Settings of the decoder the fixture is built for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub inter_digit_timeout_ms: u32,
    pub entry_timeout_ms: u32,
    /// `PIN=function` file the decoder loads.
    pub pin_file: Option<String>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            inter_digit_timeout_ms: 3000,
            entry_timeout_ms: 10000,
            pin_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    /// Write `<path>.json` describing where each scenario sits.
    pub write_manifest: bool,
    pub plan_file: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "test_dtmf.wav".to_string(),
            write_manifest: true,
            plan_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: LogFormat::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "compact")]
    Compact,
    #[serde(rename = "full")]
    Full,
}

impl GeneratorConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: GeneratorConfig = toml::from_str(&contents)
            .map_err(|e| Error::parse(format!("Invalid TOML: {}", e)))?;
        Ok(config)
    }

    pub fn load_from_env() -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default_config())?;

        // DTMFGEN_AUDIO__SAMPLE_RATE=16000 overrides audio.sample_rate
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::Environment::with_prefix("DTMFGEN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let generator_config = settings.try_deserialize()?;
        Ok(generator_config)
    }

    pub fn validate(&self) -> Result<()> {
        // Rejects sample widths and channel counts the container cannot carry
        ToneSynthesizer::from_config(&self.audio)?;

        let timing = &self.timing;
        if !timing.digit_duration.is_finite() || timing.digit_duration <= 0.0 {
            return Err(Error::InvalidDuration(timing.digit_duration));
        }
        for silence in [
            timing.gap_duration,
            timing.pause_after,
            timing.timeout_gap_duration,
            timing.inter_digit_timeout_silence,
            timing.entry_timeout_silence,
            timing.reset_silence,
        ] {
            if !silence.is_finite() || silence < 0.0 {
                return Err(Error::InvalidDuration(silence));
            }
        }

        let inter_digit = self.decoder.inter_digit_timeout_ms as f64 / 1000.0;
        let entry = self.decoder.entry_timeout_ms as f64 / 1000.0;

        if timing.gap_duration >= inter_digit {
            return Err(Error::configuration_mismatch(format!(
                "inter-digit gap {}s would trip the {}s inter-digit timeout",
                timing.gap_duration, inter_digit
            )));
        }
        if timing.inter_digit_timeout_silence <= inter_digit {
            return Err(Error::configuration_mismatch(format!(
                "inter-digit timeout silence {}s does not exceed the {}s decoder timeout",
                timing.inter_digit_timeout_silence, inter_digit
            )));
        }
        if timing.entry_timeout_silence <= entry {
            return Err(Error::configuration_mismatch(format!(
                "entry timeout silence {}s does not exceed the {}s decoder timeout",
                timing.entry_timeout_silence, entry
            )));
        }
        if timing.reset_silence <= inter_digit {
            return Err(Error::configuration_mismatch(format!(
                "reset silence {}s does not clear the {}s inter-digit timeout",
                timing.reset_silence, inter_digit
            )));
        }

        if self.output.path.is_empty() {
            return Err(Error::parse("Output path is empty"));
        }

        Ok(())
    }

    pub fn default_config() -> Self {
        Self::default()
    }
}
