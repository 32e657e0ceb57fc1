//! Side-car manifest describing where each scenario sits in a rendered file

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::AudioBuffer;
use crate::protocols::dtmf::{DtmfSequence, ToneSynthesizer};
use crate::services::composer::TimingPolicy;
use crate::services::test_plan::{ExpectedOutcome, ScenarioDescriptor};
use crate::Result;

/// Placement of one scenario, in frames from the start of the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub index: usize,
    pub label: String,
    pub pin: DtmfSequence,
    pub outcome: ExpectedOutcome,
    pub start_frame: usize,
    /// End of the scenario itself, exclusive
    pub end_frame: usize,
    /// End of the reset silence that follows, exclusive
    pub reset_end_frame: usize,
    pub start_secs: f64,
    pub end_secs: f64,
}

impl SegmentRecord {
    pub fn new(
        index: usize,
        scenario: &ScenarioDescriptor,
        start_frame: usize,
        end_frame: usize,
        reset_end_frame: usize,
        sample_rate: u32,
    ) -> Self {
        let rate = sample_rate as f64;
        Self {
            index,
            label: scenario.label.clone(),
            pin: scenario.pin.clone(),
            outcome: scenario.outcome,
            start_frame,
            end_frame,
            reset_end_frame,
            start_secs: start_frame as f64 / rate,
            end_secs: end_frame as f64 / rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderManifest {
    pub generated_at: DateTime<Utc>,
    pub generator: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub total_frames: usize,
    pub duration_secs: f64,
    pub timing: TimingPolicy,
    pub segments: Vec<SegmentRecord>,
}

impl RenderManifest {
    pub fn new(
        synth: &ToneSynthesizer,
        timing: TimingPolicy,
        output: &AudioBuffer,
        segments: Vec<SegmentRecord>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            generator: format!("{} {}", crate::NAME, crate::VERSION),
            sample_rate: synth.sample_rate(),
            channels: synth.channels(),
            bits_per_sample: synth.bits_per_sample(),
            total_frames: output.len(),
            duration_secs: output.duration_secs(),
            timing,
            segments,
        }
    }

    /// `test_dtmf.wav` -> `test_dtmf.wav.json`
    pub fn path_for(audio_path: &Path) -> PathBuf {
        let mut name = audio_path.as_os_str().to_owned();
        name.push(".json");
        PathBuf::from(name)
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Manifest written to {}", path.display());
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
