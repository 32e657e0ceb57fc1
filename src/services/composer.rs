//! Sequence composition: turns a test plan into one continuous PCM buffer

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{GeneratorConfig, TimingConfig};
use crate::core::AudioBuffer;
use crate::protocols::dtmf::{DtmfDigit, ToneSynthesizer};
use crate::services::manifest::{RenderManifest, SegmentRecord};
use crate::services::test_plan::{ExpectedOutcome, PlanSummary, ScenarioDescriptor, TestPlan};
use crate::{Error, Result};

/// Tone, gap and trailing pause for one keyed sequence, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceTiming {
    pub digit_duration: f64,
    pub gap_duration: f64,
    pub pause_after: f64,
}

impl SequenceTiming {
    pub fn validate(&self) -> Result<()> {
        if !self.digit_duration.is_finite() || self.digit_duration <= 0.0 {
            return Err(Error::InvalidDuration(self.digit_duration));
        }
        for silence in [self.gap_duration, self.pause_after] {
            if !silence.is_finite() || silence < 0.0 {
                return Err(Error::InvalidDuration(silence));
            }
        }
        Ok(())
    }
}

/// Timing applied to each scenario, selected by its expected outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingPolicy {
    /// Valid and invalid entries
    pub entry: SequenceTiming,
    /// The single keyed digit of a timeout scenario
    pub abandoned: SequenceTiming,
    pub inter_digit_timeout_silence: f64,
    pub entry_timeout_silence: f64,
    /// Appended after every scenario so the decoder starts from an empty buffer
    pub reset_silence: f64,
}

impl TimingPolicy {
    /// Timing for `scenario`, honouring its own override.
    pub fn timing_for(&self, scenario: &ScenarioDescriptor) -> SequenceTiming {
        scenario.timing.unwrap_or_else(|| self.sequence_for(scenario.outcome))
    }

    pub fn sequence_for(&self, outcome: ExpectedOutcome) -> SequenceTiming {
        match outcome {
            ExpectedOutcome::Valid | ExpectedOutcome::Invalid => self.entry,
            ExpectedOutcome::TimeoutInterDigit | ExpectedOutcome::TimeoutEntry => self.abandoned,
        }
    }

    /// Silence forced after the sequence to provoke a decoder timeout.
    pub fn timeout_silence(&self, outcome: ExpectedOutcome) -> Option<f64> {
        match outcome {
            ExpectedOutcome::Valid | ExpectedOutcome::Invalid => None,
            ExpectedOutcome::TimeoutInterDigit => Some(self.inter_digit_timeout_silence),
            ExpectedOutcome::TimeoutEntry => Some(self.entry_timeout_silence),
        }
    }
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self::from(&TimingConfig::default())
    }
}

impl From<&TimingConfig> for TimingPolicy {
    fn from(config: &TimingConfig) -> Self {
        Self {
            entry: SequenceTiming {
                digit_duration: config.digit_duration,
                gap_duration: config.gap_duration,
                pause_after: config.pause_after,
            },
            abandoned: SequenceTiming {
                digit_duration: config.digit_duration,
                gap_duration: config.timeout_gap_duration,
                pause_after: config.pause_after,
            },
            inter_digit_timeout_silence: config.inter_digit_timeout_silence,
            entry_timeout_silence: config.entry_timeout_silence,
            reset_silence: config.reset_silence,
        }
    }
}

/// Renders scenarios and whole plans with a fixed synthesizer and policy
#[derive(Debug, Clone)]
pub struct SequenceComposer {
    synth: ToneSynthesizer,
    policy: TimingPolicy,
}

impl SequenceComposer {
    pub fn new(synth: ToneSynthesizer, policy: TimingPolicy) -> Self {
        Self { synth, policy }
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let synth = ToneSynthesizer::from_config(&config.audio)?;
        Ok(Self::new(synth, TimingPolicy::from(&config.timing)))
    }

    pub fn synthesizer(&self) -> &ToneSynthesizer {
        &self.synth
    }

    /// Key `pin` digit by digit, each tone followed by a gap, then pause.
    pub fn render_pin_sequence(
        &self,
        pin: &[DtmfDigit],
        digit_duration: f64,
        gap_duration: f64,
        pause_after: f64,
    ) -> Result<AudioBuffer> {
        if pin.is_empty() {
            return Err(Error::invalid_plan("cannot render an empty PIN"));
        }

        let frames = self.sequence_frames(pin.len(), digit_duration, gap_duration, pause_after)?;
        let mut buffer = AudioBuffer::with_capacity(self.synth.sample_rate(), self.synth.channels(), frames);

        let gap = self.synth.generate_silence(gap_duration)?;
        for &digit in pin {
            buffer.append(&self.synth.generate_tone(digit, digit_duration)?)?;
            buffer.append(&gap)?;
        }
        buffer.append(&self.synth.generate_silence(pause_after)?)?;

        Ok(buffer)
    }

    /// One scenario without the trailing reset silence.
    pub fn render_scenario(&self, scenario: &ScenarioDescriptor) -> Result<AudioBuffer> {
        let timing = self.policy.timing_for(scenario);
        let mut buffer = self.render_pin_sequence(
            scenario.rendered_digits(),
            timing.digit_duration,
            timing.gap_duration,
            timing.pause_after,
        )?;

        // Kept separate from pause_after; both segments count toward the file.
        if let Some(silence) = self.policy.timeout_silence(scenario.outcome) {
            buffer.append(&self.synth.generate_silence(silence)?)?;
        }

        debug!(
            "Rendered scenario '{}' ({}, PIN {}): {} frames",
            scenario.label,
            scenario.outcome,
            scenario.pin,
            buffer.len()
        );
        Ok(buffer)
    }

    pub fn render_test_plan(&self, plan: &TestPlan) -> Result<AudioBuffer> {
        self.render_with_manifest(plan).map(|(buffer, _)| buffer)
    }

    /// Render the plan and record where every scenario landed.
    pub fn render_with_manifest(&self, plan: &TestPlan) -> Result<(AudioBuffer, RenderManifest)> {
        plan.validate()?;
        // Sizes the whole file up front so an oversized plan fails before rendering.
        let summary = self.summarize(plan)?;

        let parts = self.render_scenarios(plan)?;
        let reset = self.synth.generate_silence(self.policy.reset_silence)?;

        let mut output =
            AudioBuffer::with_capacity(self.synth.sample_rate(), self.synth.channels(), summary.total_frames);
        let mut segments = Vec::with_capacity(plan.len());

        for (index, (scenario, part)) in plan.iter().zip(&parts).enumerate() {
            let start_frame = output.len();
            output.append(part)?;
            let end_frame = output.len();
            output.append(&reset)?;

            segments.push(SegmentRecord::new(
                index,
                scenario,
                start_frame,
                end_frame,
                output.len(),
                self.synth.sample_rate(),
            ));
        }

        info!(
            "Rendered {} scenarios: {} frames ({:.2}s)",
            plan.len(),
            output.len(),
            output.duration_secs()
        );

        let manifest = RenderManifest::new(&self.synth, self.policy, &output, segments);
        Ok((output, manifest))
    }

    #[cfg(not(feature = "parallel"))]
    fn render_scenarios(&self, plan: &TestPlan) -> Result<Vec<AudioBuffer>> {
        plan.iter().map(|scenario| self.render_scenario(scenario)).collect()
    }

    #[cfg(feature = "parallel")]
    fn render_scenarios(&self, plan: &TestPlan) -> Result<Vec<AudioBuffer>> {
        use rayon::prelude::*;

        // Collecting an indexed iterator keeps plan order.
        plan.scenarios()
            .par_iter()
            .map(|scenario| self.render_scenario(scenario))
            .collect()
    }

    /// `keyed × (tone + gap) + pause`, bounded by what one WAV file holds.
    fn sequence_frames(
        &self,
        keyed: usize,
        digit_duration: f64,
        gap_duration: f64,
        pause_after: f64,
    ) -> Result<usize> {
        let tone = self.synth.samples_for(digit_duration)?;
        let gap = self.synth.samples_for(gap_duration)?;
        let pause = self.synth.samples_for(pause_after)?;

        tone.checked_add(gap)
            .and_then(|per_digit| per_digit.checked_mul(keyed))
            .and_then(|keyed_frames| keyed_frames.checked_add(pause))
            .filter(|&frames| frames <= self.synth.max_frames())
            .ok_or_else(|| self.too_long())
    }

    fn too_long(&self) -> Error {
        Error::configuration_mismatch(format!(
            "audio longer than {} frames does not fit in one WAV file",
            self.synth.max_frames()
        ))
    }

    /// Frames `render_scenario` produces for `scenario`.
    pub fn scenario_frames(&self, scenario: &ScenarioDescriptor) -> Result<usize> {
        let timing = self.policy.timing_for(scenario);
        let sequence = self.sequence_frames(
            scenario.rendered_digits().len(),
            timing.digit_duration,
            timing.gap_duration,
            timing.pause_after,
        )?;
        let timeout = match self.policy.timeout_silence(scenario.outcome) {
            Some(silence) => self.synth.samples_for(silence)?,
            None => 0,
        };

        sequence
            .checked_add(timeout)
            .filter(|&frames| frames <= self.synth.max_frames())
            .ok_or_else(|| self.too_long())
    }

    /// Size of the rendered plan, computed without rendering it.
    pub fn summarize(&self, plan: &TestPlan) -> Result<PlanSummary> {
        let reset = self.synth.samples_for(self.policy.reset_silence)?;
        let mut total_frames: usize = 0;
        for scenario in plan {
            total_frames = self
                .scenario_frames(scenario)?
                .checked_add(reset)
                .and_then(|frames| frames.checked_add(total_frames))
                .filter(|&frames| frames <= self.synth.max_frames())
                .ok_or_else(|| self.too_long())?;
        }
        let channels = self.synth.channels();

        Ok(PlanSummary {
            scenarios: plan.len(),
            valid: plan.count(ExpectedOutcome::Valid),
            invalid: plan.count(ExpectedOutcome::Invalid),
            timeouts: plan.count(ExpectedOutcome::TimeoutInterDigit) + plan.count(ExpectedOutcome::TimeoutEntry),
            sample_rate: self.synth.sample_rate(),
            channels,
            total_frames,
            duration_secs: total_frames as f64 / self.synth.sample_rate() as f64,
            data_bytes: total_frames * channels as usize * (self.synth.bits_per_sample() / 8) as usize,
        })
    }
}
