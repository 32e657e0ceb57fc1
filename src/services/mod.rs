//! Fixture composition services

pub mod composer;
pub mod manifest;
pub mod pin_codes;
pub mod test_plan;

pub use composer::{SequenceComposer, SequenceTiming, TimingPolicy};
pub use manifest::{RenderManifest, SegmentRecord};
pub use pin_codes::{PinDirectory, PinEntry};
pub use test_plan::{ExpectedOutcome, PlanIssue, PlanSummary, ScenarioDescriptor, TestPlan};
