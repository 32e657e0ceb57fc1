//! Test plans: the ordered scenarios encoded into a fixture file

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::protocols::dtmf::{DtmfDigit, DtmfSequence};
use crate::services::composer::SequenceTiming;
use crate::services::pin_codes::PinDirectory;
use crate::{Error, Result};

/// What the decoder under test should report for a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutcome {
    /// Configured PIN, reported with valid=true
    Valid,
    /// Unconfigured PIN, reported with valid=false
    Invalid,
    /// Partial entry abandoned past the inter-digit timeout
    TimeoutInterDigit,
    /// Partial entry abandoned past the entry timeout
    TimeoutEntry,
}

impl ExpectedOutcome {
    pub fn is_timeout(self) -> bool {
        matches!(self, ExpectedOutcome::TimeoutInterDigit | ExpectedOutcome::TimeoutEntry)
    }
}

impl fmt::Display for ExpectedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExpectedOutcome::Valid => "valid",
            ExpectedOutcome::Invalid => "invalid",
            ExpectedOutcome::TimeoutInterDigit => "timeout_inter_digit",
            ExpectedOutcome::TimeoutEntry => "timeout_entry",
        };
        f.write_str(name)
    }
}

/// One PIN entry attempt and its expected result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDescriptor {
    pub pin: DtmfSequence,
    pub label: String,
    pub outcome: ExpectedOutcome,
    /// Replaces the policy's tone/gap/pause for this scenario
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<SequenceTiming>,
}

impl ScenarioDescriptor {
    pub fn new(pin: &str, label: impl Into<String>, outcome: ExpectedOutcome) -> Result<Self> {
        Ok(Self {
            pin: pin.parse()?,
            label: label.into(),
            outcome,
            timing: None,
        })
    }

    pub fn with_timing(mut self, timing: SequenceTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Digits that actually get keyed. Timeout scenarios key only the first
    /// digit and then fall silent.
    pub fn rendered_digits(&self) -> &[DtmfDigit] {
        let digits = self.pin.digits();
        if self.outcome.is_timeout() && !digits.is_empty() {
            &digits[..1]
        } else {
            digits
        }
    }
}

struct ScenarioLiteral {
    pin: &'static [DtmfDigit],
    label: &'static str,
    outcome: ExpectedOutcome,
}

/// Ordered list of scenarios; order is the order in the output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPlan {
    scenarios: Vec<ScenarioDescriptor>,
}

impl TestPlan {
    pub fn new(scenarios: Vec<ScenarioDescriptor>) -> Result<Self> {
        let plan = Self { scenarios };
        plan.validate()?;
        Ok(plan)
    }

    /// The plan matching the reference `codes.pin` deployment.
    pub fn reference() -> Self {
        use DtmfDigit::*;
        use ExpectedOutcome::{Invalid, TimeoutEntry, TimeoutInterDigit, Valid};

        const SCENARIOS: [ScenarioLiteral; 14] = [
            ScenarioLiteral { pin: &[One, Two, Three, Four], label: "open_door", outcome: Valid },
            ScenarioLiteral { pin: &[Five, Six, Seven, Eight], label: "unlock_garage", outcome: Valid },
            ScenarioLiteral { pin: &[Nine, Nine, Nine, Nine], label: "emergency_shutdown", outcome: Valid },
            ScenarioLiteral { pin: &[Zero, Zero, Zero, Zero], label: "admin_mode", outcome: Valid },
            ScenarioLiteral { pin: &[Star, A, One, B], label: "special_code", outcome: Valid },
            ScenarioLiteral { pin: &[C, Two, Three, D], label: "commented_example", outcome: Valid },
            ScenarioLiteral { pin: &[A, B, C, Hash], label: "hello_world", outcome: Valid },
            ScenarioLiteral { pin: &[One, One, One, One], label: "not in config", outcome: Invalid },
            ScenarioLiteral { pin: &[Two, Two, Two, Two], label: "not in config", outcome: Invalid },
            ScenarioLiteral { pin: &[One, Two, Three], label: "too short", outcome: Invalid },
            ScenarioLiteral { pin: &[One, Two, Three, Four, Five], label: "too long", outcome: Invalid },
            ScenarioLiteral { pin: &[A, B, C, D], label: "not in config", outcome: Invalid },
            ScenarioLiteral {
                pin: &[One],
                label: "inter-digit pause after 1",
                outcome: TimeoutInterDigit,
            },
            ScenarioLiteral {
                pin: &[Two],
                label: "entry timeout after 2",
                outcome: TimeoutEntry,
            },
        ];

        let scenarios = SCENARIOS
            .iter()
            .map(|literal| ScenarioDescriptor {
                pin: DtmfSequence::new(literal.pin.to_vec()),
                label: literal.label.to_string(),
                outcome: literal.outcome,
                timing: None,
            })
            .collect();
        Self { scenarios }
    }

    /// Load a plan from `.toml` or `.json`.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let plan: TestPlan = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&contents)
                .map_err(|e| Error::parse(format!("Invalid TOML plan: {}", e)))?,
            Some("json") => serde_json::from_str(&contents)?,
            _ => {
                return Err(Error::parse(format!(
                    "Unsupported plan file extension: {}",
                    path.display()
                )))
            }
        };

        plan.validate()?;
        info!("Loaded {} scenarios from {}", plan.len(), path.display());
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scenarios.is_empty() {
            return Err(Error::invalid_plan("plan has no scenarios"));
        }
        for (index, scenario) in self.scenarios.iter().enumerate() {
            if scenario.pin.is_empty() {
                return Err(Error::invalid_plan(format!(
                    "scenario {} ({}) has an empty PIN",
                    index, scenario.label
                )));
            }
            if let Some(timing) = &scenario.timing {
                timing.validate()?;
            }
        }
        Ok(())
    }

    pub fn scenarios(&self) -> &[ScenarioDescriptor] {
        &self.scenarios
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScenarioDescriptor> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn count(&self, outcome: ExpectedOutcome) -> usize {
        self.scenarios.iter().filter(|s| s.outcome == outcome).count()
    }

    /// Check every scenario against the decoder's PIN file.
    ///
    /// The decoder compares its buffer after each digit, so a configured
    /// prefix ends the entry early.
    pub fn check_against(&self, directory: &PinDirectory) -> Vec<PlanIssue> {
        let mut issues = Vec::new();

        for (index, scenario) in self.scenarios.iter().enumerate() {
            let keyed = scenario.rendered_digits();

            for end in 1..keyed.len() {
                let prefix = DtmfSequence::new(keyed[..end].to_vec());
                if let Some(function) = directory.lookup(&prefix) {
                    issues.push(PlanIssue::EarlyMatch {
                        index,
                        pin: scenario.pin.clone(),
                        prefix,
                        function: function.to_string(),
                    });
                }
            }

            let keyed = DtmfSequence::new(keyed.to_vec());
            match (scenario.outcome, directory.lookup(&keyed)) {
                (ExpectedOutcome::Valid, None) => issues.push(PlanIssue::ValidPinNotConfigured {
                    index,
                    pin: scenario.pin.clone(),
                }),
                (ExpectedOutcome::Valid, Some(_)) => {}
                (_, Some(function)) => issues.push(PlanIssue::UnexpectedMatch {
                    index,
                    pin: keyed,
                    function: function.to_string(),
                }),
                (_, None) => {}
            }
        }

        issues
    }
}

impl<'a> IntoIterator for &'a TestPlan {
    type Item = &'a ScenarioDescriptor;
    type IntoIter = std::slice::Iter<'a, ScenarioDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.scenarios.iter()
    }
}

/// Disagreement between a plan and the decoder's PIN file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanIssue {
    ValidPinNotConfigured {
        index: usize,
        pin: DtmfSequence,
    },
    UnexpectedMatch {
        index: usize,
        pin: DtmfSequence,
        function: String,
    },
    EarlyMatch {
        index: usize,
        pin: DtmfSequence,
        prefix: DtmfSequence,
        function: String,
    },
}

impl fmt::Display for PlanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanIssue::ValidPinNotConfigured { index, pin } => {
                write!(f, "scenario {}: valid PIN {} is not configured", index, pin)
            }
            PlanIssue::UnexpectedMatch { index, pin, function } => {
                write!(f, "scenario {}: {} matches configured function {}", index, pin, function)
            }
            PlanIssue::EarlyMatch {
                index,
                pin,
                prefix,
                function,
            } => write!(
                f,
                "scenario {}: prefix {} of {} already triggers {}",
                index, prefix, pin, function
            ),
        }
    }
}

/// Totals for a plan rendered with a given timing policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub scenarios: usize,
    pub valid: usize,
    pub invalid: usize,
    pub timeouts: usize,
    pub sample_rate: u32,
    pub channels: u16,
    pub total_frames: usize,
    pub duration_secs: f64,
    pub data_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reference_plan() {
        let plan = TestPlan::reference();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.len(), 14);
        assert_eq!(plan.count(ExpectedOutcome::Valid), 7);
        assert_eq!(plan.count(ExpectedOutcome::Invalid), 5);
        assert_eq!(plan.count(ExpectedOutcome::TimeoutInterDigit), 1);
        assert_eq!(plan.count(ExpectedOutcome::TimeoutEntry), 1);

        let first = &plan.scenarios()[0];
        assert_eq!(first.pin.to_string(), "1234");
        assert_eq!(first.outcome, ExpectedOutcome::Valid);
        assert_eq!(plan.scenarios()[13].pin.to_string(), "2");
    }

    #[test]
    fn test_rendered_digits() {
        let normal = ScenarioDescriptor::new("12345", "too long", ExpectedOutcome::Invalid).unwrap();
        assert_eq!(normal.rendered_digits().len(), 5);

        let timeout = ScenarioDescriptor::new("987", "abandoned", ExpectedOutcome::TimeoutEntry).unwrap();
        assert_eq!(timeout.rendered_digits(), &[DtmfDigit::Nine]);
    }

    #[test]
    fn test_rejects_empty_plans() {
        assert!(matches!(TestPlan::new(vec![]), Err(Error::InvalidPlan(_))));

        let empty_pin = ScenarioDescriptor::new("", "nothing", ExpectedOutcome::Invalid).unwrap();
        assert!(matches!(TestPlan::new(vec![empty_pin]), Err(Error::InvalidPlan(_))));

        assert!(matches!(
            ScenarioDescriptor::new("12E4", "bad", ExpectedOutcome::Invalid),
            Err(Error::InvalidDigit('E'))
        ));
    }

    #[test]
    fn test_load_toml_plan() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[[scenarios]]
pin = "*A1B"
label = "special_code"
outcome = "valid"

[[scenarios]]
pin = "7"
label = "abandoned"
outcome = "timeout_inter_digit"
"#
        )
        .unwrap();

        let plan = TestPlan::load_from_file(file.path()).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.scenarios()[0].pin.to_string(), "*A1B");
        assert_eq!(plan.scenarios()[1].outcome, ExpectedOutcome::TimeoutInterDigit);
        assert_eq!(plan.scenarios()[1].timing, None);
    }

    #[test]
    fn test_timing_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[[scenarios]]
pin = "55"
label = "slow"
outcome = "invalid"
timing = {{ digit_duration = 0.2, gap_duration = 0.3, pause_after = 1.0 }}
"#
        )
        .unwrap();

        let plan = TestPlan::load_from_file(file.path()).unwrap();
        let timing = plan.scenarios()[0].timing.unwrap();
        assert_eq!(timing.digit_duration, 0.2);
        assert_eq!(timing.pause_after, 1.0);

        let bad = ScenarioDescriptor::new("5", "bad", ExpectedOutcome::Valid)
            .unwrap()
            .with_timing(SequenceTiming {
                digit_duration: 0.0,
                gap_duration: 0.1,
                pause_after: 0.5,
            });
        assert!(matches!(TestPlan::new(vec![bad]), Err(Error::InvalidDuration(_))));
    }

    #[test]
    fn test_load_json_plan() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let json = serde_json::to_string(&TestPlan::reference()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let plan = TestPlan::load_from_file(file.path()).unwrap();
        assert_eq!(plan, TestPlan::reference());
    }

    #[test]
    fn test_load_rejects_bad_plans() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"scenarios":[{{"pin":"12x","label":"x","outcome":"valid"}}]}}"#).unwrap();
        assert!(TestPlan::load_from_file(file.path()).is_err());

        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(TestPlan::load_from_file(file.path()), Err(Error::Parse(_))));
    }

    #[test]
    fn test_check_against_reference_directory() {
        let directory = PinDirectory::parse(
            "; reference codes\n1234=open_door\n5678=unlock_garage\n9999=emergency_shutdown\n\
             0000=admin_mode\n*A1B=special_code\nC23D=commented_example\nABC#=hello_world\n",
        );
        let issues = TestPlan::reference().check_against(&directory);

        // "12345" completes open_door before its fifth digit is keyed
        assert_eq!(
            issues,
            vec![PlanIssue::EarlyMatch {
                index: 10,
                pin: "12345".parse().unwrap(),
                prefix: "1234".parse().unwrap(),
                function: "open_door".to_string(),
            }]
        );
    }

    #[test]
    fn test_check_against_reports_conflicts() {
        let directory = PinDirectory::parse("12=short_code\n2=single\n1111=oops\n");
        let issues = TestPlan::reference().check_against(&directory);

        assert!(issues.contains(&PlanIssue::ValidPinNotConfigured {
            index: 1,
            pin: "5678".parse().unwrap(),
        }));
        assert!(issues.contains(&PlanIssue::UnexpectedMatch {
            index: 7,
            pin: "1111".parse().unwrap(),
            function: "oops".to_string(),
        }));
        assert!(issues.contains(&PlanIssue::EarlyMatch {
            index: 0,
            pin: "1234".parse().unwrap(),
            prefix: "12".parse().unwrap(),
            function: "short_code".to_string(),
        }));
        assert!(issues.contains(&PlanIssue::UnexpectedMatch {
            index: 13,
            pin: "2".parse().unwrap(),
            function: "single".to_string(),
        }));
    }
}
