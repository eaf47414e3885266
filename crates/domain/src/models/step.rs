//! Step outcomes for the provisioning and configuration pipelines.

use serde::{Deserialize, Serialize};

/// Result of a single pipeline step.
///
/// Control-plane commands never fail the request on their own: a non-zero
/// exit becomes `SoftFailed` and the pipeline carries on. Conditions that
/// stop the pipeline are errors, not outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Ok(String),
    SoftFailed(String),
}

impl StepOutcome {
    pub fn ok(detail: impl Into<String>) -> Self {
        StepOutcome::Ok(detail.into())
    }

    pub fn soft(reason: impl Into<String>) -> Self {
        StepOutcome::SoftFailed(reason.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StepOutcome::Ok(_))
    }

    pub fn detail(&self) -> &str {
        match self {
            StepOutcome::Ok(d) | StepOutcome::SoftFailed(d) => d,
        }
    }
}

/// A named step and its outcome, in pipeline order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl StepReport {
    pub fn new(step: impl Into<String>, outcome: StepOutcome) -> Self {
        Self {
            step: step.into(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_outcome_serialization() {
        let json = serde_json::to_value(StepOutcome::soft("dummy created")).unwrap();
        assert_eq!(json["status"], "soft_failed");
        assert_eq!(json["detail"], "dummy created");
    }

    #[test]
    fn test_step_report_flattens_outcome() {
        let report = StepReport::new("theme", StepOutcome::ok("woostify active"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["step"], "theme");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["detail"], "woostify active");
    }

    #[test]
    fn test_step_outcome_predicates() {
        assert!(StepOutcome::ok("x").is_ok());
        assert!(!StepOutcome::soft("x").is_ok());
        assert_eq!(StepOutcome::soft("plugin missing").detail(), "plugin missing");
    }
}
