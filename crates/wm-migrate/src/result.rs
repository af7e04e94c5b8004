//! Step and run results

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;
use wm_core::MigrationStep;

/// Outcome of one migration step
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// Step identifier
    pub step_id: String,

    /// Human-readable step name
    pub step_name: String,

    /// SHA-256 of the step SQL
    pub checksum: String,

    /// False only when the step failed
    pub success: bool,

    /// True when the step SQL was not executed in this run
    pub skipped: bool,

    /// True when the journal checksum differed and the probe reported the
    /// step as present
    pub drift_detected: bool,

    /// Wall time spent on the step
    pub duration_ms: u64,

    /// Error text for failures, or a note for drift and adoption
    pub message: Option<String>,
}

impl StepResult {
    fn new(step: &MigrationStep, checksum: &str, duration: Duration) -> Self {
        Self {
            step_id: step.id.to_string(),
            step_name: step.name.clone(),
            checksum: checksum.to_string(),
            success: true,
            skipped: false,
            drift_detected: false,
            duration_ms: duration_ms(duration),
            message: None,
        }
    }

    /// Step SQL was executed and committed
    pub fn applied(step: &MigrationStep, checksum: &str, duration: Duration) -> Self {
        Self::new(step, checksum, duration)
    }

    /// Step SQL was not executed
    pub fn skipped(step: &MigrationStep, checksum: &str, duration: Duration) -> Self {
        Self {
            skipped: true,
            ..Self::new(step, checksum, duration)
        }
    }

    /// Step failed and was rolled back
    pub fn failed(
        step: &MigrationStep,
        checksum: &str,
        duration: Duration,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::new(step, checksum, duration)
        }
    }

    pub fn with_drift(mut self) -> Self {
        self.drift_detected = true;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Executed in this run
    pub fn is_applied(&self) -> bool {
        self.success && !self.skipped
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub steps_applied: usize,
    pub steps_skipped: usize,
    pub steps_failed: usize,
    pub steps_with_drift: usize,
    pub total_duration_ms: u64,
    pub results: Vec<StepResult>,
}

impl MigrationResult {
    /// Build the summary from per-step results, keeping their order
    pub fn from_results(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        results: Vec<StepResult>,
        total_duration: Duration,
    ) -> Self {
        let steps_applied = results.iter().filter(|r| r.is_applied()).count();
        let steps_skipped = results.iter().filter(|r| r.skipped).count();
        let steps_failed = results.iter().filter(|r| !r.success).count();
        let steps_with_drift = results.iter().filter(|r| r.drift_detected).count();

        Self {
            run_id,
            started_at,
            steps_applied,
            steps_skipped,
            steps_failed,
            steps_with_drift,
            total_duration_ms: duration_ms(total_duration),
            results,
        }
    }

    /// True when no step failed
    pub fn is_success(&self) -> bool {
        self.steps_failed == 0
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.total_duration_ms)
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wm_core::StepId;

    fn step(id: &str) -> MigrationStep {
        MigrationStep {
            id: StepId::try_new(id).unwrap(),
            name: format!("step {}", id),
            check_sql: None,
            sql: "SELECT 1".to_string(),
        }
    }

    #[test]
    fn test_counts() {
        let results = vec![
            StepResult::applied(&step("1"), "a", Duration::from_millis(5)),
            StepResult::skipped(&step("2"), "b", Duration::ZERO),
            StepResult::skipped(&step("3"), "c", Duration::ZERO).with_drift(),
            StepResult::applied(&step("4"), "d", Duration::ZERO).with_drift(),
            StepResult::failed(&step("5"), "e", Duration::ZERO, "boom"),
        ];
        let summary = MigrationResult::from_results(
            Uuid::new_v4(),
            Utc::now(),
            results,
            Duration::from_millis(42),
        );

        assert_eq!(summary.steps_applied, 2);
        assert_eq!(summary.steps_skipped, 2);
        assert_eq!(summary.steps_failed, 1);
        assert_eq!(summary.steps_with_drift, 2);
        assert_eq!(summary.total_duration(), Duration::from_millis(42));
        assert!(!summary.is_success());
        assert_eq!(summary.results[4].message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_empty_run_is_success() {
        let summary =
            MigrationResult::from_results(Uuid::new_v4(), Utc::now(), vec![], Duration::ZERO);
        assert!(summary.is_success());
        assert_eq!(summary.steps_applied, 0);
    }

    #[test]
    fn test_serializes_to_json() {
        let result = StepResult::applied(&step("007"), "abc", Duration::from_millis(3));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["step_id"], "007");
        assert_eq!(json["duration_ms"], 3);
        assert_eq!(json["message"], serde_json::Value::Null);
    }
}
