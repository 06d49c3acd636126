//! Pass/fail checks over a finished scenario

use serde::Serialize;

use crate::framework::ScenarioResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ValidationSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub validator: &'static str,
    pub passed: bool,
    pub message: String,
    pub severity: ValidationSeverity,
}

impl ValidationResult {
    fn check(
        validator: &'static str,
        passed: bool,
        severity: ValidationSeverity,
        message: String,
    ) -> Self {
        Self {
            validator,
            passed,
            message,
            severity,
        }
    }

    /// Failed at error severity
    pub fn is_fatal(&self) -> bool {
        !self.passed && self.severity >= ValidationSeverity::Error
    }
}

/// Run every check against `result`
pub fn validate(result: &ScenarioResult) -> Vec<ValidationResult> {
    let publish = &result.publish;
    let receive = &result.receive;
    let publish_samples = publish.summary.as_ref().map_or(0, |s| s.count);

    vec![
        ValidationResult::check(
            "all_delivered",
            publish.delivered == result.expected,
            ValidationSeverity::Error,
            format!("{}/{} acknowledged", publish.delivered, result.expected),
        ),
        ValidationResult::check(
            "all_received",
            receive.received == u64::from(publish.delivered),
            ValidationSeverity::Error,
            format!("{} decoded of {} delivered", receive.received, publish.delivered),
        ),
        ValidationResult::check(
            "no_decode_failures",
            receive.decode_failures == 0,
            ValidationSeverity::Error,
            format!("{} payloads rejected", receive.decode_failures),
        ),
        ValidationResult::check(
            "one_sample_per_delivery",
            publish_samples == publish.delivered as usize,
            ValidationSeverity::Error,
            format!("{} publish samples", publish_samples),
        ),
        ValidationResult::check(
            "receive_latency_non_negative",
            receive.summary.as_ref().map_or(true, |s| s.min >= 0.0),
            ValidationSeverity::Warning,
            "negative receive latency means the clocks disagree".to_string(),
        ),
    ]
}

/// True when no check failed at error severity
pub fn all_passed(results: &[ValidationResult]) -> bool {
    !results.iter().any(ValidationResult::is_fatal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_do_not_fail() {
        let results = vec![
            ValidationResult::check("a", true, ValidationSeverity::Error, String::new()),
            ValidationResult::check("b", false, ValidationSeverity::Warning, String::new()),
        ];
        assert!(all_passed(&results));

        let failed = ValidationResult::check("c", false, ValidationSeverity::Error, String::new());
        assert!(failed.is_fatal());
        assert!(!all_passed(&[failed]));
    }
}
