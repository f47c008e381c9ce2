use crate::engine::policy::SeverityPolicy;
use crate::models::attendance::{AttendanceStatus, FactorResults};

/// Reduces per-factor results and the failure reasons into one status.
///
/// Success is all-or-nothing: every evaluated factor must have passed.
/// On failure the severity policy decides between graduated classification
/// (two or more reasons signal multi-factor compromise and become FLAGGED)
/// and the simplified mapping where any failure is FAILED.
pub fn decide(
    results: &FactorResults,
    reasons: &[String],
    severity: SeverityPolicy,
) -> AttendanceStatus {
    if results.is_success() {
        return AttendanceStatus::Marked;
    }

    match severity {
        SeverityPolicy::Graduated if reasons.len() > 1 => AttendanceStatus::Flagged,
        _ => AttendanceStatus::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance::FaceCheck;

    fn failing(face: bool, id_card: bool, liveness: bool) -> FactorResults {
        FactorResults {
            face: FaceCheck {
                success: face,
                confidence: if face { 100.0 } else { 10.0 },
            },
            fingerprint: true,
            id_card,
            liveness,
        }
    }

    #[test]
    fn all_passing_is_marked_under_both_policies() {
        let results = FactorResults::all_passing();
        assert_eq!(
            decide(&results, &[], SeverityPolicy::Graduated),
            AttendanceStatus::Marked
        );
        assert_eq!(
            decide(&results, &[], SeverityPolicy::FailedOnly),
            AttendanceStatus::Marked
        );
    }

    #[test]
    fn single_failure_is_failed_under_both_policies() {
        let results = failing(true, false, true);
        let reasons = vec!["Invalid Session Token".to_string()];
        assert_eq!(
            decide(&results, &reasons, SeverityPolicy::Graduated),
            AttendanceStatus::Failed
        );
        assert_eq!(
            decide(&results, &reasons, SeverityPolicy::FailedOnly),
            AttendanceStatus::Failed
        );
    }

    #[test]
    fn multiple_failures_are_flagged_only_under_graduated() {
        let results = failing(false, false, true);
        let reasons = vec![
            "Face mismatch".to_string(),
            "Invalid Session Token".to_string(),
        ];
        assert_eq!(
            decide(&results, &reasons, SeverityPolicy::Graduated),
            AttendanceStatus::Flagged
        );
        assert_eq!(
            decide(&results, &reasons, SeverityPolicy::FailedOnly),
            AttendanceStatus::Failed
        );
    }

    #[test]
    fn face_subresult_gates_success() {
        let results = failing(false, true, true);
        let reasons = vec!["Face mismatch".to_string()];
        assert_eq!(
            decide(&results, &reasons, SeverityPolicy::Graduated),
            AttendanceStatus::Failed
        );
    }
}
