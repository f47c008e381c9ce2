use crate::engine::policy::SeverityPolicy;
use crate::models::anomaly::Severity;
use crate::models::attendance::{AttendanceStatus, FactorResults};

/// Attempt count beyond which severity escalates under the simplified policy.
const MEDIUM_ATTEMPT_THRESHOLD: i32 = 2;

/// Attempt count beyond which the proxy-prevention escalation fires.
const ESCALATION_ATTEMPT_THRESHOLD: i32 = 3;

/// An anomaly event waiting to be persisted.
#[derive(Debug, Clone)]
pub struct AnomalyDraft {
    pub reason: String,
    pub severity: Severity,
    pub details: serde_json::Value,
}

/// Context for one inspected attempt.
pub struct AttemptContext<'a> {
    /// Attempt number for this pair, counting the current submission.
    pub attempts: i32,
    /// Per-factor results of the current attempt.
    pub results: &'a FactorResults,
    /// Failure reasons accumulated by the pipeline.
    pub reasons: &'a [String],
    /// Device fingerprint from the submission, if any.
    pub device_hash: Option<&'a str>,
    /// IP fingerprint from the submission, if any.
    pub ip_hash: Option<&'a str>,
}

/// Inspects one decided attempt and plans the anomaly events to record.
///
/// Purely observational: the decision is never altered, only audited. A
/// MARKED outcome never produces events. Under the graduated policy a
/// student stuck past the escalation threshold additionally triggers a
/// separate HIGH event, independent of which factor keeps failing; this is
/// the proxy-prevention signal.
pub fn plan_anomalies(
    status: AttendanceStatus,
    policy: SeverityPolicy,
    ctx: &AttemptContext<'_>,
) -> Vec<AnomalyDraft> {
    if status == AttendanceStatus::Marked {
        return Vec::new();
    }

    let mut drafts = Vec::new();

    if policy == SeverityPolicy::Graduated && ctx.attempts > ESCALATION_ATTEMPT_THRESHOLD {
        drafts.push(AnomalyDraft {
            reason: "Too many failed verification attempts".to_string(),
            severity: Severity::High,
            details: serde_json::json!({
                "attempts": ctx.attempts,
                "anomalies": ctx.reasons,
            }),
        });
    }

    let severity = match policy {
        SeverityPolicy::Graduated => {
            if status == AttendanceStatus::Flagged {
                Severity::Medium
            } else {
                Severity::Low
            }
        }
        SeverityPolicy::FailedOnly => {
            if ctx.attempts > MEDIUM_ATTEMPT_THRESHOLD {
                Severity::Medium
            } else {
                Severity::Low
            }
        }
    };

    drafts.push(AnomalyDraft {
        reason: ctx.reasons.join(", "),
        severity,
        details: serde_json::json!({
            "results": ctx.results,
            "deviceHash": ctx.device_hash,
            "ipHash": ctx.ip_hash,
        }),
    });

    drafts
}
