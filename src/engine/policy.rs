use serde::{Deserialize, Serialize};

/// Face similarity threshold policy.
///
/// The source rules evolved between a strict cutoff and a relaxed one that
/// also performs first-use enrollment; both remain selectable per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceThresholdPolicy {
    /// Similarity must exceed 85.
    Strict,
    /// Similarity must exceed 60; an empty profile adopts the submitted
    /// vector before scoring (first-use enrollment).
    #[default]
    Relaxed,
}

impl FaceThresholdPolicy {
    /// The similarity percentage the face factor must exceed.
    pub fn threshold(&self) -> f64 {
        match self {
            FaceThresholdPolicy::Strict => 85.0,
            FaceThresholdPolicy::Relaxed => 60.0,
        }
    }

    /// Whether a missing profile vector is adopted from the submission.
    pub fn enrolls_on_first_use(&self) -> bool {
        matches!(self, FaceThresholdPolicy::Relaxed)
    }
}

/// Session token comparison policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenMatchPolicy {
    /// Constant-time byte equality.
    Exact,
    /// Trimmed, case-insensitive equality.
    #[default]
    Lenient,
}

/// Liveness check policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessPolicy {
    /// Deterministic: submitted blink count must be at least 2.
    #[default]
    BlinkCount,
    /// Legacy: passes with 95% probability from the injected RNG.
    Randomized,
}

/// How failures map onto an overall status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityPolicy {
    /// One failure reason yields FAILED, two or more yield FLAGGED, and
    /// repeated attempts escalate to a separate HIGH anomaly.
    #[default]
    Graduated,
    /// Any failure yields FAILED; attempt count alone drives severity.
    FailedOnly,
}

/// The complete rule variant a session runs under, resolved when the
/// session is created and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationPolicy {
    pub face: FaceThresholdPolicy,
    pub token: TokenMatchPolicy,
    pub liveness: LivenessPolicy,
    pub severity: SeverityPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_the_recommended_variant() {
        let policy = VerificationPolicy::default();
        assert_eq!(policy.face, FaceThresholdPolicy::Relaxed);
        assert_eq!(policy.token, TokenMatchPolicy::Lenient);
        assert_eq!(policy.liveness, LivenessPolicy::BlinkCount);
        assert_eq!(policy.severity, SeverityPolicy::Graduated);
    }

    #[test]
    fn thresholds_match_the_observed_variants() {
        assert_eq!(FaceThresholdPolicy::Strict.threshold(), 85.0);
        assert_eq!(FaceThresholdPolicy::Relaxed.threshold(), 60.0);
        assert!(!FaceThresholdPolicy::Strict.enrolls_on_first_use());
        assert!(FaceThresholdPolicy::Relaxed.enrolls_on_first_use());
    }

    #[test]
    fn policy_deserializes_from_partial_json() {
        let policy: VerificationPolicy =
            serde_json::from_str(r#"{"face":"strict","severity":"failed_only"}"#).unwrap();
        assert_eq!(policy.face, FaceThresholdPolicy::Strict);
        assert_eq!(policy.severity, SeverityPolicy::FailedOnly);
        assert_eq!(policy.token, TokenMatchPolicy::Lenient);
    }
}
