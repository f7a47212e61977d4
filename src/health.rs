//! Threshold labels for rates and composite health indicators.

use serde::{Deserialize, Serialize};

/// Composite indicators computed upstream and passed through as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthIndicators {
    pub health_score: i64,
    pub compliance_issues: i64,
    pub error_rate: i64,
    pub department_coverage: i64,
}

impl HealthIndicators {
    pub fn label(&self) -> HealthLabel {
        HealthLabel::from_score(self.health_score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLabel {
    Excellent,
    Good,
    NeedsAttention,
}

impl HealthLabel {
    pub fn from_score(score: i64) -> Self {
        if score >= 80 {
            HealthLabel::Excellent
        } else if score >= 60 {
            HealthLabel::Good
        } else {
            HealthLabel::NeedsAttention
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLabel::Excellent => "excellent",
            HealthLabel::Good => "good",
            HealthLabel::NeedsAttention => "needs attention",
        }
    }
}

/// Three-tier classification used for adoption, success and error rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdoptionTier {
    /// Below 50%.
    Critical,
    /// 50% to 79%.
    Warning,
    /// 80% and above.
    Healthy,
}

impl AdoptionTier {
    pub fn from_rate(rate: i64) -> Self {
        match rate {
            r if r >= 80 => AdoptionTier::Healthy,
            r if r >= 50 => AdoptionTier::Warning,
            _ => AdoptionTier::Critical,
        }
    }

    /// Tier for a failure percentage, read as the share that succeeded.
    pub fn from_error_rate(error_rate: i64) -> Self {
        Self::from_rate(100 - error_rate)
    }

    /// Rates in the critical tier get an attention banner.
    pub fn needs_attention(&self) -> bool {
        matches!(self, AdoptionTier::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdoptionTier::Critical => "critical",
            AdoptionTier::Warning => "warning",
            AdoptionTier::Healthy => "healthy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_labels_follow_thresholds() {
        assert_eq!(HealthLabel::from_score(100), HealthLabel::Excellent);
        assert_eq!(HealthLabel::from_score(80), HealthLabel::Excellent);
        assert_eq!(HealthLabel::from_score(79), HealthLabel::Good);
        assert_eq!(HealthLabel::from_score(60), HealthLabel::Good);
        assert_eq!(HealthLabel::from_score(59), HealthLabel::NeedsAttention);
        assert_eq!(HealthLabel::from_score(0), HealthLabel::NeedsAttention);
    }

    #[test]
    fn adoption_tiers_split_at_50_and_80() {
        assert_eq!(AdoptionTier::from_rate(0), AdoptionTier::Critical);
        assert_eq!(AdoptionTier::from_rate(49), AdoptionTier::Critical);
        assert_eq!(AdoptionTier::from_rate(50), AdoptionTier::Warning);
        assert_eq!(AdoptionTier::from_rate(79), AdoptionTier::Warning);
        assert_eq!(AdoptionTier::from_rate(80), AdoptionTier::Healthy);
        assert!(AdoptionTier::from_rate(12).needs_attention());
        assert!(!AdoptionTier::from_rate(50).needs_attention());
    }

    #[test]
    fn error_rates_use_the_complement() {
        assert_eq!(AdoptionTier::from_error_rate(0), AdoptionTier::Healthy);
        assert_eq!(AdoptionTier::from_error_rate(20), AdoptionTier::Healthy);
        assert_eq!(AdoptionTier::from_error_rate(21), AdoptionTier::Warning);
        assert_eq!(AdoptionTier::from_error_rate(50), AdoptionTier::Warning);
        assert_eq!(AdoptionTier::from_error_rate(51), AdoptionTier::Critical);
    }

    #[test]
    fn indicators_pass_through_unchanged() {
        let indicators = HealthIndicators {
            health_score: 64,
            compliance_issues: 3,
            error_rate: 7,
            department_coverage: 90,
        };
        assert_eq!(indicators.label(), HealthLabel::Good);
        assert_eq!(indicators.error_rate, 7);
    }
}
