//! Prediction result types.
//!
//! Each submission yields one prediction per risk target (CKD status and
//! dialysis need). A prediction is a class label plus the positive-class
//! probability reported by the forest.

use serde::{Deserialize, Serialize};

use super::PatientRecord;

/// What a model predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTarget {
    /// Chronic kidney disease status
    Ckd,
    /// Need for dialysis
    Dialysis,
}

impl RiskTarget {
    /// Section title for the results view.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Ckd => "CKD Prediction",
            Self::Dialysis => "Dialysis Risk Prediction",
        }
    }

    /// Label used next to the formatted probability.
    #[must_use]
    pub fn probability_label(&self) -> &'static str {
        match self {
            Self::Ckd => "CKD Probability",
            Self::Dialysis => "Dialysis Probability",
        }
    }

    /// Message shown for a given label.
    #[must_use]
    pub fn message(&self, label: u8) -> &'static str {
        match (self, label) {
            (Self::Ckd, 1) => "High risk of Chronic Kidney Disease detected.",
            (Self::Ckd, _) => "No signs of CKD detected at this time.",
            (Self::Dialysis, 1) => {
                "Patient is at high risk of requiring dialysis based on current indicators."
            }
            (Self::Dialysis, _) => "No immediate indication of dialysis need.",
        }
    }

    /// Badge for a given label.
    ///
    /// Label 0 is always `Positive`; label 1 is `Negative` for CKD and
    /// `Warning` for dialysis.
    #[must_use]
    pub fn badge(&self, label: u8) -> Badge {
        match (self, label) {
            (Self::Ckd, 1) => Badge::Negative,
            (Self::Dialysis, 1) => Badge::Warning,
            _ => Badge::Positive,
        }
    }
}

impl std::fmt::Display for RiskTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ckd => write!(f, "ckd_status"),
            Self::Dialysis => write!(f, "dialysis_needed"),
        }
    }
}

/// Visual risk badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Badge {
    /// No risk indicated
    Positive,
    /// High risk
    Negative,
    /// Elevated risk, action may be needed
    Warning,
}

impl Badge {
    /// Short marker rendered in front of the message.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Positive => "OK",
            Self::Negative => "!!",
            Self::Warning => "!",
        }
    }

    /// Associated color for TUI display (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Positive => (16, 185, 129), // Emerald (#10B981)
            Self::Warning => (251, 191, 36),  // Amber (#FBBF24)
            Self::Negative => (244, 63, 94),  // Rose (#F43F5E)
        }
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "POSITIVE"),
            Self::Negative => write!(f, "NEGATIVE"),
            Self::Warning => write!(f, "WARNING"),
        }
    }
}

/// Output of one binary classifier for one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Class label (0 = negative class, 1 = positive class)
    pub label: u8,

    /// Probability of the positive class (0.0 to 1.0)
    pub probability: f64,
}

impl Prediction {
    /// Build a prediction from the positive-class probability.
    ///
    /// Label is the argmax over the two classes; a tie resolves to class 0.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        let label = if probability > 1.0 - probability { 1 } else { 0 };
        Self { label, probability }
    }

    /// Probability formatted as a percentage.
    #[must_use]
    pub fn formatted_probability(&self) -> String {
        format_probability(self.probability)
    }
}

/// Format a probability as a percentage with two decimals, e.g. `0.4567`
/// becomes `"45.67%"`.
#[must_use]
pub fn format_probability(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Result of one submission: the record and both predictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// The clamped record that was scored
    pub record: PatientRecord,

    /// CKD status prediction
    pub ckd: Prediction,

    /// Dialysis need prediction
    pub dialysis: Prediction,

    /// When the assessment was computed
    pub assessed_at: chrono::DateTime<chrono::Utc>,
}

impl Assessment {
    #[must_use]
    pub fn new(record: PatientRecord, ckd: Prediction, dialysis: Prediction) -> Self {
        Self {
            record,
            ckd,
            dialysis,
            assessed_at: chrono::Utc::now(),
        }
    }

    /// Predictions paired with their targets, in display order.
    #[must_use]
    pub fn predictions(&self) -> [(RiskTarget, Prediction); 2] {
        [(RiskTarget::Ckd, self.ckd), (RiskTarget::Dialysis, self.dialysis)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_probability() {
        assert_eq!(Prediction::from_probability(0.1).label, 0);
        assert_eq!(Prediction::from_probability(0.5).label, 0);
        assert_eq!(Prediction::from_probability(0.51).label, 1);
        assert_eq!(Prediction::from_probability(1.0).label, 1);
    }

    #[test]
    fn test_badge_depends_only_on_label() {
        assert_eq!(RiskTarget::Ckd.badge(0), Badge::Positive);
        assert_eq!(RiskTarget::Dialysis.badge(0), Badge::Positive);
        assert_eq!(RiskTarget::Ckd.badge(1), Badge::Negative);
        assert_eq!(RiskTarget::Dialysis.badge(1), Badge::Warning);
    }

    #[test]
    fn test_format_probability() {
        assert_eq!(format_probability(0.0), "0.00%");
        assert_eq!(format_probability(1.0), "100.00%");
        assert_eq!(format_probability(0.4567), "45.67%");
        assert_eq!(format_probability(0.987654), "98.77%");
    }

    #[test]
    fn test_target_display_is_model_column() {
        assert_eq!(RiskTarget::Ckd.to_string(), "ckd_status");
        assert_eq!(RiskTarget::Dialysis.to_string(), "dialysis_needed");
    }

    #[test]
    fn test_format_probability_half_cent() {
        // 0.015 is stored just below the half, so it rounds down.
        assert_eq!(format_probability(0.00015), "0.01%");
        assert_eq!(Prediction::from_probability(0.00015).formatted_probability(), "0.01%");
    }

    #[test]
    fn test_formatted_probability_is_two_decimal_percentage() {
        for i in 0..=200_000 {
            let p = f64::from(i) / 200_000.0;
            let rendered = format_probability(p);
            assert_eq!(rendered, format!("{:.2}%", p * 100.0));

            let digits = rendered.trim_end_matches('%');
            assert_eq!(digits.split_once('.').map(|(_, d)| d.len()), Some(2));
            let parsed: f64 = digits.parse().expect("Should parse percentage");
            assert!(
                (parsed - p * 100.0).abs() <= 0.005 + 1e-9,
                "{p} rendered as {rendered}"
            );
        }
    }

    #[test]
    fn test_assessment_predictions_order() {
        let assessment = Assessment::new(
            PatientRecord::default(),
            Prediction::from_probability(0.8),
            Prediction::from_probability(0.2),
        );
        let [(first, ckd), (second, dialysis)] = assessment.predictions();
        assert_eq!(first, RiskTarget::Ckd);
        assert_eq!(second, RiskTarget::Dialysis);
        assert_eq!(ckd.label, 1);
        assert_eq!(dialysis.label, 0);
    }
}
