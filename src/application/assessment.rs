//! Assessment service: scores one patient record against both models.
//!
//! One synchronous call per submission: clamp the record, build the feature
//! vector once, ask each classifier once. No retry, caching or batching.

use std::sync::Arc;

use crate::domain::{Assessment, PatientRecord, RiskTarget};
use crate::ports::BinaryClassifier;

/// Status line for one loaded model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSummary {
    pub target: RiskTarget,
    pub name: String,
    pub fingerprint: Option<String>,
}

/// Service holding the two read-only classifiers.
pub struct AssessmentService<C>
where
    C: BinaryClassifier,
{
    ckd: Arc<C>,
    dialysis: Arc<C>,
}

impl<C> AssessmentService<C>
where
    C: BinaryClassifier,
{
    /// Create a new assessment service.
    pub fn new(ckd: Arc<C>, dialysis: Arc<C>) -> Self {
        Self { ckd, dialysis }
    }

    /// Score a record with both models.
    ///
    /// The record is clamped into its clinical domain first; the returned
    /// assessment carries the clamped record.
    ///
    /// # Errors
    /// Returns `NephrocheckError::Model` if either classifier fails.
    pub fn assess(&self, record: PatientRecord) -> crate::Result<Assessment> {
        let record = record.clamped();
        let features = record.to_features();

        let ckd = self.ckd.predict(&features)?;
        let dialysis = self.dialysis.predict(&features)?;

        let assessment = Assessment::new(record, ckd, dialysis);
        for (target, prediction) in assessment.predictions() {
            tracing::info!(
                "Assessment complete: {target} label={} p={:.4}",
                prediction.label,
                prediction.probability
            );
        }

        Ok(assessment)
    }

    /// Names and fingerprints of the loaded models.
    #[must_use]
    pub fn model_summaries(&self) -> [ModelSummary; 2] {
        let summary = |target: RiskTarget, model: &C| ModelSummary {
            target,
            name: model.name().to_string(),
            fingerprint: model.fingerprint().map(str::to_string),
        };
        [
            summary(RiskTarget::Ckd, self.ckd.as_ref()),
            summary(RiskTarget::Dialysis, self.dialysis.as_ref()),
        ]
    }
}
