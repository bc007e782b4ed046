//! Probability vectors and the diagnosis-to-risk reduction.

use crate::constants::{DIAGNOSIS_CLASS_COUNT, PROBABILITY_SUM_TOLERANCE, RISK_LEVEL_COUNT};
use crate::taxonomy::DANGER_SURJECTION;
use crate::{TriageError, TriageResult};

/// Classifier output: one probability per diagnosis class, in taxonomy order.
///
/// Construction checks the simplex constraints, so a value of this type always has exactly
/// [`DIAGNOSIS_CLASS_COUNT`] finite entries in `[0, 1]` whose sum is 1 within
/// [`PROBABILITY_SUM_TOLERANCE`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationVector([f64; DIAGNOSIS_CLASS_COUNT]);

impl ClassificationVector {
    /// # Errors
    ///
    /// Returns [`TriageError::Prediction`] if the slice has the wrong length, contains a
    /// non-finite value or a value outside `[0, 1]`, or does not sum to 1.
    pub fn new(probabilities: &[f64]) -> TriageResult<Self> {
        let values: [f64; DIAGNOSIS_CLASS_COUNT] = probabilities.try_into().map_err(|_| {
            TriageError::Prediction(format!(
                "classifier returned {} probabilities, expected {}",
                probabilities.len(),
                DIAGNOSIS_CLASS_COUNT
            ))
        })?;

        if let Some((i, p)) = values
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || !(0.0..=1.0).contains(*p))
        {
            return Err(TriageError::Prediction(format!(
                "classifier probability {p} at index {i} is outside [0, 1]"
            )));
        }

        let sum: f64 = values.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(TriageError::Prediction(format!(
                "classifier probabilities sum to {sum}, expected 1"
            )));
        }

        Ok(Self(values))
    }

    pub fn probabilities(&self) -> &[f64; DIAGNOSIS_CLASS_COUNT] {
        &self.0
    }

    /// Index of the most probable class; ties go to the lowest index.
    pub fn argmax(&self) -> usize {
        argmax(&self.0)
    }
}

/// Probability mass per risk level, in risk taxonomy order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskVector([f64; RISK_LEVEL_COUNT]);

impl RiskVector {
    pub fn probabilities(&self) -> &[f64; RISK_LEVEL_COUNT] {
        &self.0
    }

    /// Level holding the most aggregated mass; ties go to the lowest level.
    pub fn argmax(&self) -> usize {
        argmax(&self.0)
    }
}

/// Reduce a classification vector to a risk vector.
///
/// Every diagnosis class contributes its full probability to the bucket given by
/// [`DANGER_SURJECTION`]. Buckets are summed, so the total mass is preserved.
pub fn aggregate(classification: &ClassificationVector) -> RiskVector {
    let mut risk = [0.0; RISK_LEVEL_COUNT];
    for (index, p) in classification.0.iter().enumerate() {
        risk[DANGER_SURJECTION[index]] += p;
    }
    RiskVector(risk)
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
