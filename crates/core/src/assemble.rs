//! Result assembly.
//!
//! Combines a validated classification vector with the patient metadata into a
//! [`PredictionResult`]. The reported risk level follows the single most likely diagnosis;
//! its confidence is the aggregated mass of that diagnosis's risk bucket.

use crate::aggregate::{aggregate, ClassificationVector};
use crate::result::{
    DiagnosisInfo, DiagnosisProbability, MetadataInfo, PredictionResult, Probabilities, RiskInfo,
    RiskLevelInfo, RiskProbability,
};
use crate::taxonomy::{DIAGNOSIS_CLASSES, RISK_LEVELS};
use crate::validation::PatientMetadata;

/// Build the structured result for one classifier output.
pub fn assemble(
    classification: &ClassificationVector,
    metadata: &PatientMetadata,
) -> PredictionResult {
    let probs = classification.probabilities();
    let risk_vector = aggregate(classification);

    let winner = &DIAGNOSIS_CLASSES[classification.argmax()];
    let diagnosis_confidence = probs[winner.index];

    let risk_level = winner.risk();
    let risk_confidence = risk_vector.probabilities()[usize::from(risk_level.level)];
    let dominant = risk_vector.argmax();

    tracing::debug!(
        diagnosis = winner.code,
        diagnosis_confidence,
        risk_level = risk_level.level,
        risk_confidence,
        dominant_risk_level = dominant,
        "assembled prediction"
    );

    let diagnosis = DiagnosisInfo {
        class: winner.index,
        name: winner.code.to_owned(),
        full_name: winner.full_name.to_owned(),
        description: winner.description.to_owned(),
        confidence: diagnosis_confidence,
    };

    let risk = RiskInfo {
        level: risk_level.level,
        name: risk_level.name.to_owned(),
        description: risk_level.description.to_owned(),
        recommendation: risk_level.recommendation.to_owned(),
        color: risk_level.color,
        urgency: risk_level.urgency,
        confidence: risk_confidence,
    };

    let metadata = MetadataInfo::from(metadata);

    let diagnosis_breakdown = DIAGNOSIS_CLASSES
        .iter()
        .zip(probs.iter())
        .map(|(d, p)| DiagnosisProbability {
            class: d.index,
            diagnosis: d.code.to_owned(),
            full_name: d.full_name.to_owned(),
            description: d.description.to_owned(),
            probability: *p,
            risk_level: d.risk().level,
        })
        .collect();

    let risk_breakdown = RISK_LEVELS
        .iter()
        .zip(risk_vector.probabilities().iter())
        .map(|(r, p)| RiskProbability {
            level: r.level,
            probability: *p,
            risk_info: RiskLevelInfo::from(r),
        })
        .collect();

    PredictionResult {
        diagnosis,
        risk,
        metadata,
        probabilities: Probabilities {
            diagnosis: diagnosis_breakdown,
            risk: risk_breakdown,
            dominant_risk_level: RISK_LEVELS[dominant].level,
        },
    }
}
