//! Result types returned to callers of the triage engine.
//!
//! Each entity gets its own struct so the serialised response shape is fixed and documented
//! (the REST layer exposes these through OpenAPI).

use crate::codec::{CategoricalField, CategoryEntry};
use crate::taxonomy::{DiagnosisClass, RiskColor, RiskLevel, Urgency};
use crate::validation::PatientMetadata;
use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Selectable value of a categorical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryOption {
    pub name: String,
    pub code: u8,
    pub description: String,
}

impl From<&CategoryEntry> for CategoryOption {
    fn from(e: &CategoryEntry) -> Self {
        Self {
            name: e.name.to_owned(),
            code: e.code,
            description: e.description.to_owned(),
        }
    }
}

/// Catalogue entry for a diagnosis class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DiagnosisClassInfo {
    pub class: usize,
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub risk_level: u8,
}

impl From<&DiagnosisClass> for DiagnosisClassInfo {
    fn from(d: &DiagnosisClass) -> Self {
        Self {
            class: d.index,
            name: d.code.to_owned(),
            full_name: d.full_name.to_owned(),
            description: d.description.to_owned(),
            risk_level: d.risk().level,
        }
    }
}

/// Catalogue entry for a risk level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RiskLevelInfo {
    pub level: u8,
    pub name: String,
    pub description: String,
    pub recommendation: String,
    pub color: RiskColor,
    pub urgency: Urgency,
}

impl From<&RiskLevel> for RiskLevelInfo {
    fn from(r: &RiskLevel) -> Self {
        Self {
            level: r.level,
            name: r.name.to_owned(),
            description: r.description.to_owned(),
            recommendation: r.recommendation.to_owned(),
            color: r.color,
            urgency: r.urgency,
        }
    }
}

/// The winning diagnosis of a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiagnosisInfo {
    pub class: usize,
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub confidence: f64,
}

/// Risk presentation for the winning diagnosis.
///
/// `confidence` is the summed probability of every class sharing this level, not the
/// probability of the winning class alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RiskInfo {
    pub level: u8,
    pub name: String,
    pub description: String,
    pub recommendation: String,
    pub color: RiskColor,
    pub urgency: Urgency,
    pub confidence: f64,
}

/// A categorical metadata value echoed back with its decoded name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryInfo {
    pub code: u8,
    pub name: String,
    pub description: String,
}

impl CategoryInfo {
    pub fn decode(field: CategoricalField, code: u8) -> Self {
        Self {
            code,
            name: field.decode(code).to_owned(),
            description: field.describe(code).to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetadataInfo {
    pub age: f64,
    pub sex: CategoryInfo,
    pub localization: CategoryInfo,
    pub dx_type: CategoryInfo,
}

impl From<&PatientMetadata> for MetadataInfo {
    fn from(m: &PatientMetadata) -> Self {
        Self {
            age: m.age(),
            sex: CategoryInfo::decode(CategoricalField::Sex, m.sex()),
            localization: CategoryInfo::decode(CategoricalField::Localization, m.localization()),
            dx_type: CategoryInfo::decode(CategoricalField::DxType, m.dx_type()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiagnosisProbability {
    pub class: usize,
    pub diagnosis: String,
    pub full_name: String,
    pub description: String,
    pub probability: f64,
    pub risk_level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RiskProbability {
    pub level: u8,
    pub probability: f64,
    pub risk_info: RiskLevelInfo,
}

/// Full probability breakdowns for a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Probabilities {
    /// One entry per diagnosis class, in taxonomy order.
    pub diagnosis: Vec<DiagnosisProbability>,
    /// One entry per risk level, in taxonomy order.
    pub risk: Vec<RiskProbability>,
    /// Level with the largest aggregated mass. May differ from the reported risk level,
    /// which follows the single most likely diagnosis.
    pub dominant_risk_level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictionResult {
    pub diagnosis: DiagnosisInfo,
    pub risk: RiskInfo,
    pub metadata: MetadataInfo,
    pub probabilities: Probabilities,
}

/// Response envelope for a prediction request.
///
/// On success the result fields are present and `error` is absent; on failure only
/// `success` and `error` are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<DiagnosisInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Probabilities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResponse {
    pub fn success(result: PredictionResult) -> Self {
        Self {
            success: true,
            diagnosis: Some(result.diagnosis),
            risk: Some(result.risk),
            metadata: Some(result.metadata),
            probabilities: Some(result.probabilities),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            diagnosis: None,
            risk: None,
            metadata: None,
            probabilities: None,
            error: Some(message.into()),
        }
    }
}

impl From<TriageResult<PredictionResult>> for PredictionResponse {
    fn from(outcome: TriageResult<PredictionResult>) -> Self {
        match outcome {
            Ok(result) => Self::success(result),
            Err(err) => Self::from(&err),
        }
    }
}

impl From<&TriageError> for PredictionResponse {
    fn from(err: &TriageError) -> Self {
        Self::failure(err.to_string())
    }
}
