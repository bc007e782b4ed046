//! Request and response bodies for the triage API.
//!
//! Engine result types (`PredictionResponse`, `ModelInfo`, ...) live in `derma-core` and are
//! re-exported here so API consumers only need one import path.

use derma_core::result::{DiagnosisClassInfo, MetadataInfo, RiskLevelInfo};
use derma_core::{PatientMetadata, ValidationError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use derma_core::result::{CategoryOption, PredictionResponse};
pub use derma_core::service::ModelInfo;

/// Service banner returned by `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RootRes {
    pub message: String,
    pub version: String,
    pub status: String,
    pub docs: String,
    pub health: String,
}

impl Default for RootRes {
    fn default() -> Self {
        Self {
            message: crate::SERVICE_NAME.into(),
            version: crate::SERVICE_VERSION.into(),
            status: "running".into(),
            docs: "/swagger-ui".into(),
            health: "/api/v1/health".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub status: String,
    pub model_loaded: bool,
    /// RFC 3339, UTC
    pub timestamp: String,
}

/// Raw metadata as submitted by a client. Codes are numeric; names are resolved upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"age": 45, "sex": 1, "localization": 5, "dx_type": 0}))]
pub struct ValidateMetadataReq {
    pub age: f64,
    pub sex: f64,
    pub localization: f64,
    pub dx_type: f64,
}

/// Outcome of metadata validation.
///
/// `message` is `"Metadata is valid"` on success and the first violation otherwise.
/// `metadata` echoes the decoded values when validation passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValidateMetadataRes {
    pub valid: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataInfo>,
}

impl From<Result<PatientMetadata, ValidationError>> for ValidateMetadataRes {
    fn from(outcome: Result<PatientMetadata, ValidationError>) -> Self {
        match outcome {
            Ok(m) => Self {
                valid: true,
                message: "Metadata is valid".into(),
                metadata: Some(MetadataInfo::from(&m)),
            },
            Err(e) => Self {
                valid: false,
                message: e.to_string(),
                metadata: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DiagnosisClassesRes {
    pub diagnosis_classes: Vec<DiagnosisClassInfo>,
    pub total_classes: usize,
}

impl From<Vec<DiagnosisClassInfo>> for DiagnosisClassesRes {
    fn from(diagnosis_classes: Vec<DiagnosisClassInfo>) -> Self {
        Self {
            total_classes: diagnosis_classes.len(),
            diagnosis_classes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RiskClassesRes {
    pub risk_classes: Vec<RiskLevelInfo>,
    pub total_classes: usize,
}

impl From<Vec<RiskLevelInfo>> for RiskClassesRes {
    fn from(risk_classes: Vec<RiskLevelInfo>) -> Self {
        Self {
            total_classes: risk_classes.len(),
            risk_classes,
        }
    }
}
