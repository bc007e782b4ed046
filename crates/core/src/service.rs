//! Triage service: the operations exposed to transport layers.

use crate::aggregate::ClassificationVector;
use crate::assemble::assemble;
use crate::classifier::{Classifier, ClassifierSlot, ImageTensor};
use crate::codec::CategoricalField;
use crate::constants::{DIAGNOSIS_CLASS_COUNT, METADATA_DIM, RISK_LEVEL_COUNT};
use crate::result::{CategoryOption, DiagnosisClassInfo, PredictionResult, RiskLevelInfo};
use crate::taxonomy::{diagnosis_classes, risk_levels};
use crate::validation::PatientMetadata;
use crate::{TriageError, TriageResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Snapshot of the model state and every static table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModelInfo {
    pub is_loaded: bool,
    pub classifier: Option<String>,
    pub image_shape: Vec<usize>,
    pub meta_dim: usize,
    pub sex_options: Vec<CategoryOption>,
    pub localization_options: Vec<CategoryOption>,
    pub dx_type_options: Vec<CategoryOption>,
    pub diagnosis_classes: Vec<DiagnosisClassInfo>,
    pub risk_classes: Vec<RiskLevelInfo>,
    pub total_diagnosis_classes: usize,
    pub total_risk_classes: usize,
}

/// Stateless apart from the classifier slot; clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct TriageService {
    slot: Arc<ClassifierSlot>,
}

impl TriageService {
    /// Creates a service with no classifier installed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier(classifier: Arc<dyn Classifier>) -> Self {
        let service = Self::new();
        service.install_classifier(classifier);
        service
    }

    pub fn install_classifier(&self, classifier: Arc<dyn Classifier>) {
        tracing::info!("installing classifier: {}", classifier.describe());
        self.slot.install(classifier);
    }

    pub fn clear_classifier(&self) {
        tracing::warn!("classifier removed; predictions will fail until one is installed");
        self.slot.clear();
    }

    pub fn is_ready(&self) -> bool {
        self.slot.current().is_some()
    }

    pub fn categorical_options(field: CategoricalField) -> Vec<CategoryOption> {
        field.entries().iter().map(CategoryOption::from).collect()
    }

    pub fn diagnosis_taxonomy() -> Vec<DiagnosisClassInfo> {
        diagnosis_classes()
            .iter()
            .map(DiagnosisClassInfo::from)
            .collect()
    }

    pub fn risk_taxonomy() -> Vec<RiskLevelInfo> {
        risk_levels().iter().map(RiskLevelInfo::from).collect()
    }

    /// Validate raw metadata inputs.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate_metadata(
        age: f64,
        sex: f64,
        localization: f64,
        dx_type: f64,
    ) -> Result<PatientMetadata, ValidationError> {
        PatientMetadata::new(age, sex, localization, dx_type)
    }

    /// Run the reduction engine on an already computed probability vector.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Prediction`] if `probabilities` is not a valid distribution
    /// over the diagnosis classes.
    pub fn reduce(
        probabilities: &[f64],
        metadata: &PatientMetadata,
    ) -> TriageResult<PredictionResult> {
        let classification = ClassificationVector::new(probabilities)?;
        Ok(assemble(&classification, metadata))
    }

    /// Classify an image and assemble the triage result.
    ///
    /// Metadata is validated by construction of [`PatientMetadata`], so invalid input never
    /// reaches the classifier.
    ///
    /// # Errors
    ///
    /// - [`TriageError::ModelNotReady`] if no classifier is installed.
    /// - [`TriageError::Prediction`] if the classifier fails or returns a malformed vector.
    pub async fn predict(
        &self,
        image: &ImageTensor,
        metadata: &PatientMetadata,
    ) -> TriageResult<PredictionResult> {
        let classifier = self.slot.current().ok_or(TriageError::ModelNotReady)?;
        let features: [f32; METADATA_DIM] = metadata.to_features();

        let probabilities = classifier.classify(image, &features).await.map_err(|e| {
            tracing::error!("classifier call failed: {}", e);
            TriageError::from(e)
        })?;

        let result = Self::reduce(&probabilities, metadata).inspect_err(|e| {
            tracing::error!("classifier output rejected: {}", e);
        })?;

        tracing::info!(
            diagnosis = %result.diagnosis.name,
            risk_level = result.risk.level,
            "prediction complete"
        );
        Ok(result)
    }

    pub fn model_info(&self) -> ModelInfo {
        let classifier = self.slot.current();
        ModelInfo {
            is_loaded: classifier.is_some(),
            classifier: classifier.map(|c| c.describe()),
            image_shape: ImageTensor::SHAPE.to_vec(),
            meta_dim: METADATA_DIM,
            sex_options: Self::categorical_options(CategoricalField::Sex),
            localization_options: Self::categorical_options(CategoricalField::Localization),
            dx_type_options: Self::categorical_options(CategoricalField::DxType),
            diagnosis_classes: Self::diagnosis_taxonomy(),
            risk_classes: Self::risk_taxonomy(),
            total_diagnosis_classes: DIAGNOSIS_CLASS_COUNT,
            total_risk_classes: RISK_LEVEL_COUNT,
        }
    }
}
