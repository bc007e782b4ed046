use crate::codec::CategoricalField;

/// Reasons a set of patient metadata is rejected before classification.
///
/// Messages are shown to the caller as-is, so they name the accepted values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("age must be between 0 and 120 years (got {0})")]
    AgeOutOfRange(f64),
    #[error("sex must be 0 (male), 1 (female) or 2 (unknown) (got {0})")]
    InvalidSex(f64),
    #[error("localization must be an integer between 0 and 14 (got {0})")]
    LocalizationOutOfRange(f64),
    #[error("dx_type must be 0 (follow_up), 1 (consensus), 2 (confocal) or 3 (histo) (got {0})")]
    InvalidDxType(f64),
}

/// Failures raised by classifier adapters.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    #[error("classifier request failed: {0}")]
    Request(String),
    #[error("malformed classifier response: {0}")]
    MalformedResponse(String),
    #[error("invalid classifier input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unknown {field} category: {name:?}")]
    UnknownCategory {
        field: CategoricalField,
        name: String,
    },
    #[error("model not loaded; the classifier has not been initialised")]
    ModelNotReady,
    #[error("prediction failed: {0}")]
    Prediction(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<ClassifierError> for TriageError {
    fn from(err: ClassifierError) -> Self {
        TriageError::Prediction(err.to_string())
    }
}

impl TriageError {
    /// Whether the error was caused by caller-supplied input rather than the service.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            TriageError::Validation(_) | TriageError::UnknownCategory { .. }
        )
    }
}

pub type TriageResult<T> = std::result::Result<T, TriageError>;
