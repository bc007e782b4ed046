//! # Derma Core
//!
//! Core triage logic for the skin-lesion classification service.
//!
//! This crate turns the output of an external multimodal classifier into a structured triage
//! result:
//! - categorical metadata codec and validation (`codec`, `validation`)
//! - the fixed diagnosis and risk taxonomies and the danger surjection (`taxonomy`)
//! - reduction of diagnosis probabilities to risk probabilities (`aggregate`)
//! - result assembly (`assemble`) and the service facade (`service`)
//!
//! **No transport concerns**: HTTP routing, multipart parsing and image decoding belong in
//! `api-rest` and `derma-imaging`. The classifier itself sits behind the
//! [`classifier::Classifier`] trait.

pub mod aggregate;
pub mod assemble;
pub mod classifier;
pub mod codec;
pub mod config;
pub mod constants;
pub mod result;
pub mod service;
pub mod taxonomy;
pub mod validation;

mod error;

pub use aggregate::{aggregate, ClassificationVector, RiskVector};
pub use classifier::{Classifier, ClassifierSlot, ImageTensor};
pub use codec::CategoricalField;
pub use config::CoreConfig;
pub use error::{ClassifierError, TriageError, TriageResult, ValidationError};
pub use result::{PredictionResponse, PredictionResult};
pub use service::{ModelInfo, TriageService};
pub use validation::{validate_metadata, PatientMetadata};
