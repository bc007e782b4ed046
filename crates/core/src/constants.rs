//! Constants used throughout the derma core crate.
//!
//! Table sizes, tensor shapes and numeric tolerances live here so the codec, the reduction
//! engine and the adapters agree on them.

/// Number of diagnosis classes the classifier distinguishes.
pub const DIAGNOSIS_CLASS_COUNT: usize = 7;

/// Number of coarse risk levels used for triage.
pub const RISK_LEVEL_COUNT: usize = 4;

/// Image height expected by the classifier, in pixels.
pub const IMAGE_HEIGHT: usize = 300;

/// Image width expected by the classifier, in pixels.
pub const IMAGE_WIDTH: usize = 200;

/// Colour channels expected by the classifier (RGB).
pub const IMAGE_CHANNELS: usize = 3;

/// Length of the metadata vector: age, sex, localization, dx-type.
pub const METADATA_DIM: usize = 4;

/// Inclusive upper bound for patient age, in years.
pub const MAX_AGE_YEARS: f64 = 120.0;

/// Allowed distance between the sum of a classifier output and 1.0.
///
/// Classifiers emit f32 softmax output, so a strict comparison would reject valid vectors.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-3;

/// Marker returned when a categorical code has no entry in its table.
pub const UNKNOWN_CATEGORY: &str = "unknown";
