//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into services. Request
//! handling never reads environment variables. The `*_from_env_value` helpers take the raw
//! optional string so binaries decide where values come from.

use crate::{TriageError, TriageResult};
use std::time::Duration;

/// Default TensorFlow Serving REST endpoint.
pub const DEFAULT_MODEL_URL: &str = "http://127.0.0.1:8501";

/// Default model name registered with the model server.
pub const DEFAULT_MODEL_NAME: &str = "skin_cancer";

/// Default per-request classifier timeout.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default minimum width and height accepted for uploaded images.
pub const DEFAULT_MIN_IMAGE_SIDE: u32 = 100;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    model_url: String,
    model_name: String,
    model_timeout: Duration,
    min_image_side: u32,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidConfig`] if the model URL is not an http(s) URL, the
    /// model name is empty, or the timeout is zero.
    pub fn new(
        model_url: String,
        model_name: String,
        model_timeout: Duration,
        min_image_side: u32,
    ) -> TriageResult<Self> {
        let model_url = model_url.trim().trim_end_matches('/').to_string();
        if !(model_url.starts_with("http://") || model_url.starts_with("https://")) {
            return Err(TriageError::InvalidConfig(format!(
                "model URL must start with http:// or https:// (got {model_url:?})"
            )));
        }

        let model_name = model_name.trim().to_string();
        if model_name.is_empty() || model_name.contains('/') {
            return Err(TriageError::InvalidConfig(
                "model name cannot be empty or contain '/'".into(),
            ));
        }

        if model_timeout.is_zero() {
            return Err(TriageError::InvalidConfig(
                "model timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            model_url,
            model_name,
            model_timeout,
            min_image_side,
        })
    }

    pub fn model_url(&self) -> &str {
        &self.model_url
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model_timeout(&self) -> Duration {
        self.model_timeout
    }

    pub fn min_image_side(&self) -> u32 {
        self.min_image_side
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            model_url: DEFAULT_MODEL_URL.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            min_image_side: DEFAULT_MIN_IMAGE_SIDE,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the classifier timeout (whole seconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_MODEL_TIMEOUT`].
pub fn model_timeout_from_env_value(value: Option<String>) -> TriageResult<Duration> {
    match non_empty(value) {
        None => Ok(DEFAULT_MODEL_TIMEOUT),
        Some(v) => v
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| TriageError::InvalidConfig(format!("invalid model timeout: {v:?}"))),
    }
}

/// Parse the minimum image side (pixels) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_MIN_IMAGE_SIDE`].
pub fn min_image_side_from_env_value(value: Option<String>) -> TriageResult<u32> {
    match non_empty(value) {
        None => Ok(DEFAULT_MIN_IMAGE_SIDE),
        Some(v) => v
            .parse::<u32>()
            .map_err(|_| TriageError::InvalidConfig(format!("invalid minimum image side: {v:?}"))),
    }
}
