use crate::wire::HealthRes;
use chrono::{SecondsFormat, Utc};

/// Health report builder used by the REST `/health` routes
///
/// The service is healthy whenever it can answer. Whether a classifier is installed is
/// reported separately in `model_loaded`, since metadata and taxonomy endpoints keep
/// working without one.
pub struct HealthService;

impl HealthService {
    /// Build a health report stamped with the current UTC time (RFC 3339).
    pub fn check_health(model_loaded: bool) -> HealthRes {
        HealthRes {
            status: "healthy".into(),
            model_loaded,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}
