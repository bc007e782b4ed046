//! # API REST
//!
//! REST API implementation for the derma triage service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (multipart uploads, JSON serialisation, CORS)
//!
//! Uses `api-shared` for the request/response bodies and `derma-core` for all triage logic.

#![warn(rust_2018_idioms)]

mod handlers;

use api_shared::{
    CategoryOption, DiagnosisClassesRes, HealthRes, ModelInfo, PredictionResponse,
    RiskClassesRes, RootRes, ValidateMetadataReq, ValidateMetadataRes,
};
use axum::extract::DefaultBodyLimit;
use axum::http::{header::InvalidHeaderValue, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use derma_core::result::{
    CategoryInfo, DiagnosisClassInfo, DiagnosisInfo, DiagnosisProbability, MetadataInfo,
    Probabilities, RiskInfo, RiskLevelInfo, RiskProbability,
};
use derma_core::taxonomy::{RiskColor, Urgency};
use derma_core::TriageService;
use derma_imaging::{ImagePreprocessor, MAX_UPLOAD_BYTES};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use handlers::PredictUpload;

/// Application state shared across REST API handlers
///
/// Clones share the same classifier slot, so a classifier installed after the router is
/// built is visible to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: TriageService,
    pub preprocessor: ImagePreprocessor,
}

impl AppState {
    pub fn new(service: TriageService, preprocessor: ImagePreprocessor) -> Self {
        Self {
            service,
            preprocessor,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root,
        handlers::health,
        handlers::sex_options,
        handlers::localization_options,
        handlers::dx_type_options,
        handlers::diagnosis_classes,
        handlers::risk_classes,
        handlers::model_info,
        handlers::validate_metadata,
        handlers::predict,
    ),
    components(schemas(
        RootRes,
        HealthRes,
        CategoryOption,
        DiagnosisClassesRes,
        DiagnosisClassInfo,
        RiskClassesRes,
        RiskLevelInfo,
        RiskColor,
        Urgency,
        ModelInfo,
        ValidateMetadataReq,
        ValidateMetadataRes,
        MetadataInfo,
        CategoryInfo,
        PredictUpload,
        PredictionResponse,
        DiagnosisInfo,
        RiskInfo,
        Probabilities,
        DiagnosisProbability,
        RiskProbability,
    )),
    info(title = "Skin Cancer Classification API")
)]
pub struct ApiDoc;

/// Build the full REST router: service routes, versioned API routes and Swagger UI.
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    // multipart framing and text fields on top of the image itself
    let upload_limit = MAX_UPLOAD_BYTES + 64 * 1024;

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/sex-options", get(handlers::sex_options))
        .route("/localization-options", get(handlers::localization_options))
        .route("/dx-type-options", get(handlers::dx_type_options))
        .route("/diagnosis-classes", get(handlers::diagnosis_classes))
        .route("/risk-classes", get(handlers::risk_classes))
        .route("/model-info", get(handlers::model_info))
        .route("/validate-metadata", post(handlers::validate_metadata))
        .route(
            "/predict",
            post(handlers::predict).layer(DefaultBodyLimit::max(upload_limit)),
        );

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer from a comma-separated list of allowed origins.
///
/// An unset or empty value, or one containing `*`, allows any origin.
///
/// # Errors
///
/// Returns an error if an origin is not a valid header value.
pub fn cors_from_env_value(value: Option<String>) -> Result<CorsLayer, InvalidHeaderValue> {
    let origins: Vec<String> = value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_owned)
        .collect();

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::permissive());
    }

    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}
