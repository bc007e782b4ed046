use crate::AppState;
use api_shared::{
    CategoryOption, DiagnosisClassesRes, HealthRes, HealthService, ModelInfo, PredictionResponse,
    RiskClassesRes, RootRes, ValidateMetadataReq, ValidateMetadataRes,
};
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Json;
use derma_core::{CategoricalField, PatientMetadata, TriageError, TriageService};
use derma_imaging::{ImagingError, MAX_UPLOAD_BYTES};
use serde::Serialize;
use tracing::Instrument;
use utoipa::ToSchema;

type Rejection = (StatusCode, Json<PredictionResponse>);

/// Multipart form accepted by `POST /api/v1/predict`. Only used for the OpenAPI document.
#[derive(Debug, Serialize, ToSchema)]
pub struct PredictUpload {
    /// JPEG, PNG or BMP image of the lesion
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Age in years, 0 to 120
    pub age: f64,
    /// Code (`1`) or name (`female`)
    pub sex: String,
    /// Code (`5`) or name (`lower extremity`)
    pub localization: String,
    /// Code (`3`) or name (`histo`)
    pub dx_type: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = RootRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn root() -> Json<RootRes> {
    Json(RootRes::default())
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Always answers `healthy`; `model_loaded` tells monitoring whether predictions can be
/// served. Also mounted at `/health` for load balancers.
#[axum::debug_handler]
pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health(state.service.is_ready()))
}

#[utoipa::path(
    get,
    path = "/api/v1/sex-options",
    responses(
        (status = 200, description = "Accepted sex values", body = [CategoryOption])
    )
)]
#[axum::debug_handler]
pub(crate) async fn sex_options() -> Json<Vec<CategoryOption>> {
    Json(TriageService::categorical_options(CategoricalField::Sex))
}

#[utoipa::path(
    get,
    path = "/api/v1/localization-options",
    responses(
        (status = 200, description = "Accepted lesion localizations", body = [CategoryOption])
    )
)]
#[axum::debug_handler]
pub(crate) async fn localization_options() -> Json<Vec<CategoryOption>> {
    Json(TriageService::categorical_options(CategoricalField::Localization))
}

#[utoipa::path(
    get,
    path = "/api/v1/dx-type-options",
    responses(
        (status = 200, description = "Accepted diagnostic methods", body = [CategoryOption])
    )
)]
#[axum::debug_handler]
pub(crate) async fn dx_type_options() -> Json<Vec<CategoryOption>> {
    Json(TriageService::categorical_options(CategoricalField::DxType))
}

#[utoipa::path(
    get,
    path = "/api/v1/diagnosis-classes",
    responses(
        (status = 200, description = "Diagnosis taxonomy", body = DiagnosisClassesRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn diagnosis_classes() -> Json<DiagnosisClassesRes> {
    Json(TriageService::diagnosis_taxonomy().into())
}

#[utoipa::path(
    get,
    path = "/api/v1/risk-classes",
    responses(
        (status = 200, description = "Risk taxonomy", body = RiskClassesRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn risk_classes() -> Json<RiskClassesRes> {
    Json(TriageService::risk_taxonomy().into())
}

#[utoipa::path(
    get,
    path = "/api/v1/model-info",
    responses(
        (status = 200, description = "Model state and static tables", body = ModelInfo)
    )
)]
#[axum::debug_handler]
pub(crate) async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.service.model_info())
}

#[utoipa::path(
    post,
    path = "/api/v1/validate-metadata",
    request_body = ValidateMetadataReq,
    responses(
        (status = 200, description = "Validation outcome; `valid` is false for rejected metadata", body = ValidateMetadataRes)
    )
)]
/// Validate metadata without running a prediction
///
/// Rejected metadata is not an HTTP error: the body carries `valid: false` and the
/// first violation found.
#[axum::debug_handler]
pub(crate) async fn validate_metadata(
    Json(req): Json<ValidateMetadataReq>,
) -> Json<ValidateMetadataRes> {
    Json(
        TriageService::validate_metadata(req.age, req.sex, req.localization, req.dx_type).into(),
    )
}

#[utoipa::path(
    post,
    path = "/api/v1/predict",
    request_body(content = PredictUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Prediction result", body = PredictionResponse),
        (status = 400, description = "Invalid metadata or image", body = PredictionResponse),
        (status = 413, description = "Image upload over the size limit", body = PredictionResponse),
        (status = 503, description = "No classifier loaded", body = PredictionResponse),
        (status = 500, description = "Classifier failure", body = PredictionResponse)
    )
)]
/// Classify a lesion image with its patient metadata
///
/// Every outcome, including failures, is a `PredictionResponse` body. Metadata is checked
/// before the image is decoded, and the image before the classifier is called.
#[axum::debug_handler]
pub(crate) async fn predict(
    State(state): State<AppState>,
    multipart: Multipart,
) -> (StatusCode, Json<PredictionResponse>) {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("predict", %request_id);

    match run_predict(state, multipart).instrument(span).await {
        Ok(resp) => (StatusCode::OK, Json(resp)),
        Err(rejection) => rejection,
    }
}

async fn run_predict(
    state: AppState,
    multipart: Multipart,
) -> Result<PredictionResponse, Rejection> {
    let form = PredictForm::read(multipart).await?;
    let metadata = form.metadata()?;

    if !state.service.is_ready() {
        return Err(triage_rejection(&TriageError::ModelNotReady));
    }

    let preprocessor = state.preprocessor;
    let image = tokio::task::spawn_blocking(move || preprocessor.prepare(&form.file))
        .await
        .map_err(|e| {
            tracing::error!("image pre-processing task failed: {}", e);
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        })?
        .map_err(|e| imaging_rejection(&e))?;

    let result = state
        .service
        .predict(&image, &metadata)
        .await
        .map_err(|e| triage_rejection(&e))?;

    Ok(PredictionResponse::success(result))
}

/// Raw fields of the predict form, before validation.
struct PredictForm {
    file: Bytes,
    age: String,
    sex: String,
    localization: String,
    dx_type: String,
}

impl PredictForm {
    async fn read(mut multipart: Multipart) -> Result<Self, Rejection> {
        let mut file = None;
        let mut age = None;
        let mut sex = None;
        let mut localization = None;
        let mut dx_type = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_rejection("invalid multipart body", &e))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            let slot = match name.as_str() {
                "file" => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| multipart_rejection("failed to read file", &e))?;
                    file = Some(bytes);
                    continue;
                }
                "age" => &mut age,
                "sex" => &mut sex,
                "localization" => &mut localization,
                "dx_type" => &mut dx_type,
                other => {
                    tracing::debug!("ignoring unexpected form field {:?}", other);
                    continue;
                }
            };
            let text = field
                .text()
                .await
                .map_err(|e| multipart_rejection(&format!("failed to read {name}"), &e))?;
            *slot = Some(text);
        }

        Ok(Self {
            file: required("file", file)?,
            age: required("age", age)?,
            sex: required("sex", sex)?,
            localization: required("localization", localization)?,
            dx_type: required("dx_type", dx_type)?,
        })
    }

    /// Resolve categorical names to codes and validate the result.
    fn metadata(&self) -> Result<PatientMetadata, Rejection> {
        let age = self.age.trim().parse::<f64>().map_err(|_| {
            reject(
                StatusCode::BAD_REQUEST,
                format!("age must be a number (got {:?})", self.age),
            )
        })?;

        let resolve = |field: CategoricalField, raw: &str| {
            field.resolve(raw).map_err(|e| triage_rejection(&e))
        };
        let sex = resolve(CategoricalField::Sex, &self.sex)?;
        let localization = resolve(CategoricalField::Localization, &self.localization)?;
        let dx_type = resolve(CategoricalField::DxType, &self.dx_type)?;

        PatientMetadata::new(age, sex, localization, dx_type)
            .map_err(|e| triage_rejection(&TriageError::from(e)))
    }
}

fn required<T>(name: &str, value: Option<T>) -> Result<T, Rejection> {
    value.ok_or_else(|| reject(StatusCode::BAD_REQUEST, format!("missing form field: {name}")))
}

fn reject(status: StatusCode, message: impl Into<String>) -> Rejection {
    (status, Json(PredictionResponse::failure(message)))
}

/// A body over the route's limit surfaces here as 413; anything else is a malformed form.
fn multipart_rejection(context: &str, err: &MultipartError) -> Rejection {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::info!("upload rejected: {}", err.body_text());
        return reject(
            status,
            format!("image upload is larger than the {MAX_UPLOAD_BYTES} byte limit"),
        );
    }
    reject(status, format!("{context}: {}", err.body_text()))
}

fn triage_rejection(err: &TriageError) -> Rejection {
    let status = match err {
        e if e.is_caller_error() => StatusCode::BAD_REQUEST,
        TriageError::ModelNotReady => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("prediction error: {}", err);
    } else {
        tracing::info!("prediction rejected: {}", err);
    }
    (status, Json(PredictionResponse::from(err)))
}

fn imaging_rejection(err: &ImagingError) -> Rejection {
    let status = match err {
        ImagingError::Tensor(_) | ImagingError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ImagingError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    };
    tracing::info!("image rejected: {}", err);
    reject(status, err.to_string())
}
