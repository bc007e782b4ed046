//! Route-level tests driving the router in-process with `tower::ServiceExt::oneshot`.

use api_rest::{cors_from_env_value, router, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use derma_core::{Classifier, ClassifierError, ImageTensor, TriageService};
use derma_imaging::{ImagePreprocessor, MAX_UPLOAD_BYTES};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "derma-test-boundary";

struct Fixed(Result<Vec<f64>, &'static str>);

#[async_trait]
impl Classifier for Fixed {
    async fn classify(
        &self,
        image: &ImageTensor,
        metadata: &[f32; 4],
    ) -> Result<Vec<f64>, ClassifierError> {
        assert_eq!(image.data().len(), 300 * 200 * 3);
        assert!(metadata[0] >= 0.0);
        self.0
            .clone()
            .map_err(|msg| ClassifierError::Request(msg.to_string()))
    }

    fn describe(&self) -> String {
        "fixed".into()
    }
}

fn app(classifier: Option<Fixed>) -> Router {
    let service = match classifier {
        Some(c) => TriageService::with_classifier(Arc::new(c)),
        None => TriageService::new(),
    };
    let cors = cors_from_env_value(None).expect("cors");
    router(AppState::new(service, ImagePreprocessor::new(100)), cors)
}

fn melanoma() -> Fixed {
    Fixed(Ok(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]))
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([180, 120, 90]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode png");
    buf
}

fn multipart(fields: &[(&str, &str)], file: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"lesion.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

const VALID_FIELDS: [(&str, &str); 4] = [
    ("age", "45"),
    ("sex", "female"),
    ("localization", "5"),
    ("dx_type", "histo"),
];

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    send(app, req).await
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    send(app, req).await
}

async fn post_predict(
    app: Router,
    fields: &[(&str, &str)],
    file: Option<&[u8]>,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart(fields, file)))
        .expect("request");
    send(app, req).await
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.expect("router is infallible");
    let status = resp.status();
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}

#[tokio::test]
async fn test_root_banner() {
    let (status, body) = get_json(app(None), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["health"], "/api/v1/health");
}

#[tokio::test]
async fn test_health_reports_model_state() {
    let (status, body) = get_json(app(None), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], false);

    let (_, body) = get_json(app(Some(melanoma())), "/api/v1/health").await;
    assert_eq!(body["model_loaded"], true);
}

#[tokio::test]
async fn test_option_endpoints_list_codec_tables() {
    let (_, sex) = get_json(app(None), "/api/v1/sex-options").await;
    assert_eq!(sex.as_array().map(Vec::len), Some(3));
    assert_eq!(sex[1], json!({"name": "female", "code": 1, "description": "Female"}));

    let (_, loc) = get_json(app(None), "/api/v1/localization-options").await;
    assert_eq!(loc.as_array().map(Vec::len), Some(15));
    assert_eq!(loc[14]["name"], "scalp");

    let (_, dx) = get_json(app(None), "/api/v1/dx-type-options").await;
    assert_eq!(dx.as_array().map(Vec::len), Some(4));
    assert_eq!(dx[3]["name"], "histo");
}

#[tokio::test]
async fn test_taxonomy_endpoints_carry_totals() {
    let (_, diagnoses) = get_json(app(None), "/api/v1/diagnosis-classes").await;
    assert_eq!(diagnoses["total_classes"], 7);
    assert_eq!(diagnoses["diagnosis_classes"][6]["name"], "mel");
    assert_eq!(diagnoses["diagnosis_classes"][6]["risk_level"], 3);

    let (_, risks) = get_json(app(None), "/api/v1/risk-classes").await;
    assert_eq!(risks["total_classes"], 4);
    assert_eq!(risks["risk_classes"][0]["color"], "green");
}

#[tokio::test]
async fn test_model_info() {
    let (_, info) = get_json(app(Some(melanoma())), "/api/v1/model-info").await;
    assert_eq!(info["is_loaded"], true);
    assert_eq!(info["classifier"], "fixed");
    assert_eq!(info["image_shape"], json!([300, 200, 3]));
    assert_eq!(info["total_diagnosis_classes"], 7);
}

#[tokio::test]
async fn test_validate_metadata() {
    let (status, body) = post_json(
        app(None),
        "/api/v1/validate-metadata",
        json!({"age": 45, "sex": 1, "localization": 5, "dx_type": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["metadata"]["sex"]["name"], "female");

    let (status, body) = post_json(
        app(None),
        "/api/v1/validate-metadata",
        json!({"age": 45, "sex": 3, "localization": 5, "dx_type": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert!(body["message"].as_str().expect("message").contains("sex"));
}

#[tokio::test]
async fn test_predict_success() {
    let (status, body) =
        post_predict(app(Some(melanoma())), &VALID_FIELDS, Some(&png(240, 320)[..])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body.get("error").is_none());
    assert_eq!(body["diagnosis"]["name"], "mel");
    assert_eq!(body["diagnosis"]["class"], 6);
    assert_eq!(body["risk"]["level"], 3);
    assert_eq!(body["risk"]["name"], "Very dangerous");
    assert_eq!(body["metadata"]["sex"]["code"], 1);
    assert_eq!(body["metadata"]["localization"]["name"], "lower extremity");
    assert_eq!(body["metadata"]["dx_type"]["code"], 3);
    assert_eq!(
        body["probabilities"]["diagnosis"].as_array().map(Vec::len),
        Some(7)
    );
    assert_eq!(body["probabilities"]["risk"].as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn test_predict_without_model_is_unavailable() {
    let (status, body) = post_predict(app(None), &VALID_FIELDS, Some(&png(120, 120)[..])).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("model not loaded"));
    assert!(body.get("diagnosis").is_none());
}

#[tokio::test]
async fn test_predict_rejects_invalid_metadata() {
    let fields = [
        ("age", "130"),
        ("sex", "1"),
        ("localization", "5"),
        ("dx_type", "0"),
    ];
    let service = app(Some(melanoma()));
    let (status, body) = post_predict(service, &fields, Some(&png(120, 120)[..])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().expect("error").contains("age"));
}

#[tokio::test]
async fn test_predict_rejects_unknown_category_name() {
    let fields = [
        ("age", "45"),
        ("sex", "female"),
        ("localization", "elbow"),
        ("dx_type", "0"),
    ];
    let service = app(Some(melanoma()));
    let (status, body) = post_predict(service, &fields, Some(&png(120, 120)[..])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("error").contains("elbow"));
}

#[tokio::test]
async fn test_predict_rejects_missing_file_and_bad_image() {
    let (status, body) = post_predict(app(Some(melanoma())), &VALID_FIELDS, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing form field: file");

    let (status, body) =
        post_predict(app(Some(melanoma())), &VALID_FIELDS, Some(&b"not an image"[..])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("unsupported image format"));

    let service = app(Some(melanoma()));
    let (status, _) = post_predict(service, &VALID_FIELDS, Some(&png(50, 50)[..])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_classifier_failures_are_server_errors() {
    let failing = Fixed(Err("connection reset"));
    let service = app(Some(failing));
    let (status, body) = post_predict(service, &VALID_FIELDS, Some(&png(120, 120)[..])).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("connection reset"));

    let not_a_distribution = Fixed(Ok(vec![0.5; 7]));
    let (status, body) =
        post_predict(app(Some(not_a_distribution)), &VALID_FIELDS, Some(&png(120, 120)[..])).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_predict_rejects_oversized_upload_with_413() {
    let oversized = vec![0u8; MAX_UPLOAD_BYTES + 128 * 1024];
    let service = app(Some(melanoma()));
    let (status, body) = post_predict(service, &VALID_FIELDS, Some(&oversized[..])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().expect("error").contains("byte limit"));
    assert!(body.get("diagnosis").is_none());
}

#[tokio::test]
async fn test_predict_rejects_upload_just_over_image_limit_with_413() {
    // fits under the body limit, which leaves room for the form fields
    let mut bytes = png(120, 120);
    bytes.resize(MAX_UPLOAD_BYTES + 1, 0);
    let service = app(Some(melanoma()));
    let (status, body) = post_predict(service, &VALID_FIELDS, Some(&bytes[..])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].as_str().expect("error").contains("byte limit"));
}
