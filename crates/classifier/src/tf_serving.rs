//! TensorFlow Serving REST client.
//!
//! Talks to the model server's REST API:
//! - `GET  {base}/v1/models/{name}` to check that a model version is `AVAILABLE`
//! - `POST {base}/v1/models/{name}:predict` with columnar `inputs`
//!
//! Request shape:
//!
//! ```text
//! { "signature_name": "serving_default",
//!   "inputs": { "image_input": [[[[r, g, b], ...], ...]],   // [1, 300, 200, 3]
//!               "meta_input":  [[age, sex, localization, dx_type]] } }
//! ```
//!
//! Response shape: `{ "outputs": [[p0, ..., p6]] }`.

use async_trait::async_trait;
use derma_core::config::CoreConfig;
use derma_core::constants::{IMAGE_CHANNELS, METADATA_DIM};
use derma_core::{Classifier, ClassifierError, ImageTensor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_SIGNATURE: &str = "serving_default";
pub const DEFAULT_IMAGE_INPUT: &str = "image_input";
pub const DEFAULT_META_INPUT: &str = "meta_input";

/// Classifier backed by a TensorFlow Serving model.
#[derive(Debug, Clone)]
pub struct TfServingClassifier {
    client: reqwest::Client,
    base_url: String,
    model_name: String,
    image_input: String,
    meta_input: String,
}

impl TfServingClassifier {
    /// Build a client for the model named in `cfg`. No network I/O happens here.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Unavailable`] if the HTTP client cannot be constructed.
    pub fn new(cfg: &CoreConfig) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.model_timeout())
            .build()
            .map_err(|e| {
                ClassifierError::Unavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: cfg.model_url().to_string(),
            model_name: cfg.model_name().to_string(),
            image_input: DEFAULT_IMAGE_INPUT.to_string(),
            meta_input: DEFAULT_META_INPUT.to_string(),
        })
    }

    /// Override the input tensor names of the serving signature.
    pub fn with_input_names(mut self, image: impl Into<String>, meta: impl Into<String>) -> Self {
        self.image_input = image.into();
        self.meta_input = meta.into();
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn status_url(&self) -> String {
        format!("{}/v1/models/{}", self.base_url, self.model_name)
    }

    fn predict_url(&self) -> String {
        format!("{}/v1/models/{}:predict", self.base_url, self.model_name)
    }

    /// Check that the model server has an `AVAILABLE` version of the model.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Unavailable`] if the server cannot be reached or reports no
    /// available version, and [`ClassifierError::MalformedResponse`] if the status body does
    /// not parse.
    pub async fn probe(&self) -> Result<String, ClassifierError> {
        let resp = self
            .client
            .get(self.status_url())
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(format!("{}: {e}", self.status_url())))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(ClassifierError::Unavailable(format!(
                "model status returned {status}: {}",
                error_message(&body)
            )));
        }

        let versions = parse_model_status(&body)?;
        versions.into_iter().next().ok_or_else(|| {
            ClassifierError::Unavailable(format!(
                "model '{}' has no AVAILABLE version",
                self.model_name
            ))
        })
    }

    fn predict_body(
        &self,
        image: &ImageTensor,
        metadata: &[f32; METADATA_DIM],
    ) -> Result<String, ClassifierError> {
        let pixels: Vec<Vec<&[f32]>> = image
            .rows()
            .map(|row| row.chunks_exact(IMAGE_CHANNELS).collect())
            .collect();

        let mut inputs = BTreeMap::new();
        inputs.insert(self.image_input.as_str(), to_value(&[pixels])?);
        inputs.insert(self.meta_input.as_str(), to_value(&[metadata])?);

        serde_json::to_string(&PredictRequestWire {
            signature_name: DEFAULT_SIGNATURE,
            inputs,
        })
        .map_err(|e| ClassifierError::InvalidInput(e.to_string()))
    }
}

#[async_trait]
impl Classifier for TfServingClassifier {
    async fn classify(
        &self,
        image: &ImageTensor,
        metadata: &[f32; METADATA_DIM],
    ) -> Result<Vec<f64>, ClassifierError> {
        let body = self.predict_body(image, metadata)?;

        let resp = self
            .client
            .post(self.predict_url())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Request(format!("timed out: {e}"))
                } else {
                    ClassifierError::Unavailable(e.to_string())
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ClassifierError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(ClassifierError::Request(format!(
                "predict returned {status}: {}",
                error_message(&text)
            )));
        }

        parse_predict_response(&text)
    }

    fn describe(&self) -> String {
        format!("tensorflow-serving {}", self.status_url())
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Serialize)]
struct PredictRequestWire<'a> {
    signature_name: &'a str,
    inputs: BTreeMap<&'a str, serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PredictResponseWire {
    outputs: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct ModelStatusWire {
    model_version_status: Vec<VersionStatusWire>,
}

#[derive(Deserialize)]
struct VersionStatusWire {
    version: String,
    state: String,
}

#[derive(Deserialize)]
struct ErrorWire {
    error: String,
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value, ClassifierError> {
    serde_json::to_value(value).map_err(|e| ClassifierError::InvalidInput(e.to_string()))
}

/// Extract the single output row of a predict response.
fn parse_predict_response(text: &str) -> Result<Vec<f64>, ClassifierError> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let wire: PredictResponseWire = serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|err| {
            let path = err.path().to_string();
            let path = if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            };
            ClassifierError::MalformedResponse(format!(
                "predict response schema mismatch at {path}: {}",
                err.into_inner()
            ))
        })?;

    let mut outputs = wire.outputs.into_iter();
    match (outputs.next(), outputs.next()) {
        (Some(row), None) => Ok(row),
        (None, _) => Err(ClassifierError::MalformedResponse(
            "predict response has no output rows".into(),
        )),
        (Some(_), Some(_)) => Err(ClassifierError::MalformedResponse(
            "predict response has more than one output row for a single image".into(),
        )),
    }
}

/// Versions reported as `AVAILABLE`, in the order the server lists them.
fn parse_model_status(text: &str) -> Result<Vec<String>, ClassifierError> {
    let wire: ModelStatusWire = serde_json::from_str(text).map_err(|e| {
        ClassifierError::MalformedResponse(format!("invalid model status response: {e}"))
    })?;

    Ok(wire
        .model_version_status
        .into_iter()
        .filter(|v| v.state == "AVAILABLE")
        .map(|v| v.version)
        .collect())
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorWire>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::time::Duration;

    fn tensor() -> ImageTensor {
        ImageTensor::new(vec![0.25; 300 * 200 * 3]).expect("tensor")
    }

    fn config(base: &str, model: &str) -> CoreConfig {
        CoreConfig::new(base.into(), model.into(), Duration::from_secs(5), 100).expect("config")
    }

    /// Serve a fake model server on an ephemeral port and return its base URL.
    async fn fake_server(predict_reply: serde_json::Value, predict_status: StatusCode) -> String {
        // TF Serving puts the verb after a colon in the last path segment.
        let app = Router::new().route(
            "/v1/models/:name",
            get(|Path(name): Path<String>| async move {
                if name == "skin" {
                    (
                        StatusCode::OK,
                        Json(serde_json::json!({
                            "model_version_status": [
                                {"version": "3", "state": "AVAILABLE",
                                 "status": {"error_code": "OK", "error_message": ""}}
                            ]
                        })),
                    )
                } else {
                    (
                        StatusCode::NOT_FOUND,
                        Json(serde_json::json!({"error": "Servable not found"})),
                    )
                }
            })
            .post(move |Path(name): Path<String>, Json(body): Json<serde_json::Value>| {
                let reply = predict_reply.clone();
                async move {
                    assert_eq!(name, "skin:predict");
                    assert_eq!(body["signature_name"], "serving_default");
                    let image = &body["inputs"]["image_input"];
                    assert_eq!(image.as_array().map(Vec::len), Some(1));
                    assert_eq!(image[0].as_array().map(Vec::len), Some(300));
                    assert_eq!(image[0][0].as_array().map(Vec::len), Some(200));
                    assert_eq!(image[0][0][0].as_array().map(Vec::len), Some(3));
                    assert_eq!(body["inputs"]["meta_input"][0][0], 45.0);
                    (predict_status, Json(reply))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    #[test]
    fn parses_single_output_row() {
        let probs = parse_predict_response(r#"{"outputs": [[0.1, 0.2, 0.0, 0.0, 0.0, 0.0, 0.7]]}"#)
            .expect("parse");
        assert_eq!(probs.len(), 7);
        assert_eq!(probs[6], 0.7);
    }

    #[test]
    fn malformed_response_reports_path() {
        let err = parse_predict_response(r#"{"outputs": [[0.1, "x"]]}"#).expect_err("bad type");
        assert!(matches!(err, ClassifierError::MalformedResponse(msg) if msg.contains("outputs")));

        let err = parse_predict_response(r#"{"predictions": [[1.0]]}"#).expect_err("wrong key");
        assert!(matches!(err, ClassifierError::MalformedResponse(_)));

        let err = parse_predict_response(r#"{"outputs": []}"#).expect_err("no rows");
        assert!(matches!(err, ClassifierError::MalformedResponse(msg) if msg.contains("no output")));
    }

    #[test]
    fn model_status_lists_available_versions_only() {
        let versions = parse_model_status(
            r#"{"model_version_status": [
                {"version": "1", "state": "END"},
                {"version": "2", "state": "AVAILABLE"}
            ]}"#,
        )
        .expect("parse");
        assert_eq!(versions, vec!["2".to_string()]);
    }

    #[test]
    fn error_message_prefers_json_error_field() {
        assert_eq!(error_message(r#"{"error": "boom"}"#), "boom");
        assert_eq!(error_message("plain text"), "plain text");
    }

    #[tokio::test]
    async fn probe_and_classify_against_fake_server() {
        let base = fake_server(
            serde_json::json!({"outputs": [[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]]}),
            StatusCode::OK,
        )
        .await;

        let classifier = TfServingClassifier::new(&config(&base, "skin")).expect("client");
        assert_eq!(classifier.probe().await.expect("probe"), "3");
        assert!(classifier.describe().contains("/v1/models/skin"));

        let probs = classifier
            .classify(&tensor(), &[45.0, 1.0, 5.0, 1.0])
            .await
            .expect("classify");
        assert_eq!(probs, vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[tokio::test]
    async fn probe_fails_for_unknown_model() {
        let base = fake_server(serde_json::json!({}), StatusCode::OK).await;
        let err = TfServingClassifier::new(&config(&base, "other"))
            .expect("client")
            .probe()
            .await
            .expect_err("unknown model");
        assert!(matches!(err, ClassifierError::Unavailable(msg) if msg.contains("Servable not found")));
    }

    #[tokio::test]
    async fn server_error_surfaces_as_request_error() {
        let base = fake_server(
            serde_json::json!({"error": "input size mismatch"}),
            StatusCode::BAD_REQUEST,
        )
        .await;
        let classifier = TfServingClassifier::new(&config(&base, "skin")).expect("client");
        let err = classifier
            .classify(&tensor(), &[45.0, 1.0, 5.0, 1.0])
            .await
            .expect_err("server error");
        assert!(matches!(err, ClassifierError::Request(msg) if msg.contains("input size mismatch")));
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        // port 9 (discard) is not expected to run an HTTP server locally
        let classifier =
            TfServingClassifier::new(&config("http://127.0.0.1:9", "skin")).expect("client");
        let err = classifier.probe().await.expect_err("unreachable");
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }
}
