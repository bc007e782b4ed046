use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, cors_from_env_value, router};
use derma_classifier::{DEFAULT_IMAGE_INPUT, DEFAULT_META_INPUT, TfServingClassifier};
use derma_core::config::{
    DEFAULT_MODEL_NAME, DEFAULT_MODEL_URL, min_image_side_from_env_value,
    model_timeout_from_env_value,
};
use derma_core::{ClassifierError, CoreConfig, TriageService};
use derma_imaging::ImagePreprocessor;

/// How often the model server is re-checked after startup.
const MODEL_PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Main entry point for the derma triage server
///
/// Resolves configuration, connects to the model server if it is up, and serves the REST API.
/// A missing model server is not fatal: metadata and taxonomy endpoints keep working, predict
/// answers 503, and a background task installs the classifier once the model is available.
///
/// # Environment Variables
/// - `DERMA_REST_ADDR`: REST server address (default: "0.0.0.0:8000")
/// - `DERMA_MODEL_URL`: TensorFlow Serving base URL (default: "http://127.0.0.1:8501")
/// - `DERMA_MODEL_NAME`: served model name (default: "skin_cancer")
/// - `DERMA_MODEL_TIMEOUT_SECS`: per-request classifier timeout (default: 30)
/// - `DERMA_MIN_IMAGE_SIDE`: smallest accepted image side in pixels (default: 100)
/// - `DERMA_IMAGE_INPUT` / `DERMA_META_INPUT`: input tensor names of the serving signature
/// - `DERMA_ALLOWED_ORIGINS`: comma-separated CORS origins (default: any)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - any configuration value is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("derma=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr: SocketAddr = std::env::var("DERMA_REST_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".into())
        .parse()?;

    let cfg = CoreConfig::new(
        std::env::var("DERMA_MODEL_URL").unwrap_or_else(|_| DEFAULT_MODEL_URL.into()),
        std::env::var("DERMA_MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL_NAME.into()),
        model_timeout_from_env_value(std::env::var("DERMA_MODEL_TIMEOUT_SECS").ok())?,
        min_image_side_from_env_value(std::env::var("DERMA_MIN_IMAGE_SIDE").ok())?,
    )?;
    let cors = cors_from_env_value(std::env::var("DERMA_ALLOWED_ORIGINS").ok())?;

    let classifier = Arc::new(TfServingClassifier::new(&cfg)?.with_input_names(
        std::env::var("DERMA_IMAGE_INPUT").unwrap_or_else(|_| DEFAULT_IMAGE_INPUT.into()),
        std::env::var("DERMA_META_INPUT").unwrap_or_else(|_| DEFAULT_META_INPUT.into()),
    ));

    let service = TriageService::new();
    refresh_model(&service, &classifier).await;
    tokio::spawn(watch_model(service.clone(), classifier));

    let app = router(
        AppState::new(service, ImagePreprocessor::from_config(&cfg)),
        cors,
    );

    tracing::info!("++ Starting derma REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- derma REST stopped");
    Ok(())
}

/// Effect of one model probe on the installed classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelChange {
    Installed,
    Cleared,
    Unchanged,
}

/// Install the classifier when the model is available and remove it when it is not.
async fn refresh_model(service: &TriageService, classifier: &Arc<TfServingClassifier>) {
    let outcome = classifier.probe().await;
    apply_probe(service, classifier, outcome);
}

fn apply_probe(
    service: &TriageService,
    classifier: &Arc<TfServingClassifier>,
    outcome: Result<String, ClassifierError>,
) -> ModelChange {
    match outcome {
        Ok(_) if service.is_ready() => ModelChange::Unchanged,
        Ok(version) => {
            tracing::info!(
                "model '{}' version {} is available",
                classifier.model_name(),
                version
            );
            service.install_classifier(classifier.clone());
            ModelChange::Installed
        }
        Err(e) => {
            tracing::warn!("model server unavailable, predictions disabled: {}", e);
            if service.is_ready() {
                service.clear_classifier();
                ModelChange::Cleared
            } else {
                ModelChange::Unchanged
            }
        }
    }
}

async fn watch_model(service: TriageService, classifier: Arc<TfServingClassifier>) {
    let mut interval = tokio::time::interval(MODEL_PROBE_INTERVAL);
    // the first tick completes immediately and startup has already probed
    interval.tick().await;
    loop {
        interval.tick().await;
        refresh_model(&service, &classifier).await;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
