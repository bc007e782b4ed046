use api_shared::{DiagnosisClassesRes, PredictionResponse, RiskClassesRes, ValidateMetadataRes};
use clap::{Args, Parser, Subcommand, ValueEnum};
use derma_classifier::{TfServingClassifier, DEFAULT_IMAGE_INPUT, DEFAULT_META_INPUT};
use derma_core::config::{CoreConfig, DEFAULT_MIN_IMAGE_SIDE, DEFAULT_MODEL_NAME, DEFAULT_MODEL_URL};
use derma_core::{CategoricalField, PatientMetadata, TriageResult, TriageService};
use derma_imaging::{load_file, ImagePreprocessor};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "derma")]
#[command(about = "Skin lesion triage CLI")]
struct Cli {
    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Commands {
    /// List accepted values of a categorical field (sex, localization, dx_type)
    Options {
        field: CategoricalField,
    },
    /// List the diagnosis classes
    Diagnoses,
    /// List the risk levels
    Risks,
    /// Validate patient metadata
    Validate {
        #[command(flatten)]
        metadata: MetadataArgs,
    },
    /// Reduce a diagnosis probability vector to a triage result (no model needed)
    Reduce {
        /// Seven comma-separated probabilities in class order: df,vasc,bkl,nv,akiec,bcc,mel
        #[arg(long, value_delimiter = ',', required = true)]
        probabilities: Vec<f64>,
        #[command(flatten)]
        metadata: MetadataArgs,
    },
    /// Classify an image through a TensorFlow Serving model
    Predict {
        /// JPEG, PNG or BMP image
        image: PathBuf,
        #[command(flatten)]
        metadata: MetadataArgs,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Show the detected format and dimensions of an image
    ImageInfo {
        image: PathBuf,
    },
}

#[derive(Args)]
struct MetadataArgs {
    /// Age in years
    #[arg(long, allow_negative_numbers = true)]
    age: f64,
    /// Code or name, e.g. `1` or `female`
    #[arg(long)]
    sex: String,
    /// Code or name, e.g. `5` or `lower extremity`
    #[arg(long)]
    localization: String,
    /// Code or name, e.g. `3` or `histo`
    #[arg(long)]
    dx_type: String,
}

impl MetadataArgs {
    /// Resolve names to codes; the outer error is an unknown name, the inner a rejected value.
    fn resolve(&self) -> TriageResult<Result<PatientMetadata, derma_core::ValidationError>> {
        let sex = CategoricalField::Sex.resolve(&self.sex)?;
        let localization = CategoricalField::Localization.resolve(&self.localization)?;
        let dx_type = CategoricalField::DxType.resolve(&self.dx_type)?;
        Ok(TriageService::validate_metadata(
            self.age,
            sex,
            localization,
            dx_type,
        ))
    }

    fn validated(&self) -> TriageResult<PatientMetadata> {
        Ok(self.resolve()??)
    }
}

#[derive(Args)]
struct ModelArgs {
    /// TensorFlow Serving base URL
    #[arg(long, env = "DERMA_MODEL_URL", default_value = DEFAULT_MODEL_URL)]
    model_url: String,
    #[arg(long, env = "DERMA_MODEL_NAME", default_value = DEFAULT_MODEL_NAME)]
    model_name: String,
    /// Request timeout in seconds
    #[arg(long, env = "DERMA_MODEL_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,
    /// Name of the image input tensor in the serving signature
    #[arg(long, env = "DERMA_IMAGE_INPUT", default_value = DEFAULT_IMAGE_INPUT)]
    image_input: String,
    /// Name of the metadata input tensor in the serving signature
    #[arg(long, env = "DERMA_META_INPUT", default_value = DEFAULT_META_INPUT)]
    meta_input: String,
}

impl ModelArgs {
    fn config(&self) -> TriageResult<CoreConfig> {
        CoreConfig::new(
            self.model_url.clone(),
            self.model_name.clone(),
            Duration::from_secs(self.timeout_secs),
            DEFAULT_MIN_IMAGE_SIDE,
        )
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("derma=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    match cli.command {
        Some(Commands::Options { field }) => {
            emit(format, &TriageService::categorical_options(field))?;
        }
        Some(Commands::Diagnoses) => {
            emit(
                format,
                &DiagnosisClassesRes::from(TriageService::diagnosis_taxonomy()),
            )?;
        }
        Some(Commands::Risks) => {
            emit(format, &RiskClassesRes::from(TriageService::risk_taxonomy()))?;
        }
        Some(Commands::Validate { metadata }) => {
            let res = match metadata.resolve() {
                Ok(outcome) => ValidateMetadataRes::from(outcome),
                Err(e) => ValidateMetadataRes {
                    valid: false,
                    message: e.to_string(),
                    metadata: None,
                },
            };
            let valid = res.valid;
            emit(format, &res)?;
            if !valid {
                return Ok(ExitCode::FAILURE);
            }
        }
        Some(Commands::Reduce {
            probabilities,
            metadata,
        }) => {
            let outcome = metadata
                .validated()
                .and_then(|m| TriageService::reduce(&probabilities, &m));
            return finish(format, PredictionResponse::from(outcome));
        }
        Some(Commands::Predict {
            image,
            metadata,
            model,
        }) => {
            let resp = match predict(&image, &metadata, &model).await {
                Ok(resp) => resp,
                Err(e) => PredictionResponse::failure(e.to_string()),
            };
            return finish(format, resp);
        }
        Some(Commands::ImageInfo { image }) => {
            let bytes = load_file(&image)?;
            emit(format, &ImagePreprocessor::new(1).info(&bytes)?)?;
        }
        None => {
            println!("Use 'derma --help' for commands");
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn predict(
    image: &Path,
    metadata: &MetadataArgs,
    model: &ModelArgs,
) -> Result<PredictionResponse, Box<dyn std::error::Error>> {
    let metadata = metadata.validated()?;
    let cfg = model.config()?;

    let bytes = load_file(image)?;
    let tensor = ImagePreprocessor::from_config(&cfg).prepare(&bytes)?;

    let classifier = TfServingClassifier::new(&cfg)?
        .with_input_names(&model.image_input, &model.meta_input);
    classifier.probe().await?;
    let service = TriageService::with_classifier(Arc::new(classifier));
    Ok(PredictionResponse::from(
        service.predict(&tensor, &metadata).await,
    ))
}

fn finish(
    format: OutputFormat,
    resp: PredictionResponse,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let success = resp.success;
    emit(format, &resp)?;
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn emit<T: Serialize>(format: OutputFormat, value: &T) -> Result<(), Box<dyn std::error::Error>> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", text.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_reduce_parses_probability_list_and_names() {
        let cli = Cli::try_parse_from([
            "derma",
            "--format",
            "yaml",
            "reduce",
            "--probabilities",
            "0,0,0,0,0,0,1",
            "--age",
            "45",
            "--sex",
            "female",
            "--localization",
            "lower extremity",
            "--dx-type",
            "histo",
        ])
        .expect("parse");

        let Some(Commands::Reduce {
            probabilities,
            metadata,
        }) = cli.command
        else {
            panic!("expected reduce");
        };
        assert_eq!(probabilities.len(), 7);
        let metadata = metadata.validated().expect("valid metadata");
        assert_eq!(metadata.sex(), 1);
        assert_eq!(metadata.localization(), 5);
        assert_eq!(metadata.dx_type(), 3);

        let resp = PredictionResponse::from(TriageService::reduce(&probabilities, &metadata));
        assert!(resp.success);
        assert_eq!(resp.risk.map(|r| r.level), Some(3));
    }

    #[test]
    fn test_options_field_accepts_aliases() {
        let cli = Cli::try_parse_from(["derma", "options", "dx-type"]).expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Options {
                field: CategoricalField::DxType
            })
        ));
    }

    #[test]
    fn test_validate_reports_unknown_names() {
        let cli = Cli::try_parse_from([
            "derma",
            "validate",
            "--age",
            "45",
            "--sex",
            "robot",
            "--localization",
            "5",
            "--dx-type",
            "0",
        ])
        .expect("parse");
        let Some(Commands::Validate { metadata }) = cli.command else {
            panic!("expected validate");
        };
        assert!(metadata.resolve().is_err());
    }
}
