//! Notesmith command-line interface.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use notesmith::generation::{
    HistorySink, JsonlHistory, OpenAiChatGenerator, ReferenceTemplate, generate_release_notes,
};
use notesmith::transcription::{OpenAiWhisper, SpeechToText, UnconfiguredEngine};
use notesmith::{
    ClassificationError, NormalizedInput, Normalizer, NotesmithError, PipelineConfig, SUPPORTED_LANGUAGES,
    UploadArtifact, classify,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Plain text
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Parser)]
#[command(name = "notesmith")]
#[command(version, about = "Normalize uploads and generate release notes", long_about = None)]
struct Cli {
    /// Path to a notesmith.toml/yaml/json file (defaults to discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize files into text with a resolved language
    Normalize {
        /// Files to normalize (PDF, TXT, JSON or video)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Normalize files and generate release notes from them
    Generate {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Reference release-notes document (overrides generation.template_path)
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// User identifier attached to the history record
        #[arg(long)]
        user_id: Option<String>,

        /// Append a history record to this JSON Lines file
        #[arg(long)]
        history: Option<PathBuf>,

        /// Write the release notes to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List supported language codes
    Languages {
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Start the HTTP API server
    #[cfg(feature = "api")]
    Serve {
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => match PipelineConfig::discover()? {
            Some(config) => {
                tracing::debug!("Loaded configuration from discovered notesmith.toml");
                Ok(config)
            }
            None => Ok(PipelineConfig::default()),
        },
    }
}

fn speech_engine(config: &PipelineConfig) -> Arc<dyn SpeechToText> {
    match OpenAiWhisper::from_config(&config.transcription.engine, config.request_timeout()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::debug!(error = %e, "Speech-to-text disabled");
            Arc::new(UnconfiguredEngine::new(e.to_string()))
        }
    }
}

/// Read one file, rejecting it on its on-disk size before any bytes are read.
fn read_artifact(path: &Path, config: &PipelineConfig) -> notesmith::Result<UploadArtifact> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let size = std::fs::metadata(path)?.len();
    if let Err(e @ NotesmithError::Classification(ClassificationError::TooLarge { .. })) =
        classify(&filename, size, &config.size_limits)
    {
        return Err(e);
    }

    let bytes = std::fs::read(path)?;
    Ok(UploadArtifact::new(filename, bytes).with_declared_size(size))
}

async fn normalize_files(normalizer: &Normalizer, files: &[PathBuf]) -> Result<Vec<NormalizedInput>> {
    let mut results: Vec<Option<notesmith::Result<NormalizedInput>>> = Vec::with_capacity(files.len());
    let mut artifacts = Vec::new();
    for path in files {
        match read_artifact(path, normalizer.config()) {
            Ok(artifact) => {
                artifacts.push(artifact);
                results.push(None);
            }
            Err(e) => results.push(Some(Err(e))),
        }
    }

    let mut normalized = normalizer.normalize_batch(artifacts).await.into_iter();
    let mut inputs = Vec::with_capacity(files.len());
    let mut failures = 0;
    for (path, slot) in files.iter().zip(results) {
        let result = match slot {
            Some(result) => result,
            None => normalized
                .next()
                .unwrap_or_else(|| Err(NotesmithError::Other("Normalization result missing".to_string()))),
        };
        match result {
            Ok(input) => inputs.push(input),
            Err(e) => {
                failures += 1;
                eprintln!("error: {}: {}", path.display(), e);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} file(s) could not be normalized", failures, files.len());
    }
    Ok(inputs)
}

fn print_normalized(inputs: &[NormalizedInput], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(inputs)?),
        OutputFormat::Text => {
            for (i, input) in inputs.iter().enumerate() {
                if inputs.len() > 1 {
                    if i > 0 {
                        println!();
                    }
                    println!("==> {} [{}, {}] <==", input.filename, input.kind, input.language);
                }
                println!("{}", input.text);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("notesmith=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Normalize { files, format } => {
            let normalizer = Normalizer::new(config.clone(), speech_engine(&config))?;
            let inputs = normalize_files(&normalizer, &files).await?;
            print_normalized(&inputs, format)
        }

        Commands::Generate {
            files,
            template,
            user_id,
            history,
            output,
        } => {
            let generator = OpenAiChatGenerator::from_config(&config.generation, config.request_timeout())?;
            let template_path = template.or_else(|| config.generation.template_path.clone());
            let reference = match template_path {
                Some(path) => ReferenceTemplate::load(&path)
                    .with_context(|| format!("Failed to load template {}", path.display()))?,
                None => ReferenceTemplate::default(),
            };

            let normalizer = Normalizer::new(config.clone(), speech_engine(&config))?;
            let inputs = normalize_files(&normalizer, &files).await?;

            let sink = history.map(JsonlHistory::new);
            let notes = generate_release_notes(
                &generator,
                &reference,
                &inputs,
                sink.as_ref().map(|s| s as &dyn HistorySink),
                user_id,
            )
            .await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &notes.content)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Release notes written to {}", path.display());
                }
                None => println!("{}", notes.content),
            }
            if let Some(usage) = notes.token_usage {
                tracing::info!(
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Token usage"
                );
            }
            Ok(())
        }

        Commands::Languages { format } => {
            match format {
                OutputFormat::Json => {
                    let languages: Vec<_> = SUPPORTED_LANGUAGES
                        .iter()
                        .map(|code| serde_json::json!({"code": code, "name": code.english_name()}))
                        .collect();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "languages": languages,
                            "default": config.language_detection.default_language,
                        }))?
                    );
                }
                OutputFormat::Text => {
                    for code in SUPPORTED_LANGUAGES {
                        let marker = if code == config.language_detection.default_language {
                            " (default)"
                        } else {
                            ""
                        };
                        println!("{}\t{}{}", code, code.english_name(), marker);
                    }
                }
            }
            Ok(())
        }

        #[cfg(feature = "api")]
        Commands::Serve { host, port } => {
            use notesmith::api::{ApiState, serve};

            let template = ReferenceTemplate::load_or_empty(config.generation.template_path.as_deref());
            let generator = OpenAiChatGenerator::from_config(&config.generation, config.request_timeout());
            let normalizer = Normalizer::new(config.clone(), speech_engine(&config))?;

            let mut state = ApiState::new(normalizer).with_template(template);
            match generator {
                Ok(generator) => state = state.with_generator(Arc::new(generator)),
                Err(e) => tracing::warn!(error = %e, "Release-notes generation disabled"),
            }

            serve(host, port, state).await?;
            Ok(())
        }
    }
}
